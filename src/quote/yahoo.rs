// =============================================================================
// Yahoo Finance chart client: latest daily close for one symbol
// =============================================================================
//
// GET {base}/v8/finance/chart/{symbol}?range=1d&interval=1d
//
// The last non-null entry of `indicators.quote[0].close` is the most recent
// session close. Unknown symbols come back as 404 with a `chart.error`
// object; an empty trading day comes back as 200 with an empty close list.
// Both surface as `FetchError`.
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::quote::PriceFetcher;
use crate::runtime_config::RuntimeConfig;
use crate::types::Symbol;

/// Longest slice of an error body kept in a `FetchError::Status` message.
const MAX_ERROR_BODY: usize = 200;

/// HTTP client for the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooClient {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Build a client from the provider section of `config`.
    pub fn new(config: &RuntimeConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.provider_base_url)
            .with_context(|| format!("invalid provider URL '{}'", config.provider_base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("provider URL '{}' cannot carry a path", base_url);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self { base_url, client })
    }

    /// Chart URL for `symbol`; the symbol is percent-encoded as a path segment.
    fn chart_url(&self, symbol: &Symbol) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart", symbol.as_str()]);
        }
        url.query_pairs_mut()
            .append_pair("range", "1d")
            .append_pair("interval", "1d");
        url
    }
}

#[async_trait]
impl PriceFetcher for YahooClient {
    #[instrument(skip(self), fields(symbol = %symbol), name = "yahoo::fetch")]
    async fn fetch(&self, symbol: &Symbol) -> Result<f64, FetchError> {
        let url = self.chart_url(symbol);
        let transport = |source| FetchError::Transport {
            symbol: symbol.to_string(),
            source,
        };

        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            if let Some(message) = body.as_ref().and_then(provider_error) {
                return Err(FetchError::Provider {
                    symbol: symbol.to_string(),
                    message,
                });
            }
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body = body.ok_or_else(|| FetchError::Provider {
            symbol: symbol.to_string(),
            message: "response body is not JSON".to_string(),
        })?;

        let price = parse_latest_close(symbol.as_str(), &body)?;
        debug!(price, "latest close fetched");
        Ok(price)
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Extract the most recent close from a chart response body.
pub fn parse_latest_close(symbol: &str, body: &Value) -> Result<f64, FetchError> {
    if let Some(message) = provider_error(body) {
        return Err(FetchError::Provider {
            symbol: symbol.to_string(),
            message,
        });
    }

    let price = body["chart"]["result"]
        .get(0)
        .and_then(|result| result["indicators"]["quote"].get(0))
        .and_then(|quote| quote["close"].as_array())
        .and_then(|closes| closes.iter().rev().find_map(Value::as_f64))
        .ok_or_else(|| FetchError::NoData {
            symbol: symbol.to_string(),
        })?;

    if !price.is_finite() || price < 0.0 {
        return Err(FetchError::InvalidPrice {
            symbol: symbol.to_string(),
            price,
        });
    }

    Ok(price)
}

/// The provider's own error description, if the body carries one.
fn provider_error(body: &Value) -> Option<String> {
    let err = &body["chart"]["error"];
    if err.is_null() {
        return None;
    }
    let message = err["description"]
        .as_str()
        .or_else(|| err["code"].as_str())
        .unwrap_or("unknown provider error");
    Some(message.to_string())
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chart_body(closes: Value) -> Value {
        json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "ACME", "currency": "USD" },
                    "timestamp": [1709299800],
                    "indicators": { "quote": [{ "close": closes }] }
                }],
                "error": null
            }
        })
    }

    fn client_for(server: &MockServer) -> YahooClient {
        let config = RuntimeConfig {
            provider_base_url: server.uri(),
            ..RuntimeConfig::default()
        };
        YahooClient::new(&config).unwrap()
    }

    #[test]
    fn parse_takes_last_non_null_close() {
        let body = chart_body(json!([187.2, 189.55, null]));
        let price = parse_latest_close("ACME", &body).unwrap();
        assert!((price - 189.55).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_empty_close_list_is_no_data() {
        let body = chart_body(json!([]));
        let err = parse_latest_close("ACME", &body).unwrap_err();
        assert!(matches!(err, FetchError::NoData { .. }));
        assert!(err.to_string().contains("no price data found"));
    }

    #[test]
    fn parse_missing_result_is_no_data() {
        let body = json!({ "chart": { "result": [], "error": null } });
        assert!(matches!(
            parse_latest_close("ACME", &body),
            Err(FetchError::NoData { .. })
        ));
    }

    #[test]
    fn parse_provider_error_object() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        let err = parse_latest_close("NOPE", &body).unwrap_err();
        assert_eq!(err.to_string(), "NOPE: No data found, symbol may be delisted");
    }

    #[test]
    fn parse_rejects_negative_price() {
        let body = chart_body(json!([-3.0]));
        assert!(matches!(
            parse_latest_close("ACME", &body),
            Err(FetchError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn chart_url_appends_symbol_segment() {
        let client = YahooClient::new(&RuntimeConfig::default()).unwrap();
        let url = client.chart_url(&Symbol::parse("BRK-B").unwrap());
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/BRK-B?range=1d&interval=1d"
        );

        let url = client.chart_url(&Symbol::parse("A/B").unwrap());
        assert!(url.path().ends_with("/chart/A%2FB"));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = RuntimeConfig {
            provider_base_url: "not a url".into(),
            ..RuntimeConfig::default()
        };
        assert!(YahooClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn fetch_returns_latest_close() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ACME"))
            .and(query_param("range", "1d"))
            .and(query_param("interval", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(json!([101.5]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let price = client.fetch(&Symbol::parse("ACME").unwrap()).await.unwrap();
        assert!((price - 101.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn fetch_unknown_symbol_reports_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ZZZZ"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "chart": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch(&Symbol::parse("ZZZZ").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Provider { .. }));
    }

    #[tokio::test]
    async fn fetch_non_json_error_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch(&Symbol::parse("ACME").unwrap())
            .await
            .unwrap_err();
        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
