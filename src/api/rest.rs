// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// The dashboard page lives at `/`; everything it talks to is under `/api/`.
// There is no authentication: the server binds to localhost by default.
//
// CORS is permissive so the page can also be opened from a file.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::page::DASHBOARD_HTML;
use crate::app_state::AppState;
use crate::error::SymbolError;

// =============================================================================
// Router construction
// =============================================================================

/// Build the dashboard router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Page ────────────────────────────────────────────────────
        .route("/", get(index))
        // ── State ───────────────────────────────────────────────────
        .route("/api/health", get(health))
        .route("/api/state", get(full_state))
        // ── Controls ────────────────────────────────────────────────
        .route("/api/track", post(start_tracker))
        .route("/api/plot", post(start_plot).delete(close_plot))
        // ── Chart ───────────────────────────────────────────────────
        .route("/api/chart", get(chart_state))
        .route("/api/chart.svg", get(chart_svg))
        // ── WebSocket ───────────────────────────────────────────────
        .route("/api/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ──────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// =============================================================================
// Health & state
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Controls
// =============================================================================

#[derive(Deserialize)]
struct SymbolRequest {
    #[serde(default)]
    symbol: String,
}

fn invalid_symbol(e: SymbolError) -> Response {
    warn!(error = %e, "rejected ticker input");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
}

async fn start_tracker(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SymbolRequest>,
) -> Response {
    let symbol = match state.accept_symbol(&req.symbol) {
        Ok(s) => s,
        Err(e) => return invalid_symbol(e),
    };

    let tracker = state.start_label_tracker(symbol);
    Json(tracker).into_response()
}

async fn start_plot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SymbolRequest>,
) -> Response {
    let symbol = match state.accept_symbol(&req.symbol) {
        Ok(s) => s,
        Err(e) => return invalid_symbol(e),
    };

    let session_id = state.start_chart(symbol.clone());
    info!(%symbol, %session_id, "plot requested");
    Json(json!({ "session_id": session_id, "symbol": symbol })).into_response()
}

async fn close_plot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let closed = state.close_chart();
    info!(closed, "plot close requested");
    Json(json!({ "closed": closed }))
}

// =============================================================================
// Chart
// =============================================================================

async fn chart_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chart_board.snapshot())
}

async fn chart_svg(State(state): State<Arc<AppState>>) -> Response {
    match state.chart_board.svg() {
        Some(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No chart has been drawn yet" })),
        )
            .into_response(),
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use crate::quote::testing::ConstantFetcher;
    use crate::runtime_config::RuntimeConfig;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            RuntimeConfig::default(),
            Arc::new(ConstantFetcher(123.456)),
            CancellationToken::new(),
        ))
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = router(Arc::clone(state))
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json_of(bytes: &[u8]) -> serde_json::Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn index_serves_dashboard() {
        let state = test_state();
        let (status, body) = send(&state, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("Track Stock"));
    }

    #[tokio::test]
    async fn empty_ticker_is_rejected_and_shown() {
        let state = test_state();
        for path in ["/api/track", "/api/plot"] {
            let (status, body) =
                send(&state, Method::POST, path, Some(json!({ "symbol": "  " }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json_of(&body)["error"], "Please enter a valid stock ticker!");
        }

        let (_, body) = send(&state, Method::GET, "/api/state", None).await;
        let snap = json_of(&body);
        assert_eq!(snap["error_text"], "Please enter a valid stock ticker!");
        assert_eq!(snap["trackers"].as_array().unwrap().len(), 0);
        assert_eq!(snap["chart"]["status"], "idle");
    }

    #[tokio::test(start_paused = true)]
    async fn track_clears_error_and_updates_label() {
        let state = test_state();
        let mut rx = state.subscribe_label();
        send(&state, Method::POST, "/api/track", Some(json!({}))).await;

        let (status, body) =
            send(&state, Method::POST, "/api/track", Some(json!({ "symbol": "ACME" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["symbol"], "ACME");

        rx.changed().await.unwrap();
        let (_, body) = send(&state, Method::GET, "/api/state", None).await;
        let snap = json_of(&body);
        assert_eq!(snap["error_text"], "");
        assert_eq!(snap["label"], "The current price of ACME is $123.46");
    }

    #[tokio::test(start_paused = true)]
    async fn plot_renders_chart_and_delete_closes_it() {
        let state = test_state();

        let (status, _) = send(&state, Method::GET, "/api/chart.svg", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&state, Method::POST, "/api/plot", Some(json!({ "symbol": "ACME" }))).await;
        assert_eq!(status, StatusCode::OK);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let (status, body) = send(&state, Method::GET, "/api/chart.svg", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("<svg"));

        let (_, body) = send(&state, Method::GET, "/api/chart", None).await;
        let chart = json_of(&body);
        assert_eq!(chart["status"], "running");
        assert_eq!(chart["points"].as_array().unwrap().len(), 1);

        let (_, body) = send(&state, Method::DELETE, "/api/plot", None).await;
        assert_eq!(json_of(&body)["closed"], true);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let (_, body) = send(&state, Method::GET, "/api/chart", None).await;
        let chart = json_of(&body);
        assert_eq!(chart["status"], "finished");
        assert_eq!(chart["outcome"]["state"], "cancelled-by-user");

        let (_, body) = send(&state, Method::DELETE, "/api/plot", None).await;
        assert_eq!(json_of(&body)["closed"], false);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let state = test_state();
        let (status, body) = send(&state, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "ok");
    }
}
