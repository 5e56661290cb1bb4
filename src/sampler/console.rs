// =============================================================================
// Console Sampler: print the latest price every interval until cancelled
// =============================================================================

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::quote::PriceFetcher;
use crate::sampler::{console_error_line, console_price_line};
use crate::types::Symbol;

/// Counters reported when the loop is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleSummary {
    pub cycles: u64,
    pub successes: u64,
    pub failures: u64,
}

pub struct ConsoleSampler {
    fetcher: Arc<dyn PriceFetcher>,
    interval: Duration,
}

impl ConsoleSampler {
    pub fn new(fetcher: Arc<dyn PriceFetcher>, interval: Duration) -> Self {
        Self { fetcher, interval }
    }

    /// Sample `symbol` forever, writing one line per cycle to `out`.
    ///
    /// Fetch errors are written and logged, never returned. The loop only
    /// ends when `cancel` fires, including mid-fetch and mid-sleep.
    pub async fn run<W: Write + Send>(
        &self,
        symbol: &Symbol,
        out: &mut W,
        cancel: &CancellationToken,
    ) -> ConsoleSummary {
        let mut summary = ConsoleSummary::default();
        info!(%symbol, interval_secs = self.interval.as_secs(), "console tracking started");

        while !cancel.is_cancelled() {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.fetcher.fetch(symbol) => Some(result),
            };
            let Some(result) = fetched else { break };

            summary.cycles += 1;
            let line = match result {
                Ok(price) => {
                    summary.successes += 1;
                    info!(%symbol, price, cycle = summary.cycles, "price sampled");
                    console_price_line(symbol, price)
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!(%symbol, error = %e, cycle = summary.cycles, "price fetch failed");
                    console_error_line(&e)
                }
            };

            if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
                warn!(error = %e, "failed to write console line");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(
            %symbol,
            cycles = summary.cycles,
            failures = summary.failures,
            "console tracking stopped"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::testing::{ScriptedFetcher, Step};

    fn cancel_after(token: &CancellationToken, secs: u64) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            token.cancel();
        });
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_logged_and_loop_continues() {
        let fetcher = Arc::new(ScriptedFetcher::new([Step::Fail("network down"), Step::Price(101.5)]));
        let sampler = ConsoleSampler::new(fetcher.clone(), Duration::from_secs(5));
        let symbol = Symbol::parse("ACME").unwrap();
        let cancel = CancellationToken::new();
        let mut out = Vec::<u8>::new();

        cancel_after(&cancel, 7);
        let summary = sampler.run(&symbol, &mut out, &cancel).await;

        assert_eq!(
            summary,
            ConsoleSummary {
                cycles: 2,
                successes: 1,
                failures: 1
            }
        );
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "An error occurred: ACME: network down",
                "The current price of ACME is: $101.50",
            ]
        );
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_retrying_every_interval_without_backoff() {
        let fetcher = Arc::new(ScriptedFetcher::new(Vec::<Step>::new()));
        let sampler = ConsoleSampler::new(fetcher.clone(), Duration::from_secs(1));
        let symbol = Symbol::parse("ACME").unwrap();
        let cancel = CancellationToken::new();
        let mut out = Vec::<u8>::new();

        // Samples at t = 0, 1, 2, 3, 4; cancelled at 4.5.
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4500)).await;
            token.cancel();
        });
        let summary = sampler.run(&symbol, &mut out, &cancel).await;

        assert_eq!(summary.cycles, 5);
        assert_eq!(summary.failures, 5);
        assert_eq!(fetcher.calls(), 5);
    }

    #[tokio::test]
    async fn already_cancelled_token_runs_no_cycle() {
        let fetcher = Arc::new(ScriptedFetcher::new([Step::Price(1.0)]));
        let sampler = ConsoleSampler::new(fetcher.clone(), Duration::from_secs(5));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut out = Vec::<u8>::new();
        let summary = sampler
            .run(&Symbol::parse("ACME").unwrap(), &mut out, &cancel)
            .await;
        assert_eq!(summary, ConsoleSummary::default());
        assert!(out.is_empty());
        assert_eq!(fetcher.calls(), 0);
    }
}
