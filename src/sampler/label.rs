// =============================================================================
// Label Sampler: detached task keeping a live price label up to date
// =============================================================================
//
// The label is a `watch` channel: a single slot that every writer replaces.
// Starting the sampler twice gives two independent writers on the same
// label; whichever wrote last is what readers see. The task stops only when
// its cancel token fires (process shutdown).
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::quote::PriceFetcher;
use crate::sampler::{label_error_text, label_price_text};
use crate::types::Symbol;

/// Fixed pause between label updates.
pub const LABEL_INTERVAL: Duration = Duration::from_secs(5);

pub struct LabelSampler {
    fetcher: Arc<dyn PriceFetcher>,
}

impl LabelSampler {
    pub fn new(fetcher: Arc<dyn PriceFetcher>) -> Self {
        Self { fetcher }
    }

    /// Start a detached writer for `symbol`. The handle may be dropped.
    pub fn spawn(
        &self,
        symbol: Symbol,
        label: Arc<watch::Sender<String>>,
        cancel: CancellationToken,
    ) -> JoinHandle<u64> {
        let sampler = Self {
            fetcher: Arc::clone(&self.fetcher),
        };
        tokio::spawn(async move { sampler.run(&symbol, &label, &cancel).await })
    }

    /// Update `label` every [`LABEL_INTERVAL`] until cancelled. Returns the
    /// number of updates written.
    pub async fn run(
        &self,
        symbol: &Symbol,
        label: &watch::Sender<String>,
        cancel: &CancellationToken,
    ) -> u64 {
        let mut updates = 0u64;
        info!(%symbol, "label tracking started");

        while !cancel.is_cancelled() {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.fetcher.fetch(symbol) => Some(result),
            };
            let Some(result) = fetched else { break };

            let text = match result {
                Ok(price) => {
                    debug!(%symbol, price, "label price updated");
                    label_price_text(symbol, price)
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "label price fetch failed");
                    label_error_text(&e)
                }
            };
            label.send_replace(text);
            updates += 1;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(LABEL_INTERVAL) => {}
            }
        }

        info!(%symbol, updates, "label tracking stopped");
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::testing::{ConstantFetcher, ScriptedFetcher, Step};

    #[tokio::test(start_paused = true)]
    async fn error_text_replaces_price_then_recovers() {
        let fetcher = Arc::new(ScriptedFetcher::new([
            Step::Price(101.5),
            Step::Fail("timeout"),
            Step::Price(99.0),
        ]));
        let (tx, mut rx) = watch::channel(String::new());
        let cancel = CancellationToken::new();
        let handle = LabelSampler::new(fetcher).spawn(
            Symbol::parse("ACME").unwrap(),
            Arc::new(tx),
            cancel.clone(),
        );

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "The current price of ACME is $101.50");

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "Error: ACME: timeout");

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "The current price of ACME is $99.00");

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn updates_every_five_seconds() {
        let (tx, rx) = watch::channel(String::new());
        let cancel = CancellationToken::new();
        let handle = LabelSampler::new(Arc::new(ConstantFetcher(5.0))).spawn(
            Symbol::parse("ACME").unwrap(),
            Arc::new(tx),
            cancel.clone(),
        );

        // Updates at t = 0, 5, 10; cancelled at 12.
        tokio::time::sleep(Duration::from_secs(12)).await;
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), 3);
        assert_eq!(*rx.borrow(), "The current price of ACME is $5.00");
    }

    #[tokio::test(start_paused = true)]
    async fn two_writers_share_one_label_last_write_wins() {
        let (tx, rx) = watch::channel(String::new());
        let tx = Arc::new(tx);
        let cancel = CancellationToken::new();
        let symbol = Symbol::parse("ACME").unwrap();

        let first = LabelSampler::new(Arc::new(ConstantFetcher(1.0)))
            .spawn(symbol.clone(), Arc::clone(&tx), cancel.clone());
        let second = LabelSampler::new(Arc::new(ConstantFetcher(2.0)))
            .spawn(symbol, Arc::clone(&tx), cancel.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        let seen = rx.borrow().clone();
        assert!(
            seen == "The current price of ACME is $1.00"
                || seen == "The current price of ACME is $2.00",
            "label holds one whole update, got {seen:?}"
        );

        cancel.cancel();
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 1);
    }
}
