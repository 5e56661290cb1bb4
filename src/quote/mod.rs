// =============================================================================
// Quote Module: latest closing price lookups
// =============================================================================
//
// Samplers depend only on the `PriceFetcher` trait so that tests can script
// a sequence of prices and failures without touching the network.
// =============================================================================

pub mod yahoo;

pub use yahoo::YahooClient;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::Symbol;

/// One remote lookup of the most recent closing price for a symbol.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Issue a single request and return the latest close.
    ///
    /// Successful prices are finite and non-negative.
    async fn fetch(&self, symbol: &Symbol) -> Result<f64, FetchError>;
}
