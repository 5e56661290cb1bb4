// =============================================================================
// Error types
// =============================================================================
//
// FetchError is the single failure kind a sampler sees. The variants only
// exist to make log lines readable; every sampler treats them alike.
// =============================================================================

use thiserror::Error;

/// Failure of one remote price lookup.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request for {symbol} failed: {source}")]
    Transport {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("provider returned {status} for {symbol}: {body}")]
    Status {
        symbol: String,
        status: u16,
        body: String,
    },

    /// The provider answered but reported an error of its own.
    #[error("{symbol}: {message}")]
    Provider { symbol: String, message: String },

    /// The response carried no closing price (unknown symbol, empty session).
    #[error("{symbol}: no price data found, symbol may be delisted")]
    NoData { symbol: String },

    /// The latest close was not a finite, non-negative number.
    #[error("{symbol}: invalid price {price}")]
    InvalidPrice { symbol: String, price: f64 },
}

/// Rejection of user-supplied ticker input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("Please enter a valid stock ticker!")]
    Empty,
}
