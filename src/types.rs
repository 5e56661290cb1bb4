// =============================================================================
// Shared types used across the ticker tracker
// =============================================================================

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::SymbolError;

/// Time-of-day format used for chart tick labels and point timestamps.
pub const TIME_LABEL_FORMAT: &str = "%H:%M:%S";

// =============================================================================
// Symbol
// =============================================================================

/// A ticker symbol identifying a tradable instrument.
///
/// The only validation is that it is non-empty after trimming; the provider
/// decides whether the instrument exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Parse user input into a symbol. Surrounding whitespace is dropped.
    pub fn parse(input: &str) -> Result<Self, SymbolError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// PricePoint
// =============================================================================

/// A single (timestamp, price) observation taken by a sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub at: DateTime<Local>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(at: DateTime<Local>, price: f64) -> Self {
        Self { at, price }
    }

    /// Sample `price` at the current wall-clock time.
    #[cfg(test)]
    pub fn now(price: f64) -> Self {
        Self::new(Local::now(), price)
    }

    /// `HH:MM:SS` label shown on the chart's x axis.
    pub fn time_label(&self) -> String {
        self.at.format(TIME_LABEL_FORMAT).to_string()
    }
}

impl Serialize for PricePoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("PricePoint", 3)?;
        s.serialize_field("time", &self.time_label())?;
        s.serialize_field("at", &self.at.to_rfc3339())?;
        s.serialize_field("price", &self.price)?;
        s.end()
    }
}

// =============================================================================
// SessionOutcome
// =============================================================================

/// Terminal state of a bounded chart session. There is no resumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "kebab-case")]
pub enum SessionOutcome {
    /// The configured duration elapsed.
    Completed,
    /// The chart surface was closed before the duration elapsed.
    CancelledByUser,
    /// A fetch failed; the message is the reported error text.
    AbortedOnError(String),
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CancelledByUser => "cancelled-by-user",
            Self::AbortedOnError(_) => "aborted-on-error",
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbortedOnError(msg) => write!(f, "aborted-on-error ({msg})"),
            other => f.write_str(other.label()),
        }
    }
}
