// =============================================================================
// Runtime Configuration: provider, sampling cadence and dashboard settings
// =============================================================================
//
// Every field carries `#[serde(default)]` so that a partial (or empty) JSON
// file still loads. Saving uses an atomic tmp + rename so a crash mid-write
// never leaves a truncated file behind.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_provider_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; ticker-tracker)".to_string()
}

fn default_console_interval_secs() -> u64 {
    5
}

fn default_chart_duration_secs() -> u64 {
    60
}

fn default_chart_interval_secs() -> u64 {
    5
}

fn default_chart_output_path() -> String {
    "chart.svg".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Provider ------------------------------------------------------------

    /// Base URL of the chart API (no trailing slash).
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // --- Sampling ------------------------------------------------------------

    /// Sleep between console samples.
    #[serde(default = "default_console_interval_secs")]
    pub console_interval_secs: u64,

    /// Total length of a chart session.
    #[serde(default = "default_chart_duration_secs")]
    pub chart_duration_secs: u64,

    /// Sleep between chart samples.
    #[serde(default = "default_chart_interval_secs")]
    pub chart_interval_secs: u64,

    /// Where `plot` writes its SVG.
    #[serde(default = "default_chart_output_path")]
    pub chart_output_path: String,

    // --- Dashboard -----------------------------------------------------------

    /// Listen address for `serve`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider_base_url: default_provider_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            console_interval_secs: default_console_interval_secs(),
            chart_duration_secs: default_chart_duration_secs(),
            chart_interval_secs: default_chart_interval_secs(),
            chart_output_path: default_chart_output_path(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            provider = %config.provider_base_url,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `TICKER_PROVIDER_URL` / `TICKER_BIND_ADDR` from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("TICKER_PROVIDER_URL").ok(),
            std::env::var("TICKER_BIND_ADDR").ok(),
        );
    }

    fn apply_overrides(&mut self, provider_url: Option<String>, bind_addr: Option<String>) {
        if let Some(url) = provider_url.filter(|u| !u.trim().is_empty()) {
            self.provider_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(addr) = bind_addr.filter(|a| !a.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
    }

    /// Reject settings that would make a sampler spin or never run.
    pub fn validate(&self) -> Result<()> {
        if self.console_interval_secs == 0 {
            anyhow::bail!("console_interval_secs must be at least 1");
        }
        if self.chart_interval_secs == 0 {
            anyhow::bail!("chart_interval_secs must be at least 1");
        }
        if self.chart_duration_secs == 0 {
            anyhow::bail!("chart_duration_secs must be at least 1");
        }
        if self.provider_base_url.trim().is_empty() {
            anyhow::bail!("provider_base_url must not be empty");
        }
        Ok(())
    }
}
