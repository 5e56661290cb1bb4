// =============================================================================
// Central Application State: dashboard shell
// =============================================================================
//
// Ties the dashboard surfaces together: the error text region, the live
// price label, and the chart board. Handlers only go through the methods
// below so the error-text rules stay in one place.
//
// Thread safety:
//   - AtomicU64 version counter, bumped on every visible mutation.
//   - parking_lot::RwLock for the small mutable fields.
//   - The label is a watch channel written only by label sampler tasks.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chart::board::ChartSnapshot;
use crate::chart::ChartBoard;
use crate::error::SymbolError;
use crate::quote::PriceFetcher;
use crate::runtime_config::RuntimeConfig;
use crate::sampler::{ChartSampler, LabelSampler};
use crate::types::{SessionOutcome, Symbol};

// =============================================================================
// Records
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// One label writer started from the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerRecord {
    pub id: Uuid,
    pub symbol: Symbol,
    pub started_at: String,
}

/// Full dashboard view returned by `GET /api/state`.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub label: String,
    pub error_text: String,
    pub trackers: Vec<TrackerRecord>,
    pub chart: ChartSnapshot,
    pub recent_errors: Vec<ErrorRecord>,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Price source ────────────────────────────────────────────────────
    pub fetcher: Arc<dyn PriceFetcher>,

    // ── Surfaces ────────────────────────────────────────────────────────
    pub label_tx: Arc<watch::Sender<String>>,
    pub error_text: RwLock<String>,
    pub chart_board: Arc<ChartBoard>,

    // ── Bookkeeping ─────────────────────────────────────────────────────
    pub trackers: RwLock<Vec<TrackerRecord>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Lifecycle ───────────────────────────────────────────────────────
    /// Cancelled on shutdown; every sampler task holds a child token.
    pub shutdown: CancellationToken,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        fetcher: Arc<dyn PriceFetcher>,
        shutdown: CancellationToken,
    ) -> Self {
        let (label_tx, _) = watch::channel(String::new());

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            fetcher,
            label_tx: Arc::new(label_tx),
            error_text: RwLock::new(String::new()),
            chart_board: Arc::new(ChartBoard::new()),
            trackers: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            shutdown,
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error text & log ────────────────────────────────────────────────

    /// Validate ticker input from the dashboard.
    ///
    /// An empty ticker shows the validation message in the error region; a
    /// valid one clears any previous message.
    pub fn accept_symbol(&self, input: &str) -> Result<Symbol, SymbolError> {
        let result = Symbol::parse(input);
        *self.error_text.write() = match &result {
            Ok(_) => String::new(),
            Err(e) => e.to_string(),
        };
        self.increment_version();
        result
    }

    /// Record an error message. The log is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, message: String) {
        let record = ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Label ───────────────────────────────────────────────────────────

    pub fn label_text(&self) -> String {
        self.label_tx.borrow().clone()
    }

    pub fn subscribe_label(&self) -> watch::Receiver<String> {
        self.label_tx.subscribe()
    }

    /// Spawn a detached label writer for `symbol`.
    ///
    /// Earlier writers are left running; the label shows whichever wrote
    /// last.
    pub fn start_label_tracker(&self, symbol: Symbol) -> TrackerRecord {
        let record = TrackerRecord {
            id: Uuid::new_v4(),
            symbol: symbol.clone(),
            started_at: Utc::now().to_rfc3339(),
        };

        let _detached = LabelSampler::new(Arc::clone(&self.fetcher)).spawn(
            symbol,
            Arc::clone(&self.label_tx),
            self.shutdown.child_token(),
        );

        info!(symbol = %record.symbol, id = %record.id, "label tracker started");
        self.trackers.write().push(record.clone());
        self.increment_version();
        record
    }

    // ── Chart ───────────────────────────────────────────────────────────

    /// Open a new chart session on the board and run it in the background.
    pub fn start_chart(self: &Arc<Self>, symbol: Symbol) -> Uuid {
        let (duration, interval) = {
            let config = self.runtime_config.read();
            (
                Duration::from_secs(config.chart_duration_secs),
                Duration::from_secs(config.chart_interval_secs),
            )
        };

        let mut surface = self
            .chart_board
            .open(symbol.clone(), self.shutdown.child_token());
        let session_id = surface.session_id();
        let sampler = ChartSampler::new(Arc::clone(&self.fetcher), duration, interval);
        let state = Arc::clone(self);

        tokio::spawn(async move {
            let session = sampler.run(&symbol, &mut surface).await;
            if let SessionOutcome::AbortedOnError(message) = &session.outcome {
                warn!(%symbol, error = %message, "chart session aborted");
                state.push_error(format!("Error fetching data: {message}"));
            }
            state.increment_version();
        });

        self.increment_version();
        session_id
    }

    /// Close the running chart session. `false` if none was running.
    pub fn close_chart(&self) -> bool {
        let closed = self.chart_board.close();
        if closed {
            self.increment_version();
        }
        closed
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    pub fn build_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            label: self.label_text(),
            error_text: self.error_text.read().clone(),
            trackers: self.trackers.read().clone(),
            chart: self.chart_board.snapshot(),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::board::BoardStatus;
    use crate::quote::testing::{ConstantFetcher, ScriptedFetcher, Step};
    use crate::sampler::label::LABEL_INTERVAL;

    fn state_with(fetcher: Arc<dyn PriceFetcher>) -> Arc<AppState> {
        let config = RuntimeConfig {
            chart_duration_secs: 10,
            chart_interval_secs: 5,
            ..RuntimeConfig::default()
        };
        Arc::new(AppState::new(config, fetcher, CancellationToken::new()))
    }

    #[test]
    fn empty_symbol_sets_error_text_and_valid_one_clears_it() {
        let state = state_with(Arc::new(ConstantFetcher(1.0)));

        assert_eq!(state.accept_symbol(""), Err(SymbolError::Empty));
        assert_eq!(
            *state.error_text.read(),
            "Please enter a valid stock ticker!"
        );

        let sym = state.accept_symbol("ACME").unwrap();
        assert_eq!(sym.as_str(), "ACME");
        assert!(state.error_text.read().is_empty());
    }

    #[test]
    fn error_log_is_capped() {
        let state = state_with(Arc::new(ConstantFetcher(1.0)));
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error(format!("e{i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "e5");
    }

    #[tokio::test(start_paused = true)]
    async fn label_tracker_writes_label_and_stops_on_shutdown() {
        let state = state_with(Arc::new(ConstantFetcher(42.0)));
        let mut rx = state.subscribe_label();

        state.start_label_tracker(Symbol::parse("ACME").unwrap());
        rx.changed().await.unwrap();
        assert_eq!(state.label_text(), "The current price of ACME is $42.00");
        assert_eq!(state.build_snapshot().trackers.len(), 1);

        state.shutdown.cancel();
        tokio::time::sleep(LABEL_INTERVAL * 3).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn chart_session_runs_to_completion_on_board() {
        let state = state_with(Arc::new(ConstantFetcher(10.0)));
        state.start_chart(Symbol::parse("ACME").unwrap());

        tokio::time::sleep(Duration::from_secs(11)).await;
        let snap = state.build_snapshot().chart;
        assert_eq!(
            snap.status,
            BoardStatus::Finished {
                outcome: SessionOutcome::Completed
            }
        );
        assert_eq!(snap.points.len(), 2);
        assert!(snap.has_image);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_chart_session_is_logged() {
        let state = state_with(Arc::new(ScriptedFetcher::new([Step::Fail("boom")])));
        state.start_chart(Symbol::parse("ACME").unwrap());

        tokio::time::sleep(Duration::from_secs(1)).await;
        let snap = state.build_snapshot();
        assert_eq!(snap.recent_errors.len(), 1);
        assert_eq!(snap.recent_errors[0].message, "Error fetching data: ACME: boom");
        assert_eq!(snap.chart.error.as_deref(), Some("Error fetching data: ACME: boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn close_chart_cancels_running_session() {
        let state = state_with(Arc::new(ConstantFetcher(10.0)));
        assert!(!state.close_chart());

        state.start_chart(Symbol::parse("ACME").unwrap());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(state.close_chart());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            state.build_snapshot().chart.status,
            BoardStatus::Finished {
                outcome: SessionOutcome::CancelledByUser
            }
        );
    }
}
