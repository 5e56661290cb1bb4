// =============================================================================
// Chart Board: the dashboard's chart window
// =============================================================================
//
// Holds the latest rendered chart of at most one session. Opening a new
// session closes the previous one (the old window goes away). Writes from a
// surface whose session is no longer current are dropped, so a slow
// previous session can never overwrite the new chart.
// =============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chart::{render_svg, ChartSurface, CHART_SIZE};
use crate::types::{PricePoint, SessionOutcome, Symbol};

// =============================================================================
// Status & snapshot
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum BoardStatus {
    #[default]
    Idle,
    Running,
    Finished { outcome: SessionOutcome },
}

/// Serialisable view of the board for `GET /api/chart`.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    pub session_id: Option<Uuid>,
    pub symbol: Option<Symbol>,
    #[serde(flatten)]
    pub status: BoardStatus,
    pub points: Vec<PricePoint>,
    pub error: Option<String>,
    pub has_image: bool,
}

#[derive(Default)]
struct BoardState {
    session_id: Option<Uuid>,
    symbol: Option<Symbol>,
    status: BoardStatus,
    points: Vec<PricePoint>,
    svg: Option<String>,
    error: Option<String>,
    close: Option<CancellationToken>,
}

// =============================================================================
// ChartBoard
// =============================================================================

pub struct ChartBoard {
    inner: RwLock<BoardState>,
    size: (u32, u32),
}

impl Default for ChartBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartBoard {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BoardState::default()),
            size: CHART_SIZE,
        }
    }

    /// Start a new session on the board, closing any running one.
    pub fn open(self: &Arc<Self>, symbol: Symbol, close: CancellationToken) -> SharedChartSurface {
        let session_id = Uuid::new_v4();
        let mut state = self.inner.write();

        if let Some(previous) = state.close.take() {
            previous.cancel();
            debug!(session = ?state.session_id, "previous chart session closed");
        }

        *state = BoardState {
            session_id: Some(session_id),
            symbol: Some(symbol.clone()),
            status: BoardStatus::Running,
            close: Some(close.clone()),
            ..BoardState::default()
        };

        info!(%symbol, %session_id, "chart session opened");

        SharedChartSurface {
            board: Arc::clone(self),
            session_id,
            close,
        }
    }

    /// Close the running session, as if the user closed the chart window.
    ///
    /// Returns `false` when nothing is running.
    pub fn close(&self) -> bool {
        let state = self.inner.read();
        match (&state.status, &state.close) {
            (BoardStatus::Running, Some(token)) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Latest rendered chart, if any session has drawn yet.
    pub fn svg(&self) -> Option<String> {
        self.inner.read().svg.clone()
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        let state = self.inner.read();
        ChartSnapshot {
            session_id: state.session_id,
            symbol: state.symbol.clone(),
            status: state.status.clone(),
            points: state.points.clone(),
            error: state.error.clone(),
            has_image: state.svg.is_some(),
        }
    }

    /// Apply `f` only if `session_id` is still the current session.
    fn update(&self, session_id: Uuid, f: impl FnOnce(&mut BoardState)) {
        let mut state = self.inner.write();
        if state.session_id == Some(session_id) {
            f(&mut state);
        }
    }
}

// =============================================================================
// SharedChartSurface
// =============================================================================

/// A session's handle onto the board.
pub struct SharedChartSurface {
    board: Arc<ChartBoard>,
    session_id: Uuid,
    close: CancellationToken,
}

impl SharedChartSurface {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

impl ChartSurface for SharedChartSurface {
    fn close_signal(&self) -> &CancellationToken {
        &self.close
    }

    fn redraw(&mut self, symbol: &Symbol, points: &[PricePoint]) -> anyhow::Result<()> {
        let svg = render_svg(symbol, points, self.board.size)?;
        let points = points.to_vec();
        self.board.update(self.session_id, move |state| {
            state.points = points;
            state.svg = Some(svg);
        });
        Ok(())
    }

    fn report_error(&mut self, message: &str) {
        let message = message.to_string();
        self.board.update(self.session_id, move |state| {
            state.error = Some(message);
        });
    }

    fn finish(&mut self, outcome: &SessionOutcome) {
        let outcome = outcome.clone();
        self.board.update(self.session_id, move |state| {
            state.status = BoardStatus::Finished { outcome };
            state.close = None;
        });
    }
}
