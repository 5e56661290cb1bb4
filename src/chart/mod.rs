// =============================================================================
// Chart Module: line-chart rendering and the surfaces a chart session draws on
// =============================================================================
//
// A surface is "open" until its close token is cancelled. The chart sampler
// checks that before every fetch and races it against the pause between
// samples, so closing a surface ends the session within one cycle.
// =============================================================================

pub mod board;
pub mod file_surface;
pub mod render;

pub use board::ChartBoard;
pub use file_surface::SvgFileSurface;
pub use render::render_svg;

use tokio_util::sync::CancellationToken;

use crate::types::{PricePoint, SessionOutcome, Symbol};

/// Default SVG canvas size in pixels.
pub const CHART_SIZE: (u32, u32) = (900, 540);

/// Where a chart session draws.
pub trait ChartSurface: Send {
    /// Cancelled when the user closes the surface.
    fn close_signal(&self) -> &CancellationToken;

    fn is_open(&self) -> bool {
        !self.close_signal().is_cancelled()
    }

    /// Clear and redraw from the entire accumulated sequence.
    fn redraw(&mut self, symbol: &Symbol, points: &[PricePoint]) -> anyhow::Result<()>;

    /// Show an error text on the surface.
    fn report_error(&mut self, message: &str);

    /// The session reached a terminal state; the last chart stays visible.
    fn finish(&mut self, _outcome: &SessionOutcome) {}
}
