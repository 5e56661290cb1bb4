// =============================================================================
// SVG file surface: the chart window of the `plot` command
// =============================================================================
//
// Every redraw replaces the file through a tmp + rename so an image viewer
// watching the path never reads a half-written document. The surface is
// closed by cancelling its token (Ctrl-C in the CLI).
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chart::{render_svg, ChartSurface, CHART_SIZE};
use crate::types::{PricePoint, SessionOutcome, Symbol};

pub struct SvgFileSurface {
    path: PathBuf,
    close: CancellationToken,
    size: (u32, u32),
    redraws: usize,
}

impl SvgFileSurface {
    pub fn new(path: impl Into<PathBuf>, close: CancellationToken) -> Self {
        Self {
            path: path.into(),
            close,
            size: CHART_SIZE,
            redraws: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn redraws(&self) -> usize {
        self.redraws
    }

    fn write_atomic(&self, content: &str) -> Result<()> {
        let tmp_path = self.path.with_extension("svg.tmp");

        std::fs::write(&tmp_path, content)
            .with_context(|| format!("failed to write chart to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename chart to {}", self.path.display()))?;

        Ok(())
    }
}

impl ChartSurface for SvgFileSurface {
    fn close_signal(&self) -> &CancellationToken {
        &self.close
    }

    fn redraw(&mut self, symbol: &Symbol, points: &[PricePoint]) -> Result<()> {
        let svg = render_svg(symbol, points, self.size)?;
        self.write_atomic(&svg)?;
        self.redraws += 1;
        debug!(path = %self.path.display(), points = points.len(), "chart redrawn");
        Ok(())
    }

    fn report_error(&mut self, message: &str) {
        warn!(path = %self.path.display(), error = message, "chart session error");
    }

    fn finish(&mut self, outcome: &SessionOutcome) {
        info!(
            path = %self.path.display(),
            outcome = %outcome,
            redraws = self.redraws,
            "chart session finished"
        );
    }
}
