// =============================================================================
// Chart Sampler: bounded sampling session with a full redraw per cycle
// =============================================================================
//
// Per cycle:
//   1. elapsed >= duration         => Completed
//   2. surface closed              => CancelledByUser
//   3. fetch; error                => report, AbortedOnError (points untouched)
//      success                     => append (now, price)
//   4. redraw from all points
//   5. pause `interval`, waking early if the surface closes
//
// The point count is bounded by ceil(duration / interval) + 1, which keeps
// redrawing from scratch cheap.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::chart::ChartSurface;
use crate::quote::PriceFetcher;
use crate::sampler::chart_error_text;
use crate::types::{PricePoint, SessionOutcome, Symbol};

// =============================================================================
// Session result
// =============================================================================

/// Everything a finished session produced.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSession {
    pub symbol: Symbol,
    pub points: Vec<PricePoint>,
    pub outcome: SessionOutcome,
    /// Fetch attempts made, including a failing last one.
    pub cycles: u64,
}

/// Open / last / range of a session's prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSummary {
    pub samples: usize,
    pub open: f64,
    pub last: f64,
    pub high: f64,
    pub low: f64,
    pub change: f64,
    pub change_pct: f64,
}

impl ChartSession {
    /// `None` when no sample succeeded.
    pub fn summary(&self) -> Option<SessionSummary> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        let (high, low) = self
            .points
            .iter()
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), p| {
                (hi.max(p.price), lo.min(p.price))
            });

        let change = last.price - first.price;
        let change_pct = if first.price > 0.0 {
            change / first.price * 100.0
        } else {
            0.0
        };

        Some(SessionSummary {
            samples: self.points.len(),
            open: first.price,
            last: last.price,
            high,
            low,
            change,
            change_pct,
        })
    }
}

// =============================================================================
// ChartSampler
// =============================================================================

/// Points reserved up front; longer sessions grow the buffer as they go.
const MAX_PREALLOCATED_POINTS: usize = 1024;

pub struct ChartSampler {
    fetcher: Arc<dyn PriceFetcher>,
    duration: Duration,
    interval: Duration,
}

impl ChartSampler {
    pub fn new(fetcher: Arc<dyn PriceFetcher>, duration: Duration, interval: Duration) -> Self {
        Self {
            fetcher,
            duration,
            interval,
        }
    }

    /// Upper bound on the points one session can hold.
    pub fn max_points(&self) -> usize {
        let interval = self.interval.as_secs_f64();
        if interval <= 0.0 {
            return 1;
        }
        ((self.duration.as_secs_f64() / interval).ceil() as usize).saturating_add(1)
    }

    /// Run one session against `surface` until it reaches a terminal state.
    pub async fn run<S>(&self, symbol: &Symbol, surface: &mut S) -> ChartSession
    where
        S: ChartSurface + ?Sized,
    {
        let start = Instant::now();
        let started_at = Local::now();
        let close = surface.close_signal().clone();
        let mut points: Vec<PricePoint> =
            Vec::with_capacity(self.max_points().min(MAX_PREALLOCATED_POINTS));
        let mut cycles = 0u64;

        info!(
            %symbol,
            duration_secs = self.duration.as_secs(),
            interval_secs = self.interval.as_secs(),
            "chart session started"
        );

        let outcome = loop {
            if start.elapsed() >= self.duration {
                break SessionOutcome::Completed;
            }
            if !surface.is_open() {
                info!(%symbol, "Plot closed by user.");
                break SessionOutcome::CancelledByUser;
            }

            let fetched = tokio::select! {
                biased;
                _ = close.cancelled() => None,
                result = self.fetcher.fetch(symbol) => Some(result),
            };
            let Some(result) = fetched else {
                info!(%symbol, "Plot closed by user.");
                break SessionOutcome::CancelledByUser;
            };
            cycles += 1;

            match result {
                Ok(price) => {
                    points.push(PricePoint::new(sample_time(started_at, start), price));
                    info!(%symbol, price, points = points.len(), "chart point added");
                }
                Err(e) => {
                    let message = chart_error_text(&e);
                    warn!(%symbol, error = %e, cycle = cycles, "chart session aborted");
                    surface.report_error(&message);
                    break SessionOutcome::AbortedOnError(e.to_string());
                }
            }

            if let Err(e) = surface.redraw(symbol, &points) {
                warn!(%symbol, error = %e, "chart redraw failed");
            }

            tokio::select! {
                _ = close.cancelled() => {}
                _ = tokio::time::sleep(self.interval) => {}
            }
        };

        surface.finish(&outcome);
        info!(%symbol, outcome = %outcome, points = points.len(), "chart session ended");

        ChartSession {
            symbol: symbol.clone(),
            points,
            outcome,
            cycles,
        }
    }
}

/// Wall-clock time of a sample, derived from the monotonic session clock so
/// point timestamps never go backwards.
fn sample_time(started_at: DateTime<Local>, start: Instant) -> DateTime<Local> {
    let elapsed = TimeDelta::from_std(start.elapsed()).unwrap_or_default();
    started_at + elapsed
}
