//! SVG line chart of a price session.
//!
//! Points are placed at their index on the x axis and labelled with their
//! `HH:MM:SS` sample time, the same way a categorical time axis reads.

use plotters::prelude::*;

use crate::types::{PricePoint, Symbol};

/// Render the whole sequence to an SVG document.
pub fn render_svg(
    symbol: &Symbol,
    points: &[PricePoint],
    size: (u32, u32),
) -> anyhow::Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;

        let labels: Vec<String> = points.iter().map(PricePoint::time_label).collect();
        let (y_min, y_max) = price_range(points);
        let x_max = points.len().saturating_sub(1).max(1) as f64;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Real-Time Stock Price of {symbol}"),
                ("sans-serif", 22),
            )
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..x_max + 0.5, y_min..y_max)?;

        let label_at = |x: &f64| tick_label(&labels, *x);
        let price_label = |y: &f64| format!("{y:.2}");
        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc("Price (USD)")
            .x_labels(points.len().clamp(2, 12))
            .x_label_formatter(&label_at)
            .y_label_formatter(&price_label)
            .draw()?;

        let series = points
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.price));

        chart
            .draw_series(LineSeries::new(series.clone(), &BLUE))?
            .label(symbol.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart.draw_series(series.map(|coord| Circle::new(coord, 4, BLUE.filled())))?;

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
    }
    Ok(svg)
}

/// Time label for an x tick; ticks between two samples stay blank.
fn tick_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Padded y range. A flat series still gets a visible band.
fn price_range(points: &[PricePoint]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for p in points {
        min = min.min(p.price);
        max = max.max(p.price);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let spread = max - min;
    let pad = if spread < 1e-9 {
        (max.abs() * 0.01).max(0.5)
    } else {
        spread * 0.1
    };
    (min - pad, max + pad)
}
