//! Chart model and rendering seam
//!
//! [`ChartModel`] accumulates one base series plus up to a few overlay
//! series, aligned positionally to the base series' bucket ordering. The
//! derived time span is a structured field on the model, not a convention
//! buried in the title string, so callers compose titles without parsing
//! renderer output.
//!
//! Rendering goes through the [`ChartEngine`] trait. The bundled
//! [`SvgChartEngine`] emits a plain SVG line chart; anything more elaborate
//! is a different engine behind the same contract.

use crate::error::{Error, Result};
use crate::series::TimeSeries;
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::path::Path;

/// One plotted line: a legend label plus values in bucket order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlottedSeries {
    pub label: String,
    pub values: Vec<u64>,
}

/// In-memory chart being assembled for one pipeline run.
///
/// Transient: discarded after rendering.
#[derive(Debug, Clone)]
pub struct ChartModel {
    /// Chart title; the pipeline owns its final form
    pub title: String,
    /// Bucket dates shared by all plotted series
    buckets: Vec<NaiveDate>,
    base: PlottedSeries,
    overlays: Vec<PlottedSeries>,
    /// Derived from the base series' bucket range; `None` for empty series
    span: Option<(NaiveDate, NaiveDate)>,
}

impl ChartModel {
    /// Build a chart model from the base series.
    ///
    /// The base series defines the bucket cardinality and ordering every
    /// overlay must match.
    pub fn compose(base: &TimeSeries, label: &str) -> Self {
        Self {
            title: label.to_string(),
            buckets: base.dates().collect(),
            base: PlottedSeries {
                label: label.to_string(),
                values: base.values(),
            },
            overlays: Vec::new(),
            span: base.span(),
        }
    }

    /// Add a named comparison line.
    ///
    /// Values are aligned positionally to the base series' buckets; the
    /// model does not re-key by date. A different cardinality is a caller
    /// bug surfaced as [`Error::SeriesShapeMismatch`].
    pub fn add_overlay(&mut self, label: &str, values: Vec<u64>) -> Result<()> {
        if values.len() != self.buckets.len() {
            return Err(Error::SeriesShapeMismatch {
                expected: self.buckets.len(),
                actual: values.len(),
            });
        }
        self.overlays.push(PlottedSeries {
            label: label.to_string(),
            values,
        });
        Ok(())
    }

    /// Bucket range of the base series.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.span
    }

    /// Human-readable form of [`span`](Self::span), e.g. `2024-01-01 to 2024-03-05`.
    pub fn span_text(&self) -> String {
        match self.span {
            Some((first, last)) => format!("{} to {}", first, last),
            None => "no recorded activity".to_string(),
        }
    }

    /// All plotted series: base first, then overlays in insertion order.
    pub fn plotted(&self) -> impl Iterator<Item = &PlottedSeries> {
        std::iter::once(&self.base).chain(self.overlays.iter())
    }

    pub fn series_count(&self) -> usize {
        1 + self.overlays.len()
    }

    pub fn buckets(&self) -> &[NaiveDate] {
        &self.buckets
    }
}

/// Rendering contract the pipeline depends on.
///
/// Implementations rasterize (or otherwise serialize) a [`ChartModel`] to an
/// image file at `dest`. Failures map to [`Error::Render`].
pub trait ChartEngine: Send + Sync {
    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &'static str;

    /// Render `model` to an image file at `dest`.
    fn render(&self, model: &ChartModel, dest: &Path) -> Result<()>;
}

const SVG_WIDTH: u32 = 800;
const SVG_HEIGHT: u32 = 450;
const MARGIN: u32 = 50;
const PALETTE: [&str; 4] = ["#3465a4", "#cc0000", "#4e9a06", "#f57900"];

/// Minimal built-in engine: polyline-per-series SVG with legend and title.
pub struct SvgChartEngine;

impl SvgChartEngine {
    fn polyline_points(values: &[u64], max_value: u64) -> String {
        let plot_w = (SVG_WIDTH - 2 * MARGIN) as f64;
        let plot_h = (SVG_HEIGHT - 2 * MARGIN) as f64;
        let n = values.len();
        let mut points = String::new();
        for (i, v) in values.iter().enumerate() {
            let x = if n <= 1 {
                MARGIN as f64 + plot_w / 2.0
            } else {
                MARGIN as f64 + plot_w * i as f64 / (n - 1) as f64
            };
            let y = MARGIN as f64 + plot_h * (1.0 - *v as f64 / max_value.max(1) as f64);
            let _ = write!(points, "{:.1},{:.1} ", x, y);
        }
        points.trim_end().to_string()
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }
}

impl ChartEngine for SvgChartEngine {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn render(&self, model: &ChartModel, dest: &Path) -> Result<()> {
        let max_value = model
            .plotted()
            .flat_map(|s| s.values.iter().copied())
            .max()
            .unwrap_or(0);

        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = SVG_WIDTH,
            h = SVG_HEIGHT
        );
        svg.push('\n');
        let _ = writeln!(
            svg,
            r#"<rect width="{}" height="{}" fill="white"/>"#,
            SVG_WIDTH, SVG_HEIGHT
        );

        // Title block: one text element per line
        for (i, line) in model.title.lines().enumerate() {
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="{}">{}</text>"#,
                SVG_WIDTH / 2,
                18 + i as u32 * 16,
                if i == 0 { 15 } else { 12 },
                Self::escape(line)
            );
        }

        // Axes. The color literal contains `"#`, so these two format
        // strings need the wider raw-string delimiter.
        let _ = writeln!(
            svg,
            r##"<line x1="{m}" y1="{m}" x2="{m}" y2="{b}" stroke="#888"/>"##,
            m = MARGIN,
            b = SVG_HEIGHT - MARGIN
        );
        let _ = writeln!(
            svg,
            r##"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="#888"/>"##,
            m = MARGIN,
            b = SVG_HEIGHT - MARGIN,
            r = SVG_WIDTH - MARGIN
        );

        // Series lines and legend
        for (i, series) in model.plotted().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            if !series.values.is_empty() {
                let _ = writeln!(
                    svg,
                    r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
                    color,
                    Self::polyline_points(&series.values, max_value)
                );
            }
            let legend_y = MARGIN + 14 * i as u32;
            let _ = writeln!(
                svg,
                r#"<rect x="{x}" y="{y}" width="10" height="10" fill="{color}"/><text x="{tx}" y="{ty}" font-family="sans-serif" font-size="11">{label}</text>"#,
                x = SVG_WIDTH - MARGIN + 6,
                y = legend_y,
                color = color,
                tx = SVG_WIDTH - MARGIN + 20,
                ty = legend_y + 9,
                label = Self::escape(&series.label)
            );
        }

        svg.push_str("</svg>\n");

        std::fs::write(dest, svg)
            .map_err(|e| Error::Render(format!("failed to write {}: {}", dest.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_series() -> TimeSeries {
        TimeSeries::from_iter([(date(2024, 1, 1), 3), (date(2024, 1, 2), 5)])
    }

    #[test]
    fn test_compose_captures_span_and_base() {
        let model = ChartModel::compose(&base_series(), "messages");
        assert_eq!(model.series_count(), 1);
        assert_eq!(model.span(), Some((date(2024, 1, 1), date(2024, 1, 2))));
        assert_eq!(model.span_text(), "2024-01-01 to 2024-01-02");
    }

    #[test]
    fn test_empty_base_has_no_span() {
        let model = ChartModel::compose(&TimeSeries::empty(), "messages");
        assert_eq!(model.span(), None);
        assert_eq!(model.span_text(), "no recorded activity");
    }

    #[test]
    fn test_add_overlay_preserves_order() {
        let mut model = ChartModel::compose(&base_series(), "messages");
        model.add_overlay("alice", vec![1, 2]).unwrap();
        model.add_overlay("bob", vec![0, 7]).unwrap();

        let labels: Vec<_> = model.plotted().map(|s| s.label.clone()).collect();
        assert_eq!(labels, vec!["messages", "alice", "bob"]);
    }

    #[test]
    fn test_overlay_shape_mismatch() {
        let mut model = ChartModel::compose(&base_series(), "messages");
        let err = model.add_overlay("alice", vec![1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::SeriesShapeMismatch {
                expected: 2,
                actual: 3
            }
        ));
        // Failed overlay leaves the model untouched
        assert_eq!(model.series_count(), 1);
    }

    #[test]
    fn test_svg_engine_renders_all_series() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("chart.svg");

        let mut model = ChartModel::compose(&base_series(), "messages");
        model.title = format!("messages, Test Guild\n{}", model.span_text());
        model.add_overlay("alice & bob", vec![2, 2]).unwrap();

        SvgChartEngine.render(&model, &dest).unwrap();

        let svg = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 2);
        // Both axes, drawn in the fixed axis color
        assert_eq!(svg.matches(r##"stroke="#888""##).count(), 2);
        assert!(svg.contains("Test Guild"));
        assert!(svg.contains("2024-01-01 to 2024-01-02"));
        // Legend labels are XML-escaped
        assert!(svg.contains("alice &amp; bob"));
    }

    #[test]
    fn test_svg_engine_renders_empty_chart() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("flat.svg");

        let model = ChartModel::compose(&TimeSeries::empty(), "reactions");
        SvgChartEngine.render(&model, &dest).unwrap();
        assert!(dest.exists());
    }
}
