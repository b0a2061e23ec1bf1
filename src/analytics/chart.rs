//! Bar-chart geometry
//!
//! Converts a labeled count series into pixel-space bar rectangles for the
//! dashboard's SVG chart. Pure computation, no I/O. The SVG coordinate system
//! has its origin at the top-left, so `y` grows downward.

use serde::Serialize;

use crate::analytics::models::TimeSeriesPoint;

/// Default chart dimensions used by the dashboard.
pub const DEFAULT_CHART_WIDTH: f64 = 900.0;
pub const DEFAULT_CHART_HEIGHT: f64 = 200.0;
pub const DEFAULT_TOP_OFFSET: f64 = 20.0;

/// One positioned bar. Carries the source value and label for tooltips and
/// accessibility text.
#[derive(Debug, Clone, Serialize)]
pub struct ChartBar {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub max_height: f64,
    pub top_offset: f64,
    pub value: i64,
    pub label: String,
}

/// A complete chart: outer dimensions plus positioned bars.
#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub width: f64,
    pub height: f64,
    pub bars: Vec<ChartBar>,
}

impl BarChart {
    /// Lay out `points` inside the default chart dimensions.
    pub fn from_points(points: &[TimeSeriesPoint]) -> Self {
        Self {
            width: DEFAULT_CHART_WIDTH,
            height: DEFAULT_CHART_HEIGHT,
            bars: layout(
                points,
                DEFAULT_CHART_WIDTH,
                DEFAULT_CHART_HEIGHT,
                DEFAULT_TOP_OFFSET,
            ),
        }
    }
}

/// Compute bar geometry for `points` inside a `chart_width` x `chart_height`
/// canvas, reserving `top_offset` pixels above the tallest bar.
///
/// Width is divided evenly into slots; each bar takes half its slot, centered,
/// with the other half as gutter. Heights scale linearly so the maximum count
/// fills the space below the top offset. When every count is zero all bars
/// have zero height, and empty input yields no bars.
pub fn layout(
    points: &[TimeSeriesPoint],
    chart_width: f64,
    chart_height: f64,
    top_offset: f64,
) -> Vec<ChartBar> {
    if points.is_empty() {
        return Vec::new();
    }

    let available_height = chart_height - top_offset;
    let slot_width = chart_width / points.len() as f64;
    let bar_width = slot_width / 2.0;

    let max_value = points.iter().map(|p| p.count).max().unwrap_or(0);
    let scale = if max_value > 0 {
        available_height / max_value as f64
    } else {
        0.0
    };

    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let height = point.count as f64 * scale;
            ChartBar {
                x: i as f64 * slot_width + bar_width / 2.0,
                y: top_offset + available_height - height,
                width: bar_width,
                height,
                max_height: top_offset + available_height,
                top_offset,
                value: point.count,
                label: point.label.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(counts: &[i64]) -> Vec<TimeSeriesPoint> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| TimeSeriesPoint {
                label: format!("bucket {}", i),
                count,
            })
            .collect()
    }

    #[test]
    fn max_bar_fills_available_height_and_others_scale() {
        let bars = layout(&points(&[10, 20, 5]), 900.0, 200.0, 20.0);
        assert_eq!(bars.len(), 3);

        // 20 is the max: it spans the full 180px below the offset.
        assert!((bars[1].height - 180.0).abs() < f64::EPSILON);
        assert!((bars[1].y - 20.0).abs() < f64::EPSILON);

        // 10 is half the max, 5 a quarter.
        assert!((bars[0].height - bars[1].height / 2.0).abs() < 1e-9);
        assert!((bars[2].height - bars[1].height / 4.0).abs() < 1e-9);

        // Bars sit on the baseline.
        for bar in &bars {
            assert!((bar.y + bar.height - 200.0).abs() < 1e-9);
        }
    }

    #[test]
    fn bars_are_centered_in_even_slots() {
        let bars = layout(&points(&[1, 1, 1]), 900.0, 200.0, 20.0);
        let slot = 900.0 / 3.0;
        for (i, bar) in bars.iter().enumerate() {
            assert!((bar.width - slot / 2.0).abs() < f64::EPSILON);
            assert!((bar.x - (i as f64 * slot + slot / 4.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn all_zero_counts_produce_zero_height_bars() {
        let bars = layout(&points(&[0, 0, 0]), 900.0, 200.0, 20.0);
        assert_eq!(bars.len(), 3);
        for bar in &bars {
            assert_eq!(bar.height, 0.0);
            assert!((bar.y - 200.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn empty_input_yields_no_bars() {
        assert!(layout(&[], 900.0, 200.0, 20.0).is_empty());
        let chart = BarChart::from_points(&[]);
        assert!(chart.bars.is_empty());
        assert_eq!(chart.width, DEFAULT_CHART_WIDTH);
    }

    #[test]
    fn bars_carry_value_and_label() {
        let input = points(&[7]);
        let bars = layout(&input, 900.0, 200.0, 20.0);
        assert_eq!(bars[0].value, 7);
        assert_eq!(bars[0].label, "bucket 0");
        assert_eq!(bars[0].max_height, 180.0 + 20.0);
        assert_eq!(bars[0].top_offset, 20.0);
    }
}
