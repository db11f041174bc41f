//! Whole-raster compliance summary
//!
//! Without path geometry the cross slope of a cell is the gradient component
//! perpendicular to an assumed travel axis, so a summary is only as good as
//! that assumption.

use adaslope_core::crs::require_projected;
use adaslope_core::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SlopeField;
use crate::compliance::ComplianceThreshold;
use crate::round_to;

/// Histogram bin count for running slope.
pub const HISTOGRAM_BINS: usize = 10;
/// Lower bound of the histogram's upper edge, percent.
const HISTOGRAM_MIN_SPAN: f64 = 10.0;

/// Grid axis paths are assumed to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathAxis {
    /// Travel along map x; cross slope is the y gradient.
    #[default]
    X,
    /// Travel along map y; cross slope is the x gradient.
    Y,
}

/// Parameters for [`summarize_raster`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSummaryParams {
    pub thresholds: ComplianceThreshold,
    pub assumed_path_axis: PathAxis,
    /// Whether to build the running slope histogram
    pub histogram: bool,
}

impl Default for RasterSummaryParams {
    fn default() -> Self {
        Self {
            thresholds: ComplianceThreshold::default(),
            assumed_path_axis: PathAxis::X,
            histogram: true,
        }
    }
}

/// Fixed-width histogram of running slope percent over `[0, upper]`.
///
/// The last bin is closed on the right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeHistogram {
    pub upper: f64,
    pub counts: Vec<usize>,
}

impl SlopeHistogram {
    fn build(values: impl Iterator<Item = f64>, upper: f64) -> Self {
        let mut counts = vec![0usize; HISTOGRAM_BINS];
        let width = upper / HISTOGRAM_BINS as f64;
        for v in values.filter(|v| (0.0..=upper).contains(v)) {
            let bin = ((v / width).floor() as usize).min(HISTOGRAM_BINS - 1);
            counts[bin] += 1;
        }
        Self { upper, counts }
    }

    /// Bin edges, `HISTOGRAM_BINS + 1` values from 0 to `upper`.
    pub fn edges(&self) -> Vec<f64> {
        let width = self.upper / HISTOGRAM_BINS as f64;
        (0..=HISTOGRAM_BINS).map(|i| i as f64 * width).collect()
    }
}

/// Compliance statistics over every valid cell of a slope field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterSummary {
    pub running_slope_threshold_pct: f64,
    pub cross_slope_threshold_pct: f64,
    /// Cells with a finite running slope
    pub pixels_total: usize,
    pub pixels_violating_running: usize,
    pub percent_violating_running: f64,
    pub pixels_violating_cross: usize,
    pub percent_violating_cross: f64,
    pub max_slope_pct: f64,
    pub mean_slope_pct: f64,
    pub pass_running: bool,
    pub pass_cross: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub histogram: Option<SlopeHistogram>,
}

/// Cross slope percent of every cell for paths along `axis`.
pub fn cross_slope_grid(field: &SlopeField, axis: PathAxis) -> Array2<f64> {
    let across = match axis {
        PathAxis::X => field.dz_dy(),
        PathAxis::Y => field.dz_dx(),
    };
    across.mapv(|g| g.abs() * 100.0)
}

/// Summarize running and cross slope compliance for a whole raster.
///
/// # Errors
/// [`adaslope_core::Error::GeographicCrs`] when the field was derived from a
/// DEM in degrees; its slopes mix angular and metric units.
pub fn summarize_raster(field: &SlopeField, params: &RasterSummaryParams) -> Result<RasterSummary> {
    if let Some(crs) = field.crs() {
        require_projected(crs)?;
    }
    let thresholds = params.thresholds;
    let running = field.slope().data();
    let cross = cross_slope_grid(field, params.assumed_path_axis);

    let mut total = 0usize;
    let mut over_running = 0usize;
    let mut over_cross = 0usize;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;

    for (&s, &c) in running.iter().zip(cross.iter()) {
        if !s.is_finite() {
            continue;
        }
        total += 1;
        sum += s;
        max = max.max(s);
        if !thresholds.running_ok_pct(s) {
            over_running += 1;
        }
        if c.is_finite() && !thresholds.cross_ok_pct(c) {
            over_cross += 1;
        }
    }

    let percent = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 / total as f64 * 100.0
        }
    };
    let (max, mean) = if total == 0 {
        (0.0, 0.0)
    } else {
        (max, sum / total as f64)
    };

    let histogram = params.histogram.then(|| {
        SlopeHistogram::build(
            running.iter().copied().filter(|v| v.is_finite()),
            HISTOGRAM_MIN_SPAN.max(max),
        )
    });

    debug!(total, over_running, over_cross, "summarized slope raster");

    Ok(RasterSummary {
        running_slope_threshold_pct: round_to(thresholds.running_pct(), 5),
        cross_slope_threshold_pct: round_to(thresholds.cross_pct(), 5),
        pixels_total: total,
        pixels_violating_running: over_running,
        percent_violating_running: round_to(percent(over_running), 3),
        pixels_violating_cross: over_cross,
        percent_violating_cross: round_to(percent(over_cross), 3),
        max_slope_pct: round_to(max, 3),
        mean_slope_pct: round_to(mean, 3),
        pass_running: over_running == 0,
        pass_cross: over_cross == 0,
        histogram,
    })
}
