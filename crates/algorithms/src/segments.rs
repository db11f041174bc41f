//! Point-sequence slope segmentation
//!
//! Each path of elevation-tagged points is cut into segments whose slope is
//! `(z_last - z_first) / planar distance`. By default a segment joins each
//! adjacent pair; with smoothing on, a window of `window_size` points slides
//! along the path and each window's first and last points form the segment.

use adaslope_core::crs::{to_metric, MetricTarget};
use adaslope_core::{Error, Feature, FeatureCollection, Result, CRS};
use geo::{Geometry, LineString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compliance::{classify, ADA_RUNNING_MAX};
use crate::maybe_rayon::*;
use crate::path::{display_id, partition_points, Path, PathId, PathPoint, PathResult, ELEVATION_FIELD, PATH_ID_FIELD};
use crate::round_to;

/// Decimal places slopes are rounded to before classification.
pub const SLOPE_DECIMALS: i32 = 4;

/// Parameters for point-sequence segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Smoothing window length, odd and at least 3
    pub window_size: usize,
    /// Slide `window_size` windows instead of joining adjacent pairs
    pub smoothing: bool,
    /// Running slope limit, rise/run
    pub slope_threshold: f64,
    /// Projection used when the input is geographic
    pub metric: MetricTarget,
    pub path_id_field: String,
    pub elevation_field: String,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            window_size: 3,
            smoothing: false,
            slope_threshold: ADA_RUNNING_MAX,
            metric: MetricTarget::default(),
            path_id_field: PATH_ID_FIELD.to_string(),
            elevation_field: ELEVATION_FIELD.to_string(),
        }
    }
}

impl SegmentParams {
    /// Check the window size and return the number of points a segment spans.
    pub fn span(&self) -> Result<usize> {
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(Error::InvalidWindowSize(self.window_size));
        }
        Ok(if self.smoothing { self.window_size } else { 2 })
    }
}

/// A classified slope between two points of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeSegment {
    pub path_id: Option<PathId>,
    pub start: PathPoint,
    pub end: PathPoint,
    /// Signed rise/run, rounded to [`SLOPE_DECIMALS`]
    pub slope: f64,
    pub ada_compliant: bool,
}

impl SlopeSegment {
    pub fn geometry(&self) -> LineString<f64> {
        LineString::new(vec![self.start.coord, self.end.coord])
    }
}

/// Segment one path.
///
/// Windows containing a point of unknown elevation produce no segment.
///
/// # Errors
/// - [`Error::InvalidWindowSize`] for an even or too small window
/// - [`Error::InsufficientPoints`] when the path is shorter than one window
pub fn segment_path(path: &Path, params: &SegmentParams) -> Result<Vec<SlopeSegment>> {
    let span = params.span()?;
    if path.len() < span {
        return Err(Error::InsufficientPoints {
            path_id: display_id(path.id.as_ref()),
            count: path.len(),
            required: span,
        });
    }

    let segments: Vec<SlopeSegment> = path
        .points
        .windows(span)
        .filter_map(|window| {
            if window.iter().any(|p| p.elevation.is_none()) {
                return None;
            }
            let (first, last) = (window[0], window[span - 1]);
            let rise = last.elevation? - first.elevation?;
            let run = (last.coord.x - first.coord.x).hypot(last.coord.y - first.coord.y);
            let slope = if run == 0.0 { 0.0 } else { rise / run };
            let slope = round_to(slope, SLOPE_DECIMALS);

            Some(SlopeSegment {
                path_id: path.id.clone(),
                start: first,
                end: last,
                slope,
                ada_compliant: classify(slope, params.slope_threshold),
            })
        })
        .collect();

    Ok(segments)
}

/// Segment every path of a point layer.
///
/// The layer is brought into metric coordinates first. Run-level problems
/// (missing CRS, bad window size) fail the call; problems with one path are
/// reported in that path's [`PathResult`].
pub fn compute_slope_segments(
    points: &FeatureCollection,
    params: &SegmentParams,
) -> Result<SegmentBatch> {
    params.span()?;
    let metric = to_metric(points, &params.metric)?;
    let paths = partition_points(&metric, &params.path_id_field, &params.elevation_field);

    let results: Vec<PathResult<Vec<SlopeSegment>>> = paths
        .par_iter()
        .map(|path| PathResult::new(path.id.clone(), segment_path(path, params)))
        .collect();

    debug!(paths = results.len(), "segmented point paths");
    Ok(SegmentBatch {
        crs: metric.crs.clone(),
        results,
    })
}

/// Segments of every path, in the CRS they were measured in.
#[derive(Debug)]
pub struct SegmentBatch {
    pub crs: Option<CRS>,
    pub results: Vec<PathResult<Vec<SlopeSegment>>>,
}

impl SegmentBatch {
    /// Successful segments of all paths, in path order.
    pub fn segments(&self) -> impl Iterator<Item = &SlopeSegment> {
        self.results.iter().filter_map(PathResult::value).flatten()
    }

    /// Paths that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (Option<&PathId>, &Error)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (r.path_id.as_ref(), e)))
    }

    pub fn summary(&self) -> SegmentSummary {
        SegmentSummary::from_segments(self.segments())
    }

    /// Segments as two-point LineString features with `path_id`, `slope`
    /// and `ada_compliant`.
    pub fn to_features(&self) -> FeatureCollection {
        segments_to_features(self.segments(), self.crs.clone())
    }
}

/// Build one LineString feature per segment.
pub fn segments_to_features<'a>(
    segments: impl IntoIterator<Item = &'a SlopeSegment>,
    crs: Option<CRS>,
) -> FeatureCollection {
    let features = segments
        .into_iter()
        .map(|s| {
            let mut f = Feature::new(Geometry::LineString(s.geometry()))
                .with_property("slope", s.slope)
                .with_property("ada_compliant", s.ada_compliant);
            if let Some(id) = &s.path_id {
                f.set_property(PATH_ID_FIELD, id.clone());
            }
            f
        })
        .collect();
    FeatureCollection::with_features(crs, features)
}

/// Counts of compliant and non-compliant segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub total_segments: usize,
    pub compliant_segments: usize,
    pub non_compliant_segments: usize,
    /// Percent compliant, two decimals; 0 when there are no segments
    pub compliance_percentage: f64,
}

impl SegmentSummary {
    pub fn from_segments<'a>(segments: impl IntoIterator<Item = &'a SlopeSegment>) -> Self {
        let (total, compliant) = segments
            .into_iter()
            .fold((0usize, 0usize), |(t, c), s| (t + 1, c + usize::from(s.ada_compliant)));
        let pct = if total == 0 {
            0.0
        } else {
            round_to(compliant as f64 / total as f64 * 100.0, 2)
        };
        Self {
            total_segments: total,
            compliant_segments: compliant,
            non_compliant_segments: total - compliant,
            compliance_percentage: pct,
        }
    }
}
