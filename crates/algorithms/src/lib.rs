//! # adaslope algorithms
//!
//! Accessibility slope analysis over elevation rasters and path layers.
//!
//! ## Available Algorithm Categories
//!
//! - **terrain**: slope field (running slope and aspect), whole-raster summary
//! - **segments**: running slope between consecutive elevation points
//! - **paths**: densified line paths decomposed into running and cross slope
//! - **vector**: polygon outlines, line resampling, elevation sampling
//! - **compliance**: ADA thresholds and classification

pub mod compliance;
pub mod path;
pub mod paths;
pub mod segments;
pub mod terrain;
pub mod vector;

mod maybe_rayon;

/// Round to a fixed number of decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::compliance::{classify, ComplianceThreshold, ADA_CROSS_MAX, ADA_RUNNING_MAX};
    pub use crate::path::{fail_fast, partition_points, Path, PathId, PathPoint, PathResult};
    pub use crate::paths::{attach_evaluations, evaluate_paths, PathEvalParams, PathEvaluation, RunningSlopeMode};
    pub use crate::segments::{compute_slope_segments, SegmentBatch, SegmentParams, SegmentSummary, SlopeSegment};
    pub use crate::terrain::{
        slope_field, summarize_raster, PathAxis, RasterSummary, RasterSummaryParams, SlopeField, SlopeFieldParams,
    };
    pub use crate::vector::{polygons_to_lines, resample_lines, sample_elevations, ResampleParams};
    pub use adaslope_core::prelude::*;
}
