//! Terrain analysis of elevation rasters
//!
//! - Slope field: running slope magnitude and downslope aspect per cell
//! - Summary: whole-raster running/cross slope compliance statistics

mod slope_field;
mod summary;

pub use slope_field::{slope_field, SlopeField, SlopeFieldEngine, SlopeFieldParams, SlopeSample};
pub use summary::{
    cross_slope_grid, summarize_raster, PathAxis, RasterSummary, RasterSummaryParams, SlopeHistogram,
    HISTOGRAM_BINS,
};
