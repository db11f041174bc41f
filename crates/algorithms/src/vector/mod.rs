//! Vector preparation for the slope engines
//!
//! - Outlines: polygon footprints to line paths
//! - Resampling: evenly spaced, path-tagged points along lines
//! - Sampling: DEM elevations attached to point layers

mod prepare;
mod sample;

pub use prepare::{polygons_to_lines, resample_lines, ResampleParams};
pub use sample::sample_elevations;
