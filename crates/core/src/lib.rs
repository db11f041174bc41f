//! # adaslope core
//!
//! Data model and I/O for ADA slope analysis.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced elevation grid with a nodata sentinel
//! - `GeoTransform`: affine pixel/map transform
//! - `CRS`: coordinate reference systems, pure-Rust projection math and the
//!   metric normalizer used before any distance is measured
//! - `Feature` / `FeatureCollection`: ordered vector layers
//! - GeoTIFF and GeoJSON readers/writers
//! - the `Algorithm` trait shared by the analysis engines

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{MetricTarget, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Common shape of the analysis engines.
///
/// An algorithm is a pure function of its input and parameters; parameters
/// carry every threshold and option so nothing depends on global state.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
