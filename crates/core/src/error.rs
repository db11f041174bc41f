//! Error types for adaslope

use thiserror::Error;

/// Main error type for adaslope operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("No CRS declared; slope and distance need known units")]
    MissingCrs,

    #[error("Raster has no readable band")]
    ZeroBandRaster,

    #[error("Invalid pixel spacing: resx={resx}, resy={resy} (must be positive)")]
    Resolution { resx: f64, resy: f64 },

    #[error("Invalid window size {0}: must be an odd integer >= 3")]
    InvalidWindowSize(usize),

    #[error("Path {path_id} has {count} usable points, at least {required} required")]
    InsufficientPoints {
        path_id: String,
        count: usize,
        required: usize,
    },

    #[error("Raster CRS {0} is geographic; cross-slope needs a projected metric CRS")]
    GeographicCrs(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Projection failed for ({x}, {y}): {reason}")]
    Projection { x: f64, y: f64, reason: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

/// Result type alias for adaslope operations
pub type Result<T> = std::result::Result<T, Error>;
