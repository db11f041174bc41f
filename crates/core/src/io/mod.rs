//! Reading and writing elevation rasters and vector layers

mod geojson_io;
mod geotiff;

pub use geojson_io::{parse_geojson, read_geojson, to_geojson_string, write_geojson};
pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions,
};
