//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D grid of elevations (or any derived field).
///
/// Data is stored row-major as `(row, col)`; row 0 is the first scanline of
/// the source file, which for north-up DEMs is the northern edge.
///
/// ```ignore
/// use adaslope_core::{GeoTransform, Raster};
///
/// let mut dem: Raster<f32> = Raster::new(100, 100)
///     .with_transform(GeoTransform::new(500_000.0, 3_400_000.0, 1.0, -1.0));
/// dem.set(10, 20, 42.0)?;
/// let z = dem.value_at(500_020.5, 3_399_989.5);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<T>) -> Self {
        self.nodata = nodata;
        self
    }

    /// A new raster of another element type on the same grid, with the same
    /// transform and CRS but no nodata sentinel.
    pub fn with_same_meta<U: RasterElement>(&self, data: Array2<U>) -> Result<Raster<U>> {
        if data.dim() != self.shape() {
            let (rows, cols) = data.dim();
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Ok(Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Declared missing-value sentinel
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Positive ground spacing `(resx, resy)` from the transform
    pub fn resolution(&self) -> Result<(f64, f64)> {
        self.transform.resolution()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Map coordinates of a cell centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Fractional pixel coordinates (col, row) of a map location
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// Index `(row, col)` of the cell containing a map location, or `None`
    /// when the location falls outside the grid.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.geo_to_pixel(x, y);
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        let (col, row) = (col.floor(), row.floor());
        if col < 0.0 || row < 0.0 || col >= self.cols() as f64 || row >= self.rows() as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// Value of the cell containing a map location as `f64`.
    ///
    /// `None` when outside the grid or when the cell is missing.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let (row, col) = self.cell_at(x, y)?;
        let value = self.data[(row, col)];
        if self.is_nodata(value) {
            return None;
        }
        value.to_f64().filter(|v| v.is_finite())
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Elevations as `f64` with missing cells set to NaN.
    ///
    /// A cell is missing when it is not finite or equals the sentinel:
    /// `nodata` when given, otherwise the raster's own.
    pub fn to_f64_masked(&self, nodata: Option<f64>) -> Array2<f64> {
        let sentinel = nodata.or_else(|| self.nodata.and_then(|v| v.to_f64()));
        self.data.mapv(|v| match v.to_f64() {
            Some(z) if z.is_finite() && Some(z) != sentinel => z,
            _ => f64::NAN,
        })
    }

    /// Basic statistics over valid cells
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for v in self.data.iter().filter(|v| !self.is_nodata(**v)) {
            let Some(v) = v.to_f64().filter(|v| v.is_finite()) else {
                continue;
            };
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        let (min, max, mean) = if count > 0 {
            (Some(min), Some(max), Some(sum / count as f64))
        } else {
            (None, None, None)
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_raster_statistics_skip_nodata() {
        let data: Vec<f32> = (0..100).map(|v| v as f32).collect();
        let raster = Raster::from_vec(data, 10, 10).unwrap().with_nodata(Some(0.0));

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
    }

    #[test]
    fn test_cell_lookup() {
        let raster = Raster::from_vec(vec![1.0f64, 2.0, 3.0, -9999.0], 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(100.0, 200.0, 10.0, -10.0))
            .with_nodata(Some(-9999.0));

        assert_eq!(raster.cell_at(105.0, 195.0), Some((0, 0)));
        assert_eq!(raster.cell_at(115.0, 185.0), Some((1, 1)));
        assert_eq!(raster.cell_at(99.0, 195.0), None);
        assert_eq!(raster.cell_at(105.0, 180.0), None);

        assert_eq!(raster.value_at(115.0, 195.0), Some(2.0));
        assert_eq!(raster.value_at(115.0, 185.0), None);
    }

    #[test]
    fn test_masked_copy() {
        let raster = Raster::from_vec(vec![1i16, -32768, 3, 4], 2, 2)
            .unwrap()
            .with_nodata(Some(-32768));
        let masked = raster.to_f64_masked(None);
        assert_eq!(masked[(0, 0)], 1.0);
        assert!(masked[(0, 1)].is_nan());
        assert_eq!(masked.iter().filter(|z| z.is_nan()).count(), 1);

        // an explicit sentinel replaces the declared one
        let masked = raster.to_f64_masked(Some(4.0));
        assert_eq!(masked[(0, 1)], -32768.0);
        assert!(masked[(1, 1)].is_nan());
    }

    #[test]
    fn test_from_vec_size_mismatch() {
        let r = Raster::<f32>::from_vec(vec![0.0; 5], 2, 3);
        assert!(matches!(r, Err(Error::InvalidDimensions { .. })));
    }
}
