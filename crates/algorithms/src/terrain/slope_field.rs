//! Running slope and aspect from a DEM
//!
//! Slope is the full gradient magnitude in percent. Gradients are taken with
//! central differences on the cell spacing of each axis and one-sided
//! differences at the grid edge. Missing cells are masked before any
//! differencing and a mask boundary is treated like a grid edge, so a valid
//! cell beside nodata still gets a finite slope. A cell with no valid
//! neighbour along an axis has no slope.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::maybe_rayon::*;
use adaslope_core::raster::{GeoTransform, Raster, RasterElement};
use adaslope_core::{Algorithm, Error, Result, CRS};

/// Parameters for the slope field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeFieldParams {
    /// Pixel spacing `(resx, resy)` in ground units. Taken from the raster
    /// transform when absent.
    pub resolution: Option<(f64, f64)>,
    /// Nodata sentinel. Overrides the raster's own when present.
    pub nodata: Option<f64>,
}

/// Slope and aspect at one location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeSample {
    /// Gradient magnitude, percent
    pub slope_pct: f64,
    /// Downslope compass azimuth, degrees in `[0, 360)`
    pub aspect_deg: f64,
}

/// Slope field derived from one DEM.
///
/// Every grid shares the DEM's shape, transform and CRS. Masked cells hold
/// NaN in all of them.
#[derive(Debug, Clone)]
pub struct SlopeField {
    slope: Raster<f64>,
    aspect: Raster<f64>,
    dz_dx: Array2<f64>,
    dz_dy: Array2<f64>,
    resolution: (f64, f64),
}

impl SlopeField {
    /// Running slope magnitude in percent
    pub fn slope(&self) -> &Raster<f64> {
        &self.slope
    }

    /// Downslope aspect in compass degrees
    pub fn aspect(&self) -> &Raster<f64> {
        &self.aspect
    }

    /// Rise/run toward increasing map x (east for north-up grids)
    pub fn dz_dx(&self) -> &Array2<f64> {
        &self.dz_dx
    }

    /// Rise/run toward increasing map y (north for north-up grids)
    pub fn dz_dy(&self) -> &Array2<f64> {
        &self.dz_dy
    }

    pub fn resolution(&self) -> (f64, f64) {
        self.resolution
    }

    pub fn shape(&self) -> (usize, usize) {
        self.slope.shape()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.slope.crs()
    }

    pub fn transform(&self) -> &GeoTransform {
        self.slope.transform()
    }

    /// Nearest-cell slope and aspect at a map location.
    ///
    /// `None` outside the grid or on a masked cell.
    pub fn sample(&self, x: f64, y: f64) -> Option<SlopeSample> {
        let (row, col) = self.slope.cell_at(x, y)?;
        let slope_pct = self.slope.data()[(row, col)];
        let aspect_deg = self.aspect.data()[(row, col)];
        if slope_pct.is_finite() && aspect_deg.is_finite() {
            Some(SlopeSample {
                slope_pct,
                aspect_deg,
            })
        } else {
            None
        }
    }

    /// Number of cells with a finite slope
    pub fn valid_count(&self) -> usize {
        self.slope.data().iter().filter(|v| v.is_finite()).count()
    }
}

/// Slope field algorithm
#[derive(Debug, Clone, Default)]
pub struct SlopeFieldEngine;

impl Algorithm for SlopeFieldEngine {
    type Input = Raster<f64>;
    type Output = SlopeField;
    type Params = SlopeFieldParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SlopeField"
    }

    fn description(&self) -> &'static str {
        "Running slope magnitude (percent) and downslope aspect from a DEM"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        slope_field(&input, &params)
    }
}

/// Pixel spacing to differentiate with: explicit override or the transform's.
fn resolve_resolution<T: RasterElement>(dem: &Raster<T>, params: &SlopeFieldParams) -> Result<(f64, f64)> {
    match params.resolution {
        Some((resx, resy)) => {
            if resx.is_finite() && resy.is_finite() && resx > 0.0 && resy > 0.0 {
                Ok((resx, resy))
            } else {
                Err(Error::Resolution { resx, resy })
            }
        }
        None => dem.resolution(),
    }
}

/// Derivative at a cell from its neighbours along one axis.
#[inline]
fn axis_derivative(prev: f64, center: f64, next: f64, spacing: f64) -> f64 {
    match (prev.is_finite(), next.is_finite()) {
        (true, true) => (next - prev) / (2.0 * spacing),
        (false, true) => (next - center) / spacing,
        (true, false) => (center - prev) / spacing,
        (false, false) => f64::NAN,
    }
}

/// Downslope compass azimuth in degrees from map-frame gradients.
#[inline]
fn downslope_aspect(dz_dx: f64, dz_dy: f64) -> f64 {
    if dz_dx == 0.0 && dz_dy == 0.0 {
        return 0.0;
    }
    (-dz_dx).atan2(-dz_dy).to_degrees().rem_euclid(360.0)
}

/// Compute the slope field of a DEM.
///
/// # Errors
/// - [`Error::ZeroBandRaster`] when the raster holds no cells
/// - [`Error::InvalidDimensions`] when either axis has fewer than two cells
/// - [`Error::Resolution`] when the pixel spacing is zero, negative or not finite
pub fn slope_field<T: RasterElement>(dem: &Raster<T>, params: &SlopeFieldParams) -> Result<SlopeField> {
    let (rows, cols) = dem.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::ZeroBandRaster);
    }
    if rows < 2 || cols < 2 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let (resx, resy) = resolve_resolution(dem, params)?;
    let (sx, sy) = dem.transform().axis_signs();
    let z = dem.to_f64_masked(params.nodata);

    let cells: Vec<[f64; 4]> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = vec![[f64::NAN; 4]; cols];
            for (col, cell) in out.iter_mut().enumerate() {
                let center = z[(row, col)];
                if center.is_nan() {
                    continue;
                }

                let west = if col > 0 { z[(row, col - 1)] } else { f64::NAN };
                let east = if col + 1 < cols { z[(row, col + 1)] } else { f64::NAN };
                let up = if row > 0 { z[(row - 1, col)] } else { f64::NAN };
                let down = if row + 1 < rows { z[(row + 1, col)] } else { f64::NAN };

                let d_col = axis_derivative(west, center, east, resx);
                let d_row = axis_derivative(up, center, down, resy);
                if d_col.is_nan() || d_row.is_nan() {
                    continue;
                }

                let dz_dx = d_col * sx;
                let dz_dy = d_row * sy;
                let slope_pct = dz_dx.hypot(dz_dy) * 100.0;
                *cell = [slope_pct, downslope_aspect(dz_dx, dz_dy), dz_dx, dz_dy];
            }
            out
        })
        .collect();

    let plane = |i: usize| -> Result<Array2<f64>> {
        Array2::from_shape_vec((rows, cols), cells.iter().map(|c| c[i]).collect())
            .map_err(|e| Error::Other(e.to_string()))
    };

    let mut slope = dem.with_same_meta(plane(0)?)?;
    slope.set_nodata(Some(f64::NAN));
    let mut aspect = dem.with_same_meta(plane(1)?)?;
    aspect.set_nodata(Some(f64::NAN));

    let field = SlopeField {
        slope,
        aspect,
        dz_dx: plane(2)?,
        dz_dy: plane(3)?,
        resolution: (resx, resy),
    };
    debug!(rows, cols, resx, resy, valid = field.valid_count(), "computed slope field");
    Ok(field)
}
