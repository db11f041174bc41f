//! Pure-Rust projection math (Snyder 1987, USGS Prof. Paper 1395).
//!
//! Supports the CRSs pedestrian-path datasets actually arrive in:
//! geographic lon/lat (WGS84, NAD83, ETRS89 treated as one datum), UTM on
//! WGS84 (326xx/327xx), NAD83 (269xx) and ETRS89 (258xx), and Web Mercator.
//! Datum shifts between WGS84, NAD83 and ETRS89 are ignored; they are well
//! below the pixel size of any DEM used for slope work.

use crate::error::{Error, Result};
use crate::crs::CRS;

// ── WGS84 / GRS80 ellipsoid constants ────────────────────────────────────

const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Web Mercator latitude limit (degrees).
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Transverse Mercator parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// Central meridian (degrees)
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl TransverseMercator {
    /// UTM zone `zone` (1-60) in the given hemisphere.
    pub fn utm(zone: u32, north: bool) -> Self {
        Self {
            lon0: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
            k0: UTM_K0,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
        }
    }

    /// (lon, lat) degrees → (easting, northing) metres. Snyder eqs. 8-9, 8-10.
    fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();
        let lon0 = self.lon0.to_radians();

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan_lat = lat.tan();

        let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
        let t = tan_lat * tan_lat;
        let c = E_PRIME2 * cos_lat * cos_lat;
        let a = cos_lat * (lon - lon0);
        let m = meridional_arc(lat);

        let a2 = a * a;
        let a4 = a2 * a2;
        let a6 = a4 * a2;

        let easting = self.k0
            * n
            * (a + (1.0 - t + c) * a2 * a / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a / 120.0)
            + self.false_easting;

        let northing = self.k0
            * (m + n
                * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0))
            + self.false_northing;

        (easting, northing)
    }

    /// (easting, northing) metres → (lon, lat) degrees. Snyder eqs. 8-18 to 8-25.
    fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let x = easting - self.false_easting;
        let y = northing - self.false_northing;

        let e4 = E2 * E2;
        let e6 = e4 * E2;
        let m = y / self.k0;
        let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1me2 = (1.0 - E2).sqrt();
        let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let w = 1.0 - E2 * sin_phi1 * sin_phi1;
        let n1 = A / w.sqrt();
        let r1 = A * (1.0 - E2) / (w * w.sqrt());
        let d = x / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * E_PRIME2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lon = self.lon0.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                    * d5
                    / 120.0)
                / cos_phi1;

        (lon.to_degrees(), lat.to_degrees())
    }
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

/// A supported coordinate system, reduced to the math needed to move
/// coordinates to and from geographic lon/lat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees
    Geographic,
    TransverseMercator(TransverseMercator),
    /// Spherical Web Mercator (EPSG:3857)
    WebMercator,
}

impl Projection {
    /// Look up the projection for an EPSG code.
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 | 4269 | 4258 | 4617 | 4283 | 4167 => Some(Self::Geographic),
            3857 | 900913 => Some(Self::WebMercator),
            32601..=32660 => Some(Self::TransverseMercator(TransverseMercator::utm(
                epsg - 32600,
                true,
            ))),
            32701..=32760 => Some(Self::TransverseMercator(TransverseMercator::utm(
                epsg - 32700,
                false,
            ))),
            // NAD83 / UTM zones 1N-23N
            26901..=26923 => Some(Self::TransverseMercator(TransverseMercator::utm(
                epsg - 26900,
                true,
            ))),
            // ETRS89 / UTM zones 28N-38N
            25828..=25838 => Some(Self::TransverseMercator(TransverseMercator::utm(
                epsg - 25800,
                true,
            ))),
            _ => None,
        }
    }

    /// Project (lon, lat) degrees into this system.
    pub fn from_lonlat(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_lonlat(lon, lat)?;
        let (x, y) = match self {
            Self::Geographic => (lon, lat),
            Self::TransverseMercator(tm) => tm.forward(lon, lat),
            Self::WebMercator => {
                if lat.abs() > MERCATOR_MAX_LAT {
                    return Err(Error::Projection {
                        x: lon,
                        y: lat,
                        reason: "latitude outside Web Mercator range".to_string(),
                    });
                }
                let x = A * lon.to_radians();
                let y = A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
        };
        finite_or_err(x, y, lon, lat)
    }

    /// Unproject (x, y) in this system to (lon, lat) degrees.
    pub fn to_lonlat(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (lon, lat) = match self {
            Self::Geographic => (x, y),
            Self::TransverseMercator(tm) => tm.inverse(x, y),
            Self::WebMercator => {
                let lon = (x / A).to_degrees();
                let lat = (2.0 * (y / A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
                (lon, lat)
            }
        };
        let (lon, lat) = finite_or_err(lon, lat, x, y)?;
        check_lonlat(lon, lat)?;
        Ok((lon, lat))
    }
}

fn check_lonlat(lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 || lon.abs() > 540.0 {
        return Err(Error::Projection {
            x: lon,
            y: lat,
            reason: "not a valid longitude/latitude".to_string(),
        });
    }
    Ok(())
}

fn finite_or_err(a: f64, b: f64, x: f64, y: f64) -> Result<(f64, f64)> {
    if a.is_finite() && b.is_finite() {
        Ok((a, b))
    } else {
        Err(Error::Projection {
            x,
            y,
            reason: "projection produced a non-finite coordinate".to_string(),
        })
    }
}

/// Converts coordinates from one CRS to another through geographic lon/lat.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    from: Projection,
    to: Projection,
}

impl Transformer {
    /// Build a transformer between two CRSs. Fails with
    /// [`Error::UnsupportedCrs`] when either side has no projection math.
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        Ok(Self {
            from: from.projection()?,
            to: to.projection()?,
        })
    }

    /// Transform a single coordinate.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.from == self.to {
            return Ok((x, y));
        }
        let (lon, lat) = self.from.to_lonlat(x, y)?;
        self.to.from_lonlat(lon, lat)
    }
}
