//! Bringing vector layers into metric coordinates
//!
//! Distances and slopes are only meaningful in a projected, metre-based CRS.
//! Every function here takes the input by reference and hands back a
//! [`Cow`]: borrowed when the layer is already where it needs to be, owned
//! when it had to be reprojected. Inputs are never modified.

use std::borrow::Cow;

use geo::MapCoords;
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Transformer, CRS};
use crate::error::{Error, Result};
use crate::vector::FeatureCollection;

/// Which metric CRS geographic input is projected into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricTarget {
    /// Always use this CRS.
    Fixed(CRS),
    /// WGS84 UTM zone containing the centre of the layer's extent.
    AutoUtm,
}

impl Default for MetricTarget {
    fn default() -> Self {
        MetricTarget::Fixed(CRS::nad83_utm17n())
    }
}

impl MetricTarget {
    /// Concrete CRS for a layer whose lon/lat extent is `bounds`
    /// (min_x, min_y, max_x, max_y).
    pub fn resolve(&self, bounds: Option<(f64, f64, f64, f64)>) -> CRS {
        match self {
            MetricTarget::Fixed(crs) => crs.clone(),
            MetricTarget::AutoUtm => {
                let (lon, lat) = bounds
                    .map(|(x0, y0, x1, y1)| ((x0 + x1) / 2.0, (y0 + y1) / 2.0))
                    .unwrap_or((0.0, 0.0));
                CRS::wgs84_utm(utm_zone(lon), lat >= 0.0)
            }
        }
    }
}

/// UTM zone number (1..=60) for a longitude in degrees.
pub fn utm_zone(lon: f64) -> u32 {
    let lon = (lon + 180.0).rem_euclid(360.0);
    ((lon / 6.0).floor() as u32 + 1).clamp(1, 60)
}

/// Return the layer in a metric, projected CRS.
///
/// Fails with [`Error::MissingCrs`] when the layer declares no CRS. A layer
/// that is already projected is returned as is.
pub fn to_metric<'a>(
    layer: &'a FeatureCollection,
    target: &MetricTarget,
) -> Result<Cow<'a, FeatureCollection>> {
    let crs = layer.crs.as_ref().ok_or(Error::MissingCrs)?;
    if !crs.is_geographic() {
        return Ok(Cow::Borrowed(layer));
    }

    let to = target.resolve(layer.bounds());
    if to.is_geographic() {
        return Err(Error::InvalidParameter {
            name: "metric_crs",
            value: to.identifier(),
            reason: "metric target must be a projected CRS".to_string(),
        });
    }
    reproject(layer, &to)
}

/// Reproject a layer into `to`.
///
/// Returns the input unchanged when it is already in an equivalent CRS.
pub fn reproject<'a>(layer: &'a FeatureCollection, to: &CRS) -> Result<Cow<'a, FeatureCollection>> {
    let from = layer.crs.as_ref().ok_or(Error::MissingCrs)?;
    if from.is_equivalent(to) {
        return Ok(Cow::Borrowed(layer));
    }

    let transformer = Transformer::new(from, to)?;
    let project = move |c: Coord<f64>| -> Result<Coord<f64>> {
        let (x, y) = transformer.transform(c.x, c.y)?;
        Ok(Coord { x, y })
    };

    let mut features = Vec::with_capacity(layer.len());
    for feature in layer.iter() {
        let mut out = feature.clone();
        out.geometry = feature
            .geometry
            .as_ref()
            .map(|g| g.try_map_coords(project))
            .transpose()?;
        features.push(out);
    }

    info!(from = %from, to = %to, features = features.len(), "reprojected vector layer");
    Ok(Cow::Owned(FeatureCollection::with_features(Some(to.clone()), features)))
}

/// Bring a layer into the raster's CRS for sampling.
///
/// A raster without a CRS is taken to be in the layer's units already; the
/// layer is returned unchanged with a warning.
pub fn align_to_raster<'a>(
    layer: &'a FeatureCollection,
    raster_crs: Option<&CRS>,
) -> Result<Cow<'a, FeatureCollection>> {
    match raster_crs {
        Some(crs) => reproject(layer, crs),
        None => {
            warn!("raster has no CRS, assuming its coordinates match the vector layer");
            Ok(Cow::Borrowed(layer))
        }
    }
}

/// Fail with [`Error::GeographicCrs`] unless `crs` is projected.
pub fn require_projected(crs: &CRS) -> Result<()> {
    if crs.is_geographic() {
        return Err(Error::GeographicCrs(crs.identifier()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Feature;
    use approx::assert_abs_diff_eq;
    use geo_types::{Geometry, LineString, Point};

    fn tallahassee(crs: Option<CRS>) -> FeatureCollection {
        FeatureCollection::with_features(
            crs,
            vec![
                Feature::new(Geometry::Point(Point::new(-84.2985, 30.4419))),
                Feature::new(Geometry::LineString(LineString::from(vec![
                    (-84.2985, 30.4419),
                    (-84.2975, 30.4425),
                ]))),
            ],
        )
    }

    #[test]
    fn missing_crs_is_fatal() {
        let layer = tallahassee(None);
        assert!(matches!(
            to_metric(&layer, &MetricTarget::default()),
            Err(Error::MissingCrs)
        ));
    }

    #[test]
    fn projected_layer_is_borrowed() {
        let layer = tallahassee(Some(CRS::from_epsg(32617)));
        let out = to_metric(&layer, &MetricTarget::default()).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn geographic_goes_to_fixed_target() {
        let layer = tallahassee(Some(CRS::wgs84()));
        let out = to_metric(&layer, &MetricTarget::default()).unwrap();
        assert_eq!(out.crs.as_ref().and_then(CRS::epsg), Some(26917));

        let p = out.features[0].point_coord().unwrap();
        assert_abs_diff_eq!(p.x, 183_200.5, epsilon = 1.0);
        assert_abs_diff_eq!(p.y, 3_372_376.6, epsilon = 1.0);

        // input untouched
        assert_eq!(layer.features[0].point_coord().unwrap().x, -84.2985);
    }

    #[test]
    fn auto_utm_picks_local_zone() {
        let layer = tallahassee(Some(CRS::wgs84()));
        let out = to_metric(&layer, &MetricTarget::AutoUtm).unwrap();
        assert_eq!(out.crs.as_ref().and_then(CRS::epsg), Some(32616));

        assert_eq!(utm_zone(-84.3), 16);
        assert_eq!(utm_zone(-3.7), 30);
        assert_eq!(utm_zone(180.0), 1);
        assert_eq!(utm_zone(179.9), 60);
    }

    #[test]
    fn geographic_target_rejected() {
        let layer = tallahassee(Some(CRS::wgs84()));
        let target = MetricTarget::Fixed(CRS::from_epsg(4269));
        assert!(matches!(
            to_metric(&layer, &target),
            Err(Error::InvalidParameter { name: "metric_crs", .. })
        ));
    }

    #[test]
    fn reprojection_round_trip_is_stable() {
        let layer = tallahassee(Some(CRS::wgs84()));
        let utm = CRS::nad83_utm17n();

        let there = reproject(&layer, &utm).unwrap().into_owned();
        let back = reproject(&there, &CRS::wgs84()).unwrap().into_owned();
        let again = reproject(&reproject(&back, &utm).unwrap(), &CRS::wgs84())
            .unwrap()
            .into_owned();

        for (orig, rt) in layer.iter().zip(again.iter()) {
            let a: Vec<_> = geo::CoordsIter::coords_iter(orig.geometry.as_ref().unwrap()).collect();
            let b: Vec<_> = geo::CoordsIter::coords_iter(rt.geometry.as_ref().unwrap()).collect();
            for (ca, cb) in a.iter().zip(b.iter()) {
                assert_abs_diff_eq!(ca.x, cb.x, epsilon = 1e-7);
                assert_abs_diff_eq!(ca.y, cb.y, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn align_without_raster_crs_is_noop() {
        let layer = tallahassee(Some(CRS::wgs84()));
        let out = align_to_raster(&layer, None).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));

        let out = align_to_raster(&layer, Some(&CRS::from_epsg(3857))).unwrap();
        assert_eq!(out.crs.as_ref().and_then(CRS::epsg), Some(3857));
    }

    #[test]
    fn geographic_raster_refused() {
        assert!(matches!(
            require_projected(&CRS::wgs84()),
            Err(Error::GeographicCrs(_))
        ));
        assert!(require_projected(&CRS::nad83_utm17n()).is_ok());
    }

    #[test]
    fn unsupported_target_errors() {
        let layer = tallahassee(Some(CRS::wgs84()));
        assert!(matches!(
            reproject(&layer, &CRS::from_epsg(2154)),
            Err(Error::UnsupportedCrs(_))
        ));
    }
}
