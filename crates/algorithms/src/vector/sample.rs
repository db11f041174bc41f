//! Elevation sampling of point layers

use adaslope_core::crs::align_to_raster;
use adaslope_core::{Feature, FeatureCollection, Raster, RasterElement, Result};
use geo::{Geometry, Point};
use tracing::debug;

/// Tag every point with the elevation of the DEM cell under it.
///
/// The layer is brought into the DEM's CRS first. Points on nodata or off
/// the grid get a null elevation; features that are not points are dropped.
pub fn sample_elevations<T: RasterElement>(
    points: &FeatureCollection,
    dem: &Raster<T>,
    elevation_field: &str,
) -> Result<FeatureCollection> {
    let aligned = align_to_raster(points, dem.crs())?;

    let mut out = FeatureCollection::new(aligned.crs.clone());
    let mut missing = 0usize;
    for feature in aligned.iter() {
        let Some(c) = feature.point_coord() else {
            continue;
        };
        let z = dem.value_at(c.x, c.y);
        missing += usize::from(z.is_none());

        let mut tagged = Feature {
            geometry: Some(Geometry::Point(Point(c))),
            properties: feature.properties.clone(),
            id: feature.id.clone(),
        };
        tagged.set_property(elevation_field, z);
        out.push(tagged);
    }

    debug!(points = out.len(), missing, "sampled elevations");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaslope_core::{AttributeValue, GeoTransform, CRS};

    #[test]
    fn samples_nearest_cell() {
        let dem = Raster::from_vec(vec![1.0f32, 2.0, 3.0, -9999.0], 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0))
            .with_crs(Some(CRS::nad83_utm17n()))
            .with_nodata(Some(-9999.0));

        let layer = FeatureCollection::with_features(
            Some(CRS::nad83_utm17n()),
            vec![
                Feature::new(Geometry::Point(Point::new(15.0, 15.0))).with_property("path_id", 1i64),
                Feature::new(Geometry::Point(Point::new(15.0, 5.0))),
                Feature::new(Geometry::Point(Point::new(50.0, 5.0))),
                Feature::new(Geometry::LineString(vec![(0.0, 0.0), (1.0, 1.0)].into())),
            ],
        );

        let out = sample_elevations(&layer, &dem, "elevation").unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.features[0].get_f64("elevation"), Some(2.0));
        assert_eq!(out.features[0].get_property("path_id"), Some(&AttributeValue::Int(1)));
        assert_eq!(out.features[1].get_property("elevation"), Some(&AttributeValue::Null));
        assert_eq!(out.features[2].get_property("elevation"), Some(&AttributeValue::Null));
    }

    #[test]
    fn reprojects_points_into_dem_crs() {
        // one 1 km cell around a point near Tallahassee in UTM 17N
        let dem = Raster::filled(1, 1, 42.0f64)
            .with_transform(GeoTransform::new(182_700.0, 3_372_900.0, 1000.0, -1000.0))
            .with_crs(Some(CRS::nad83_utm17n()));
        let layer = FeatureCollection::with_features(
            Some(CRS::wgs84()),
            vec![Feature::new(Geometry::Point(Point::new(-84.2985, 30.4419)))],
        );

        let out = sample_elevations(&layer, &dem, "z").unwrap();
        assert_eq!(out.crs, Some(CRS::nad83_utm17n()));
        assert_eq!(out.features[0].get_f64("z"), Some(42.0));
    }
}
