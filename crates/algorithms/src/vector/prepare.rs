//! Turning path layers into what the slope engines consume

use adaslope_core::crs::{to_metric, MetricTarget};
use adaslope_core::{Feature, FeatureCollection, Result};
use geo::{Geometry, LineString, MultiLineString, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::path::{PathId, PATH_ID_FIELD};
use crate::paths::{densify, validate_interval};

/// Outline every polygon as a line.
///
/// Each feature keeps its identity: a Polygon becomes the LineString of its
/// exterior and a MultiPolygon the MultiLineString of its exteriors. Lines
/// pass through and anything else is dropped. Attributes are carried over.
pub fn polygons_to_lines(layer: &FeatureCollection) -> FeatureCollection {
    let mut out = FeatureCollection::new(layer.crs.clone());
    for feature in layer.iter() {
        let geometry = match &feature.geometry {
            Some(Geometry::Polygon(p)) => Geometry::LineString(p.exterior().clone()),
            Some(Geometry::MultiPolygon(mp)) => {
                Geometry::MultiLineString(MultiLineString(mp.iter().map(|p| p.exterior().clone()).collect()))
            }
            Some(g @ (Geometry::LineString(_) | Geometry::MultiLineString(_))) => g.clone(),
            _ => continue,
        };
        out.push(Feature {
            geometry: Some(geometry),
            properties: feature.properties.clone(),
            id: feature.id.clone(),
        });
    }
    out
}

/// Parameters for [`resample_lines`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleParams {
    /// Spacing between points, metres
    pub interval_m: f64,
    /// Attribute naming each line; copied onto its points as `path_id`
    pub path_id_field: String,
    pub metric: MetricTarget,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            interval_m: 5.0,
            path_id_field: PATH_ID_FIELD.to_string(),
            metric: MetricTarget::default(),
        }
    }
}

/// Points spaced along every line, tagged with `path_id` and `distance_m`.
///
/// The layer is projected to metres first, so the result is in the metric
/// CRS. Points of a line come out in travel order. Each part of a
/// multi-part line is its own path, `"{id}:{part}"`, measured from its own
/// start.
pub fn resample_lines(layer: &FeatureCollection, params: &ResampleParams) -> Result<FeatureCollection> {
    validate_interval(params.interval_m)?;
    let metric = to_metric(layer, &params.metric)?;

    let mut out = FeatureCollection::new(metric.crs.clone());
    for (i, feature) in metric.iter().enumerate() {
        let id = PathId::for_feature(feature, &params.path_id_field, i);
        let parts: Vec<(PathId, &LineString<f64>)> = match &feature.geometry {
            Some(Geometry::LineString(ls)) => vec![(id, ls)],
            Some(Geometry::MultiLineString(mls)) if mls.0.len() == 1 => vec![(id, &mls.0[0])],
            Some(Geometry::MultiLineString(mls)) => {
                mls.iter().enumerate().map(|(k, ls)| (id.part(k), ls)).collect()
            }
            _ => continue,
        };

        for (part_id, line) in parts {
            let mut along = 0.0;
            let mut previous: Option<geo::Coord<f64>> = None;
            for c in densify(line, params.interval_m)? {
                if let Some(p) = previous {
                    along += (c.x - p.x).hypot(c.y - p.y);
                }
                previous = Some(c);
                out.push(
                    Feature::new(Geometry::Point(Point(c)))
                        .with_property(PATH_ID_FIELD, part_id.clone())
                        .with_property("distance_m", along),
                );
            }
        }
    }

    debug!(lines = metric.len(), points = out.len(), "resampled lines");
    Ok(out)
}
