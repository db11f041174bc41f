//! Ordered paths and per-path outcomes
//!
//! A [`Path`] is the ordered sequence a walker travels. Its order comes from
//! the input layer and nothing in this crate sorts it: travel direction
//! defines slope sign and bearing.

use std::collections::HashMap;
use std::fmt;

use adaslope_core::{AttributeValue, Error, Feature, FeatureCollection, Result};
use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default attribute holding the path identifier.
pub const PATH_ID_FIELD: &str = "path_id";
/// Default attribute holding point elevation.
pub const ELEVATION_FIELD: &str = "elevation";

/// Path identifier as found in the input attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(String);

impl PathId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier of a feature: `id_field` attribute, then the feature id,
    /// then its position in the layer.
    pub fn for_feature(feature: &Feature, id_field: &str, index: usize) -> Self {
        feature
            .get_property(id_field)
            .and_then(AttributeValue::as_key)
            .or_else(|| feature.id.clone())
            .map(Self)
            .unwrap_or_else(|| Self(index.to_string()))
    }

    /// Identifier of one part of a multi-part feature, `"{id}:{part}"`.
    pub fn part(&self, part: usize) -> Self {
        Self(format!("{}:{}", self.0, part))
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<PathId> for AttributeValue {
    fn from(id: PathId) -> Self {
        AttributeValue::String(id.0)
    }
}

/// Render an optional path id for messages.
pub(crate) fn display_id(id: Option<&PathId>) -> String {
    id.map_or_else(|| "(unlabelled)".to_string(), PathId::to_string)
}

/// One vertex of a point-sequence path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub coord: Coord<f64>,
    /// `None` when sampling failed or hit nodata
    pub elevation: Option<f64>,
}

impl PathPoint {
    pub fn new(x: f64, y: f64, elevation: Option<f64>) -> Self {
        Self {
            coord: Coord { x, y },
            elevation: elevation.filter(|z| z.is_finite()),
        }
    }
}

/// Ordered points sharing one path identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// `None` when the input carried no path identifiers at all
    pub id: Option<PathId>,
    pub points: Vec<PathPoint>,
}

impl Path {
    pub fn new(id: Option<PathId>, points: Vec<PathPoint>) -> Self {
        Self { id, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Group point features into paths.
///
/// Points without a usable point geometry are dropped. When any feature
/// carries `id_field`, points are grouped by it in order of first
/// appearance and points lacking it are dropped; otherwise the whole layer is
/// one path. Within a path, input order is kept.
pub fn partition_points(layer: &FeatureCollection, id_field: &str, elevation_field: &str) -> Vec<Path> {
    let keyed = layer
        .iter()
        .any(|f| f.get_property(id_field).and_then(AttributeValue::as_key).is_some());

    if !keyed {
        let points = layer
            .iter()
            .filter_map(|f| to_path_point(f, elevation_field))
            .collect();
        return vec![Path::new(None, points)];
    }

    let mut paths: Vec<Path> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unlabelled = 0usize;
    for feature in layer.iter() {
        let Some(key) = feature.get_property(id_field).and_then(AttributeValue::as_key) else {
            unlabelled += 1;
            continue;
        };
        let Some(point) = to_path_point(feature, elevation_field) else {
            continue;
        };
        match index.get(&key) {
            Some(&i) => paths[i].points.push(point),
            None => {
                index.insert(key.clone(), paths.len());
                paths.push(Path::new(Some(PathId(key)), vec![point]));
            }
        }
    }

    if unlabelled > 0 {
        warn!(count = unlabelled, field = id_field, "dropped points without a path id");
    }
    paths
}

fn to_path_point(feature: &Feature, elevation_field: &str) -> Option<PathPoint> {
    let coord = feature.point_coord()?;
    Some(PathPoint::new(coord.x, coord.y, feature.get_f64(elevation_field)))
}

/// Outcome of processing one path in a batch.
#[derive(Debug)]
pub struct PathResult<T> {
    pub path_id: Option<PathId>,
    pub outcome: Result<T>,
}

impl<T> PathResult<T> {
    pub fn new(path_id: Option<PathId>, outcome: Result<T>) -> Self {
        Self { path_id, outcome }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }
}

/// Unwrap a batch, failing on the first failed path.
///
/// For callers that treat any per-path failure as fatal for the run.
pub fn fail_fast<T>(results: Vec<PathResult<T>>) -> Result<Vec<(Option<PathId>, T)>> {
    results
        .into_iter()
        .map(|r| r.outcome.map(|v| (r.path_id, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaslope_core::CRS;
    use geo::{Geometry, Point};

    fn pt(x: f64, id: Option<i64>, z: Option<f64>) -> Feature {
        let mut f = Feature::new(Geometry::Point(Point::new(x, 0.0)));
        if let Some(id) = id {
            f.set_property(PATH_ID_FIELD, id);
        }
        f.set_property(ELEVATION_FIELD, z);
        f
    }

    #[test]
    fn groups_keep_first_appearance_and_input_order() {
        let layer = FeatureCollection::with_features(
            Some(CRS::from_epsg(26917)),
            vec![
                pt(30.0, Some(2), Some(1.0)),
                pt(20.0, Some(1), Some(1.0)),
                pt(10.0, Some(2), Some(2.0)),
                pt(0.0, Some(1), None),
                pt(5.0, None, Some(0.0)),
            ],
        );
        let paths = partition_points(&layer, PATH_ID_FIELD, ELEVATION_FIELD);

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].id, Some(PathId::from("2")));
        let xs: Vec<f64> = paths[0].points.iter().map(|p| p.coord.x).collect();
        assert_eq!(xs, vec![30.0, 10.0]);

        assert_eq!(paths[1].id, Some(PathId::from("1")));
        assert_eq!(paths[1].points[1].elevation, None);
    }

    #[test]
    fn interleaved_paths_regroup() {
        // points of 20 paths dealt round-robin
        let features = (0..2000)
            .map(|i| pt(i as f64, Some((i % 20) as i64), Some(0.0)))
            .collect();
        let layer = FeatureCollection::with_features(Some(CRS::from_epsg(26917)), features);
        let paths = partition_points(&layer, PATH_ID_FIELD, ELEVATION_FIELD);

        assert_eq!(paths.len(), 20);
        for (k, path) in paths.iter().enumerate() {
            assert_eq!(path.id, Some(PathId::new(k.to_string())));
            assert_eq!(path.len(), 100);
            assert!(path.points.windows(2).all(|w| w[1].coord.x - w[0].coord.x == 20.0));
        }
    }

    #[test]
    fn part_ids_are_distinct() {
        let id = PathId::from("trail");
        assert_eq!(id.part(0).as_str(), "trail:0");
        assert_ne!(id.part(0), id.part(1));
    }

    #[test]
    fn unkeyed_layer_is_one_path() {
        let mut no_geom = Feature::empty();
        no_geom.set_property(ELEVATION_FIELD, 3.0);
        let layer = FeatureCollection::with_features(
            None,
            vec![pt(0.0, None, Some(0.0)), no_geom, pt(1.0, None, Some(1.0))],
        );
        let paths = partition_points(&layer, PATH_ID_FIELD, ELEVATION_FIELD);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].id, None);
        assert_eq!(paths[0].len(), 2);
    }

    #[test]
    fn feature_ids_fall_back() {
        let mut f = Feature::empty();
        assert_eq!(PathId::for_feature(&f, PATH_ID_FIELD, 4).as_str(), "4");
        f.id = Some("trail-a".into());
        assert_eq!(PathId::for_feature(&f, PATH_ID_FIELD, 4).as_str(), "trail-a");
        f.set_property(PATH_ID_FIELD, 9i64);
        assert_eq!(PathId::for_feature(&f, PATH_ID_FIELD, 4).as_str(), "9");
    }

    #[test]
    fn fail_fast_stops_on_error() {
        let results = vec![
            PathResult::new(Some(PathId::from("a")), Ok(1)),
            PathResult::new(Some(PathId::from("b")), Err(Error::MissingCrs)),
        ];
        assert!(fail_fast(results).is_err());

        let results = vec![PathResult::new(None, Ok(1)), PathResult::new(None, Ok(2))];
        let values: Vec<i32> = fail_fast(results).unwrap().into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![1, 2]);
    }
}
