//! Running and cross slope of line paths over a slope field
//!
//! Each line is densified, and every adjacent sample pair contributes one
//! observation at its midpoint: the cell's slope magnitude `S` and downslope
//! aspect `A` are split against the pair's bearing `b` into
//! `cross = S * |sin(A - b)|`. Midpoints on masked cells or off the raster
//! contribute nothing.

use adaslope_core::crs::{align_to_raster, require_projected};
use adaslope_core::{Error, FeatureCollection, Result};
use geo::{Coord, Geometry, LineString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::densify::{densify, validate_interval};
use crate::compliance::ComplianceThreshold;
use crate::maybe_rayon::*;
use crate::path::{PathId, PathResult, PATH_ID_FIELD};
use crate::terrain::SlopeField;

/// What "running slope" reports for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunningSlopeMode {
    /// Full gradient magnitude `S` under the path, regardless of bearing
    #[default]
    Magnitude,
    /// Gradient component along the path, `S * |cos(A - b)|`
    Directional,
}

/// Parameters for path evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathEvalParams {
    /// Densification spacing, metres
    pub interval_m: f64,
    pub thresholds: ComplianceThreshold,
    pub running_mode: RunningSlopeMode,
    /// Attribute naming each path in the results
    pub path_id_field: String,
}

impl Default for PathEvalParams {
    fn default() -> Self {
        Self {
            interval_m: 2.0,
            thresholds: ComplianceThreshold::default(),
            running_mode: RunningSlopeMode::Magnitude,
            path_id_field: PATH_ID_FIELD.to_string(),
        }
    }
}

/// Worst running and cross slope along one path, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathEvaluation {
    /// `None` when no midpoint could be sampled
    pub running_max: Option<f64>,
    pub cross_max: Option<f64>,
    pub running_ok: bool,
    pub cross_ok: bool,
    /// Midpoints that contributed
    pub samples: usize,
}

/// Running accumulator over retained midpoints.
#[derive(Debug, Clone, Copy, Default)]
struct Maxima {
    running: Option<f64>,
    cross: Option<f64>,
    samples: usize,
}

impl Maxima {
    fn push(&mut self, running: f64, cross: f64) {
        self.running = Some(self.running.map_or(running, |m| m.max(running)));
        self.cross = Some(self.cross.map_or(cross, |m| m.max(cross)));
        self.samples += 1;
    }

    fn merge(mut self, other: Maxima) -> Maxima {
        if let (Some(r), Some(c)) = (other.running, other.cross) {
            self.running = Some(self.running.map_or(r, |m| m.max(r)));
            self.cross = Some(self.cross.map_or(c, |m| m.max(c)));
        }
        self.samples += other.samples;
        self
    }

    fn finish(self, thresholds: &ComplianceThreshold) -> PathEvaluation {
        PathEvaluation {
            running_max: self.running,
            cross_max: self.cross,
            running_ok: self.running.is_some_and(|v| thresholds.running_ok_pct(v)),
            cross_ok: self.cross.is_some_and(|v| thresholds.cross_ok_pct(v)),
            samples: self.samples,
        }
    }
}

/// Compass bearing in degrees `[0, 360)` from `a` to `b`.
pub fn bearing(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (b.x - a.x).atan2(b.y - a.y).to_degrees().rem_euclid(360.0)
}

/// Split slope magnitude `s` with aspect `aspect_deg` against travel
/// `bearing_deg` into (along, across) components.
pub fn decompose(s: f64, aspect_deg: f64, bearing_deg: f64) -> (f64, f64) {
    let delta = (aspect_deg - bearing_deg).to_radians();
    (s * delta.cos().abs(), s * delta.sin().abs())
}

fn sample_line(line: &LineString<f64>, field: &SlopeField, params: &PathEvalParams) -> Result<Maxima> {
    let samples = densify(line, params.interval_m)?;
    let mut acc = Maxima::default();

    for pair in samples.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a == b {
            continue;
        }
        let mid = Coord {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        };
        let Some(cell) = field.sample(mid.x, mid.y) else {
            continue;
        };

        let (along, across) = decompose(cell.slope_pct, cell.aspect_deg, bearing(a, b));
        let running = match params.running_mode {
            RunningSlopeMode::Magnitude => cell.slope_pct,
            RunningSlopeMode::Directional => along,
        };
        acc.push(running, across);
    }

    debug!(samples = samples.len(), retained = acc.samples, "sampled path");
    Ok(acc)
}

/// Evaluate one geometry, already in the slope field's CRS.
///
/// Lines and multi-lines are evaluated; any other geometry has no samples.
pub fn evaluate_path(geometry: &Geometry<f64>, field: &SlopeField, params: &PathEvalParams) -> Result<PathEvaluation> {
    let maxima = match geometry {
        Geometry::LineString(ls) => sample_line(ls, field, params)?,
        Geometry::Line(l) => sample_line(&LineString::new(vec![l.start, l.end]), field, params)?,
        Geometry::MultiLineString(mls) => mls
            .iter()
            .map(|ls| sample_line(ls, field, params))
            .try_fold(Maxima::default(), |acc, m| m.map(|m| acc.merge(m)))?,
        _ => Maxima::default(),
    };
    Ok(maxima.finish(&params.thresholds))
}

/// Evaluate every feature of a line layer against a slope field.
///
/// Fails up front when the field's CRS is geographic, when the layer
/// declares no CRS, or when the interval is not a positive distance. The
/// layer is reprojected into the field's CRS; results follow feature order.
pub fn evaluate_paths(
    layer: &FeatureCollection,
    field: &SlopeField,
    params: &PathEvalParams,
) -> Result<Vec<PathResult<PathEvaluation>>> {
    if let Some(crs) = field.crs() {
        require_projected(crs)?;
    }
    validate_interval(params.interval_m)?;
    if layer.crs.is_none() {
        return Err(Error::MissingCrs);
    }

    let aligned = align_to_raster(layer, field.crs())?;
    let results = aligned
        .features
        .par_iter()
        .enumerate()
        .map(|(i, feature)| {
            let id = PathId::for_feature(feature, &params.path_id_field, i);
            let outcome = match &feature.geometry {
                Some(g) => evaluate_path(g, field, params),
                None => Ok(Maxima::default().finish(&params.thresholds)),
            };
            PathResult::new(Some(id), outcome)
        })
        .collect();
    Ok(results)
}

/// Copy `layer` with each feature's evaluation attached as `running_max`,
/// `cross_max`, `running_ok` and `cross_ok`.
///
/// Results pair with features by position. A failed path gets both flags
/// false and an `error` message.
pub fn attach_evaluations(
    layer: &FeatureCollection,
    results: &[PathResult<PathEvaluation>],
) -> FeatureCollection {
    let mut out = layer.clone();
    for (feature, result) in out.features.iter_mut().zip(results) {
        match &result.outcome {
            Ok(eval) => {
                feature.set_property("running_max", eval.running_max);
                feature.set_property("cross_max", eval.cross_max);
                feature.set_property("running_ok", eval.running_ok);
                feature.set_property("cross_ok", eval.cross_ok);
            }
            Err(e) => {
                feature.set_property("running_max", None::<f64>);
                feature.set_property("cross_max", None::<f64>);
                feature.set_property("running_ok", false);
                feature.set_property("cross_ok", false);
                feature.set_property("error", e.to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{slope_field, SlopeFieldParams};
    use adaslope_core::{AttributeValue, Feature, GeoTransform, Raster, CRS};
    use approx::assert_abs_diff_eq;

    /// 100 x 100 m grid at 1 m, origin (500000, 3400100), z = f(x, y).
    fn field_from(crs: Option<CRS>, f: impl Fn(f64, f64) -> f64) -> SlopeField {
        let gt = GeoTransform::new(500_000.0, 3_400_100.0, 1.0, -1.0);
        let mut data = Vec::with_capacity(100 * 100);
        for row in 0..100 {
            for col in 0..100 {
                let (x, y) = gt.pixel_to_geo(col, row);
                data.push(f(x - 500_000.0, y - 3_400_000.0));
            }
        }
        let dem = Raster::from_vec(data, 100, 100)
            .unwrap()
            .with_transform(gt)
            .with_crs(crs);
        slope_field(&dem, &SlopeFieldParams::default()).unwrap()
    }

    fn line(coords: &[(f64, f64)]) -> Geometry<f64> {
        let shifted: Vec<(f64, f64)> = coords
            .iter()
            .map(|&(x, y)| (x + 500_000.0, y + 3_400_000.0))
            .collect();
        Geometry::LineString(LineString::from(shifted))
    }

    #[test]
    fn bearings_are_compass() {
        let o = Coord { x: 0.0, y: 0.0 };
        assert_abs_diff_eq!(bearing(o, Coord { x: 0.0, y: 1.0 }), 0.0);
        assert_abs_diff_eq!(bearing(o, Coord { x: 1.0, y: 0.0 }), 90.0);
        assert_abs_diff_eq!(bearing(o, Coord { x: 0.0, y: -1.0 }), 180.0);
        assert_abs_diff_eq!(bearing(o, Coord { x: -1.0, y: 0.0 }), 270.0);
    }

    #[test]
    fn flat_field_is_compliant() {
        let field = field_from(Some(CRS::nad83_utm17n()), |_, _| 50.0);
        let eval = evaluate_path(&line(&[(10.0, 10.0), (60.0, 40.0)]), &field, &PathEvalParams::default()).unwrap();
        assert_abs_diff_eq!(eval.running_max.unwrap(), 0.0);
        assert_abs_diff_eq!(eval.cross_max.unwrap(), 0.0);
        assert!(eval.running_ok && eval.cross_ok);
    }

    #[test]
    fn path_along_and_across_a_tilted_plane() {
        // 4% rising east
        let field = field_from(Some(CRS::nad83_utm17n()), |x, _| 0.04 * x);
        let params = PathEvalParams::default();

        let along = evaluate_path(&line(&[(10.0, 50.0), (80.0, 50.0)]), &field, &params).unwrap();
        assert_abs_diff_eq!(along.running_max.unwrap(), 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(along.cross_max.unwrap(), 0.0, epsilon = 1e-9);
        assert!(along.running_ok);
        assert!(along.cross_ok);

        let across = evaluate_path(&line(&[(50.0, 10.0), (50.0, 80.0)]), &field, &params).unwrap();
        assert_abs_diff_eq!(across.running_max.unwrap(), 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(across.cross_max.unwrap(), 4.0, epsilon = 1e-9);
        assert!(!across.cross_ok);
    }

    #[test]
    fn directional_running_slope() {
        let field = field_from(Some(CRS::nad83_utm17n()), |x, _| 0.04 * x);
        let params = PathEvalParams {
            running_mode: RunningSlopeMode::Directional,
            ..Default::default()
        };

        let across = evaluate_path(&line(&[(50.0, 10.0), (50.0, 80.0)]), &field, &params).unwrap();
        assert_abs_diff_eq!(across.running_max.unwrap(), 0.0, epsilon = 1e-9);

        let diagonal = evaluate_path(&line(&[(10.0, 10.0), (80.0, 80.0)]), &field, &params).unwrap();
        let half = 4.0 * std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(diagonal.running_max.unwrap(), half, epsilon = 1e-9);
        assert_abs_diff_eq!(diagonal.cross_max.unwrap(), half, epsilon = 1e-9);
    }

    #[test]
    fn path_off_raster_has_no_value() {
        let field = field_from(Some(CRS::nad83_utm17n()), |_, _| 0.0);
        let eval = evaluate_path(&line(&[(200.0, 200.0), (260.0, 200.0)]), &field, &PathEvalParams::default()).unwrap();
        assert_eq!(eval.running_max, None);
        assert_eq!(eval.cross_max, None);
        assert!(!eval.running_ok && !eval.cross_ok);
        assert_eq!(eval.samples, 0);
    }

    #[test]
    fn short_path_uses_its_endpoints() {
        let field = field_from(Some(CRS::nad83_utm17n()), |x, _| 0.01 * x);
        let eval = evaluate_path(&line(&[(20.2, 20.5), (21.0, 20.5)]), &field, &PathEvalParams::default()).unwrap();
        assert_eq!(eval.samples, 1);
        assert_abs_diff_eq!(eval.running_max.unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn points_are_not_paths() {
        let field = field_from(Some(CRS::nad83_utm17n()), |_, _| 0.0);
        let pt = Geometry::Point(geo::Point::new(500_010.0, 3_400_010.0));
        let eval = evaluate_path(&pt, &field, &PathEvalParams::default()).unwrap();
        assert_eq!(eval, PathEvaluation::default());
    }

    #[test]
    fn geographic_field_aborts_batch() {
        let field = field_from(Some(CRS::wgs84()), |_, _| 0.0);
        let layer = FeatureCollection::with_features(Some(CRS::wgs84()), vec![Feature::new(line(&[(0.0, 0.0), (1.0, 1.0)]))]);
        assert!(matches!(
            evaluate_paths(&layer, &field, &PathEvalParams::default()),
            Err(Error::GeographicCrs(_))
        ));
    }

    #[test]
    fn batch_reprojects_and_attaches() {
        let field = field_from(Some(CRS::from_epsg(32617)), |_, y| 0.03 * y);
        let mut layer = FeatureCollection::new(Some(CRS::from_epsg(32617)));
        layer.push(Feature::new(line(&[(10.0, 50.0), (90.0, 50.0)])).with_property("path_id", "east"));
        layer.push(Feature::new(line(&[(50.0, 10.0), (50.0, 90.0)])));
        layer.push(Feature::empty());

        let results = evaluate_paths(&layer, &field, &PathEvalParams::default()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].path_id, Some(PathId::from("east")));
        assert_eq!(results[1].path_id, Some(PathId::from("1")));

        let east = results[0].value().unwrap();
        assert_abs_diff_eq!(east.cross_max.unwrap(), 3.0, epsilon = 1e-9);
        assert!(!east.cross_ok);
        let north = results[1].value().unwrap();
        assert_abs_diff_eq!(north.cross_max.unwrap(), 0.0, epsilon = 1e-9);
        assert!(north.cross_ok && north.running_ok);

        let out = attach_evaluations(&layer, &results);
        assert_eq!(out.crs, layer.crs);
        assert_eq!(out.features[0].get_property("cross_ok"), Some(&AttributeValue::Bool(false)));
        assert_eq!(out.features[2].get_property("running_max"), Some(&AttributeValue::Null));
        assert_eq!(out.features[2].get_property("running_ok"), Some(&AttributeValue::Bool(false)));
    }

    #[test]
    fn failed_paths_carry_error() {
        let layer = FeatureCollection::with_features(Some(CRS::nad83_utm17n()), vec![Feature::empty()]);
        let results = vec![PathResult::new(Some(PathId::from("0")), Err(Error::MissingCrs))];
        let out = attach_evaluations(&layer, &results);
        assert!(matches!(out.features[0].get_property("error"), Some(AttributeValue::String(_))));
        assert_eq!(out.features[0].get_property("cross_ok"), Some(&AttributeValue::Bool(false)));
    }

    #[test]
    fn layer_without_crs_is_fatal() {
        let field = field_from(Some(CRS::nad83_utm17n()), |_, _| 0.0);
        let layer = FeatureCollection::new(None);
        assert!(matches!(
            evaluate_paths(&layer, &field, &PathEvalParams::default()),
            Err(Error::MissingCrs)
        ));
    }
}
