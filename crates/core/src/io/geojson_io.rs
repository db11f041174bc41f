//! GeoJSON reading/writing
//!
//! RFC 7946 GeoJSON is always WGS84 lon/lat, but most slope work exchanges
//! projected layers, so the legacy (2008) `crs` member is honoured on read and
//! written whenever the collection is not EPSG:4326.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue};
use serde_json::json;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Read a GeoJSON file (FeatureCollection, Feature or bare Geometry).
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let geojson = GeoJson::from_reader(BufReader::new(file))?;
    let fc = from_geojson(geojson)?;
    debug!(path = %path.display(), features = fc.len(), crs = ?fc.crs, "read GeoJSON");
    Ok(fc)
}

/// Parse GeoJSON text.
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let geojson = text.parse::<GeoJson>()?;
    from_geojson(geojson)
}

fn from_geojson(geojson: GeoJson) -> Result<FeatureCollection> {
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            let crs = crs_from_members(fc.foreign_members.as_ref())?;
            let features = fc.features.into_iter().map(convert_feature).collect();
            Ok(FeatureCollection::with_features(Some(crs), features))
        }
        GeoJson::Feature(f) => {
            let crs = crs_from_members(f.foreign_members.as_ref())?;
            Ok(FeatureCollection::with_features(Some(crs), vec![convert_feature(f)]))
        }
        GeoJson::Geometry(g) => {
            let crs = crs_from_members(g.foreign_members.as_ref())?;
            let feature = Feature {
                geometry: convert_geometry(g),
                ..Feature::empty()
            };
            Ok(FeatureCollection::with_features(Some(crs), vec![feature]))
        }
    }
}

/// CRS named by a legacy `crs` member, WGS84 when there is none.
fn crs_from_members(members: Option<&JsonObject>) -> Result<CRS> {
    let Some(crs) = members.and_then(|m| m.get("crs")) else {
        return Ok(CRS::wgs84());
    };
    let props = crs.get("properties");

    if let Some(name) = props.and_then(|p| p.get("name")).and_then(JsonValue::as_str) {
        return CRS::parse(name);
    }
    if let Some(code) = props
        .and_then(|p| p.get("code"))
        .and_then(JsonValue::as_u64)
        .and_then(|c| u32::try_from(c).ok())
    {
        return Ok(CRS::from_epsg(code));
    }
    if crs.is_null() {
        return Ok(CRS::wgs84());
    }
    Err(Error::GeoJson(format!("unrecognised crs member: {crs}")))
}

fn convert_feature(f: geojson::Feature) -> Feature {
    let id = f.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });
    let properties = f
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, attribute_from_json(v)))
        .collect();

    Feature {
        geometry: f.geometry.and_then(convert_geometry),
        properties,
        id,
    }
}

fn convert_geometry(g: geojson::Geometry) -> Option<Geometry<f64>> {
    match Geometry::<f64>::try_from(g) {
        Ok(geom) => Some(geom),
        Err(e) => {
            warn!(error = %e, "dropping unreadable geometry");
            None
        }
    }
}

fn attribute_from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => json!(i),
        // JSON has no NaN or infinity
        AttributeValue::Float(f) if !f.is_finite() => JsonValue::Null,
        AttributeValue::Float(f) => json!(f),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    let features = collection
        .iter()
        .map(|f| geojson::Feature {
            bbox: None,
            geometry: f
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: f.id.clone().map(Id::String),
            properties: Some(
                f.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                    .collect(),
            ),
            foreign_members: None,
        })
        .collect();

    let foreign_members = collection
        .crs
        .as_ref()
        .filter(|crs| crs.epsg() != Some(4326))
        .map(|crs| {
            let name = match crs.epsg() {
                Some(code) => format!("urn:ogc:def:crs:EPSG::{code}"),
                None => crs.identifier(),
            };
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                json!({ "type": "name", "properties": { "name": name } }),
            );
            members
        });

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    }
}

/// Serialize a collection as pretty-printed GeoJSON.
pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_geojson(collection))?)
}

/// Write a collection to a GeoJSON file.
pub fn write_geojson<P: AsRef<Path>>(path: P, collection: &FeatureCollection) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &to_geojson(collection))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Point};

    const UTM_POINTS: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::26917" } },
        "features": [
            { "type": "Feature", "id": 7,
              "geometry": { "type": "Point", "coordinates": [760000.0, 3370000.0] },
              "properties": { "path_id": 1, "elevation": 12.5, "name": "a" } },
            { "type": "Feature",
              "geometry": null,
              "properties": { "path_id": 1, "elevation": null } }
        ]
    }"#;

    #[test]
    fn reads_legacy_crs_member() {
        let fc = parse_geojson(UTM_POINTS).unwrap();
        assert_eq!(fc.crs.as_ref().and_then(CRS::epsg), Some(26917));
        assert_eq!(fc.len(), 2);

        let first = &fc.features[0];
        assert_eq!(first.id.as_deref(), Some("7"));
        assert_eq!(first.get_f64("elevation"), Some(12.5));
        assert_eq!(first.get_property("path_id"), Some(&AttributeValue::Int(1)));
        assert!(matches!(first.geometry, Some(Geometry::Point(_))));

        assert!(fc.features[1].geometry.is_none());
        assert_eq!(fc.features[1].get_f64("elevation"), None);
    }

    #[test]
    fn missing_crs_defaults_to_wgs84() {
        let text = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[-84.3,30.4]},"properties":{}}"#;
        let fc = parse_geojson(text).unwrap();
        assert_eq!(fc.crs, Some(CRS::wgs84()));
    }

    #[test]
    fn write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.geojson");

        let mut fc = FeatureCollection::new(Some(CRS::from_epsg(32617)));
        fc.push(
            Feature::new(Geometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 0.0)])))
                .with_property("running_max", Some(3.25))
                .with_property("cross_max", None::<f64>)
                .with_property("running_ok", true),
        );
        fc.push(Feature::new(Geometry::Point(Point::new(1.0, 2.0))).with_property("slope", f64::NAN));
        write_geojson(&path, &fc).unwrap();

        let back = read_geojson(&path).unwrap();
        assert_eq!(back.crs.as_ref().and_then(CRS::epsg), Some(32617));
        assert_eq!(back.features[0].get_f64("running_max"), Some(3.25));
        assert_eq!(back.features[0].get_property("cross_max"), Some(&AttributeValue::Null));
        assert_eq!(back.features[0].get_property("running_ok"), Some(&AttributeValue::Bool(true)));
        assert_eq!(back.features[1].get_property("slope"), Some(&AttributeValue::Null));
    }

    #[test]
    fn wgs84_output_has_no_crs_member() {
        let fc = FeatureCollection::new(Some(CRS::wgs84()));
        let text = to_geojson_string(&fc).unwrap();
        assert!(!text.contains("\"crs\""));
    }

    #[test]
    fn rejects_garbage_crs() {
        let text = r#"{"type":"FeatureCollection","crs":{"type":"name","properties":{"name":"bogus"}},"features":[]}"#;
        assert!(parse_geojson(text).is_err());
    }
}
