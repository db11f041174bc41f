//! Vector data structures
//!
//! Features carry a `geo_types` geometry plus an ordered attribute map. A
//! [`FeatureCollection`] owns its features in input order and the CRS they
//! are expressed in; nothing in the crate reorders features implicitly.

use geo_types::{Coord, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crs::CRS;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value. Non-finite floats count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) if v.is_finite() => Some(*v),
            AttributeValue::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Render the value as a grouping key (`path_id` and friends).
    ///
    /// Integral floats render without a fractional part so `1` and `1.0`
    /// group together. Null and NaN have no key.
    pub fn as_key(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Int(v) => Some(v.to_string()),
            AttributeValue::Float(v) if v.is_nan() => None,
            AttributeValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(format!("{}", *v as i64))
            }
            AttributeValue::Float(v) => Some(v.to_string()),
            AttributeValue::String(s) => Some(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<Option<f64>> for AttributeValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(AttributeValue::Null, AttributeValue::Float)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: BTreeMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Numeric attribute, `None` when absent, null or non-finite.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_property(key).and_then(AttributeValue::as_f64)
    }

    /// The coordinate of a point geometry with finite components.
    pub fn point_coord(&self) -> Option<Coord<f64>> {
        match &self.geometry {
            Some(Geometry::Point(p)) if p.x().is_finite() && p.y().is_finite() => Some(p.0),
            _ => None,
        }
    }
}

/// Collection of features sharing one CRS
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    /// CRS of every geometry in the collection, `None` when undeclared
    pub crs: Option<CRS>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(crs: Option<CRS>) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    pub fn with_features(crs: Option<CRS>, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Axis-aligned envelope of all coordinates (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        use geo::CoordsIter;

        let mut acc: Option<(f64, f64, f64, f64)> = None;
        for geom in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            for c in geom.coords_iter() {
                if !c.x.is_finite() || !c.y.is_finite() {
                    continue;
                }
                acc = Some(match acc {
                    None => (c.x, c.y, c.x, c.y),
                    Some((a, b, d, e)) => (a.min(c.x), b.min(c.y), d.max(c.x), e.max(c.y)),
                });
            }
        }
        acc
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Point};

    #[test]
    fn test_attribute_keys() {
        assert_eq!(AttributeValue::Int(7).as_key().as_deref(), Some("7"));
        assert_eq!(AttributeValue::Float(7.0).as_key().as_deref(), Some("7"));
        assert_eq!(AttributeValue::Float(7.5).as_key().as_deref(), Some("7.5"));
        assert_eq!(AttributeValue::Null.as_key(), None);
        assert_eq!(AttributeValue::Float(f64::NAN).as_key(), None);
    }

    #[test]
    fn test_attribute_numeric() {
        assert_eq!(AttributeValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(AttributeValue::Float(f64::NAN).as_f64(), None);
        assert_eq!(AttributeValue::String("2.5".into()).as_f64(), Some(2.5));
        assert_eq!(AttributeValue::Null.as_f64(), None);
    }

    #[test]
    fn test_point_coord_rejects_non_points() {
        let pt = Feature::new(Geometry::Point(Point::new(1.0, 2.0)));
        assert_eq!(pt.point_coord(), Some(Coord { x: 1.0, y: 2.0 }));

        let line = Feature::new(Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])));
        assert_eq!(line.point_coord(), None);
        assert_eq!(Feature::empty().point_coord(), None);
    }

    #[test]
    fn test_collection_bounds() {
        let mut fc = FeatureCollection::new(Some(CRS::from_epsg(26917)));
        assert!(fc.bounds().is_none());
        fc.push(Feature::new(Geometry::Point(Point::new(1.0, 5.0))));
        fc.push(Feature::new(Geometry::LineString(LineString::from(vec![(-2.0, 0.0), (3.0, 1.0)]))));
        assert_eq!(fc.bounds(), Some((-2.0, 0.0, 3.0, 5.0)));
    }
}
