//! Coordinate Reference System handling
//!
//! [`CRS`] is a lightweight tag (EPSG code, WKT or PROJ string). The
//! [`projection`] submodule holds the pure-Rust projection math for the EPSG
//! codes the engine can reproject between, and [`normalize`] guarantees
//! vector data ends up in a metric projected CRS before any distance or slope
//! is computed.

pub mod normalize;
pub mod projection;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
pub use normalize::{align_to_raster, reproject, require_projected, to_metric, MetricTarget};
pub use projection::{Projection, Transformer};

/// EPSG block holding geographic (degree based) CRSs.
///
/// The block also has a few geocentric codes; those are not metric map
/// coordinates either, so counting them as geographic is harmless.
const GEOGRAPHIC_EPSG_BLOCK: std::ops::RangeInclusive<u32> = 4001..=4999;
/// Geographic CRSs registered outside that block.
const GEOGRAPHIC_EPSG_EXTRA: &[u32] = &[6318, 7844];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
    /// Angular/linear units as declared by the source, when it says so
    /// (e.g. the GeoTIFF model type). Overrides the EPSG classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geographic: Option<bool>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
            geographic: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
            geographic: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
            geographic: None,
        }
    }

    /// Record whether the source declared angular units.
    pub fn with_geographic(mut self, geographic: bool) -> Self {
        self.geographic = Some(geographic);
        self
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// NAD83 / UTM zone 17N (EPSG:26917), the historical fixed metric target.
    pub fn nad83_utm17n() -> Self {
        Self::from_epsg(26917)
    }

    /// WGS84 / UTM zone for the given zone number and hemisphere.
    pub fn wgs84_utm(zone: u32, north: bool) -> Self {
        let base = if north { 32600 } else { 32700 };
        Self::from_epsg(base + zone.clamp(1, 60))
    }

    /// Parse a user or file supplied CRS identifier.
    ///
    /// Accepts `EPSG:26917`, `urn:ogc:def:crs:EPSG::26917`, OGC CRS84
    /// identifiers, bare EPSG numbers, PROJ strings and WKT.
    pub fn parse(text: &str) -> Result<Self> {
        let s = text.trim();
        if s.is_empty() {
            return Err(Error::MissingCrs);
        }

        let upper = s.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Self::wgs84());
        }
        if let Some(idx) = upper.rfind("EPSG:") {
            let code = upper[idx + 5..].rsplit(':').next().unwrap_or_default();
            return code
                .parse::<u32>()
                .map(Self::from_epsg)
                .map_err(|_| Error::UnsupportedCrs(s.to_string()));
        }
        if let Ok(code) = s.parse::<u32>() {
            return Ok(Self::from_epsg(code));
        }
        if s.starts_with('+') {
            return Ok(Self::from_proj(s));
        }
        if upper.starts_with("GEOGCS")
            || upper.starts_with("GEOGCRS")
            || upper.starts_with("PROJCS")
            || upper.starts_with("PROJCRS")
        {
            return Ok(Self::from_wkt(s));
        }

        Err(Error::UnsupportedCrs(s.to_string()))
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Whether coordinates in this CRS are angular (degrees).
    ///
    /// A declared unit hint wins. Otherwise EPSG codes are classified by the
    /// registry's geographic block plus a short list of later additions; a
    /// geographic code registered anywhere else reads as projected unless
    /// the source declares it.
    pub fn is_geographic(&self) -> bool {
        if let Some(geographic) = self.geographic {
            return geographic;
        }
        if let Some(code) = self.epsg {
            return GEOGRAPHIC_EPSG_BLOCK.contains(&code) || GEOGRAPHIC_EPSG_EXTRA.contains(&code);
        }
        if let Some(wkt) = &self.wkt {
            let upper = wkt.trim_start().to_ascii_uppercase();
            return upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS");
        }
        if let Some(proj) = &self.proj {
            return proj.contains("+proj=longlat") || proj.contains("+proj=latlong");
        }
        false
    }

    /// Projection math for this CRS, if it is one we can transform.
    pub fn projection(&self) -> Result<Projection> {
        self.epsg
            .and_then(Projection::from_epsg)
            .ok_or_else(|| Error::UnsupportedCrs(self.identifier()))
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(26917);
        assert_eq!(crs.epsg(), Some(26917));
        assert_eq!(crs.identifier(), "EPSG:26917");
        assert!(!crs.is_geographic());
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(4326);
        let b = CRS::wgs84();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::nad83_utm17n()));
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!(CRS::parse("EPSG:3857").unwrap().epsg(), Some(3857));
        assert_eq!(CRS::parse("epsg:26917").unwrap().epsg(), Some(26917));
        assert_eq!(
            CRS::parse("urn:ogc:def:crs:EPSG::32617").unwrap().epsg(),
            Some(32617)
        );
        assert_eq!(
            CRS::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap().epsg(),
            Some(4326)
        );
        assert_eq!(CRS::parse("4269").unwrap().epsg(), Some(4269));
        assert!(CRS::parse("+proj=longlat +datum=WGS84").unwrap().is_geographic());
        assert!(matches!(CRS::parse(""), Err(Error::MissingCrs)));
        assert!(CRS::parse("not a crs").is_err());
    }

    #[test]
    fn test_geographic_detection() {
        assert!(CRS::wgs84().is_geographic());
        assert!(CRS::from_epsg(4269).is_geographic());
        assert!(CRS::from_wkt("GEOGCS[\"WGS 84\"]").is_geographic());
        assert!(!CRS::from_wkt("PROJCS[\"UTM 17N\"]").is_geographic());
        assert!(!CRS::from_epsg(3857).is_geographic());
    }

    #[test]
    fn geographic_codes_beyond_the_common_datums() {
        // CGCS2000 and ED50
        assert!(CRS::from_epsg(4490).is_geographic());
        assert!(CRS::from_epsg(4230).is_geographic());
        assert!(CRS::from_epsg(6318).is_geographic());
        assert!(!CRS::from_epsg(26917).is_geographic());
        assert!(!CRS::from_epsg(32617).is_geographic());
        assert!(!CRS::from_epsg(2193).is_geographic());
    }

    #[test]
    fn declared_units_override_the_code() {
        assert!(CRS::from_epsg(9999).with_geographic(true).is_geographic());
        assert!(!CRS::from_epsg(4490).with_geographic(false).is_geographic());
        assert_eq!(CRS::from_epsg(4490).with_geographic(true).epsg(), Some(4490));
    }

    #[test]
    fn test_wgs84_utm_codes() {
        assert_eq!(CRS::wgs84_utm(17, true).epsg(), Some(32617));
        assert_eq!(CRS::wgs84_utm(21, false).epsg(), Some(32721));
    }
}
