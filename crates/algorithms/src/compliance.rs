//! ADA compliance classification
//!
//! [`classify`] is the only place a slope is compared against a limit. Every
//! engine in this crate routes its pass/fail decision through it so that
//! compliance is always sign-agnostic.

use serde::{Deserialize, Serialize};

/// ADA running-slope limit, 1:20.
pub const ADA_RUNNING_MAX: f64 = 0.05;
/// ADA cross-slope limit, 1:48.
pub const ADA_CROSS_MAX: f64 = 0.02083;

/// Whether `slope` is within `threshold`, ignoring direction of travel.
///
/// Both values must be in the same unit (rise/run or percent). NaN never
/// passes.
#[inline]
pub fn classify(slope: f64, threshold: f64) -> bool {
    slope.abs() <= threshold
}

/// Running and cross slope limits, stored as rise/run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceThreshold {
    /// Limit along the direction of travel
    pub running: f64,
    /// Limit perpendicular to the direction of travel
    pub cross: f64,
}

impl Default for ComplianceThreshold {
    fn default() -> Self {
        Self {
            running: ADA_RUNNING_MAX,
            cross: ADA_CROSS_MAX,
        }
    }
}

impl ComplianceThreshold {
    pub fn new(running: f64, cross: f64) -> Self {
        Self { running, cross }
    }

    /// Build from percent limits (5.0 for 5%).
    pub fn from_percent(running_pct: f64, cross_pct: f64) -> Self {
        Self::new(running_pct / 100.0, cross_pct / 100.0)
    }

    pub fn running_pct(&self) -> f64 {
        self.running * 100.0
    }

    pub fn cross_pct(&self) -> f64 {
        self.cross * 100.0
    }

    /// Running limit check for a percent value
    pub fn running_ok_pct(&self, slope_pct: f64) -> bool {
        classify(slope_pct, self.running_pct())
    }

    /// Cross limit check for a percent value
    pub fn cross_ok_pct(&self, slope_pct: f64) -> bool {
        classify(slope_pct, self.cross_pct())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_ignores_sign() {
        assert!(classify(0.05, 0.05));
        assert!(classify(-0.05, 0.05));
        assert!(!classify(-0.0501, 0.05));
        assert!(!classify(0.1, 0.05));
    }

    #[test]
    fn nan_fails() {
        assert!(!classify(f64::NAN, 0.05));
    }

    #[test]
    fn default_thresholds() {
        let t = ComplianceThreshold::default();
        assert_eq!(t.running, 0.05);
        assert_eq!(t.cross, 0.02083);
        assert!((t.running_pct() - 5.0).abs() < 1e-12);
        assert!((t.cross_pct() - 2.083).abs() < 1e-12);
        assert!(t.running_ok_pct(4.99));
        assert!(!t.cross_ok_pct(2.1));
    }

    #[test]
    fn percent_constructor() {
        let t = ComplianceThreshold::from_percent(8.33, 2.0);
        assert!((t.running - 0.0833).abs() < 1e-12);
        assert!((t.cross - 0.02).abs() < 1e-12);
    }

    #[test]
    fn deserializes_partial_json() {
        let t: ComplianceThreshold = serde_json::from_str(r#"{"running": 0.0833}"#).unwrap();
        assert_eq!(t.running, 0.0833);
        assert_eq!(t.cross, ADA_CROSS_MAX);
    }
}
