//! Cell value types a DEM can be stored in

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Every element converts losslessly enough to `f64` for elevation math;
/// slope computation always runs on `f64` regardless of storage type.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Short type name as it appears in GeoTIFF sample formats
    const TYPE_NAME: &'static str;

    /// Fill value used when a cell must be written as missing and no
    /// sentinel was declared.
    fn default_nodata() -> Self;

    /// Whether this cell is missing.
    ///
    /// The sentinel comparison is exact. Floating types additionally treat
    /// NaN as missing whether or not a sentinel is declared.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, `None` when the value does not fit.
    fn from_f64(v: f64) -> Option<Self> {
        NumCast::from(v)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $name:expr) => {
        impl RasterElement for $t {
            const TYPE_NAME: &'static str = $name;

            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $name:expr) => {
        impl RasterElement for $t {
            const TYPE_NAME: &'static str = $name;

            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata == Some(*self)
            }
        }
    };
}

impl_raster_element_int!(i8, "i8");
impl_raster_element_int!(i16, "i16");
impl_raster_element_int!(i32, "i32");
impl_raster_element_int!(i64, "i64");
impl_raster_element_int!(u8, "u8");
impl_raster_element_int!(u16, "u16");
impl_raster_element_int!(u32, "u32");
impl_raster_element_int!(u64, "u64");
impl_raster_element_float!(f32, "f32");
impl_raster_element_float!(f64, "f64");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_match_is_exact() {
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
        assert!(!(-9999.0001f64).is_nodata(Some(-9999.0)));
        assert!(!(-9999.0f64).is_nodata(None));
    }

    #[test]
    fn nan_is_always_missing() {
        assert!(f32::NAN.is_nodata(None));
        assert!(f64::NAN.is_nodata(Some(0.0)));
    }

    #[test]
    fn integer_sentinel() {
        assert!(0u8.is_nodata(Some(0)));
        assert!(!1u8.is_nodata(Some(0)));
        assert!(!i16::MIN.is_nodata(None));
    }
}
