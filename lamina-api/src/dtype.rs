//! Element types for layer payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The element type of an [`ArrayData`](crate::ArrayData).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DType {
    /// Every dtype, integers first.
    pub const ALL: [DType; 10] = [
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
    ];

    /// The integer dtypes, in the order they appear in menus.
    pub const INTEGERS: [DType; 8] = [
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
    ];

    /// Lowercase name, e.g. `"uint16"`.
    pub fn name(self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    /// Inclusive value range of an integer dtype.
    pub fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            DType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            DType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            DType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            DType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            DType::UInt8 => (0, u8::MAX as i128),
            DType::UInt16 => (0, u16::MAX as i128),
            DType::UInt32 => (0, u32::MAX as i128),
            DType::UInt64 => (0, u64::MAX as i128),
            DType::Float32 | DType::Float64 => return None,
        };
        Some(range)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown dtype name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dtype: {0}")]
pub struct UnknownDType(pub String);

impl FromStr for DType {
    type Err = UnknownDType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::ALL
            .into_iter()
            .find(|dtype| dtype.name() == s)
            .ok_or_else(|| UnknownDType(s.to_string()))
    }
}

/// A primitive that can be stored in an [`ArrayData`](crate::ArrayData).
///
/// Conversions are exact: `from_i128` and `from_f64` return `None` when the
/// value would not survive a round trip through `Self`.
pub trait Element: Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;
    const ZERO: Self;

    fn to_f64(self) -> f64;

    /// The exact integer value, `None` for non-integral floats.
    fn to_i128(self) -> Option<i128>;

    fn from_i128(value: i128) -> Option<Self>;

    fn from_f64(value: f64) -> Option<Self>;
}

macro_rules! int_element {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const DTYPE: DType = DType::$dtype;
                const ZERO: Self = 0;

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn to_i128(self) -> Option<i128> {
                    Some(self as i128)
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }

                fn from_f64(value: f64) -> Option<Self> {
                    if value.is_finite() && value.fract() == 0.0 {
                        // Out-of-range floats saturate in the cast, so
                        // compare in i128 space afterwards.
                        let wide = value as i128;
                        if wide as f64 == value {
                            return <$t>::try_from(wide).ok();
                        }
                    }
                    None
                }
            }
        )*
    };
}

int_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
}

impl Element for f32 {
    const DTYPE: DType = DType::Float32;
    const ZERO: Self = 0.0;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn to_i128(self) -> Option<i128> {
        (self as f64).to_i128()
    }

    fn from_i128(value: i128) -> Option<Self> {
        let narrowed = value as f32;
        (narrowed.to_i128() == Some(value)).then_some(narrowed)
    }

    fn from_f64(value: f64) -> Option<Self> {
        let narrowed = value as f32;
        (value.is_nan() || narrowed as f64 == value).then_some(narrowed)
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;
    const ZERO: Self = 0.0;

    fn to_f64(self) -> f64 {
        self
    }

    fn to_i128(self) -> Option<i128> {
        if self.is_finite() && self.fract() == 0.0 {
            let wide = self as i128;
            (wide as f64 == self).then_some(wide)
        } else {
            None
        }
    }

    fn from_i128(value: i128) -> Option<Self> {
        let widened = value as f64;
        (widened.to_i128() == Some(value)).then_some(widened)
    }

    fn from_f64(value: f64) -> Option<Self> {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        for dtype in DType::ALL {
            assert_eq!(dtype.name().parse::<DType>(), Ok(dtype));
            assert_eq!(dtype.to_string(), dtype.name());
        }
        assert!("int128".parse::<DType>().is_err());
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(DType::Int8.int_range(), Some((-128, 127)));
        assert_eq!(DType::UInt8.int_range(), Some((0, 255)));
        assert_eq!(DType::Float32.int_range(), None);
        assert!(DType::INTEGERS.iter().all(|d| d.is_integer()));
    }

    #[test]
    fn test_exact_conversions() {
        assert_eq!(i8::from_i128(1000), None);
        assert_eq!(i16::from_i128(1000), Some(1000));
        assert_eq!(u8::from_i128(-1), None);
        assert_eq!(i32::from_f64(2.5), None);
        assert_eq!(i32::from_f64(7.0), Some(7));
        assert_eq!(u64::from_f64(f64::NAN), None);
        assert_eq!(f32::from_i128(16_777_217), None);
        assert_eq!(f32::from_i128(1000), Some(1000.0));
    }
}
