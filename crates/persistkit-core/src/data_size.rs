//! Byte-size quantities with a count style.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::array::{ElementType, OrderedPrimitiveArray};
use crate::bridge::{ints, Bridged, Shape};
use crate::error::CodecError;

/// How a byte count is scaled when presented.
///
/// `File` and `Decimal` use 1000 bytes per kilobyte. `Memory` and `Binary`
/// use 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountStyle {
    #[default]
    File,
    Memory,
    Decimal,
    Binary,
}

impl CountStyle {
    pub fn to_raw(self) -> i64 {
        match self {
            CountStyle::File => 0,
            CountStyle::Memory => 1,
            CountStyle::Decimal => 2,
            CountStyle::Binary => 3,
        }
    }

    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(CountStyle::File),
            1 => Some(CountStyle::Memory),
            2 => Some(CountStyle::Decimal),
            3 => Some(CountStyle::Binary),
            _ => None,
        }
    }

    /// Bytes per kilobyte under this style.
    pub fn unit(self) -> i64 {
        match self {
            CountStyle::File | CountStyle::Decimal => 1000,
            CountStyle::Memory | CountStyle::Binary => 1024,
        }
    }
}

/// A number of bytes together with the style used to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DataSize {
    pub bytes: i64,
    pub count_style: CountStyle,
}

impl DataSize {
    pub const fn new(bytes: i64, count_style: CountStyle) -> Self {
        Self { bytes, count_style }
    }

    pub const fn bytes(bytes: i64) -> Self {
        Self::new(bytes, CountStyle::File)
    }

    pub fn kilobytes(&self) -> f64 {
        self.bytes as f64 / self.count_style.unit() as f64
    }

    pub fn megabytes(&self) -> f64 {
        self.kilobytes() / self.count_style.unit() as f64
    }
}

impl fmt::Display for DataSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
        let unit = self.count_style.unit() as f64;
        let mut value = self.bytes as f64;
        let mut index = 0;
        while value.abs() >= unit && index < UNITS.len() - 1 {
            value /= unit;
            index += 1;
        }
        if index == 0 {
            write!(f, "{} {}", self.bytes, UNITS[0])
        } else {
            write!(f, "{:.1} {}", value, UNITS[index])
        }
    }
}

impl Bridged for DataSize {
    const TYPE_NAME: &'static str = "DataSize";
    const SHAPE: Shape = Shape::fixed(ElementType::Int, 2);

    fn decompose(&self) -> OrderedPrimitiveArray {
        OrderedPrimitiveArray::from([self.bytes, self.count_style.to_raw()])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let v = ints::<Self>(array)?;
        let count_style = CountStyle::from_raw(v[1]).ok_or_else(|| {
            CodecError::malformed(Self::TYPE_NAME, format!("unknown count style: {}", v[1]))
        })?;
        Ok(DataSize::new(v[0], count_style))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_style_raw_values() {
        for style in [
            CountStyle::File,
            CountStyle::Memory,
            CountStyle::Decimal,
            CountStyle::Binary,
        ] {
            assert_eq!(CountStyle::from_raw(style.to_raw()), Some(style));
        }
        assert_eq!(CountStyle::from_raw(4), None);
        assert_eq!(CountStyle::from_raw(-1), None);
    }

    #[test]
    fn test_invalid_count_style_is_malformed() {
        let err = DataSize::recompose(&OrderedPrimitiveArray::from([1024i64, 7])).unwrap_err();
        assert!(matches!(err, CodecError::MalformedBridgedValue { type_name: "DataSize", .. }));
    }

    #[test]
    fn test_boundaries() {
        for bytes in [0, -1, i64::MAX, i64::MIN] {
            let size = DataSize::new(bytes, CountStyle::Binary);
            assert_eq!(DataSize::recompose(&size.decompose()).unwrap(), size);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(DataSize::bytes(512).to_string(), "512 B");
        assert_eq!(DataSize::new(1536, CountStyle::Binary).to_string(), "1.5 KB");
        assert_eq!(DataSize::new(2_500_000, CountStyle::Decimal).to_string(), "2.5 MB");
    }
}
