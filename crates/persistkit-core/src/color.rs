//! RGBA colors.

use serde::{Deserialize, Serialize};

use crate::array::{ElementType, OrderedPrimitiveArray};
use crate::bridge::{doubles, Bridged, Shape};
use crate::error::CodecError;

/// A color given by its red, green, blue and alpha channels.
///
/// Channels are kept at full `f64` precision. Values outside `0.0..=1.0`
/// are allowed for extended-range colors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const CLEAR: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }
}

impl Bridged for Color {
    const TYPE_NAME: &'static str = "Color";
    const SHAPE: Shape = Shape::fixed(ElementType::Double, 4);

    fn decompose(&self) -> OrderedPrimitiveArray {
        OrderedPrimitiveArray::from([self.red, self.green, self.blue, self.alpha])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let v = doubles::<Self>(array)?;
        Ok(Color::rgba(v[0], v[1], v[2], v[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_keep_precision() {
        let color = Color::rgba(0.1 + 0.2, 1.0 / 3.0, 0.123_456_789_012_345_67, 0.5);
        assert_eq!(Color::recompose(&color.decompose()).unwrap(), color);
    }

    #[test]
    fn test_channel_order() {
        let array = Color::rgb(0.25, 0.5, 0.75).decompose();
        assert_eq!(array.as_doubles(), Some(&[0.25, 0.5, 0.75, 1.0][..]));
    }

    #[test]
    fn test_rejects_three_channels() {
        let err = Color::recompose(&OrderedPrimitiveArray::from([1.0, 1.0, 1.0])).unwrap_err();
        assert!(matches!(err, CodecError::MalformedBridgedValue { type_name: "Color", .. }));
    }
}
