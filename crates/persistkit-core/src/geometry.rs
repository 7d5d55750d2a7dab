//! Geometry values: points, sizes and rectangles.

use serde::{Deserialize, Serialize};

use crate::array::{ElementType, OrderedPrimitiveArray};
use crate::bridge::{doubles, Bridged, Shape};
use crate::error::CodecError;

/// A point in a two-dimensional coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A rectangle given by its origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Self = Self {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }
}

impl Bridged for Point {
    const TYPE_NAME: &'static str = "Point";
    const SHAPE: Shape = Shape::fixed(ElementType::Double, 2);

    fn decompose(&self) -> OrderedPrimitiveArray {
        OrderedPrimitiveArray::from([self.x, self.y])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let v = doubles::<Self>(array)?;
        Ok(Point::new(v[0], v[1]))
    }
}

impl Bridged for Size {
    const TYPE_NAME: &'static str = "Size";
    const SHAPE: Shape = Shape::fixed(ElementType::Double, 2);

    fn decompose(&self) -> OrderedPrimitiveArray {
        OrderedPrimitiveArray::from([self.width, self.height])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let v = doubles::<Self>(array)?;
        Ok(Size::new(v[0], v[1]))
    }
}

impl Bridged for Rect {
    const TYPE_NAME: &'static str = "Rect";
    const SHAPE: Shape = Shape::fixed(ElementType::Double, 4);

    fn decompose(&self) -> OrderedPrimitiveArray {
        OrderedPrimitiveArray::from([
            self.origin.x,
            self.origin.y,
            self.size.width,
            self.size.height,
        ])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let v = doubles::<Self>(array)?;
        Ok(Rect::new(v[0], v[1], v[2], v[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_layout() {
        let array = Point::new(3.5, -1.25).decompose();
        assert_eq!(array.as_doubles(), Some(&[3.5, -1.25][..]));
    }

    #[test]
    fn test_rect_layout() {
        let rect = Rect::new(1.0, 2.0, 30.0, 40.0);
        assert_eq!(rect.decompose().as_doubles(), Some(&[1.0, 2.0, 30.0, 40.0][..]));
        assert_eq!(rect.max_x(), 31.0);
        assert_eq!(rect.max_y(), 42.0);
    }

    #[test]
    fn test_boundary_values_bit_exact() {
        for v in [0.0, -0.0, f64::MAX, f64::MIN, f64::MIN_POSITIVE, -1.0e-300] {
            let p = Point::new(v, -v);
            let back = Point::recompose(&p.decompose()).unwrap();
            assert_eq!(back.x.to_bits(), p.x.to_bits());
            assert_eq!(back.y.to_bits(), p.y.to_bits());
        }
    }

    #[test]
    fn test_wrong_shape_rejected() {
        assert!(matches!(
            Point::recompose(&OrderedPrimitiveArray::from([1.0])),
            Err(CodecError::MalformedBridgedValue { type_name: "Point", .. })
        ));
        assert!(matches!(
            Size::recompose(&OrderedPrimitiveArray::from([1i64, 2])),
            Err(CodecError::MalformedBridgedValue { type_name: "Size", .. })
        ));
        assert!(Rect::recompose(&OrderedPrimitiveArray::from([1.0, 2.0, 3.0])).is_err());
        assert!(Rect::recompose(&Point::new(1.0, 2.0).decompose()).is_err());
    }
}
