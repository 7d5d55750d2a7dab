//! Bridged value codec.
//!
//! A bridged value is an application type that the store cannot hold
//! natively. It decomposes into an [`OrderedPrimitiveArray`] of a fixed,
//! type-specific shape and recomposes from one. Implementing [`Bridged`]
//! is the only step needed to make a new type storable.
//!
//! This module carries the implementations for std types. Geometry, color,
//! data size and media time live in their own modules.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::array::{ElementType, OrderedPrimitiveArray};
use crate::error::CodecError;

/// Length constraint of a bridged shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Fixed(usize),
    Variable,
}

/// The stored shape a bridged type expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub element: ElementType,
    pub length: Length,
}

impl Shape {
    pub const fn fixed(element: ElementType, len: usize) -> Self {
        Self {
            element,
            length: Length::Fixed(len),
        }
    }

    pub const fn variable(element: ElementType) -> Self {
        Self {
            element,
            length: Length::Variable,
        }
    }

    /// Check `array` against this shape.
    pub fn check(&self, type_name: &'static str, array: &OrderedPrimitiveArray) -> Result<(), CodecError> {
        if array.element_type() != self.element {
            return Err(CodecError::malformed(
                type_name,
                format!(
                    "expected {} elements, found {}",
                    self.element,
                    array.element_type()
                ),
            ));
        }
        if let Length::Fixed(expected) = self.length {
            if array.len() != expected {
                return Err(CodecError::malformed(
                    type_name,
                    format!("expected {} elements, found {}", expected, array.len()),
                ));
            }
        }
        Ok(())
    }
}

/// A value type stored through an ordered primitive array.
///
/// `decompose` must be pure and total. `recompose` must reject any array
/// that does not match [`Bridged::SHAPE`] or the type's value domain, and
/// `recompose(&v.decompose())` must reproduce `v` exactly.
pub trait Bridged: Sized {
    /// Name used in error messages.
    const TYPE_NAME: &'static str;

    /// The stored shape.
    const SHAPE: Shape;

    fn decompose(&self) -> OrderedPrimitiveArray;

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError>;
}

/// Check the shape of `array` for `T` and return its doubles.
pub fn doubles<T: Bridged>(array: &OrderedPrimitiveArray) -> Result<&[f64], CodecError> {
    T::SHAPE.check(T::TYPE_NAME, array)?;
    array
        .as_doubles()
        .ok_or_else(|| CodecError::malformed(T::TYPE_NAME, "expected double elements"))
}

/// Check the shape of `array` for `T` and return its integers.
pub fn ints<T: Bridged>(array: &OrderedPrimitiveArray) -> Result<&[i64], CodecError> {
    T::SHAPE.check(T::TYPE_NAME, array)?;
    array
        .as_ints()
        .ok_or_else(|| CodecError::malformed(T::TYPE_NAME, "expected int elements"))
}

const NANOS_PER_SEC: i64 = 1_000_000_000;

// Seconds are stored as the i64 bit pattern of the u64 so every Duration fits.
impl Bridged for Duration {
    const TYPE_NAME: &'static str = "Duration";
    const SHAPE: Shape = Shape::fixed(ElementType::Int, 2);

    fn decompose(&self) -> OrderedPrimitiveArray {
        OrderedPrimitiveArray::from([self.as_secs() as i64, i64::from(self.subsec_nanos())])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let parts = ints::<Self>(array)?;
        let nanos = parts[1];
        if !(0..NANOS_PER_SEC).contains(&nanos) {
            return Err(CodecError::malformed(
                Self::TYPE_NAME,
                format!("nanoseconds out of range: {}", nanos),
            ));
        }
        Ok(Duration::new(parts[0] as u64, nanos as u32))
    }
}

impl Bridged for SystemTime {
    const TYPE_NAME: &'static str = "SystemTime";
    const SHAPE: Shape = Shape::fixed(ElementType::Int, 2);

    fn decompose(&self) -> OrderedPrimitiveArray {
        // [secs, nanos] with secs floored, so nanos is always non-negative.
        let (secs, nanos) = match self.duration_since(UNIX_EPOCH) {
            Ok(after) => (after.as_secs() as i64, i64::from(after.subsec_nanos())),
            Err(err) => {
                let before = err.duration();
                // 2^63 s before the epoch wraps to i64::MIN, which is exact.
                let secs = (before.as_secs() as i64).wrapping_neg();
                match before.subsec_nanos() {
                    0 => (secs, 0),
                    n => (secs - 1, NANOS_PER_SEC - i64::from(n)),
                }
            }
        };
        OrderedPrimitiveArray::from([secs, nanos])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let parts = ints::<Self>(array)?;
        let (secs, nanos) = (parts[0], parts[1]);
        if !(0..NANOS_PER_SEC).contains(&nanos) {
            return Err(CodecError::malformed(
                Self::TYPE_NAME,
                format!("nanoseconds out of range: {}", nanos),
            ));
        }
        let time = if secs >= 0 {
            UNIX_EPOCH.checked_add(Duration::new(secs as u64, nanos as u32))
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(secs.unsigned_abs()))
                .and_then(|t| t.checked_add(Duration::from_nanos(nanos as u64)))
        };
        time.ok_or_else(|| CodecError::malformed(Self::TYPE_NAME, "time not representable on this platform"))
    }
}

impl Bridged for PathBuf {
    const TYPE_NAME: &'static str = "PathBuf";
    const SHAPE: Shape = Shape::fixed(ElementType::Text, 1);

    fn decompose(&self) -> OrderedPrimitiveArray {
        let text = match self.to_str() {
            Some(text) => text.to_string(),
            None => {
                tracing::warn!(path = ?self, "path is not valid unicode, storing lossy form");
                self.to_string_lossy().into_owned()
            }
        };
        OrderedPrimitiveArray::Text(vec![text])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        Self::SHAPE.check(Self::TYPE_NAME, array)?;
        array
            .text(0)
            .map(PathBuf::from)
            .ok_or_else(|| CodecError::malformed(Self::TYPE_NAME, "expected text element"))
    }
}
