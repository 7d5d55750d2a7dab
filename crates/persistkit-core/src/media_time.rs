//! Rational time values: a count of ticks at a timescale.

use serde::{Deserialize, Serialize};

use crate::array::{ElementType, OrderedPrimitiveArray};
use crate::bridge::{ints, Bridged, Shape};
use crate::error::CodecError;

/// A time expressed as `value / timescale` seconds.
///
/// Keeping the pair instead of a float preserves frame-accurate times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    pub fn seconds(&self) -> f64 {
        self.value as f64 / f64::from(self.timescale)
    }
}

impl Bridged for MediaTime {
    const TYPE_NAME: &'static str = "MediaTime";
    const SHAPE: Shape = Shape::fixed(ElementType::Int, 2);

    fn decompose(&self) -> OrderedPrimitiveArray {
        OrderedPrimitiveArray::from([self.value, i64::from(self.timescale)])
    }

    fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
        let v = ints::<Self>(array)?;
        let timescale = i32::try_from(v[1])
            .ok()
            .filter(|scale| *scale > 0)
            .ok_or_else(|| {
                CodecError::malformed(Self::TYPE_NAME, format!("invalid timescale: {}", v[1]))
            })?;
        Ok(MediaTime::new(v[0], timescale))
    }
}
