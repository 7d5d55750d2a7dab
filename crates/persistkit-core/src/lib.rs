//! # persistkit core
//!
//! Pure primitives for persistkit: the value-bridge codec, ordered primitive
//! arrays, field records, primary keys and predicates.
//!
//! This crate performs no I/O. It defines the shapes that the store layer
//! writes and the conversions between application values and those shapes.
//!
//! ## Key Types
//!
//! - [`OrderedPrimitiveArray`] - Homogeneous array, the stored shape of a bridged value
//! - [`Bridged`] - Decompose/recompose contract for value types the store cannot hold natively
//! - [`Record`] / [`FieldValue`] - The fields of one persisted object
//! - [`KeyValue`] / [`ObjectId`] - Primary keys and store identity
//! - [`Predicate`] - Field filters for queries
//!
//! ## Bridging a new type
//!
//! ```rust
//! use persistkit_core::{Bridged, CodecError, ElementType, OrderedPrimitiveArray, Shape};
//! use persistkit_core::bridge::doubles;
//!
//! #[derive(Debug, PartialEq)]
//! struct Car {
//!     speed: f64,
//!     price: f64,
//! }
//!
//! impl Bridged for Car {
//!     const TYPE_NAME: &'static str = "Car";
//!     const SHAPE: Shape = Shape::fixed(ElementType::Double, 2);
//!
//!     fn decompose(&self) -> OrderedPrimitiveArray {
//!         OrderedPrimitiveArray::from([self.speed, self.price])
//!     }
//!
//!     fn recompose(array: &OrderedPrimitiveArray) -> Result<Self, CodecError> {
//!         let v = doubles::<Self>(array)?;
//!         Ok(Car { speed: v[0], price: v[1] })
//!     }
//! }
//!
//! let car = Car { speed: 180.0, price: 25_000.0 };
//! assert_eq!(Car::recompose(&car.decompose()).unwrap(), car);
//! ```

pub mod array;
pub mod bridge;
pub mod color;
pub mod data_size;
pub mod error;
pub mod geometry;
pub mod media_time;
pub mod query;
pub mod record;
pub mod types;

pub use array::{ElementType, OrderedPrimitiveArray, Primitive};
pub use bridge::{Bridged, Length, Shape};
pub use color::Color;
pub use data_size::{CountStyle, DataSize};
pub use error::{CodecError, QueryError};
pub use geometry::{Point, Rect, Size};
pub use media_time::MediaTime;
pub use query::{CompareOp, FieldRef, Predicate};
pub use record::{FieldValue, Record};
pub use types::{KeyValue, ObjectId};
