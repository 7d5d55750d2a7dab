//! Ordered primitive array: the storage shape of a decomposed bridged value.
//!
//! An [`OrderedPrimitiveArray`] holds a sequence of one primitive element
//! type. The backing vector is chosen by element type, so a mixed array
//! cannot be represented at all. Building one from dynamic [`Primitive`]
//! values checks homogeneity up front.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CodecError;

/// Element types the store can hold directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Int,
    Double,
    Text,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Int => "int",
            ElementType::Double => "double",
            ElementType::Text => "text",
        };
        f.write_str(name)
    }
}

/// A single primitive element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Int(i64),
    Double(f64),
    Text(String),
}

impl Primitive {
    /// The element type of this value.
    pub fn element_type(&self) -> ElementType {
        match self {
            Primitive::Int(_) => ElementType::Int,
            Primitive::Double(_) => ElementType::Double,
            Primitive::Text(_) => ElementType::Text,
        }
    }
}

impl From<i64> for Primitive {
    fn from(v: i64) -> Self {
        Primitive::Int(v)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Double(v)
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::Text(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::Text(v.to_string())
    }
}

/// A homogeneous, ordered sequence of primitives.
///
/// Inert by intent: storage and indexed access only. All conversion logic
/// lives in the [`Bridged`](crate::bridge::Bridged) implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderedPrimitiveArray {
    Int(Vec<i64>),
    Double(Vec<f64>),
    Text(Vec<String>),
}

impl OrderedPrimitiveArray {
    /// An empty array of the given element type.
    pub fn empty(element: ElementType) -> Self {
        match element {
            ElementType::Int => OrderedPrimitiveArray::Int(Vec::new()),
            ElementType::Double => OrderedPrimitiveArray::Double(Vec::new()),
            ElementType::Text => OrderedPrimitiveArray::Text(Vec::new()),
        }
    }

    /// Build an array from dynamic primitives, all of which must be `element`.
    ///
    /// Fails on the first element of a different type.
    pub fn from_primitives<I>(element: ElementType, values: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = Primitive>,
    {
        let mut array = Self::empty(element);
        for (index, value) in values.into_iter().enumerate() {
            match (&mut array, value) {
                (OrderedPrimitiveArray::Int(items), Primitive::Int(v)) => items.push(v),
                (OrderedPrimitiveArray::Double(items), Primitive::Double(v)) => items.push(v),
                (OrderedPrimitiveArray::Text(items), Primitive::Text(v)) => items.push(v),
                (_, other) => {
                    return Err(CodecError::MixedElementTypes {
                        expected: element,
                        found: other.element_type(),
                        index,
                    })
                }
            }
        }
        Ok(array)
    }

    /// Build an array from dynamic primitives, taking the element type from
    /// the first value. An empty input is rejected since its type is unknown.
    pub fn try_from_primitives(values: Vec<Primitive>) -> Result<Self, CodecError> {
        let element = values
            .first()
            .map(Primitive::element_type)
            .ok_or_else(|| CodecError::malformed("OrderedPrimitiveArray", "no elements to infer a type from"))?;
        Self::from_primitives(element, values)
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            OrderedPrimitiveArray::Int(_) => ElementType::Int,
            OrderedPrimitiveArray::Double(_) => ElementType::Double,
            OrderedPrimitiveArray::Text(_) => ElementType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OrderedPrimitiveArray::Int(items) => items.len(),
            OrderedPrimitiveArray::Double(items) => items.len(),
            OrderedPrimitiveArray::Text(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element at `index`, if present.
    pub fn get(&self, index: usize) -> Option<Primitive> {
        match self {
            OrderedPrimitiveArray::Int(items) => items.get(index).copied().map(Primitive::Int),
            OrderedPrimitiveArray::Double(items) => {
                items.get(index).copied().map(Primitive::Double)
            }
            OrderedPrimitiveArray::Text(items) => items.get(index).cloned().map(Primitive::Text),
        }
    }

    /// The integer at `index`, or `None` for another element type.
    pub fn int(&self, index: usize) -> Option<i64> {
        self.as_ints().and_then(|items| items.get(index).copied())
    }

    /// The double at `index`, or `None` for another element type.
    pub fn double(&self, index: usize) -> Option<f64> {
        self.as_doubles().and_then(|items| items.get(index).copied())
    }

    /// The string at `index`, or `None` for another element type.
    pub fn text(&self, index: usize) -> Option<&str> {
        self.as_texts()
            .and_then(|items| items.get(index))
            .map(String::as_str)
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            OrderedPrimitiveArray::Int(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            OrderedPrimitiveArray::Double(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            OrderedPrimitiveArray::Text(items) => Some(items),
            _ => None,
        }
    }

    /// Iterate the elements as dynamic primitives.
    pub fn iter(&self) -> impl Iterator<Item = Primitive> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

impl From<Vec<i64>> for OrderedPrimitiveArray {
    fn from(items: Vec<i64>) -> Self {
        OrderedPrimitiveArray::Int(items)
    }
}

impl From<Vec<f64>> for OrderedPrimitiveArray {
    fn from(items: Vec<f64>) -> Self {
        OrderedPrimitiveArray::Double(items)
    }
}

impl From<Vec<String>> for OrderedPrimitiveArray {
    fn from(items: Vec<String>) -> Self {
        OrderedPrimitiveArray::Text(items)
    }
}

impl<const N: usize> From<[i64; N]> for OrderedPrimitiveArray {
    fn from(items: [i64; N]) -> Self {
        OrderedPrimitiveArray::Int(items.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for OrderedPrimitiveArray {
    fn from(items: [f64; N]) -> Self {
        OrderedPrimitiveArray::Double(items.to_vec())
    }
}

impl From<&[i64]> for OrderedPrimitiveArray {
    fn from(items: &[i64]) -> Self {
        OrderedPrimitiveArray::Int(items.to_vec())
    }
}

impl From<&[f64]> for OrderedPrimitiveArray {
    fn from(items: &[f64]) -> Self {
        OrderedPrimitiveArray::Double(items.to_vec())
    }
}

impl FromIterator<i64> for OrderedPrimitiveArray {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        OrderedPrimitiveArray::Int(iter.into_iter().collect())
    }
}

impl FromIterator<f64> for OrderedPrimitiveArray {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        OrderedPrimitiveArray::Double(iter.into_iter().collect())
    }
}

impl FromIterator<String> for OrderedPrimitiveArray {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        OrderedPrimitiveArray::Text(iter.into_iter().collect())
    }
}

impl TryFrom<Vec<Primitive>> for OrderedPrimitiveArray {
    type Error = CodecError;

    fn try_from(values: Vec<Primitive>) -> Result<Self, Self::Error> {
        Self::try_from_primitives(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_construction() {
        let array = OrderedPrimitiveArray::from([1.5, -2.0]);
        assert_eq!(array.element_type(), ElementType::Double);
        assert_eq!(array.len(), 2);
        assert_eq!(array.double(1), Some(-2.0));
        assert_eq!(array.int(0), None);
        assert_eq!(array.get(2), None);
    }

    #[test]
    fn test_mixed_elements_rejected_at_construction() {
        let err = OrderedPrimitiveArray::from_primitives(
            ElementType::Int,
            vec![Primitive::Int(1), Primitive::Text("x".into()), Primitive::Int(3)],
        )
        .unwrap_err();

        assert_eq!(
            err,
            CodecError::MixedElementTypes {
                expected: ElementType::Int,
                found: ElementType::Text,
                index: 1,
            }
        );
    }

    #[test]
    fn test_infer_element_type() {
        let array: OrderedPrimitiveArray =
            vec![Primitive::from("a"), Primitive::from("b")].try_into().unwrap();
        assert_eq!(array.text(1), Some("b"));

        let mixed: Result<OrderedPrimitiveArray, _> =
            vec![Primitive::Double(1.0), Primitive::Int(1)].try_into();
        assert!(matches!(mixed, Err(CodecError::MixedElementTypes { index: 1, .. })));

        let empty: Result<OrderedPrimitiveArray, _> = Vec::<Primitive>::new().try_into();
        assert!(empty.is_err());
    }

    #[test]
    fn test_iter_preserves_order() {
        let array: OrderedPrimitiveArray = (0..4i64).rev().collect();
        let items: Vec<_> = array.iter().collect();
        assert_eq!(
            items,
            vec![
                Primitive::Int(3),
                Primitive::Int(2),
                Primitive::Int(1),
                Primitive::Int(0)
            ]
        );
    }

    #[test]
    fn test_empty_array_keeps_type() {
        let array = OrderedPrimitiveArray::from_primitives(ElementType::Text, Vec::new()).unwrap();
        assert!(array.is_empty());
        assert_eq!(array.element_type(), ElementType::Text);
    }
}
