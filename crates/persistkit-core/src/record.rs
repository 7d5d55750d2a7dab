//! Field records: the stored form of a persisted object.
//!
//! A [`Record`] maps field names to [`FieldValue`]s. Only primitives,
//! ordered primitive arrays and embedded records appear here. Bridged
//! values enter and leave through [`Record::with_bridged`] and
//! [`Record::bridged`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::array::OrderedPrimitiveArray;
use crate::bridge::Bridged;
use crate::error::CodecError;

/// A single stored field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Array(OrderedPrimitiveArray),
    Embedded(Record),
}

impl FieldValue {
    /// A short name for the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Double(_) => "double",
            FieldValue::Text(_) => "text",
            FieldValue::Array(_) => "array",
            FieldValue::Embedded(_) => "embedded",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Store a bridged value as its decomposed array.
    pub fn bridged<T: Bridged>(value: &T) -> Self {
        FieldValue::Array(value.decompose())
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<OrderedPrimitiveArray> for FieldValue {
    fn from(v: OrderedPrimitiveArray) -> Self {
        FieldValue::Array(v)
    }
}

impl From<Record> for FieldValue {
    fn from(v: Record) -> Self {
        FieldValue::Embedded(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Named fields of one object, in name order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Builder-style insertion of a bridged value.
    pub fn with_bridged<T: Bridged>(self, name: impl Into<String>, value: &T) -> Self {
        self.with(name, FieldValue::bridged(value))
    }

    /// Builder-style insertion of an optional bridged value (`None` stores null).
    pub fn with_optional_bridged<T: Bridged>(self, name: impl Into<String>, value: Option<&T>) -> Self {
        let value = value.map(FieldValue::bridged).unwrap_or(FieldValue::Null);
        self.with(name, value)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Resolve a dotted path such as `"frame.origin"` through embedded records.
    pub fn get_path(&self, path: &str) -> Option<&FieldValue> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            match current {
                FieldValue::Embedded(inner) => current = inner.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&FieldValue, CodecError> {
        self.get(name)
            .ok_or_else(|| CodecError::MissingField(name.to_string()))
    }

    fn mismatch(name: &str, expected: &'static str, found: &FieldValue) -> CodecError {
        CodecError::FieldType {
            field: name.to_string(),
            expected,
            found: found.kind(),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, CodecError> {
        match self.require(name)? {
            FieldValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(name, "bool", other)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, CodecError> {
        match self.require(name)? {
            FieldValue::Int(v) => Ok(*v),
            other => Err(Self::mismatch(name, "int", other)),
        }
    }

    pub fn double(&self, name: &str) -> Result<f64, CodecError> {
        match self.require(name)? {
            FieldValue::Double(v) => Ok(*v),
            other => Err(Self::mismatch(name, "double", other)),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, CodecError> {
        match self.require(name)? {
            FieldValue::Text(v) => Ok(v),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    pub fn array(&self, name: &str) -> Result<&OrderedPrimitiveArray, CodecError> {
        match self.require(name)? {
            FieldValue::Array(v) => Ok(v),
            other => Err(Self::mismatch(name, "array", other)),
        }
    }

    pub fn embedded(&self, name: &str) -> Result<&Record, CodecError> {
        match self.require(name)? {
            FieldValue::Embedded(v) => Ok(v),
            other => Err(Self::mismatch(name, "embedded", other)),
        }
    }

    /// Read a bridged value, validating its stored shape.
    pub fn bridged<T: Bridged>(&self, name: &str) -> Result<T, CodecError> {
        T::recompose(self.array(name)?)
    }

    /// `None` for a missing or null field.
    pub fn optional_int(&self, name: &str) -> Result<Option<i64>, CodecError> {
        match self.get(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(_) => self.int(name).map(Some),
        }
    }

    /// `None` for a missing or null field.
    pub fn optional_text(&self, name: &str) -> Result<Option<&str>, CodecError> {
        match self.get(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(_) => self.text(name).map(Some),
        }
    }

    /// `None` for a missing or null field.
    pub fn optional_bridged<T: Bridged>(&self, name: &str) -> Result<Option<T>, CodecError> {
        match self.get(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(_) => self.bridged(name).map(Some),
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_size::{CountStyle, DataSize};
    use crate::geometry::{Point, Rect};

    fn sample() -> Record {
        Record::new()
            .with("title", "draft")
            .with("count", 3)
            .with("ratio", 0.5)
            .with("done", false)
            .with("note", None::<String>)
            .with_bridged("frame", &Rect::new(0.0, 0.0, 10.0, 20.0))
            .with("meta", Record::new().with("origin", FieldValue::bridged(&Point::new(1.0, 2.0))))
    }

    #[test]
    fn test_typed_readers() {
        let record = sample();
        assert_eq!(record.text("title").unwrap(), "draft");
        assert_eq!(record.int("count").unwrap(), 3);
        assert_eq!(record.double("ratio").unwrap(), 0.5);
        assert!(!record.bool("done").unwrap());
        assert_eq!(record.optional_text("note").unwrap(), None);
        assert_eq!(record.optional_int("absent").unwrap(), None);
        assert_eq!(
            record.bridged::<Rect>("frame").unwrap(),
            Rect::new(0.0, 0.0, 10.0, 20.0)
        );
    }

    #[test]
    fn test_reader_errors() {
        let record = sample();
        assert_eq!(
            record.int("missing").unwrap_err(),
            CodecError::MissingField("missing".into())
        );
        assert!(matches!(
            record.int("title"),
            Err(CodecError::FieldType { expected: "int", found: "text", .. })
        ));
        assert!(matches!(
            record.bridged::<DataSize>("frame"),
            Err(CodecError::MalformedBridgedValue { type_name: "DataSize", .. })
        ));
    }

    #[test]
    fn test_get_path_through_embedded() {
        let record = sample();
        assert!(matches!(record.get_path("meta.origin"), Some(FieldValue::Array(_))));
        assert!(record.get_path("meta.missing").is_none());
        assert!(record.get_path("title.inner").is_none());
    }

    #[test]
    fn test_optional_bridged() {
        let record = Record::new()
            .with_optional_bridged("size", Some(&DataSize::new(10, CountStyle::Memory)))
            .with_optional_bridged::<DataSize>("other", None);
        assert_eq!(
            record.optional_bridged::<DataSize>("size").unwrap(),
            Some(DataSize::new(10, CountStyle::Memory))
        );
        assert_eq!(record.optional_bridged::<DataSize>("other").unwrap(), None);
    }

    #[test]
    fn test_cbor_encoding_is_lossless() {
        let record = sample().with("edge", f64::MIN_POSITIVE).with("big", i64::MIN);
        let mut buf = Vec::new();
        ciborium::into_writer(&record, &mut buf).unwrap();
        let back: Record = ciborium::from_reader(&buf[..]).unwrap();
        assert_eq!(back, record);
    }
}
