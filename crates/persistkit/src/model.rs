//! The persisted object protocol.

use persistkit_core::{CodecError, FieldValue, KeyValue, Record};
use persistkit_store::{StoreError, StoreHandle};

use crate::error::{PersistError, Result};

/// A type that can be stored as an object.
///
/// A model names its type, optionally names the field that holds its
/// primary key, and converts to and from a [`Record`]. Bridged fields go
/// through [`Record::with_bridged`] and [`Record::bridged`].
///
/// ```rust
/// use persistkit::{CodecError, Model, Record};
///
/// struct Note {
///     id: i64,
///     title: String,
/// }
///
/// impl Model for Note {
///     const TYPE_NAME: &'static str = "Note";
///     const PRIMARY_KEY: Option<&'static str> = Some("id");
///
///     fn to_record(&self) -> Record {
///         Record::new().with("id", self.id).with("title", self.title.as_str())
///     }
///
///     fn from_record(record: &Record) -> Result<Self, CodecError> {
///         Ok(Note {
///             id: record.int("id")?,
///             title: record.text("title")?.to_string(),
///         })
///     }
/// }
/// ```
pub trait Model: Sized + 'static {
    /// The stored type name. Must be unique within a store.
    const TYPE_NAME: &'static str;

    /// The field holding the primary key, if the type has one.
    const PRIMARY_KEY: Option<&'static str> = None;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> std::result::Result<Self, CodecError>;

    /// The store this type lives in. Defaults to [`StoreHandle::shared`].
    fn handle() -> std::result::Result<StoreHandle, StoreError> {
        StoreHandle::shared()
    }
}

/// Extract the primary key of `M` from a record. `None` for keyless types.
pub fn key_value<M: Model>(record: &Record) -> Result<Option<KeyValue>> {
    let Some(field) = M::PRIMARY_KEY else {
        return Ok(None);
    };
    match record.get(field) {
        Some(FieldValue::Int(v)) => Ok(Some(KeyValue::Int(*v))),
        Some(FieldValue::Text(v)) => Ok(Some(KeyValue::Text(v.clone()))),
        _ => Err(PersistError::MissingKeyValue {
            type_name: M::TYPE_NAME,
            field,
        }),
    }
}

/// The primary key of `M`, failing with `NoPrimaryKey` for keyless types.
pub(crate) fn required_key<M: Model>(record: &Record) -> Result<KeyValue> {
    key_value::<M>(record)?.ok_or(PersistError::NoPrimaryKey {
        type_name: M::TYPE_NAME,
    })
}

pub(crate) fn require_primary_key<M: Model>() -> Result<&'static str> {
    M::PRIMARY_KEY.ok_or(PersistError::NoPrimaryKey {
        type_name: M::TYPE_NAME,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Keyed;
    struct Keyless;

    impl Model for Keyed {
        const TYPE_NAME: &'static str = "Keyed";
        const PRIMARY_KEY: Option<&'static str> = Some("code");

        fn to_record(&self) -> Record {
            Record::new()
        }

        fn from_record(_: &Record) -> std::result::Result<Self, CodecError> {
            Ok(Keyed)
        }
    }

    impl Model for Keyless {
        const TYPE_NAME: &'static str = "Keyless";

        fn to_record(&self) -> Record {
            Record::new()
        }

        fn from_record(_: &Record) -> std::result::Result<Self, CodecError> {
            Ok(Keyless)
        }
    }

    #[test]
    fn test_key_extraction() {
        let record = Record::new().with("code", "ab");
        assert_eq!(key_value::<Keyed>(&record).unwrap(), Some(KeyValue::from("ab")));
        let record = Record::new().with("code", 3);
        assert_eq!(required_key::<Keyed>(&record).unwrap(), KeyValue::from(3));
        assert_eq!(key_value::<Keyless>(&record).unwrap(), None);
    }

    #[test]
    fn test_bad_key_values() {
        for record in [
            Record::new(),
            Record::new().with("code", 1.5),
            Record::new().with("code", None::<i64>),
        ] {
            assert!(matches!(
                key_value::<Keyed>(&record),
                Err(PersistError::MissingKeyValue { field: "code", .. })
            ));
        }
    }

    #[test]
    fn test_keyless_requirements() {
        assert!(matches!(
            required_key::<Keyless>(&Record::new()),
            Err(PersistError::NoPrimaryKey { type_name: "Keyless" })
        ));
        assert!(require_primary_key::<Keyless>().is_err());
        assert_eq!(require_primary_key::<Keyed>().unwrap(), "code");
    }
}
