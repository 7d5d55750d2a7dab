//! Read views and write transactions over the object table.
//!
//! Every mutation goes through [`WriteTxn`], which wraps a SQLite
//! transaction. Dropping a `WriteTxn` without committing rolls back.

use std::collections::BTreeSet;

use persistkit_core::{KeyValue, ObjectId, Record};
use rusqlite::types::Value;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};

use crate::error::{Result, StoreError};

/// A persisted object as the store sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObject {
    pub id: ObjectId,
    pub type_name: String,
    pub key: Option<KeyValue>,
    pub record: Record,
}

/// A raw object together with the digest of its stored fields.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotRow {
    pub object: RawObject,
    pub digest: [u8; 32],
}

/// Which object types a committed transaction changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Touched {
    #[default]
    Nothing,
    Types(BTreeSet<String>),
    Everything,
}

impl Touched {
    pub fn includes(&self, type_name: &str) -> bool {
        match self {
            Touched::Nothing => false,
            Touched::Types(types) => types.contains(type_name),
            Touched::Everything => true,
        }
    }

    fn add(&mut self, type_name: &str) {
        match self {
            Touched::Nothing => {
                *self = Touched::Types(BTreeSet::from([type_name.to_string()]));
            }
            Touched::Types(types) => {
                types.insert(type_name.to_string());
            }
            Touched::Everything => {}
        }
    }
}

const SELECT_OBJECT: &str = "SELECT object_id, type_name, primary_key, fields FROM objects";

struct Row {
    id: i64,
    type_name: String,
    key: Value,
    fields: Vec<u8>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok(Row {
        id: row.get(0)?,
        type_name: row.get(1)?,
        key: row.get(2)?,
        fields: row.get(3)?,
    })
}

impl Row {
    fn into_object(self) -> Result<RawObject> {
        let id = ObjectId::from_raw(self.id);
        let key = key_from_sql(id, self.key)?;
        let record = decode_record(id, &self.fields)?;
        Ok(RawObject {
            id,
            type_name: self.type_name,
            key,
            record,
        })
    }
}

pub(crate) fn key_to_sql(key: &KeyValue) -> Value {
    match key {
        KeyValue::Int(v) => Value::Integer(*v),
        KeyValue::Text(v) => Value::Text(v.clone()),
    }
}

fn key_from_sql(id: ObjectId, value: Value) -> Result<Option<KeyValue>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(v) => Ok(Some(KeyValue::Int(v))),
        Value::Text(v) => Ok(Some(KeyValue::Text(v))),
        other => Err(StoreError::CorruptRecord {
            object_id: id,
            reason: format!("unsupported primary key type: {:?}", other.data_type()),
        }),
    }
}

pub(crate) fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf).map_err(|e| StoreError::Encoding(e.to_string()))?;
    Ok(buf)
}

fn decode_record(id: ObjectId, bytes: &[u8]) -> Result<Record> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::CorruptRecord {
        object_id: id,
        reason: e.to_string(),
    })
}

/// Read-only access to the objects in a store.
pub struct ReadView<'a> {
    conn: &'a Connection,
}

impl<'a> ReadView<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All objects of a type in store order.
    pub fn objects_of_type(&self, type_name: &str) -> Result<Vec<RawObject>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{} WHERE type_name = ?1 ORDER BY object_id",
            SELECT_OBJECT
        ))?;
        let rows = stmt
            .query_map(params![type_name], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Row::into_object).collect()
    }

    pub fn find_by_key(&self, type_name: &str, key: &KeyValue) -> Result<Option<RawObject>> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE type_name = ?1 AND primary_key = ?2", SELECT_OBJECT),
                params![type_name, key_to_sql(key)],
                read_row,
            )
            .optional()?;
        row.map(Row::into_object).transpose()
    }

    pub fn find_by_id(&self, id: ObjectId) -> Result<Option<RawObject>> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE object_id = ?1", SELECT_OBJECT),
                params![id.as_raw()],
                read_row,
            )
            .optional()?;
        row.map(Row::into_object).transpose()
    }

    pub fn count(&self, type_name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM objects WHERE type_name = ?1",
            params![type_name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn total_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every type name with at least one stored object.
    pub fn type_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT type_name FROM objects ORDER BY type_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn id_for_key(&self, type_name: &str, key: &KeyValue) -> Result<Option<ObjectId>> {
        let id = self
            .conn
            .query_row(
                "SELECT object_id FROM objects WHERE type_name = ?1 AND primary_key = ?2",
                params![type_name, key_to_sql(key)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(ObjectId::from_raw))
    }

    pub(crate) fn snapshot(&self, type_name: &str) -> Result<Vec<SnapshotRow>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{} WHERE type_name = ?1 ORDER BY object_id",
            SELECT_OBJECT
        ))?;
        let rows = stmt
            .query_map(params![type_name], read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|row| {
                let digest = *blake3::hash(&row.fields).as_bytes();
                Ok(SnapshotRow {
                    object: row.into_object()?,
                    digest,
                })
            })
            .collect()
    }
}

/// An open write transaction.
///
/// Commits only through [`WriteTxn::commit`], which the handle calls when
/// the transaction body returns `Ok`.
pub struct WriteTxn<'a> {
    tx: Transaction<'a>,
    touched: Touched,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(tx: Transaction<'a>) -> Self {
        Self {
            tx,
            touched: Touched::Nothing,
        }
    }

    /// Read access inside the transaction, seeing its uncommitted writes.
    pub fn view(&self) -> ReadView<'_> {
        ReadView::new(&self.tx)
    }

    /// Insert a new object. Insert-only: an existing key is an error.
    pub fn insert(&mut self, type_name: &str, key: Option<&KeyValue>, record: &Record) -> Result<ObjectId> {
        if let Some(key) = key {
            if self.view().id_for_key(type_name, key)?.is_some() {
                return Err(StoreError::DuplicateKey {
                    type_name: type_name.to_string(),
                    key: key.clone(),
                });
            }
        }

        let fields = encode_record(record)?;
        let now = crate::now_millis();
        self.tx
            .execute(
                "INSERT INTO objects (type_name, primary_key, fields, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![type_name, key.map(key_to_sql), fields, now],
            )
            .map_err(|e| match (e.sqlite_error_code(), key) {
                (Some(ErrorCode::ConstraintViolation), Some(key)) => StoreError::DuplicateKey {
                    type_name: type_name.to_string(),
                    key: key.clone(),
                },
                _ => StoreError::from_write(e),
            })?;

        self.touched.add(type_name);
        Ok(ObjectId::from_raw(self.tx.last_insert_rowid()))
    }

    /// Merge `record` into the object with `key`, or insert it if absent.
    ///
    /// An existing object keeps its [`ObjectId`].
    pub fn upsert(&mut self, type_name: &str, key: &KeyValue, record: &Record) -> Result<ObjectId> {
        match self.view().id_for_key(type_name, key)? {
            Some(id) => {
                self.write_fields(id, record)?;
                self.touched.add(type_name);
                Ok(id)
            }
            None => self.insert(type_name, Some(key), record),
        }
    }

    /// Replace the fields of an existing object. Returns false if it is gone.
    pub fn replace(&mut self, id: ObjectId, record: &Record) -> Result<bool> {
        let type_name: Option<String> = self
            .tx
            .query_row(
                "SELECT type_name FROM objects WHERE object_id = ?1",
                params![id.as_raw()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(type_name) = type_name else {
            return Ok(false);
        };
        self.write_fields(id, record)?;
        self.touched.add(&type_name);
        Ok(true)
    }

    fn write_fields(&mut self, id: ObjectId, record: &Record) -> Result<()> {
        let fields = encode_record(record)?;
        self.tx
            .execute(
                "UPDATE objects SET fields = ?1, updated_at = ?2 WHERE object_id = ?3",
                params![fields, crate::now_millis(), id.as_raw()],
            )
            .map_err(StoreError::from_write)?;
        Ok(())
    }

    /// Delete by identity. Deleting a missing object is not an error.
    pub fn delete_by_id(&mut self, id: ObjectId) -> Result<bool> {
        let type_name: Option<String> = self
            .tx
            .query_row(
                "DELETE FROM objects WHERE object_id = ?1 RETURNING type_name",
                params![id.as_raw()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from_write)?;
        match type_name {
            Some(type_name) => {
                self.touched.add(&type_name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete by primary key. Deleting a missing object is not an error.
    pub fn delete_by_key(&mut self, type_name: &str, key: &KeyValue) -> Result<bool> {
        let removed = self
            .tx
            .execute(
                "DELETE FROM objects WHERE type_name = ?1 AND primary_key = ?2",
                params![type_name, key_to_sql(key)],
            )
            .map_err(StoreError::from_write)?;
        if removed > 0 {
            self.touched.add(type_name);
        }
        Ok(removed > 0)
    }

    /// Delete every object of one type.
    pub fn delete_type(&mut self, type_name: &str) -> Result<usize> {
        let removed = self
            .tx
            .execute("DELETE FROM objects WHERE type_name = ?1", params![type_name])
            .map_err(StoreError::from_write)?;
        if removed > 0 {
            self.touched.add(type_name);
        }
        Ok(removed)
    }

    /// Delete every object of every type.
    pub fn delete_everything(&mut self) -> Result<usize> {
        let removed = self
            .tx
            .execute("DELETE FROM objects", [])
            .map_err(StoreError::from_write)?;
        self.touched = Touched::Everything;
        Ok(removed)
    }

    pub fn touched(&self) -> &Touched {
        &self.touched
    }

    pub(crate) fn commit(self) -> Result<Touched> {
        let touched = self.touched;
        self.tx.commit().map_err(|e| match StoreError::from_write(e) {
            StoreError::Database(e) => StoreError::TransactionFailed(e.to_string()),
            other => other,
        })?;
        Ok(touched)
    }
}
