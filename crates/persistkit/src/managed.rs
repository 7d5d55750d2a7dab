//! Persisted objects.

use std::fmt;
use std::ops::Deref;

use persistkit_core::{KeyValue, ObjectId};
use persistkit_store::{RawObject, StoreError, StoreHandle, WriteTxn};

use crate::error::{PersistError, Result};
use crate::model::{self, Model};

/// A model value that lives in a store.
///
/// Carries the store identity of the object and the handle it belongs to.
/// The value is a snapshot: it changes only through [`Managed::edit`] and
/// [`Managed::refresh`].
pub struct Managed<M> {
    id: ObjectId,
    handle: StoreHandle,
    value: M,
}

impl<M: Model> Managed<M> {
    pub(crate) fn new(id: ObjectId, handle: StoreHandle, value: M) -> Self {
        Self { id, handle, value }
    }

    pub(crate) fn from_raw(raw: &RawObject, handle: &StoreHandle) -> Result<Self> {
        let value = M::from_record(&raw.record)?;
        Ok(Self::new(raw.id, handle.clone(), value))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub fn into_inner(self) -> M {
        self.value
    }

    /// The object's primary key, `None` for keyless types.
    pub fn key(&self) -> Result<Option<KeyValue>> {
        model::key_value::<M>(&self.value.to_record())
    }

    /// Whether the object is still in the store.
    pub fn exists(&self) -> Result<bool> {
        let id = self.id;
        Ok(self.handle.read(|view| view.find_by_id(id))?.is_some())
    }

    /// Reload the value from the store.
    pub fn refresh(&mut self) -> Result<()> {
        let id = self.id;
        let raw = self
            .handle
            .read(|view| view.find_by_id(id))?
            .ok_or(PersistError::Invalidated {
                type_name: M::TYPE_NAME,
                id,
            })?;
        self.value = M::from_record(&raw.record)?;
        Ok(())
    }

    /// Delete the object. Deleting an already deleted object succeeds.
    pub fn delete(&self) -> Result<()> {
        let id = self.id;
        self.handle.write(|txn| txn.delete_by_id(id).map_err(PersistError::from))?;
        Ok(())
    }

    /// Apply `f` to the stored object inside one write transaction.
    ///
    /// `f` sees the live row, not this snapshot. When `f` fails nothing is
    /// written and this value is left as it was. On success the edited value
    /// replaces it.
    pub fn edit<F, E>(&mut self, f: F) -> std::result::Result<(), E>
    where
        F: FnOnce(&mut M) -> std::result::Result<(), E>,
        E: From<PersistError>,
    {
        let id = self.id;
        let edited = self
            .handle
            .write(|txn| -> std::result::Result<M, EditError<E>> {
                let raw = txn.view().find_by_id(id)?.ok_or(PersistError::Invalidated {
                    type_name: M::TYPE_NAME,
                    id,
                })?;
                apply_edit(txn, &raw, f)
            })
            .map_err(EditError::into_caller)?;
        self.value = edited;
        Ok(())
    }

    /// Queue an edit on the handle's writer thread.
    ///
    /// The object is looked up again by primary key when the job runs. A
    /// keyless type fails here with `NoPrimaryKey`, before anything is queued.
    pub fn edit_async<F, E, C>(&self, f: F, on_complete: C) -> Result<()>
    where
        M: Send,
        F: FnOnce(&mut M) -> std::result::Result<(), E> + Send + 'static,
        E: From<PersistError> + fmt::Display + Send + 'static,
        C: FnOnce(std::result::Result<Managed<M>, E>) + Send + 'static,
    {
        model::require_primary_key::<M>()?;
        let key = model::required_key::<M>(&self.value.to_record())?;
        edit_by_key_async(&self.handle, key, f, on_complete)
    }
}

/// Error of an edit transaction: ours or the caller's.
pub(crate) enum EditError<E> {
    Persist(PersistError),
    Caller(E),
}

impl<E: From<PersistError>> EditError<E> {
    pub(crate) fn into_caller(self) -> E {
        match self {
            EditError::Persist(e) => E::from(e),
            EditError::Caller(e) => e,
        }
    }
}

impl<E> From<StoreError> for EditError<E> {
    fn from(e: StoreError) -> Self {
        EditError::Persist(PersistError::Store(e))
    }
}

impl<E> From<PersistError> for EditError<E> {
    fn from(e: PersistError) -> Self {
        EditError::Persist(e)
    }
}

impl<E: fmt::Display> fmt::Display for EditError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::Persist(e) => e.fmt(f),
            EditError::Caller(e) => e.fmt(f),
        }
    }
}

/// Decode `raw`, run `f` on it and write the result back under the same id.
pub(crate) fn apply_edit<M, F, E>(
    txn: &mut WriteTxn<'_>,
    raw: &RawObject,
    f: F,
) -> std::result::Result<M, EditError<E>>
where
    M: Model,
    F: FnOnce(&mut M) -> std::result::Result<(), E>,
{
    let mut value = M::from_record(&raw.record).map_err(PersistError::from)?;
    f(&mut value).map_err(EditError::Caller)?;

    let record = value.to_record();
    if model::key_value::<M>(&record)? != raw.key {
        return Err(EditError::Persist(PersistError::PrimaryKeyChanged {
            type_name: M::TYPE_NAME,
        }));
    }
    txn.replace(raw.id, &record)?;
    Ok(value)
}

/// Edit the object with `key` inside one write transaction.
pub(crate) fn edit_by_key<M, F, E>(
    handle: &StoreHandle,
    key: &KeyValue,
    f: F,
) -> std::result::Result<Option<Managed<M>>, E>
where
    M: Model,
    F: FnOnce(&mut M) -> std::result::Result<(), E>,
    E: From<PersistError>,
{
    model::require_primary_key::<M>().map_err(E::from)?;
    handle
        .write(|txn| -> std::result::Result<Option<Managed<M>>, EditError<E>> {
            let Some(raw) = txn.view().find_by_key(M::TYPE_NAME, key)? else {
                return Ok(None);
            };
            let value = apply_edit(txn, &raw, f)?;
            Ok(Some(Managed::new(raw.id, handle.clone(), value)))
        })
        .map_err(EditError::into_caller)
}

pub(crate) fn edit_by_key_async<M, F, E, C>(
    handle: &StoreHandle,
    key: KeyValue,
    f: F,
    on_complete: C,
) -> Result<()>
where
    M: Model + Send,
    F: FnOnce(&mut M) -> std::result::Result<(), E> + Send + 'static,
    E: From<PersistError> + fmt::Display + Send + 'static,
    C: FnOnce(std::result::Result<Managed<M>, E>) + Send + 'static,
{
    let store = handle.clone();
    handle.write_async(
        move |txn| -> std::result::Result<(ObjectId, M), EditError<E>> {
            let raw = txn
                .view()
                .find_by_key(M::TYPE_NAME, &key)?
                .ok_or_else(|| PersistError::NotFound {
                    type_name: M::TYPE_NAME,
                    key: key.clone(),
                })?;
            let value = apply_edit(txn, &raw, f)?;
            Ok((raw.id, value))
        },
        move |result| {
            on_complete(
                result
                    .map(|(id, value)| Managed::new(id, store, value))
                    .map_err(EditError::into_caller),
            )
        },
    )?;
    Ok(())
}

impl<M> Deref for Managed<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.value
    }
}

impl<M: Clone> Clone for Managed<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handle: self.handle.clone(),
            value: self.value.clone(),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for Managed<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}
