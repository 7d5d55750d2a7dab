//! Object operations against an explicit store handle.
//!
//! These are the operations behind [`ObjectAccess`](crate::ObjectAccess)
//! and [`BatchAccess`](crate::BatchAccess), with the store passed in rather
//! than taken from [`Model::handle`]. Each call is one transaction.

use std::fmt;

use persistkit_core::{KeyValue, ObjectId, Predicate};
use persistkit_store::{NotificationToken, StoreError, StoreHandle};

use crate::error::{PersistError, Result};
use crate::managed::{self, Managed};
use crate::model::{self, Model};
use crate::observe::{self, Change};
use crate::results::Results;

/// All objects of `M`, in store order.
pub fn fetch_all<M: Model>(handle: &StoreHandle) -> Results<M> {
    Results::all(handle)
}

/// The objects of `M` matching `predicate`. The predicate is validated here.
pub fn fetch_all_where<M: Model>(handle: &StoreHandle, predicate: Predicate) -> Result<Results<M>> {
    Results::filtered(handle, predicate)
}

/// The object of `M` with primary key `key`.
pub fn find<M: Model>(handle: &StoreHandle, key: impl Into<KeyValue>) -> Result<Option<Managed<M>>> {
    model::require_primary_key::<M>()?;
    let key = key.into();
    handle
        .read(|view| view.find_by_key(M::TYPE_NAME, &key))?
        .map(|raw| Managed::from_raw(&raw, handle))
        .transpose()
}

/// Insert `value` as a new object. A colliding primary key fails with `DuplicateKey`.
pub fn add<M: Model>(handle: &StoreHandle, value: M) -> Result<Managed<M>> {
    let record = value.to_record();
    let key = model::key_value::<M>(&record)?;
    let id = handle.write(|txn| txn.insert(M::TYPE_NAME, key.as_ref(), &record))?;
    Ok(Managed::new(id, handle.clone(), value))
}

/// Insert `value`, or merge it into the stored object with the same key.
///
/// A merged object keeps its identity. Keyless types fail with `NoPrimaryKey`.
pub fn update<M: Model>(handle: &StoreHandle, value: M) -> Result<Managed<M>> {
    let record = value.to_record();
    let key = model::required_key::<M>(&record)?;
    let id = handle.write(|txn| txn.upsert(M::TYPE_NAME, &key, &record))?;
    Ok(Managed::new(id, handle.clone(), value))
}

/// Queue an [`update`] of `value` on the handle's writer thread.
///
/// `value` is captured as it is now. Keyless types fail here with
/// `NoPrimaryKey` and nothing is queued; later failures reach `on_complete`.
pub fn update_async<M, C>(handle: &StoreHandle, value: &M, on_complete: C) -> Result<()>
where
    M: Model,
    C: FnOnce(Result<ObjectId>) + Send + 'static,
{
    let record = value.to_record();
    let key = model::required_key::<M>(&record)?;
    handle.write_async(
        move |txn| txn.upsert(M::TYPE_NAME, &key, &record).map_err(PersistError::from),
        on_complete,
    )?;
    Ok(())
}

/// Edit the stored object of `M` with primary key `key`.
///
/// `f` runs inside the transaction on the live object. Returns `None`
/// when no object has the key.
pub fn edit<M, F, E>(handle: &StoreHandle, key: impl Into<KeyValue>, f: F) -> std::result::Result<Option<Managed<M>>, E>
where
    M: Model,
    F: FnOnce(&mut M) -> std::result::Result<(), E>,
    E: From<PersistError>,
{
    managed::edit_by_key(handle, &key.into(), f)
}

/// Queue an [`edit`] on the handle's writer thread. A missing object
/// reaches `on_complete` as `NotFound`.
pub fn edit_async<M, F, E, C>(handle: &StoreHandle, key: impl Into<KeyValue>, f: F, on_complete: C) -> Result<()>
where
    M: Model + Send,
    F: FnOnce(&mut M) -> std::result::Result<(), E> + Send + 'static,
    E: From<PersistError> + fmt::Display + Send + 'static,
    C: FnOnce(std::result::Result<Managed<M>, E>) + Send + 'static,
{
    model::require_primary_key::<M>()?;
    managed::edit_by_key_async(handle, key.into(), f, on_complete)
}

/// Delete the stored object with the same primary key as `value`.
///
/// Keyless values are never persisted by value, so this is a no-op for
/// them; delete through [`Managed::delete`] instead. A missing object is
/// not an error.
pub fn delete<M: Model>(handle: &StoreHandle, value: &M) -> Result<()> {
    let Some(key) = model::key_value::<M>(&value.to_record())? else {
        tracing::debug!(type_name = M::TYPE_NAME, "delete by value of keyless type ignored");
        return Ok(());
    };
    handle.write(|txn| txn.delete_by_key(M::TYPE_NAME, &key))?;
    Ok(())
}

/// Delete `object` from `handle`. A missing object is not an error.
pub fn delete_managed<M: Model>(handle: &StoreHandle, object: &Managed<M>) -> Result<()> {
    let id = object.id();
    handle.write(|txn| txn.delete_by_id(id))?;
    Ok(())
}

/// Delete every object of `M` in one transaction.
pub fn delete_all<M: Model>(handle: &StoreHandle) -> Result<usize> {
    let removed = handle.write(|txn| txn.delete_type(M::TYPE_NAME))?;
    tracing::debug!(type_name = M::TYPE_NAME, removed, "deleted all objects of type");
    Ok(removed)
}

/// Observe the objects of `M`. See [`Change`].
pub fn observe<M, F>(handle: &StoreHandle, callback: F) -> Result<NotificationToken>
where
    M: Model,
    F: FnMut(Result<Change<M>>) + Send + 'static,
{
    observe::observe(handle, callback)
}

/// Insert every value in one transaction. Any failure leaves the store unchanged.
pub fn add_batch<M: Model>(handle: &StoreHandle, values: Vec<M>) -> Result<Vec<Managed<M>>> {
    let records = values
        .iter()
        .map(|value| {
            let record = value.to_record();
            Ok((model::key_value::<M>(&record)?, record))
        })
        .collect::<Result<Vec<_>>>()?;

    let ids = handle.write(|txn| {
        records
            .iter()
            .map(|(key, record)| txn.insert(M::TYPE_NAME, key.as_ref(), record))
            .collect::<std::result::Result<Vec<_>, StoreError>>()
    })?;
    tracing::debug!(type_name = M::TYPE_NAME, count = ids.len(), "batch added");
    Ok(managed_all(handle, ids, values))
}

/// Upsert every value in one transaction. Keyless types fail with
/// `NoPrimaryKey` before the transaction opens.
pub fn update_batch<M: Model>(handle: &StoreHandle, values: Vec<M>) -> Result<Vec<Managed<M>>> {
    let records = keyed_records(&values)?;
    let ids = upsert_all::<M>(handle, records)?;
    tracing::debug!(type_name = M::TYPE_NAME, count = ids.len(), "batch updated");
    Ok(managed_all(handle, ids, values))
}

/// Queue an [`update_batch`] on the handle's writer thread.
pub fn update_batch_async<M, C>(handle: &StoreHandle, values: &[M], on_complete: C) -> Result<()>
where
    M: Model,
    C: FnOnce(Result<Vec<ObjectId>>) + Send + 'static,
{
    let records = keyed_records(values)?;
    handle.write_async(
        move |txn| {
            records
                .iter()
                .map(|(key, record)| txn.upsert(M::TYPE_NAME, key, record))
                .collect::<std::result::Result<Vec<_>, StoreError>>()
                .map_err(PersistError::from)
        },
        on_complete,
    )?;
    Ok(())
}

/// Delete the stored objects sharing a primary key with any of `values`.
/// Keyless values are skipped.
pub fn delete_batch<M: Model>(handle: &StoreHandle, values: &[M]) -> Result<()> {
    let mut keys = Vec::with_capacity(values.len());
    for value in values {
        if let Some(key) = model::key_value::<M>(&value.to_record())? {
            keys.push(key);
        }
    }
    if keys.is_empty() {
        return Ok(());
    }
    handle.write(|txn| {
        keys.iter()
            .try_for_each(|key| txn.delete_by_key(M::TYPE_NAME, key).map(drop))
    })?;
    Ok(())
}

/// Delete `objects` from `handle` in one transaction.
pub fn delete_managed_batch<M: Model>(handle: &StoreHandle, objects: &[Managed<M>]) -> Result<()> {
    let ids: Vec<ObjectId> = objects.iter().map(Managed::id).collect();
    delete_ids(handle, &ids)
}

pub(crate) fn delete_ids(handle: &StoreHandle, ids: &[ObjectId]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    handle.write(|txn| ids.iter().try_for_each(|id| txn.delete_by_id(*id).map(drop)))?;
    Ok(())
}

fn keyed_records<M: Model>(values: &[M]) -> Result<Vec<(KeyValue, persistkit_core::Record)>> {
    model::require_primary_key::<M>()?;
    values
        .iter()
        .map(|value| {
            let record = value.to_record();
            Ok((model::required_key::<M>(&record)?, record))
        })
        .collect()
}

fn upsert_all<M: Model>(handle: &StoreHandle, records: Vec<(KeyValue, persistkit_core::Record)>) -> Result<Vec<ObjectId>> {
    let ids = handle.write(|txn| {
        records
            .iter()
            .map(|(key, record)| txn.upsert(M::TYPE_NAME, key, record))
            .collect::<std::result::Result<Vec<_>, StoreError>>()
    })?;
    Ok(ids)
}

fn managed_all<M: Model>(handle: &StoreHandle, ids: Vec<ObjectId>, values: Vec<M>) -> Vec<Managed<M>> {
    ids.into_iter()
        .zip(values)
        .map(|(id, value)| Managed::new(id, handle.clone(), value))
        .collect()
}
