//! Per-type object operations bound to the type's own store.

use persistkit_core::{KeyValue, ObjectId, Predicate};
use persistkit_store::NotificationToken;

use crate::access;
use crate::error::Result;
use crate::managed::Managed;
use crate::model::Model;
use crate::observe::Change;
use crate::results::Results;

/// Object operations for every [`Model`], using [`Model::handle`].
///
/// Use the functions in [`access`](crate::access) to run the same
/// operations against another store.
pub trait ObjectAccess: Model {
    /// All objects of this type. Reads are live.
    fn fetch_all() -> Result<Results<Self>> {
        Ok(access::fetch_all(&Self::handle()?))
    }

    /// The objects matching `predicate`. A malformed predicate fails here.
    fn fetch_all_where(predicate: Predicate) -> Result<Results<Self>> {
        access::fetch_all_where(&Self::handle()?, predicate)
    }

    fn find(key: impl Into<KeyValue>) -> Result<Option<Managed<Self>>> {
        access::find(&Self::handle()?, key)
    }

    /// Insert as a new object.
    fn add(self) -> Result<Managed<Self>> {
        access::add(&Self::handle()?, self)
    }

    /// Insert, or merge into the object with the same primary key.
    fn update(self) -> Result<Managed<Self>> {
        access::update(&Self::handle()?, self)
    }

    fn update_async<C>(&self, on_complete: C) -> Result<()>
    where
        C: FnOnce(Result<ObjectId>) + Send + 'static,
    {
        access::update_async(&Self::handle()?, self, on_complete)
    }

    /// Delete the object with this value's primary key. No-op for keyless types.
    fn delete(&self) -> Result<()> {
        access::delete(&Self::handle()?, self)
    }

    fn delete_all() -> Result<usize> {
        access::delete_all::<Self>(&Self::handle()?)
    }

    fn observe<F>(callback: F) -> Result<NotificationToken>
    where
        F: FnMut(Result<Change<Self>>) + Send + 'static,
    {
        access::observe(&Self::handle()?, callback)
    }
}

impl<M: Model> ObjectAccess for M {}
