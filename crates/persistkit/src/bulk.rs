//! Batch operations over collections of models.
//!
//! Each batch runs as one transaction: either every element is written or
//! none is.

use persistkit_core::ObjectId;
use persistkit_store::StoreHandle;

use crate::access;
use crate::error::Result;
use crate::managed::Managed;
use crate::model::Model;

/// Batch writes for a vector of model values, against [`Model::handle`].
pub trait BatchAccess<M: Model> {
    /// Insert every value. A colliding primary key rejects the whole batch.
    fn add_batch(self) -> Result<Vec<Managed<M>>>;

    /// Upsert every value. Keyless types fail with `NoPrimaryKey` up front.
    fn update_batch(self) -> Result<Vec<Managed<M>>>;

    fn update_batch_async<C>(&self, on_complete: C) -> Result<()>
    where
        C: FnOnce(Result<Vec<ObjectId>>) + Send + 'static;

    /// Delete the stored objects with these primary keys.
    fn delete_batch(&self) -> Result<()>;
}

impl<M: Model> BatchAccess<M> for Vec<M> {
    fn add_batch(self) -> Result<Vec<Managed<M>>> {
        access::add_batch(&M::handle()?, self)
    }

    fn update_batch(self) -> Result<Vec<Managed<M>>> {
        access::update_batch(&M::handle()?, self)
    }

    fn update_batch_async<C>(&self, on_complete: C) -> Result<()>
    where
        C: FnOnce(Result<Vec<ObjectId>>) + Send + 'static,
    {
        access::update_batch_async(&M::handle()?, self, on_complete)
    }

    fn delete_batch(&self) -> Result<()> {
        access::delete_batch(&M::handle()?, self)
    }
}

/// Batch deletion of managed objects.
pub trait ManagedBatch {
    /// Delete every object, one transaction per store.
    fn delete_managed(&self) -> Result<()>;
}

impl<M: Model> ManagedBatch for [Managed<M>] {
    fn delete_managed(&self) -> Result<()> {
        let mut groups: Vec<(&StoreHandle, Vec<ObjectId>)> = Vec::new();
        for object in self {
            match groups.iter_mut().find(|(handle, _)| handle.ptr_eq(object.handle())) {
                Some((_, ids)) => ids.push(object.id()),
                None => groups.push((object.handle(), vec![object.id()])),
            }
        }
        for (handle, ids) in groups {
            access::delete_ids(handle, &ids)?;
        }
        Ok(())
    }
}
