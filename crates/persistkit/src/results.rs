//! Live query results.

use std::fmt;
use std::marker::PhantomData;

use persistkit_core::{Predicate, Record};
use persistkit_store::{RawObject, StoreHandle};

use crate::error::{PersistError, Result};
use crate::managed::Managed;
use crate::model::Model;

/// The objects of one type, optionally filtered by a predicate.
///
/// A `Results` holds no objects itself. Every read goes to the store's
/// current connection, so it always reflects the latest committed state,
/// in store order.
pub struct Results<M> {
    handle: StoreHandle,
    predicate: Option<Predicate>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Results<M> {
    pub(crate) fn all(handle: &StoreHandle) -> Self {
        Self {
            handle: handle.clone(),
            predicate: None,
            _model: PhantomData,
        }
    }

    pub(crate) fn filtered(handle: &StoreHandle, predicate: Predicate) -> Result<Self> {
        Self::all(handle).filter(predicate)
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Narrow the results. Predicates are combined with `and`.
    pub fn filter(&self, predicate: Predicate) -> Result<Self> {
        predicate.validate()?;
        let predicate = match &self.predicate {
            Some(existing) => existing.clone().and(predicate),
            None => predicate,
        };
        Ok(Self {
            handle: self.handle.clone(),
            predicate: Some(predicate),
            _model: PhantomData,
        })
    }

    pub fn len(&self) -> Result<usize> {
        match &self.predicate {
            None => Ok(self.handle.read(|view| view.count(M::TYPE_NAME))?),
            Some(_) => Ok(self.load()?.len()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn to_vec(&self) -> Result<Vec<Managed<M>>> {
        self.load()?
            .iter()
            .map(|raw| Managed::from_raw(raw, &self.handle))
            .collect()
    }

    /// Iterate over the objects present now.
    pub fn iter(&self) -> Result<std::vec::IntoIter<Managed<M>>> {
        Ok(self.to_vec()?.into_iter())
    }

    pub fn first(&self) -> Result<Option<Managed<M>>> {
        self.load()?
            .first()
            .map(|raw| Managed::from_raw(raw, &self.handle))
            .transpose()
    }

    /// Delete every matching object in one transaction.
    pub fn delete_all(&self) -> Result<usize> {
        let predicate = self.predicate.as_ref();
        let removed = self.handle.write(|txn| -> Result<usize> {
            let objects = txn.view().objects_of_type(M::TYPE_NAME)?;
            let mut removed = 0;
            for raw in matching(objects, predicate)? {
                if txn.delete_by_id(raw.id)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })?;
        tracing::debug!(type_name = M::TYPE_NAME, removed, "results deleted");
        Ok(removed)
    }

    fn load(&self) -> Result<Vec<RawObject>> {
        let objects = self.handle.read(|view| view.objects_of_type(M::TYPE_NAME))?;
        matching(objects, self.predicate.as_ref())
    }
}

fn matching(objects: Vec<RawObject>, predicate: Option<&Predicate>) -> Result<Vec<RawObject>> {
    let Some(predicate) = predicate else {
        return Ok(objects);
    };
    let mut kept = Vec::with_capacity(objects.len());
    for raw in objects {
        if evaluate(predicate, &raw.record)? {
            kept.push(raw);
        }
    }
    Ok(kept)
}

fn evaluate(predicate: &Predicate, record: &Record) -> Result<bool> {
    predicate.evaluate(record).map_err(PersistError::QueryInvalid)
}

impl<M> Clone for Results<M> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            predicate: self.predicate.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Results<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Results")
            .field("type_name", &M::TYPE_NAME)
            .field("predicate", &self.predicate)
            .finish()
    }
}
