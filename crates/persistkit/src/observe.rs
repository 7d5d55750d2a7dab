//! Typed change notifications.

use persistkit_store::{NotificationToken, RawChange, RawObject, StoreHandle};

use crate::error::{PersistError, Result};
use crate::managed::Managed;
use crate::model::Model;

/// A change to the objects of one type.
///
/// Deletion indices refer to the objects before the change. Insertion and
/// modification indices refer to `results`.
#[derive(Debug)]
pub enum Change<M> {
    /// The objects present when observation started.
    Initial(Vec<Managed<M>>),
    /// The objects after a commit.
    Update {
        results: Vec<Managed<M>>,
        deletions: Vec<usize>,
        insertions: Vec<usize>,
        modifications: Vec<usize>,
    },
}

impl<M> Change<M> {
    /// The objects present after this change.
    pub fn results(&self) -> &[Managed<M>] {
        match self {
            Change::Initial(results) | Change::Update { results, .. } => results,
        }
    }
}

impl<M: Model> Change<M> {
    fn from_raw(raw: RawChange, handle: &StoreHandle) -> Result<Self> {
        let decode = |objects: Vec<RawObject>| -> Result<Vec<Managed<M>>> {
            objects
                .iter()
                .map(|object| Managed::from_raw(object, handle))
                .collect()
        };
        Ok(match raw {
            RawChange::Initial(objects) => Change::Initial(decode(objects)?),
            RawChange::Update {
                objects,
                deletions,
                insertions,
                modifications,
            } => Change::Update {
                results: decode(objects)?,
                deletions,
                insertions,
                modifications,
            },
        })
    }
}

pub(crate) fn observe<M, F>(handle: &StoreHandle, mut callback: F) -> Result<NotificationToken>
where
    M: Model,
    F: FnMut(Result<Change<M>>) + Send + 'static,
{
    // The registry lives inside the handle, so the callback must not own it.
    let weak = handle.downgrade();
    let token = handle.observe_type(M::TYPE_NAME, move |raw| {
        let Some(handle) = weak.upgrade() else {
            return;
        };
        let change = raw
            .map_err(PersistError::from)
            .and_then(|raw| Change::from_raw(raw, &handle));
        callback(change);
    })?;
    Ok(token)
}
