//! Per-type change notifications.
//!
//! Each observer keeps a digest snapshot of the objects of its type. After a
//! commit that touched the type, the current rows are read back and diffed
//! against the snapshot by [`ObjectId`]. Deletion indices refer to the old
//! snapshot, insertion and modification indices to the new one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError, Weak};

use persistkit_core::ObjectId;

use crate::error::Result;
use crate::txn::{RawObject, SnapshotRow, Touched};

/// A change delivered to a raw observer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawChange {
    /// The objects present when the observer was registered.
    Initial(Vec<RawObject>),
    /// The objects after a commit, with indices describing what changed.
    Update {
        objects: Vec<RawObject>,
        deletions: Vec<usize>,
        insertions: Vec<usize>,
        modifications: Vec<usize>,
    },
}

pub(crate) type Callback = Box<dyn FnMut(Result<RawChange>) + Send>;

/// Reads the current generation and rows of one type.
pub(crate) type Loader<'a> = &'a dyn Fn(&str) -> Result<(u64, Vec<SnapshotRow>)>;

struct Snapshot {
    generation: u64,
    rows: Vec<(ObjectId, [u8; 32])>,
}

struct ObserverState {
    last: Option<Snapshot>,
    callback: Callback,
}

struct Observer {
    type_name: String,
    cancelled: Arc<AtomicBool>,
    pending: AtomicBool,
    state: Mutex<ObserverState>,
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<BTreeMap<u64, Arc<Observer>>>,
}

impl ObserverRegistry {
    /// Register an observer and deliver its initial change.
    pub(crate) fn register(
        self: &Arc<Self>,
        type_name: &str,
        callback: Callback,
        load: Loader<'_>,
    ) -> NotificationToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        let observer = Arc::new(Observer {
            type_name: type_name.to_string(),
            cancelled: Arc::clone(&cancelled),
            pending: AtomicBool::new(false),
            state: Mutex::new(ObserverState {
                last: None,
                callback,
            }),
        });

        self.lock().insert(id, Arc::clone(&observer));
        tracing::debug!(observer = id, type_name, "observer registered");
        deliver(&observer, load);

        NotificationToken {
            id,
            registry: Arc::downgrade(self),
            cancelled,
        }
    }

    /// Deliver changes to every observer whose type was touched.
    pub(crate) fn notify(&self, touched: &Touched, load: Loader<'_>) {
        if *touched == Touched::Nothing {
            return;
        }
        let targets: Vec<Arc<Observer>> = self
            .lock()
            .values()
            .filter(|o| touched.includes(&o.type_name))
            .cloned()
            .collect();
        for observer in targets {
            deliver(&observer, load);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: u64) {
        if self.lock().remove(&id).is_some() {
            tracing::debug!(observer = id, "observer removed");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, Arc<Observer>>> {
        self.observers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// Deliveries for one observer never overlap. A caller that finds a delivery
// in progress leaves `pending` set and the running delivery loops again.
fn deliver(observer: &Observer, load: Loader<'_>) {
    observer.pending.store(true, Ordering::SeqCst);
    loop {
        let mut state = match observer.state.try_lock() {
            Ok(state) => state,
            Err(TryLockError::WouldBlock) => return,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        if !observer.pending.swap(false, Ordering::SeqCst) {
            return;
        }
        if observer.cancelled.load(Ordering::SeqCst) {
            return;
        }

        match load(&observer.type_name) {
            Ok((generation, rows)) => {
                let digests: Vec<(ObjectId, [u8; 32])> =
                    rows.iter().map(|r| (r.object.id, r.digest)).collect();
                let objects: Vec<RawObject> = rows.into_iter().map(|r| r.object).collect();
                let change = match state.last.as_ref() {
                    None => Some(RawChange::Initial(objects)),
                    Some(last) => diff(last, generation, &digests).map(
                        |(deletions, insertions, modifications)| RawChange::Update {
                            objects,
                            deletions,
                            insertions,
                            modifications,
                        },
                    ),
                };
                state.last = Some(Snapshot {
                    generation,
                    rows: digests,
                });
                if let Some(change) = change {
                    (state.callback)(Ok(change));
                }
            }
            Err(e) => {
                tracing::debug!(type_name = %observer.type_name, error = %e, "observer reload failed");
                (state.callback)(Err(e));
            }
        }

        drop(state);
        if !observer.pending.load(Ordering::SeqCst) {
            return;
        }
    }
}

type Indices = (Vec<usize>, Vec<usize>, Vec<usize>);

/// Diff two id-sorted snapshots. `None` when nothing changed.
fn diff(old: &Snapshot, generation: u64, new: &[(ObjectId, [u8; 32])]) -> Option<Indices> {
    // A recreated store shares no objects with the old one.
    if old.generation != generation {
        if old.rows.is_empty() && new.is_empty() {
            return None;
        }
        return Some(((0..old.rows.len()).collect(), (0..new.len()).collect(), Vec::new()));
    }

    let (mut deletions, mut insertions, mut modifications) = (Vec::new(), Vec::new(), Vec::new());
    let (mut i, mut j) = (0, 0);
    while i < old.rows.len() || j < new.len() {
        match (old.rows.get(i), new.get(j)) {
            (Some((old_id, old_digest)), Some((new_id, new_digest))) => {
                if old_id == new_id {
                    if old_digest != new_digest {
                        modifications.push(j);
                    }
                    i += 1;
                    j += 1;
                } else if old_id < new_id {
                    deletions.push(i);
                    i += 1;
                } else {
                    insertions.push(j);
                    j += 1;
                }
            }
            (Some(_), None) => {
                deletions.push(i);
                i += 1;
            }
            (None, Some(_)) => {
                insertions.push(j);
                j += 1;
            }
            (None, None) => break,
        }
    }

    if deletions.is_empty() && insertions.is_empty() && modifications.is_empty() {
        None
    } else {
        Some((deletions, insertions, modifications))
    }
}

/// Keeps an observer registered. Dropping it stops notifications.
#[must_use = "dropping the token cancels the observer"]
pub struct NotificationToken {
    id: u64,
    registry: Weak<ObserverRegistry>,
    cancelled: Arc<AtomicBool>,
}

impl NotificationToken {
    /// Stop notifications. Idempotent.
    pub fn invalidate(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && self.registry.strong_count() > 0
    }
}

impl Drop for NotificationToken {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl std::fmt::Debug for NotificationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationToken")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
