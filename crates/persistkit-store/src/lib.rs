//! # persistkit store
//!
//! SQLite-backed object storage for persistkit. A [`StoreHandle`] owns one
//! live connection and runs read views, synchronous write transactions,
//! async write jobs and change observation against it.
//!
//! ## Key Types
//!
//! - [`StoreHandle`] - Shared handle to one store, cheap to clone
//! - [`WriteTxn`] / [`ReadView`] - Transaction and view primitives
//! - [`StoreConfig`] - Location and open options, loadable from the environment
//! - [`RawChange`] / [`NotificationToken`] - Per-type change notifications
//!
//! ## Usage
//!
//! ```rust,no_run
//! use persistkit_core::{KeyValue, Record};
//! use persistkit_store::StoreHandle;
//!
//! let store = StoreHandle::open_at("notes.sqlite").unwrap();
//! let key = KeyValue::from(1);
//! store
//!     .write(|txn| txn.upsert("Note", &key, &Record::new().with("title", "first")))
//!     .unwrap();
//! let count = store.read(|view| view.count("Note")).unwrap();
//! assert_eq!(count, 1);
//! ```
//!
//! ## Design Notes
//!
//! - **Stable identity**: every object gets an `ObjectId` on insert; merges keep it
//! - **All-or-nothing writes**: a transaction body returning `Err` rolls back
//! - **Ordered async writes**: one writer thread per handle, jobs run in submission order
//! - **Recreate in place**: `recreate` swaps the connection under existing handles

pub mod config;
pub mod error;
pub mod handle;
pub mod migration;
pub mod observe;
pub mod txn;
mod worker;

pub use config::{ConfigError, Location, StoreConfig};
pub use error::{Result, StoreError};
pub use handle::{Affinity, StoreHandle, WeakStoreHandle};
pub use observe::{NotificationToken, RawChange};
pub use txn::{RawObject, ReadView, Touched, WriteTxn};

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
