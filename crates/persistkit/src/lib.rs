//! # persistkit
//!
//! Typed object persistence over an embedded store.
//!
//! ## Overview
//!
//! A type becomes persistable by implementing [`Model`]: a type name, an
//! optional primary key field and a conversion to and from a [`Record`].
//! Values that the store cannot hold natively (geometry, colors, durations,
//! paths and so on) are stored through the [`Bridged`] codec.
//!
//! - [`ObjectAccess`] adds `add`, `update`, `find`, `fetch_all`, `delete`
//!   and `observe` to every model, against the type's own store
//! - [`BatchAccess`] and [`ManagedBatch`] do the same for collections, in
//!   one transaction per batch
//! - [`access`] has every operation again with an explicit [`StoreHandle`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use persistkit::{access, CodecError, Model, ObjectAccess, Predicate, Record, StoreHandle};
//!
//! #[derive(Debug, Clone)]
//! struct Note {
//!     id: i64,
//!     title: String,
//! }
//!
//! impl Model for Note {
//!     const TYPE_NAME: &'static str = "Note";
//!     const PRIMARY_KEY: Option<&'static str> = Some("id");
//!
//!     fn to_record(&self) -> Record {
//!         Record::new().with("id", self.id).with("title", self.title.as_str())
//!     }
//!
//!     fn from_record(record: &Record) -> Result<Self, CodecError> {
//!         Ok(Note {
//!             id: record.int("id")?,
//!             title: record.text("title")?.to_string(),
//!         })
//!     }
//! }
//!
//! fn example() -> persistkit::Result<()> {
//!     // Against the shared store
//!     let mut note = Note { id: 1, title: "draft".into() }.update()?;
//!     note.edit(|n| {
//!         n.title = "final".into();
//!         Ok::<_, persistkit::PersistError>(())
//!     })?;
//!
//!     // Against an explicit store
//!     let store = StoreHandle::open_at("notes.sqlite")?;
//!     access::add(&store, Note { id: 2, title: "other".into() })?;
//!     let finals = access::fetch_all_where::<Note>(&store, Predicate::field("title").eq("final"))?;
//!     println!("{} final notes", finals.len()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `persistkit::core` - Codec, records and predicates
//! - `persistkit::store` - Store handle, configuration and raw transactions

pub mod access;
pub mod bulk;
pub mod error;
pub mod managed;
pub mod model;
pub mod object;
pub mod observe;
pub mod results;

// Re-export component crates
pub use persistkit_core as core;
pub use persistkit_store as store;

pub use bulk::{BatchAccess, ManagedBatch};
pub use error::{PersistError, Result};
pub use managed::Managed;
pub use model::Model;
pub use object::ObjectAccess;
pub use observe::Change;
pub use results::Results;

pub use persistkit_core::{
    Bridged, CodecError, Color, CountStyle, DataSize, FieldValue, KeyValue, MediaTime, ObjectId,
    OrderedPrimitiveArray, Point, Predicate, Record, Rect, Size,
};
pub use persistkit_store::{
    Affinity, Location, NotificationToken, StoreConfig, StoreError, StoreHandle,
};
