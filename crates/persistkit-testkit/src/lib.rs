//! # persistkit testkit
//!
//! Testing utilities for persistkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Temporary stores and sample models covering keyed,
//!   text-keyed and keyless types
//! - **Generators**: Proptest strategies for every bridged value type,
//!   including boundary values
//!
//! ## Test Fixtures
//!
//! ```rust
//! use persistkit::access;
//! use persistkit_testkit::fixtures::{Note, TempStore};
//!
//! let store = TempStore::new();
//! let note = access::update(&store, Note::new(1, "first")).unwrap();
//! assert_eq!(note.title, "first");
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use persistkit::Bridged;
//! use persistkit_testkit::generators::rect;
//!
//! proptest! {
//!     #[test]
//!     fn rect_roundtrip(r in rect()) {
//!         prop_assert_eq!(persistkit::Rect::recompose(&r.decompose()).unwrap(), r);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{Label, Note, Sketch, TempStore};

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Filtering follows `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
