//! Skein Storage - Record storage for the Skein normalized cache.
//!
//! This crate provides `RecordStore`, the flat table of normalized records
//! keyed by `RecordKey`, and a `Journal` of reversible mutations used to roll
//! back failed writes. It holds no knowledge of selections: the cache's
//! writer decides what to store and the reader decides how to interpret it.
//!
//! # Example
//!
//! ```rust
//! use skein_core::{FieldValue, RecordKey};
//! use skein_storage::RecordStore;
//!
//! let mut store = RecordStore::new();
//! let key = RecordKey::entity("User", "1");
//! store.set(&key, "firstName", FieldValue::Scalar("bob".into()));
//!
//! assert_eq!(store.get_entity("User", "1").unwrap().len(), 1);
//! ```

pub mod journal;
pub mod record_store;

pub use journal::{Journal, JournalEntry};
pub use record_store::RecordStore;
