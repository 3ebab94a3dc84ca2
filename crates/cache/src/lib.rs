//! Skein Cache - A normalized, in-memory cache for GraphQL-like data.
//!
//! This crate ties the record store and the reactive layer into a cache:
//!
//! - `Writer`: Normalizes payloads into records and diffs every field it sets
//! - `Reader`: Rebuilds nested data from records and reports partial results
//! - `ListRegistry` / `ListHandle`: Named lists and connections with structural inserts
//! - `Cache`: The facade, notifying subscriptions synchronously after each mutation
//!
//! # Example
//!
//! ```rust
//! use skein_cache::{Cache, Selection, SubscriptionSpec};
//! use serde_json::json;
//!
//! let selection = Selection::from_json(json!({
//!     "fields": {
//!         "viewer": {
//!             "type": "User", "keyRaw": "viewer", "visible": true,
//!             "selection": { "fields": {
//!                 "id": { "type": "ID", "keyRaw": "id", "visible": true },
//!                 "firstName": { "type": "String", "keyRaw": "firstName", "visible": true }
//!             }}
//!         }
//!     }
//! }))
//! .unwrap();
//!
//! let mut cache = Cache::new();
//! assert!(cache.read(&selection).data.is_none());
//!
//! let id = cache.subscribe(SubscriptionSpec::new(selection.clone(), |result| {
//!     println!("viewer changed, partial: {}", result.partial);
//! }));
//!
//! cache
//!     .write(&selection, &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
//!     .unwrap();
//!
//! let result = cache.read(&selection);
//! assert!(!result.partial);
//! assert_eq!(result.pointer("/viewer/firstName"), Some(&json!("bob")));
//!
//! cache.unsubscribe(id);
//! ```

pub mod cache;
pub mod lists;
pub mod reader;
pub mod writer;

pub use cache::{Cache, ReadOptions, WriteOptions};
pub use lists::{ConnectionShape, ListHandle, ListInstance, ListRegistry};
pub use reader::Reader;
pub use writer::{ListPosition, Writer, TYPENAME_FIELD};

pub use skein_core::{
    CacheConfig, Error, Field, FieldValue, JsonValue, ListMeta, ReadResult, RecordKey, Result,
    Selection, Variables,
};
pub use skein_reactive::{ChangeSet, FieldRef, SubscriptionId, SubscriptionSpec};
