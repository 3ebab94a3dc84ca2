//! Skein Core - Core types for the Skein normalized cache.
//!
//! This crate provides the foundational types shared by the store, the
//! reactive layer and the cache engine:
//!
//! - `Selection`: Declarative description of requested fields (from compiled artifacts)
//! - `RecordKey` / `Record`: Identity and flat field table of a normalized record
//! - `FieldValue`: Values stored under record fields (scalars, nulls, links, lists)
//! - `ReadResult`: Reconstructed data plus the partial flag
//! - `CacheConfig`: Entity identification and partial policy
//! - `Error`: Error types for structural misuse
//!
//! # Example
//!
//! ```rust
//! use skein_core::{CacheConfig, RecordKey, Selection};
//! use serde_json::json;
//!
//! let selection = Selection::from_json(json!({
//!     "fields": {
//!         "viewer": { "type": "User", "keyRaw": "viewer", "visible": true }
//!     }
//! }))
//! .unwrap();
//! assert!(selection.fields["viewer"].visible);
//!
//! let config = CacheConfig::default();
//! let id = config.compute_id("User", json!({ "id": "1" }).as_object().unwrap());
//! assert_eq!(RecordKey::entity("User", id.unwrap()).to_string(), "User:1");
//! ```

mod config;
mod error;
mod record;
mod result;
mod selection;
mod value;
mod variables;

pub use config::{CacheConfig, TypeConfig, KEY_SEPARATOR};
pub use error::{Error, Result};
pub use record::{KeyKind, Record, RecordKey, ROOT_ID};
pub use result::ReadResult;
pub use selection::{AbstractFields, Field, FieldMap, ListMeta, Selection};
pub use value::FieldValue;
pub use variables::{evaluate_key, Variables};

/// Re-exported so callers build payloads with the same JSON type.
pub use serde_json::Value as JsonValue;
