//! Skein Reactive - Change tracking and subscriptions for the Skein cache.
//!
//! This crate holds the bookkeeping side of cache notifications. Writes
//! produce a `ChangeSet` of modified record fields; the `SubscriptionManager`
//! routes it through a `DependencyIndex` to the subscriptions that read any of
//! those fields. Re-reading and delivering fresh results is done by the cache.
//!
//! # Core Concepts
//!
//! - `ChangeSet`: Fields changed by one operation
//! - `Subscription`: A selection, its starting record and a `set` callback
//! - `DependencyIndex`: Non-owning field → subscription index
//! - `SubscriptionManager`: Registration order, dependencies, delivery
//!
//! # Example
//!
//! ```rust
//! use skein_core::{RecordKey, Selection};
//! use skein_reactive::{ChangeSet, FieldRef, SubscriptionManager, SubscriptionSpec};
//!
//! let mut manager = SubscriptionManager::new();
//! let id = manager.subscribe(SubscriptionSpec::new(Selection::default(), |result| {
//!     println!("partial: {}", result.partial);
//! }));
//!
//! let viewer = FieldRef::new(RecordKey::root(), "viewer");
//! manager.update_dependencies(id, [viewer.clone()].into_iter().collect());
//!
//! let mut changes = ChangeSet::new();
//! changes.insert(viewer);
//! assert_eq!(manager.affected(&changes), vec![id]);
//! ```

pub mod change_set;
pub mod notify;
pub mod subscription;

pub use change_set::{ChangeSet, FieldRef};
pub use notify::DependencyIndex;
pub use subscription::{
    SetCallback, Subscription, SubscriptionId, SubscriptionManager, SubscriptionSpec,
    DEFAULT_ROOT_TYPE,
};
