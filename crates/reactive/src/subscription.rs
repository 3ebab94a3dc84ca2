//! Subscription management for cache observers.
//!
//! This module provides subscription IDs, the `Subscription` record of what an
//! observer reads, and a manager tracking active subscriptions together with
//! the fields each one depends on.

use crate::change_set::{ChangeSet, FieldRef};
use crate::notify::DependencyIndex;
use hashbrown::HashSet;
use skein_core::{ReadResult, RecordKey, Selection, Variables};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback receiving fresh read results.
pub type SetCallback = Box<dyn Fn(&ReadResult)>;

/// Default root typename of subscriptions.
pub const DEFAULT_ROOT_TYPE: &str = "Query";

/// What a caller wants to observe.
pub struct SubscriptionSpec {
    /// The selection to re-read on change.
    pub selection: Rc<Selection>,
    /// Typename of the starting record.
    pub root_type: String,
    /// Record to read from; the root when None.
    pub parent: Option<RecordKey>,
    /// Variables used to evaluate field keys.
    pub variables: Variables,
    /// Invoked with every fresh result.
    pub set: SetCallback,
}

impl SubscriptionSpec {
    /// Creates a spec reading `selection` from the root.
    pub fn new<F>(selection: impl Into<Rc<Selection>>, set: F) -> Self
    where
        F: Fn(&ReadResult) + 'static,
    {
        Self {
            selection: selection.into(),
            root_type: DEFAULT_ROOT_TYPE.into(),
            parent: None,
            variables: Variables::new(),
            set: Box::new(set),
        }
    }

    /// Sets the root typename.
    pub fn root_type(mut self, root_type: impl Into<String>) -> Self {
        self.root_type = root_type.into();
        self
    }

    /// Reads from `parent` instead of the root.
    pub fn parent(mut self, parent: RecordKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the variables.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

/// An active subscription.
pub struct Subscription {
    id: SubscriptionId,
    selection: Rc<Selection>,
    root_type: String,
    parent: RecordKey,
    variables: Variables,
    set: SetCallback,
}

impl Subscription {
    /// Creates a subscription from a spec.
    pub fn new(id: SubscriptionId, spec: SubscriptionSpec) -> Self {
        Self {
            id,
            selection: spec.selection,
            root_type: spec.root_type,
            parent: spec.parent.unwrap_or_else(RecordKey::root),
            variables: spec.variables,
            set: spec.set,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the observed selection.
    #[inline]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Returns the root typename.
    #[inline]
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    /// Returns the record the selection is read from.
    #[inline]
    pub fn parent(&self) -> &RecordKey {
        &self.parent
    }

    /// Returns the variables.
    #[inline]
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Delivers a fresh result.
    pub fn notify(&self, result: &ReadResult) {
        (self.set)(result);
    }
}

/// Manages subscriptions and the fields they depend on.
pub struct SubscriptionManager {
    /// Active subscriptions, iterated in registration order.
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    /// Field → subscription routing.
    index: DependencyIndex,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
            index: DependencyIndex::new(),
            next_id: 1,
        }
    }

    /// Registers a subscription. Its dependencies start empty; callers set
    /// them with `update_dependencies` after the first read.
    pub fn subscribe(&mut self, spec: SubscriptionSpec) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, Subscription::new(id, spec));
        id
    }

    /// Unsubscribes by ID. Unknown or already removed IDs are a no-op.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.index.remove(id);
        self.subscriptions.remove(&id).is_some()
    }

    /// Gets a subscription by ID.
    pub fn get(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(&id)
    }

    /// Replaces the set of fields a subscription depends on.
    pub fn update_dependencies(&mut self, id: SubscriptionId, fields: HashSet<FieldRef>) {
        if self.subscriptions.contains_key(&id) {
            self.index.replace(id, fields);
        }
    }

    /// Returns the subscriptions affected by a change set, in registration order.
    pub fn affected(&self, changes: &ChangeSet) -> Vec<SubscriptionId> {
        if changes.is_empty() {
            return Vec::new();
        }
        self.index.affected(changes).into_iter().collect()
    }

    /// Notifies a specific subscription.
    pub fn notify(&self, id: SubscriptionId, result: &ReadResult) {
        if let Some(sub) = self.subscriptions.get(&id) {
            sub.notify(result);
        }
    }

    /// Returns the dependency index.
    #[inline]
    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Returns the number of active subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Returns all subscription IDs in registration order.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions.keys().copied().collect()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.index.clear();
    }
}
