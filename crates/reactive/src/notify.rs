//! Dependency index and change routing.
//!
//! This module provides `DependencyIndex` which maps record fields to the
//! subscriptions that read them, and routes change sets to the affected
//! subscriptions.

use crate::change_set::{ChangeSet, FieldRef};
use crate::subscription::SubscriptionId;
use hashbrown::{HashMap, HashSet};
use std::collections::BTreeSet;

/// A non-owning index from record fields to subscription IDs.
///
/// The index stores keys only: it never holds records or subscriptions
/// alive. Each subscription's own field set is kept as a back-reference so
/// removal costs the number of fields it touched, not the size of the store.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    /// Field → subscriptions reading it. BTreeSet keeps registration order.
    by_field: HashMap<FieldRef, BTreeSet<SubscriptionId>>,
    /// Subscription → fields it reads.
    by_subscription: HashMap<SubscriptionId, HashSet<FieldRef>>,
}

impl DependencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the field set of a subscription.
    ///
    /// Only the difference between the old and new sets is applied.
    pub fn replace(&mut self, id: SubscriptionId, fields: HashSet<FieldRef>) {
        let old = self.by_subscription.remove(&id).unwrap_or_default();

        for field in old.difference(&fields) {
            self.unlink(id, field);
        }
        for field in fields.difference(&old) {
            self.by_field.entry(field.clone()).or_default().insert(id);
        }

        self.by_subscription.insert(id, fields);
    }

    /// Removes a subscription from the index.
    ///
    /// Returns true if the subscription was indexed.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        match self.by_subscription.remove(&id) {
            Some(fields) => {
                for field in &fields {
                    self.unlink(id, field);
                }
                true
            }
            None => false,
        }
    }

    /// Returns the subscriptions reading any changed field, in registration order.
    pub fn affected(&self, changes: &ChangeSet) -> BTreeSet<SubscriptionId> {
        let mut out = BTreeSet::new();
        for field in changes {
            if let Some(ids) = self.by_field.get(field) {
                out.extend(ids.iter().copied());
            }
        }
        out
    }

    /// Returns the number of subscriptions reading a field.
    pub fn subscribers_for(&self, field: &FieldRef) -> usize {
        self.by_field.get(field).map(|ids| ids.len()).unwrap_or(0)
    }

    /// Returns the number of fields a subscription reads.
    pub fn fields_for(&self, id: SubscriptionId) -> usize {
        self.by_subscription.get(&id).map(|f| f.len()).unwrap_or(0)
    }

    /// Returns the number of distinct indexed fields.
    pub fn field_count(&self) -> usize {
        self.by_field.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_subscription.is_empty()
    }

    /// Clears the index.
    pub fn clear(&mut self) {
        self.by_field.clear();
        self.by_subscription.clear();
    }

    fn unlink(&mut self, id: SubscriptionId, field: &FieldRef) {
        if let Some(ids) = self.by_field.get_mut(field) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_field.remove(field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_core::RecordKey;

    fn field(id: &str, name: &str) -> FieldRef {
        FieldRef::new(RecordKey::entity("User", id), name)
    }

    fn fields(list: &[FieldRef]) -> HashSet<FieldRef> {
        list.iter().cloned().collect()
    }

    #[test]
    fn test_index_new() {
        let index = DependencyIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.field_count(), 0);
    }

    #[test]
    fn test_index_replace() {
        let mut index = DependencyIndex::new();
        index.replace(1, fields(&[field("1", "id"), field("1", "firstName")]));
        index.replace(2, fields(&[field("1", "id")]));

        assert_eq!(index.subscribers_for(&field("1", "id")), 2);
        assert_eq!(index.subscribers_for(&field("1", "firstName")), 1);
        assert_eq!(index.fields_for(1), 2);

        // Subscription 1 stops reading firstName and starts reading friends
        index.replace(1, fields(&[field("1", "id"), field("1", "friends")]));
        assert_eq!(index.subscribers_for(&field("1", "firstName")), 0);
        assert_eq!(index.subscribers_for(&field("1", "friends")), 1);
        assert_eq!(index.subscribers_for(&field("1", "id")), 2);
    }

    #[test]
    fn test_index_remove() {
        let mut index = DependencyIndex::new();
        index.replace(1, fields(&[field("1", "id"), field("2", "id")]));

        assert!(index.remove(1));
        assert_eq!(index.field_count(), 0);
        assert!(index.is_empty());

        assert!(!index.remove(1)); // Already removed
    }

    #[test]
    fn test_index_affected() {
        let mut index = DependencyIndex::new();
        index.replace(3, fields(&[field("1", "id")]));
        index.replace(1, fields(&[field("1", "id")]));
        index.replace(2, fields(&[field("2", "id")]));

        let mut changes = ChangeSet::new();
        changes.insert(field("1", "id"));

        let affected: Vec<_> = index.affected(&changes).into_iter().collect();
        assert_eq!(affected, vec![1, 3]);
    }

    #[test]
    fn test_index_affected_unrelated_change() {
        let mut index = DependencyIndex::new();
        index.replace(1, fields(&[field("1", "id")]));

        let mut changes = ChangeSet::new();
        changes.insert(field("1", "lastName"));

        assert!(index.affected(&changes).is_empty());
    }

    #[test]
    fn test_index_empty_change_set() {
        let mut index = DependencyIndex::new();
        index.replace(1, fields(&[field("1", "id")]));
        assert!(index.affected(&ChangeSet::new()).is_empty());
    }

    #[test]
    fn test_index_clear() {
        let mut index = DependencyIndex::new();
        index.replace(1, fields(&[field("1", "id")]));
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.subscribers_for(&field("1", "id")), 0);
    }
}
