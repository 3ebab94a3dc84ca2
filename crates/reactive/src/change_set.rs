//! Change set for tracking modified record fields.
//!
//! A ChangeSet collects every `(record, field)` pair whose stored value was
//! created, replaced or removed by a single cache operation.

use skein_core::RecordKey;
use std::collections::BTreeSet;
use std::fmt;

/// A single field of a single record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    /// The record holding the field.
    pub record: RecordKey,
    /// The evaluated storage key of the field.
    pub field: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(record: RecordKey, field: impl Into<String>) -> Self {
        Self {
            record,
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.record, self.field)
    }
}

/// The set of fields changed by an operation.
///
/// Ordered so iteration (and logging) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: BTreeSet<FieldRef>,
}

impl ChangeSet {
    /// Creates a new empty change set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a changed field.
    pub fn add(&mut self, record: &RecordKey, field: impl Into<String>) {
        self.changed.insert(FieldRef::new(record.clone(), field));
    }

    /// Records a changed field reference.
    #[inline]
    pub fn insert(&mut self, field: FieldRef) {
        self.changed.insert(field);
    }

    /// Returns true if the field was changed.
    #[inline]
    pub fn contains(&self, field: &FieldRef) -> bool {
        self.changed.contains(field)
    }

    /// Returns true if any field of the record was changed.
    pub fn touches_record(&self, record: &RecordKey) -> bool {
        self.changed.iter().any(|f| &f.record == record)
    }

    /// Returns true if there are no changes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Returns the number of changed fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.changed.len()
    }

    /// Iterates over changed fields.
    pub fn iter(&self) -> impl Iterator<Item = &FieldRef> {
        self.changed.iter()
    }

    /// Merges another change set into this one.
    pub fn merge(&mut self, other: ChangeSet) {
        self.changed.extend(other.changed);
    }

    /// Clears all changes.
    pub fn clear(&mut self) {
        self.changed.clear();
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FieldRef;
    type IntoIter = std::collections::btree_set::Iter<'a, FieldRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.changed.iter()
    }
}
