//! Undo journal for record store mutations.
//!
//! A `Journal` records the previous state of everything a write touches so
//! that a write failing partway can be rolled back, leaving the store as it
//! was before the write started.

use crate::record_store::RecordStore;
use skein_core::{FieldValue, Record, RecordKey};

/// One reversible store mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum JournalEntry {
    /// A record was created.
    Create { key: RecordKey },
    /// A record's typename changed.
    Retype { key: RecordKey, old: String },
    /// A field was set; `old` is None if it was absent.
    Set {
        key: RecordKey,
        field: String,
        old: Option<FieldValue>,
    },
    /// A record was deleted.
    Delete { key: RecordKey, record: Record },
}

impl JournalEntry {
    /// Returns the record this entry touched.
    pub fn key(&self) -> &RecordKey {
        match self {
            JournalEntry::Create { key } => key,
            JournalEntry::Retype { key, .. } => key,
            JournalEntry::Set { key, .. } => key,
            JournalEntry::Delete { key, .. } => key,
        }
    }

    fn undo(self, store: &mut RecordStore) {
        match self {
            JournalEntry::Create { key } => {
                store.delete(&key);
            }
            JournalEntry::Retype { key, old } => {
                store.ensure(&key, &old);
            }
            JournalEntry::Set { key, field, old } => match old {
                Some(value) => {
                    store.set(&key, field, value);
                }
                None => {
                    store.remove_field(&key, &field);
                }
            },
            JournalEntry::Delete { key, record } => store.restore(key, record),
        }
    }
}

/// Ordered log of store mutations.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a record exists, journaling its creation or retyping.
    pub fn ensure(&mut self, store: &mut RecordStore, key: &RecordKey, typename: &str) -> bool {
        match store.get(key).map(|r| r.typename().to_string()) {
            Some(old) if old != typename => self.entries.push(JournalEntry::Retype {
                key: key.clone(),
                old,
            }),
            Some(_) => {}
            None => self.entries.push(JournalEntry::Create { key: key.clone() }),
        }
        store.ensure(key, typename)
    }

    /// Sets a field, journaling its previous value.
    pub fn set(
        &mut self,
        store: &mut RecordStore,
        key: &RecordKey,
        field: &str,
        value: FieldValue,
    ) {
        if !store.contains(key) {
            self.entries.push(JournalEntry::Create { key: key.clone() });
        }
        let old = store.set(key, field, value);
        self.entries.push(JournalEntry::Set {
            key: key.clone(),
            field: field.to_string(),
            old,
        });
    }

    /// Deletes a record, journaling its contents.
    pub fn delete(&mut self, store: &mut RecordStore, key: &RecordKey) -> Option<Record> {
        let record = store.delete(key)?;
        self.entries.push(JournalEntry::Delete {
            key: key.clone(),
            record: record.clone(),
        });
        Some(record)
    }

    /// Returns the recorded entries, oldest first.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Returns the number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Undoes every recorded mutation, newest first.
    ///
    /// Returns the number of entries undone.
    pub fn rollback(self, store: &mut RecordStore) -> usize {
        let count = self.entries.len();
        for entry in self.entries.into_iter().rev() {
            entry.undo(store);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: &str) -> RecordKey {
        RecordKey::entity("User", id)
    }

    fn name(value: &str) -> FieldValue {
        FieldValue::Scalar(json!(value))
    }

    #[test]
    fn test_journal_rollback_create_and_set() {
        let mut store = RecordStore::new();
        let mut journal = Journal::new();

        journal.ensure(&mut store, &user("1"), "User");
        journal.set(&mut store, &user("1"), "firstName", name("bob"));
        journal.set(&mut store, &user("2"), "firstName", name("jane"));
        assert_eq!(journal.len(), 4);
        assert_eq!(journal.entries()[0].key(), &user("1"));

        assert_eq!(journal.rollback(&mut store), 4);
        assert!(store.is_empty());
        assert!(store.keys_of_type("User").is_empty());
    }

    #[test]
    fn test_journal_rollback_restores_old_values() {
        let mut store = RecordStore::new();
        store.ensure(&RecordKey::root(), "Query");
        store.set(&user("1"), "firstName", name("bob"));

        let mut journal = Journal::new();
        journal.ensure(&mut store, &RecordKey::root(), "Mutation");
        journal.set(&mut store, &user("1"), "firstName", name("robert"));
        journal.set(&mut store, &user("1"), "lastName", name("smith"));
        journal.rollback(&mut store);

        assert_eq!(store.get(&RecordKey::root()).unwrap().typename(), "Query");
        assert_eq!(store.get_field(&user("1"), "firstName"), Some(&name("bob")));
        assert!(store.get_field(&user("1"), "lastName").is_none());
    }

    #[test]
    fn test_journal_rollback_delete() {
        let mut store = RecordStore::new();
        store.set(&user("1"), "firstName", name("bob"));

        let mut journal = Journal::new();
        assert!(journal.delete(&mut store, &user("1")).is_some());
        assert!(journal.delete(&mut store, &user("1")).is_none());
        assert_eq!(journal.len(), 1);

        journal.rollback(&mut store);
        assert_eq!(store.get_field(&user("1"), "firstName"), Some(&name("bob")));
    }

    #[test]
    fn test_journal_ensure_existing_is_not_recorded() {
        let mut store = RecordStore::new();
        store.ensure(&user("1"), "User");

        let mut journal = Journal::new();
        assert!(!journal.ensure(&mut store, &user("1"), "User"));
        assert!(journal.is_empty());
    }
}
