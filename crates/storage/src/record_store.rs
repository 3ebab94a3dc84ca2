//! Record storage for the Skein cache.
//!
//! This module provides the `RecordStore` struct which holds every normalized
//! record keyed by `RecordKey`, plus a typename index for type-wide lookups.

use hashbrown::{HashMap, HashSet};
use skein_core::{FieldValue, Record, RecordKey};

/// Flat table of normalized records.
///
/// There is no implicit deletion: a record stays until `delete` is called.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<RecordKey, Record>,
    /// Typename → keys of records currently holding that typename.
    type_index: HashMap<String, HashSet<RecordKey>>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gets a record by key.
    #[inline]
    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    /// Gets an entity record by typename and primary key.
    pub fn get_entity(&self, typename: &str, id: &str) -> Option<&Record> {
        self.records.get(&RecordKey::entity(typename, id))
    }

    /// Checks if a record exists.
    #[inline]
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.contains_key(key)
    }

    /// Gets a single field of a record.
    pub fn get_field(&self, key: &RecordKey, field: &str) -> Option<&FieldValue> {
        self.records.get(key).and_then(|r| r.get(field))
    }

    /// Makes sure a record exists, creating it empty with `typename` if needed.
    ///
    /// An existing record keeps its fields; its typename is updated when it
    /// differs. Returns true if the record was created.
    pub fn ensure(&mut self, key: &RecordKey, typename: &str) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                if record.typename() != typename {
                    let old = record.typename().to_string();
                    record.set_typename(typename);
                    self.unindex(&old, key);
                    self.index(typename, key);
                }
                false
            }
            None => {
                self.records.insert(key.clone(), Record::new(typename));
                self.index(typename, key);
                true
            }
        }
    }

    /// Stores a field value, creating the record when missing.
    ///
    /// Newly created records take the typename from the key. Returns the
    /// previous value of the field.
    pub fn set(
        &mut self,
        key: &RecordKey,
        field: impl Into<String>,
        value: FieldValue,
    ) -> Option<FieldValue> {
        if !self.records.contains_key(key) {
            self.ensure(key, key.typename());
        }
        self.records
            .get_mut(key)
            .and_then(|record| record.set(field, value))
    }

    /// Removes a single field from a record.
    pub fn remove_field(&mut self, key: &RecordKey, field: &str) -> Option<FieldValue> {
        self.records.get_mut(key).and_then(|r| r.remove(field))
    }

    /// Deletes a record.
    pub fn delete(&mut self, key: &RecordKey) -> Option<Record> {
        let record = self.records.remove(key)?;
        self.unindex(record.typename(), key);
        Some(record)
    }

    /// Puts a whole record back under `key`, replacing any current one.
    pub fn restore(&mut self, key: RecordKey, record: Record) {
        if let Some(current) = self.records.get(&key) {
            let typename = current.typename().to_string();
            self.unindex(&typename, &key);
        }
        self.index(record.typename(), &key);
        self.records.insert(key, record);
    }

    /// Returns the keys of all records of a typename.
    pub fn keys_of_type(&self, typename: &str) -> Vec<RecordKey> {
        self.type_index
            .get(typename)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Iterates over all records.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &Record)> {
        self.records.iter()
    }

    /// Clears all records.
    pub fn clear(&mut self) {
        self.records.clear();
        self.type_index.clear();
    }

    fn index(&mut self, typename: &str, key: &RecordKey) {
        self.type_index
            .entry(typename.to_string())
            .or_default()
            .insert(key.clone());
    }

    fn unindex(&mut self, typename: &str, key: &RecordKey) {
        if let Some(keys) = self.type_index.get_mut(typename) {
            keys.remove(key);
            if keys.is_empty() {
                self.type_index.remove(typename);
            }
        }
    }
}
