//! Record structure for the Skein cache.
//!
//! This module defines `RecordKey`, the stable identity of a normalized
//! record, and `Record`, the flat field table stored for it.

use crate::value::FieldValue;
use std::collections::BTreeMap;
use std::fmt;

/// Display form and typename of the root record.
pub const ROOT_ID: &str = "_ROOT_";

/// How a record key was derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    /// The implicit root every top-level selection starts from.
    Root,
    /// An identifiable entity: `typename` plus primary key values.
    Entity,
    /// An object without identity, keyed by its path from the nearest parent.
    Embedded,
}

/// Stable identifier of a record in the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    kind: KeyKind,
    typename: String,
    id: String,
}

impl RecordKey {
    /// The root record key.
    pub fn root() -> Self {
        Self {
            kind: KeyKind::Root,
            typename: ROOT_ID.into(),
            id: ROOT_ID.into(),
        }
    }

    /// Creates an entity key from a typename and a primary key.
    pub fn entity(typename: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: KeyKind::Entity,
            typename: typename.into(),
            id: id.into(),
        }
    }

    /// Creates a key for an object without identity nested under `parent`.
    ///
    /// `segment` is the path step from the parent, e.g. `friends` or `edges[0]`.
    pub fn embedded(typename: impl Into<String>, parent: &RecordKey, segment: &str) -> Self {
        Self {
            kind: KeyKind::Embedded,
            typename: typename.into(),
            id: format!("{}.{}", parent, segment),
        }
    }

    /// Formats a path segment for an element of a (possibly nested) list.
    pub fn list_segment(field_key: &str, indices: &[usize]) -> String {
        let mut segment = String::from(field_key);
        for index in indices {
            segment.push_str(&format!("[{}]", index));
        }
        segment
    }

    /// Returns how this key was derived.
    #[inline]
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Returns the typename part of the key.
    #[inline]
    pub fn typename(&self) -> &str {
        &self.typename
    }

    /// Returns the id part of the key.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true if this is the root key.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.kind == KeyKind::Root
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            KeyKind::Root | KeyKind::Embedded => write!(f, "{}", self.id),
            KeyKind::Entity => write!(f, "{}:{}", self.typename, self.id),
        }
    }
}

/// A normalized record: a concrete typename plus its stored fields.
///
/// Field keys are argument-qualified storage keys, not output names.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    typename: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty record of the given concrete type.
    pub fn new(typename: impl Into<String>) -> Self {
        Self {
            typename: typename.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Returns the concrete typename.
    #[inline]
    pub fn typename(&self) -> &str {
        &self.typename
    }

    /// Replaces the concrete typename.
    pub fn set_typename(&mut self, typename: impl Into<String>) {
        self.typename = typename.into();
    }

    /// Returns the value stored under a field key.
    #[inline]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Stores a value, returning the previous one.
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Returns true if the field has been written.
    #[inline]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Returns the number of stored fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over stored fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
