//! Stored field values.
//!
//! This module defines the `FieldValue` enum which represents anything that can
//! be stored under a field key of a normalized record.

use crate::record::RecordKey;
use serde_json::Value as JsonValue;

/// A value stored under a record field.
///
/// Scalars keep their JSON form. Objects never appear inline: they are
/// normalized into their own records and referenced through `Link`.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// An explicit null written by a payload.
    Null,
    /// A scalar leaf, including arrays of scalars.
    Scalar(JsonValue),
    /// A reference to another record.
    Link(RecordKey),
    /// An ordered sequence of links, nulls or nested lists.
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns true if this value is an explicit null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the scalar if this is a Scalar, None otherwise.
    pub fn as_scalar(&self) -> Option<&JsonValue> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the referenced key if this is a Link, None otherwise.
    pub fn as_link(&self) -> Option<&RecordKey> {
        match self {
            FieldValue::Link(key) => Some(key),
            _ => None,
        }
    }

    /// Returns the entries if this is a List, None otherwise.
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns true if this value references `key`, directly or inside a list.
    pub fn references(&self, key: &RecordKey) -> bool {
        match self {
            FieldValue::Link(k) => k == key,
            FieldValue::List(entries) => entries.iter().any(|e| e.references(key)),
            _ => false,
        }
    }

    /// Collects every record key referenced by this value.
    pub fn links(&self) -> Vec<&RecordKey> {
        let mut out = Vec::new();
        self.collect_links(&mut out);
        out
    }

    fn collect_links<'a>(&'a self, out: &mut Vec<&'a RecordKey>) {
        match self {
            FieldValue::Link(key) => out.push(key),
            FieldValue::List(entries) => {
                for entry in entries {
                    entry.collect_links(out);
                }
            }
            _ => {}
        }
    }

    /// Returns a copy with every reference to `key` removed from lists.
    ///
    /// A direct `Link` to `key` becomes `Null`.
    pub fn without(&self, key: &RecordKey) -> FieldValue {
        match self {
            FieldValue::Link(k) if k == key => FieldValue::Null,
            FieldValue::List(entries) => FieldValue::List(
                entries
                    .iter()
                    .filter(|e| e.as_link() != Some(key))
                    .map(|e| e.without(key))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        if value.is_null() {
            FieldValue::Null
        } else {
            FieldValue::Scalar(value)
        }
    }
}

impl From<RecordKey> for FieldValue {
    fn from(key: RecordKey) -> Self {
        FieldValue::Link(key)
    }
}
