//! Selection trees.
//!
//! A `Selection` describes which fields an operation requests, with the
//! storage key, type and visibility metadata the cache needs to normalize a
//! payload and to read it back. Selections are produced by an external
//! compiler as JSON artifacts and are treated as read-only input.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Output-name → field mapping of a selection level.
pub type FieldMap = BTreeMap<String, Field>;

/// A selection level: the requested fields plus per-concrete-type overrides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Fields requested regardless of concrete type.
    #[serde(default)]
    pub fields: FieldMap,
    /// Fields requested per concrete type, for interfaces and unions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_fields: Option<AbstractFields>,
}

/// Per-concrete-type field sets of an abstract selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstractFields {
    /// Typename → complete field set for records of that type.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMap>,
    /// Concrete typename → abstract typename whose field set applies to it.
    #[serde(default)]
    pub type_map: BTreeMap<String, String>,
}

/// One requested field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Schema type of the field (the element type for lists).
    #[serde(rename = "type")]
    pub type_name: String,
    /// Argument-qualified storage key. May reference `$variables`.
    pub key_raw: String,
    /// Whether the field contributes to output and partial status.
    #[serde(default)]
    pub visible: bool,
    /// Whether the schema allows this field to be null.
    #[serde(default)]
    pub nullable: bool,
    /// Whether the concrete type is resolved per record from `__typename`.
    #[serde(default, rename = "abstract")]
    pub abstract_: bool,
    /// Nested selection for object and list-of-object fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Box<Selection>>,
    /// Marks this field as a named, structurally addressable list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListMeta>,
    /// Argument values used to match list handles narrowed with `when`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, JsonValue>>,
}

/// Metadata for a named list field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Registry name of the list.
    pub name: String,
    /// Whether the field is a connection (`edges { node }` wrapper).
    #[serde(default)]
    pub connection: bool,
    /// Element typename.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Selection {
    /// Creates a selection from a field map.
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            abstract_fields: None,
        }
    }

    /// Parses a selection artifact.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::invalid_selection(e.to_string()))
    }

    /// Adds a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Returns the field set that applies to a record of the given concrete type.
    pub fn fields_for_type(&self, typename: &str) -> &FieldMap {
        let Some(abstract_fields) = &self.abstract_fields else {
            return &self.fields;
        };
        if let Some(fields) = abstract_fields.fields.get(typename) {
            return fields;
        }
        abstract_fields
            .type_map
            .get(typename)
            .and_then(|target| abstract_fields.fields.get(target))
            .unwrap_or(&self.fields)
    }

    /// Returns the field with the given output name, looking through every
    /// concrete-type field set.
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name).or_else(|| {
            self.abstract_fields
                .as_ref()
                .and_then(|a| a.fields.values().find_map(|fields| fields.get(name)))
        })
    }
}

impl Field {
    /// Creates a visible, non-nullable field.
    pub fn new(type_name: impl Into<String>, key_raw: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            key_raw: key_raw.into(),
            visible: true,
            nullable: false,
            abstract_: false,
            selection: None,
            list: None,
            filters: None,
        }
    }

    /// Marks the field hidden.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Marks the field nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the field abstract.
    pub fn abstract_type(mut self) -> Self {
        self.abstract_ = true;
        self
    }

    /// Sets the nested selection.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(Box::new(selection));
        self
    }

    /// Registers the field as a named list.
    pub fn with_list(mut self, meta: ListMeta) -> Self {
        self.list = Some(meta);
        self
    }

    /// Returns true if the field links to other records.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.selection.is_some()
    }
}
