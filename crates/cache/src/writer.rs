//! Payload normalization.
//!
//! The `Writer` walks a selection alongside a JSON payload, splits nested
//! objects into their own records and stores links to them. Every store
//! mutation goes through `set_field`, which compares against the stored
//! value and records real changes in a `ChangeSet`. Mutations are journaled
//! so a write that fails partway can be rolled back with `rollback`.

use crate::lists::{ListInstance, ListRegistry};
use serde_json::{Map, Value as JsonValue};
use skein_core::{
    evaluate_key, CacheConfig, Error, Field, FieldValue, RecordKey, Result, Selection, Variables,
};
use skein_reactive::ChangeSet;
use skein_storage::{Journal, RecordStore};
use tracing::{trace, warn};

/// Field carrying the concrete type of abstract payload objects.
pub const TYPENAME_FIELD: &str = "__typename";

/// Where a structural list insert goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListPosition {
    /// Head of the list.
    First,
    /// Tail of the list.
    Last,
}

/// Normalizes payloads into a record store and collects changed fields.
pub struct Writer<'a> {
    store: &'a mut RecordStore,
    lists: &'a mut ListRegistry,
    config: &'a CacheConfig,
    variables: &'a Variables,
    changes: ChangeSet,
    journal: Journal,
    /// Lists first registered by this writer, as `(parent, key)`.
    registered: Vec<(RecordKey, String)>,
}

impl<'a> Writer<'a> {
    /// Creates a writer over a store.
    pub fn new(
        store: &'a mut RecordStore,
        lists: &'a mut ListRegistry,
        config: &'a CacheConfig,
        variables: &'a Variables,
    ) -> Self {
        Self {
            store,
            lists,
            config,
            variables,
            changes: ChangeSet::new(),
            journal: Journal::new(),
            registered: Vec::new(),
        }
    }

    /// Writes `data` into the record `parent` following `selection`.
    ///
    /// Fields absent from `data` are left untouched. The parent record is
    /// created with `parent_type` if it does not exist yet.
    pub fn write_selection(
        &mut self,
        parent: &RecordKey,
        parent_type: &str,
        selection: &Selection,
        data: &Map<String, JsonValue>,
    ) -> Result<()> {
        if self.journal.ensure(self.store, parent, parent_type) {
            trace!(record = %parent, "created record");
        }

        for (name, field) in selection.fields_for_type(parent_type) {
            let Some(value) = data.get(name) else {
                continue;
            };
            let key = evaluate_key(&field.key_raw, self.variables);

            let Some(nested) = field.selection.as_deref() else {
                self.set_field(parent, &key, FieldValue::from(value.clone()));
                continue;
            };

            let stored = match value {
                JsonValue::Null => FieldValue::Null,
                JsonValue::Object(object) => {
                    let child = self.write_object(field, nested, object, parent, &key)?;
                    FieldValue::Link(child)
                }
                JsonValue::Array(items) => {
                    self.write_list(field, nested, items, parent, &key, &mut Vec::new())?
                }
                other => {
                    warn!(
                        record = %parent,
                        field = %key,
                        value = %other,
                        "expected an object or list for linked field, skipping"
                    );
                    continue;
                }
            };
            self.set_field(parent, &key, stored);

            if field.list.is_some() {
                self.register_list(parent, &key, field);
            }
        }

        Ok(())
    }

    /// Normalizes one object of a linked field and returns its key.
    fn write_object(
        &mut self,
        field: &Field,
        selection: &Selection,
        object: &Map<String, JsonValue>,
        parent: &RecordKey,
        segment: &str,
    ) -> Result<RecordKey> {
        let typename = self.resolve_typename(field, object)?;
        let key = match self.config.compute_id(&typename, object) {
            Some(id) => RecordKey::entity(&typename, id),
            None => RecordKey::embedded(&typename, parent, segment),
        };
        self.write_selection(&key, &typename, selection, object)?;
        Ok(key)
    }

    /// Normalizes each element of a list payload. Nulls stay nulls.
    fn write_list(
        &mut self,
        field: &Field,
        selection: &Selection,
        items: &[JsonValue],
        parent: &RecordKey,
        key: &str,
        indices: &mut Vec<usize>,
    ) -> Result<FieldValue> {
        let mut entries = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            indices.push(i);
            let entry = match item {
                JsonValue::Null => FieldValue::Null,
                JsonValue::Object(object) => {
                    let segment = RecordKey::list_segment(key, indices);
                    FieldValue::Link(self.write_object(field, selection, object, parent, &segment)?)
                }
                JsonValue::Array(inner) => {
                    self.write_list(field, selection, inner, parent, key, indices)?
                }
                other => {
                    warn!(
                        record = %parent,
                        field = %key,
                        value = %other,
                        "expected an object in linked list, storing null"
                    );
                    FieldValue::Null
                }
            };
            indices.pop();
            entries.push(entry);
        }

        Ok(FieldValue::List(entries))
    }

    fn resolve_typename(&self, field: &Field, object: &Map<String, JsonValue>) -> Result<String> {
        if !field.abstract_ {
            return Ok(field.type_name.clone());
        }
        object
            .get(TYPENAME_FIELD)
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::missing_typename(&field.key_raw))
    }

    fn register_list(&mut self, parent: &RecordKey, key: &str, field: &Field) {
        if self.lists.contains(parent, key) {
            return;
        }
        if let Some(instance) = ListInstance::from_field(parent, key, field, self.variables) {
            trace!(list = %instance.name, parent = %parent, field = %key, "registered list");
            self.lists.register(instance);
            self.registered.push((parent.clone(), key.to_string()));
        }
    }

    /// Normalizes a standalone entity, e.g. a value inserted into a list.
    ///
    /// Unlike nested objects, a standalone value must be identifiable.
    pub fn write_entity(
        &mut self,
        default_type: &str,
        selection: &Selection,
        data: &JsonValue,
    ) -> Result<RecordKey> {
        let object = data
            .as_object()
            .ok_or_else(|| Error::unidentifiable(default_type))?;
        let key = self.identify(default_type, object)?;
        self.write_selection(&key, key.typename(), selection, object)?;
        Ok(key)
    }

    /// Computes the entity key of a payload object without writing it.
    pub fn identify(
        &self,
        default_type: &str,
        object: &Map<String, JsonValue>,
    ) -> Result<RecordKey> {
        let typename = object
            .get(TYPENAME_FIELD)
            .and_then(JsonValue::as_str)
            .unwrap_or(default_type);
        self.config
            .compute_id(typename, object)
            .map(|id| RecordKey::entity(typename, id))
            .ok_or_else(|| Error::unidentifiable(typename))
    }

    /// Stores a field value if it differs from the stored one.
    ///
    /// Returns true if the store changed.
    pub fn set_field(&mut self, record: &RecordKey, field: &str, value: FieldValue) -> bool {
        if self.store.get_field(record, field) == Some(&value) {
            return false;
        }
        trace!(record = %record, field = %field, "field changed");
        self.journal.set(self.store, record, field, value);
        self.changes.add(record, field);
        true
    }

    /// Inserts an entry at the head or tail of a stored list.
    ///
    /// A missing or non-list field starts a new list.
    pub fn insert_link(
        &mut self,
        record: &RecordKey,
        field: &str,
        entry: FieldValue,
        position: ListPosition,
    ) -> bool {
        let mut entries = match self.store.get_field(record, field) {
            Some(FieldValue::List(entries)) => entries.clone(),
            _ => Vec::new(),
        };
        match position {
            ListPosition::First => entries.insert(0, entry),
            ListPosition::Last => entries.push(entry),
        }
        self.set_field(record, field, FieldValue::List(entries))
    }

    /// Removes every reference to `target` from a stored value.
    pub fn remove_link(&mut self, record: &RecordKey, field: &str, target: &RecordKey) -> bool {
        let Some(current) = self.store.get_field(record, field) else {
            return false;
        };
        if !current.references(target) {
            return false;
        }
        let pruned = current.without(target);
        self.set_field(record, field, pruned)
    }

    /// Inserts `node` into one list instance.
    ///
    /// For connections a fresh edge record wrapping the node is created; it
    /// carries only the node link, so fields other selections read on edges
    /// (such as `cursor`) stay absent on this edge alone.
    pub fn insert_into(
        &mut self,
        instance: &ListInstance,
        node: &RecordKey,
        position: ListPosition,
    ) {
        if !self.store.contains(&instance.parent) {
            trace!(
                list = %instance.name,
                parent = %instance.parent,
                "skipping list with deleted parent"
            );
            return;
        }

        let Some(shape) = &instance.connection else {
            self.insert_link(
                &instance.parent,
                &instance.key,
                FieldValue::Link(node.clone()),
                position,
            );
            return;
        };

        let connection = match self.store.get_field(&instance.parent, &instance.key) {
            Some(FieldValue::Link(key)) => key.clone(),
            _ => {
                let key =
                    RecordKey::embedded(&instance.field_type, &instance.parent, &instance.key);
                self.journal.ensure(self.store, &key, &instance.field_type);
                self.set_field(&instance.parent, &instance.key, FieldValue::Link(key.clone()));
                key
            }
        };

        let edge = RecordKey::embedded(
            &shape.edge_type,
            &connection,
            &format!("{}#{}", shape.edges_key, node),
        );
        self.journal.ensure(self.store, &edge, &shape.edge_type);
        self.set_field(&edge, &shape.node_key, FieldValue::Link(node.clone()));
        self.insert_link(&connection, &shape.edges_key, FieldValue::Link(edge), position);
    }

    /// Removes `node` from one list instance.
    ///
    /// Returns true if anything was removed.
    pub fn remove_from(&mut self, instance: &ListInstance, node: &RecordKey) -> bool {
        let Some(shape) = &instance.connection else {
            return self.remove_link(&instance.parent, &instance.key, node);
        };

        let Some(FieldValue::Link(connection)) =
            self.store.get_field(&instance.parent, &instance.key).cloned()
        else {
            return false;
        };
        let Some(FieldValue::List(edges)) =
            self.store.get_field(&connection, &shape.edges_key).cloned()
        else {
            return false;
        };

        let mut removed = false;
        for edge in edges.iter().filter_map(FieldValue::as_link) {
            let points_at_node = self
                .store
                .get_field(edge, &shape.node_key)
                .map(|v| v.references(node))
                .unwrap_or(false);
            if points_at_node {
                removed |= self.remove_link(&connection, &shape.edges_key, edge);
            }
        }
        removed
    }

    /// Deletes a record, marking all of its fields as changed.
    pub fn delete_record(&mut self, key: &RecordKey) -> bool {
        let Some(record) = self.journal.delete(self.store, key) else {
            return false;
        };
        for (field, _) in record.fields() {
            self.changes.add(key, field);
        }
        true
    }

    /// Consumes the writer, returning the changed fields.
    pub fn finish(self) -> ChangeSet {
        self.changes
    }

    /// Consumes the writer, undoing everything it did.
    ///
    /// Returns the number of store mutations undone.
    pub fn rollback(self) -> usize {
        for (parent, key) in &self.registered {
            self.lists.unregister(parent, key);
        }
        self.journal.rollback(self.store)
    }
}
