//! Named lists and connections.
//!
//! Every field marked with list metadata registers a `ListInstance` the first
//! time it is written. A `ListHandle` addresses all instances of a name (or
//! a narrowed subset) and applies structural inserts and removals through
//! the writer, so they are diffed and notified like any other write.

use crate::cache::Cache;
use crate::writer::{ListPosition, Writer};
use serde_json::{Map, Value as JsonValue};
use skein_core::{evaluate_key, Error, Field, RecordKey, Result, Selection, Variables};
use std::collections::BTreeMap;
use tracing::debug;

const DEFAULT_EDGES_KEY: &str = "edges";
const DEFAULT_NODE_KEY: &str = "node";

/// Where edges and nodes live inside a connection record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionShape {
    /// Storage key of the edges list on the connection record.
    pub edges_key: String,
    /// Typename of edge records.
    pub edge_type: String,
    /// Storage key of the node link on edge records.
    pub node_key: String,
}

impl ConnectionShape {
    fn from_selection(
        selection: Option<&Selection>,
        list_type: &str,
        variables: &Variables,
    ) -> Self {
        let edges = selection.and_then(|s| s.find_field(DEFAULT_EDGES_KEY));
        let node = edges
            .and_then(|e| e.selection.as_deref())
            .and_then(|s| s.find_field(DEFAULT_NODE_KEY));

        Self {
            edges_key: edges
                .map(|f| evaluate_key(&f.key_raw, variables))
                .unwrap_or_else(|| DEFAULT_EDGES_KEY.into()),
            edge_type: edges
                .map(|f| f.type_name.clone())
                .unwrap_or_else(|| format!("{}Edge", list_type)),
            node_key: node
                .map(|f| evaluate_key(&f.key_raw, variables))
                .unwrap_or_else(|| DEFAULT_NODE_KEY.into()),
        }
    }
}

/// One concrete list: a field of a specific parent record.
#[derive(Clone, Debug, PartialEq)]
pub struct ListInstance {
    /// Registry name.
    pub name: String,
    /// Record holding the list field.
    pub parent: RecordKey,
    /// Evaluated storage key of the list field.
    pub key: String,
    /// Typename declared on the field.
    pub field_type: String,
    /// Typename of list elements.
    pub list_type: String,
    /// Connection layout, None for plain lists.
    pub connection: Option<ConnectionShape>,
    /// Field arguments, with `$variables` resolved.
    pub filters: BTreeMap<String, JsonValue>,
}

impl ListInstance {
    /// Builds the instance for a list field written under `parent`.
    ///
    /// Returns None if the field carries no list metadata.
    pub fn from_field(
        parent: &RecordKey,
        key: &str,
        field: &Field,
        variables: &Variables,
    ) -> Option<Self> {
        let meta = field.list.as_ref()?;
        let connection = meta.connection.then(|| {
            ConnectionShape::from_selection(field.selection.as_deref(), &meta.type_name, variables)
        });
        let filters = field
            .filters
            .iter()
            .flatten()
            .map(|(name, value)| (name.clone(), resolve_filter(value, variables)))
            .collect();

        Some(Self {
            name: meta.name.clone(),
            parent: parent.clone(),
            key: key.to_string(),
            field_type: field.type_name.clone(),
            list_type: meta.type_name.clone(),
            connection,
            filters,
        })
    }

    /// Returns true if every `must` pair equals this instance's filter value.
    pub fn matches(&self, must: &Map<String, JsonValue>) -> bool {
        must.iter()
            .all(|(name, value)| self.filters.get(name) == Some(value))
    }
}

fn resolve_filter(value: &JsonValue, variables: &Variables) -> JsonValue {
    match value.as_str().and_then(|s| s.strip_prefix('$')) {
        Some(name) => variables.get(name).cloned().unwrap_or(JsonValue::Null),
        None => value.clone(),
    }
}

/// Registry of list instances by name.
#[derive(Debug, Default)]
pub struct ListRegistry {
    lists: BTreeMap<String, Vec<ListInstance>>,
}

impl ListRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance, replacing one for the same parent field.
    pub fn register(&mut self, instance: ListInstance) {
        let instances = self.lists.entry(instance.name.clone()).or_default();
        match instances
            .iter_mut()
            .find(|i| i.parent == instance.parent && i.key == instance.key)
        {
            Some(existing) => *existing = instance,
            None => instances.push(instance),
        }
    }

    /// Returns true if some list is registered on this parent field.
    pub fn contains(&self, parent: &RecordKey, key: &str) -> bool {
        self.lists
            .values()
            .flatten()
            .any(|i| &i.parent == parent && i.key == key)
    }

    /// Returns the instances registered under a name.
    pub fn get(&self, name: &str) -> Option<&[ListInstance]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    /// Returns every registered instance.
    ///
    /// Element types are not filtered on: an interface or union list holds
    /// records of several concrete types.
    pub fn all(&self) -> Vec<ListInstance> {
        self.lists.values().flatten().cloned().collect()
    }

    /// Drops the instance registered on a parent field, if any.
    pub fn unregister(&mut self, parent: &RecordKey, key: &str) {
        for instances in self.lists.values_mut() {
            instances.retain(|i| !(&i.parent == parent && i.key == key));
        }
        self.lists.retain(|_, instances| !instances.is_empty());
    }

    /// Drops every instance living on a deleted record.
    pub fn forget_parent(&mut self, parent: &RecordKey) {
        for instances in self.lists.values_mut() {
            instances.retain(|i| &i.parent != parent);
        }
        self.lists.retain(|_, instances| !instances.is_empty());
    }

    /// Returns the number of registered names.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

/// A handle onto every instance of a named list.
///
/// ```ignore
/// cache.list("All_Users")?
///     .when(filters)
///     .prepend(&selection, &json!({ "id": "3", "firstName": "sally" }))?;
/// ```
pub struct ListHandle<'c> {
    cache: &'c mut Cache,
    name: String,
    parent: Option<RecordKey>,
    must: Option<Map<String, JsonValue>>,
}

impl<'c> ListHandle<'c> {
    pub(crate) fn new(cache: &'c mut Cache, name: impl Into<String>) -> Self {
        Self {
            cache,
            name: name.into(),
            parent: None,
            must: None,
        }
    }

    /// Only targets the instance under `parent`.
    pub fn with_parent(mut self, parent: RecordKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Only targets instances whose field filters match every pair.
    pub fn when(mut self, must: Map<String, JsonValue>) -> Self {
        self.must = Some(must);
        self
    }

    /// Returns the targeted instances.
    pub fn instances(&self) -> Vec<ListInstance> {
        self.cache
            .lists
            .get(&self.name)
            .unwrap_or_default()
            .iter()
            .filter(|i| self.parent.as_ref().map_or(true, |p| &i.parent == p))
            .filter(|i| self.must.as_ref().map_or(true, |m| i.matches(m)))
            .cloned()
            .collect()
    }

    /// Returns the number of targeted instances.
    pub fn len(&self) -> usize {
        self.instances().len()
    }

    /// Returns true if no instance is targeted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalizes `data` with `selection` and inserts it at the head of every
    /// targeted instance.
    pub fn prepend(&mut self, selection: &Selection, data: &JsonValue) -> Result<()> {
        self.insert(selection, data, ListPosition::First)
    }

    /// Normalizes `data` with `selection` and inserts it at the tail of every
    /// targeted instance.
    pub fn append(&mut self, selection: &Selection, data: &JsonValue) -> Result<()> {
        self.insert(selection, data, ListPosition::Last)
    }

    /// Removes the entity identified by `data` from every targeted instance.
    pub fn remove(&mut self, data: &JsonValue) -> Result<()> {
        let targets = self.instances();
        let Some(list_type) = targets.first().map(|t| t.list_type.clone()) else {
            return Ok(());
        };
        self.cache.mutate(&Variables::new(), |writer| {
            let object = data
                .as_object()
                .ok_or_else(|| Error::unidentifiable(&list_type))?;
            let node = writer.identify(&list_type, object)?;
            remove_node(writer, &targets, &node);
            Ok(())
        })
    }

    /// Removes the entity with primary key `id` from every targeted instance.
    pub fn remove_id(&mut self, id: &str) -> Result<()> {
        let targets = self.instances();
        self.cache.mutate(&Variables::new(), |writer| {
            for target in &targets {
                let node = RecordKey::entity(&target.list_type, id);
                remove_node(writer, std::slice::from_ref(target), &node);
            }
            Ok(())
        })
    }

    fn insert(
        &mut self,
        selection: &Selection,
        data: &JsonValue,
        position: ListPosition,
    ) -> Result<()> {
        let targets = self.instances();
        let Some(list_type) = targets.first().map(|t| t.list_type.clone()) else {
            debug!(list = %self.name, "no list instance matched, skipping insert");
            return Ok(());
        };

        let name = self.name.clone();
        self.cache.mutate(&Variables::new(), |writer| {
            let node = writer.write_entity(&list_type, selection, data)?;
            for target in &targets {
                writer.insert_into(target, &node, position);
            }
            debug!(list = %name, node = %node, instances = targets.len(), ?position, "inserted into list");
            Ok(())
        })
    }
}

fn remove_node(writer: &mut Writer<'_>, targets: &[ListInstance], node: &RecordKey) {
    for target in targets {
        if writer.remove_from(target, node) {
            debug!(list = %target.name, parent = %target.parent, node = %node, "removed from list");
        }
    }
}
