//! Selection reads.
//!
//! The `Reader` walks a selection against the record store, rebuilds the
//! nested JSON object and computes whether the result is partial. It can
//! optionally record every `(record, field)` pair it looks at, which is what
//! subscriptions are indexed by.

use hashbrown::HashSet;
use serde_json::{Map, Value as JsonValue};
use skein_core::{
    evaluate_key, CacheConfig, Field, FieldValue, ReadResult, RecordKey, Selection, Variables,
};
use skein_reactive::FieldRef;
use skein_storage::RecordStore;
use tracing::trace;

/// A resolved value and whether resolving it hit missing data.
type Resolved = (Option<JsonValue>, bool);

/// Reads selections from a record store.
pub struct Reader<'a> {
    store: &'a RecordStore,
    config: &'a CacheConfig,
    variables: &'a Variables,
    ignore_masking: bool,
    parent_type: Option<&'a str>,
    dependencies: Option<HashSet<FieldRef>>,
}

impl<'a> Reader<'a> {
    /// Creates a reader.
    pub fn new(store: &'a RecordStore, config: &'a CacheConfig, variables: &'a Variables) -> Self {
        Self {
            store,
            config,
            variables,
            ignore_masking: false,
            parent_type: None,
            dependencies: None,
        }
    }

    /// Includes hidden fields in output and partial status.
    pub fn ignore_masking(mut self, ignore: bool) -> Self {
        self.ignore_masking = ignore;
        self
    }

    /// Resolves the starting record's fields as `typename` instead of its
    /// stored typename. Nested records always use their own.
    pub fn parent_type(mut self, typename: Option<&'a str>) -> Self {
        self.parent_type = typename;
        self
    }

    /// Records every field the read looks at.
    pub fn tracking(mut self) -> Self {
        self.dependencies = Some(HashSet::new());
        self
    }

    /// Reads `selection` starting at `parent`.
    ///
    /// A missing starting record yields no data and is not partial.
    pub fn read(&mut self, parent: &RecordKey, selection: &Selection) -> ReadResult {
        match self.read_record(parent, selection, self.parent_type) {
            Some((data, partial)) => ReadResult {
                data: Some(data),
                partial,
            },
            None => ReadResult::empty(),
        }
    }

    /// Consumes the reader, returning the fields it looked at.
    pub fn into_dependencies(self) -> HashSet<FieldRef> {
        self.dependencies.unwrap_or_default()
    }

    fn read_record(
        &mut self,
        key: &RecordKey,
        selection: &Selection,
        typename: Option<&str>,
    ) -> Option<(JsonValue, bool)> {
        let store = self.store;
        let Some(record) = store.get(key) else {
            self.track_missing(key, selection);
            return None;
        };

        let mut out = Map::new();
        let mut partial = false;

        let typename = typename.unwrap_or_else(|| record.typename());
        for (name, field) in selection.fields_for_type(typename) {
            let field_key = evaluate_key(&field.key_raw, self.variables);
            self.track(key, &field_key);

            let (value, field_partial) = self.resolve(field, record.get(&field_key));
            if !(field.visible || self.ignore_masking) {
                continue;
            }
            if field_partial {
                trace!(record = %key, field = %field_key, "unresolved field");
            }
            partial |= field_partial;
            if let Some(value) = value {
                out.insert(name.clone(), value);
            }
        }

        Some((JsonValue::Object(out), partial))
    }

    fn resolve(&mut self, field: &Field, stored: Option<&FieldValue>) -> Resolved {
        let nested = field.selection.as_deref();
        match (stored, nested) {
            (None, _) => (None, self.absent_is_partial(field)),
            (Some(FieldValue::Null), _) => (Some(JsonValue::Null), !field.nullable),
            (Some(FieldValue::Scalar(value)), None) => (Some(value.clone()), false),
            (Some(FieldValue::Link(key)), Some(selection)) => self.resolve_link(key, selection),
            (Some(FieldValue::List(entries)), Some(selection)) => {
                self.resolve_list(entries, selection)
            }
            // Stored shape does not match the selection: treat as missing.
            (Some(_), _) => (None, true),
        }
    }

    fn resolve_link(&mut self, key: &RecordKey, selection: &Selection) -> Resolved {
        match self.read_record(key, selection, None) {
            Some((value, partial)) => (Some(value), partial),
            None => (Some(JsonValue::Null), true),
        }
    }

    fn resolve_list(&mut self, entries: &[FieldValue], selection: &Selection) -> Resolved {
        let mut items = Vec::with_capacity(entries.len());
        let mut partial = false;

        for entry in entries {
            let (value, entry_partial) = match entry {
                FieldValue::Null => (Some(JsonValue::Null), false),
                FieldValue::Link(key) => self.resolve_link(key, selection),
                FieldValue::List(inner) => self.resolve_list(inner, selection),
                FieldValue::Scalar(_) => (Some(JsonValue::Null), true),
            };
            partial |= entry_partial;
            items.push(value.unwrap_or(JsonValue::Null));
        }

        (Some(JsonValue::Array(items)), partial)
    }

    fn absent_is_partial(&self, field: &Field) -> bool {
        !field.nullable || self.config.nullable_absent_is_partial
    }

    fn track(&mut self, record: &RecordKey, field: &str) {
        if let Some(deps) = &mut self.dependencies {
            deps.insert(FieldRef::new(record.clone(), field));
        }
    }

    /// Tracks the fields of a record that does not exist yet, so writing it
    /// later reaches the reader's subscription.
    fn track_missing(&mut self, key: &RecordKey, selection: &Selection) {
        if self.dependencies.is_none() {
            return;
        }
        let abstract_sets = selection
            .abstract_fields
            .iter()
            .flat_map(|a| a.fields.values());
        let field_sets: Vec<_> = std::iter::once(&selection.fields).chain(abstract_sets).collect();
        for fields in field_sets {
            for field in fields.values() {
                let field_key = evaluate_key(&field.key_raw, self.variables);
                self.track(key, &field_key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn selection(value: JsonValue) -> Selection {
        Selection::from_json(value).unwrap()
    }

    fn viewer_selection() -> Selection {
        selection(json!({
            "fields": {
                "viewer": {
                    "type": "User", "visible": true, "keyRaw": "viewer",
                    "selection": { "fields": {
                        "id": { "type": "ID", "visible": true, "keyRaw": "id" },
                        "firstName": { "type": "String", "visible": true, "keyRaw": "firstName" },
                        "secret": { "type": "String", "keyRaw": "secret" }
                    }}
                }
            }
        }))
    }

    fn seeded_store() -> RecordStore {
        let mut store = RecordStore::new();
        let viewer = RecordKey::entity("User", "1");
        store.ensure(&RecordKey::root(), "Query");
        store.set(&RecordKey::root(), "viewer", FieldValue::Link(viewer.clone()));
        store.set(&viewer, "id", FieldValue::Scalar(json!("1")));
        store.set(&viewer, "firstName", FieldValue::Scalar(json!("bob")));
        store
    }

    #[test]
    fn test_read_empty_store() {
        let store = RecordStore::new();
        let config = CacheConfig::default();
        let variables = Variables::new();
        let result = Reader::new(&store, &config, &variables).read(&RecordKey::root(), &viewer_selection());

        assert_eq!(result, ReadResult { data: None, partial: false });
    }

    #[test]
    fn test_read_hidden_field_not_partial() {
        let store = seeded_store();
        let config = CacheConfig::default();
        let variables = Variables::new();
        let result = Reader::new(&store, &config, &variables).read(&RecordKey::root(), &viewer_selection());

        assert!(!result.partial);
        assert_eq!(
            result.data,
            Some(json!({ "viewer": { "id": "1", "firstName": "bob" } }))
        );
    }

    #[test]
    fn test_read_ignore_masking() {
        let store = seeded_store();
        let config = CacheConfig::default();
        let variables = Variables::new();
        let result = Reader::new(&store, &config, &variables)
            .ignore_masking(true)
            .read(&RecordKey::root(), &viewer_selection());

        // The hidden field now counts and is missing
        assert!(result.partial);
    }

    #[test]
    fn test_read_dangling_link_is_partial() {
        let mut store = RecordStore::new();
        store.set(
            &RecordKey::root(),
            "viewer",
            FieldValue::Link(RecordKey::entity("User", "9")),
        );
        let config = CacheConfig::default();
        let variables = Variables::new();
        let result = Reader::new(&store, &config, &variables).read(&RecordKey::root(), &viewer_selection());

        assert!(result.partial);
        assert_eq!(result.data, Some(json!({ "viewer": null })));
    }

    #[test]
    fn test_read_explicit_null_policy() {
        let mut store = RecordStore::new();
        store.set(&RecordKey::root(), "viewer", FieldValue::Null);
        let config = CacheConfig::default();
        let variables = Variables::new();

        // viewer is not nullable: stored null is reported but partial
        let result = Reader::new(&store, &config, &variables).read(&RecordKey::root(), &viewer_selection());
        assert!(result.partial);
        assert_eq!(result.data, Some(json!({ "viewer": null })));

        let mut nullable = viewer_selection();
        nullable.fields.get_mut("viewer").unwrap().nullable = true;
        let result = Reader::new(&store, &config, &variables).read(&RecordKey::root(), &nullable);
        assert!(!result.partial);
    }

    #[test]
    fn test_read_absent_nullable_policy() {
        let mut store = RecordStore::new();
        store.ensure(&RecordKey::root(), "Query");
        let mut sel = viewer_selection();
        sel.fields.get_mut("viewer").unwrap().nullable = true;
        let variables = Variables::new();

        let strict = CacheConfig::default();
        let result = Reader::new(&store, &strict, &variables).read(&RecordKey::root(), &sel);
        assert!(result.partial);

        let lenient = CacheConfig {
            nullable_absent_is_partial: false,
            ..CacheConfig::default()
        };
        let result = Reader::new(&store, &lenient, &variables).read(&RecordKey::root(), &sel);
        assert!(!result.partial);
        assert_eq!(result.data, Some(json!({})));
    }

    #[test]
    fn test_read_parent_type_override() {
        let store = seeded_store();
        let config = CacheConfig::default();
        let variables = Variables::new();
        let sel = selection(json!({
            "fields": {},
            "abstractFields": {
                "fields": {
                    "Subscription": {
                        "viewer": {
                            "type": "User", "visible": true, "keyRaw": "viewer",
                            "selection": { "fields": {
                                "firstName": { "type": "String", "visible": true, "keyRaw": "firstName" }
                            }}
                        }
                    }
                },
                "typeMap": {}
            }
        }));

        let stored = Reader::new(&store, &config, &variables).read(&RecordKey::root(), &sel);
        assert_eq!(stored.data, Some(json!({})));

        let result = Reader::new(&store, &config, &variables)
            .parent_type(Some("Subscription"))
            .read(&RecordKey::root(), &sel);
        assert_eq!(result.data, Some(json!({ "viewer": { "firstName": "bob" } })));
    }

    #[test]
    fn test_read_tracks_dependencies() {
        let store = seeded_store();
        let config = CacheConfig::default();
        let variables = Variables::new();
        let mut reader = Reader::new(&store, &config, &variables).tracking();
        reader.read(&RecordKey::root(), &viewer_selection());
        let deps = reader.into_dependencies();

        let viewer = RecordKey::entity("User", "1");
        assert!(deps.contains(&FieldRef::new(RecordKey::root(), "viewer")));
        assert!(deps.contains(&FieldRef::new(viewer.clone(), "firstName")));
        // Hidden fields are still watched
        assert!(deps.contains(&FieldRef::new(viewer, "secret")));
        assert_eq!(deps.len(), 4);
    }

    #[test]
    fn test_read_tracks_missing_root() {
        let store = RecordStore::new();
        let config = CacheConfig::default();
        let variables = Variables::new();
        let mut reader = Reader::new(&store, &config, &variables).tracking();
        reader.read(&RecordKey::root(), &viewer_selection());

        let deps = reader.into_dependencies();
        assert!(deps.contains(&FieldRef::new(RecordKey::root(), "viewer")));
    }

    #[test]
    fn test_read_without_tracking_records_nothing() {
        let store = seeded_store();
        let config = CacheConfig::default();
        let variables = Variables::new();
        let mut reader = Reader::new(&store, &config, &variables);
        reader.read(&RecordKey::root(), &viewer_selection());
        assert!(reader.into_dependencies().is_empty());
    }
}
