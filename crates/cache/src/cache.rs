//! The cache facade.
//!
//! `Cache` owns the record store, the list registry and the subscriptions.
//! Every mutation funnels through a `Writer`; the resulting change set is
//! routed to affected subscriptions, which are re-read and notified before
//! the mutating call returns. A mutation that fails is rolled back and
//! notifies nobody.

use crate::lists::{ListHandle, ListRegistry};
use crate::reader::Reader;
use crate::writer::Writer;
use hashbrown::HashSet;
use serde_json::Value as JsonValue;
use skein_core::{CacheConfig, Error, ReadResult, RecordKey, Result, Selection, Variables};
use skein_reactive::{
    ChangeSet, FieldRef, SubscriptionId, SubscriptionManager, SubscriptionSpec, DEFAULT_ROOT_TYPE,
};
use skein_storage::RecordStore;
use tracing::{debug, warn};

/// Options for `Cache::write_with`.
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    /// Record to write into; the root when None.
    pub parent: Option<RecordKey>,
    /// Typename of the root record, `Query` when None.
    pub root_type: Option<String>,
    /// Variables used to evaluate field keys.
    pub variables: Variables,
}

impl WriteOptions {
    /// Writes into `parent` instead of the root.
    pub fn parent(mut self, parent: RecordKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the root typename.
    pub fn root_type(mut self, root_type: impl Into<String>) -> Self {
        self.root_type = Some(root_type.into());
        self
    }

    /// Sets the variables.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

/// Options for `Cache::read_with`.
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// Record to read from; the root when None.
    pub parent: Option<RecordKey>,
    /// Typename used to pick the starting record's fields; its stored
    /// typename when None.
    pub root_type: Option<String>,
    /// Variables used to evaluate field keys.
    pub variables: Variables,
    /// Include hidden fields in output and partial status.
    pub ignore_masking: bool,
}

impl ReadOptions {
    /// Reads from `parent` instead of the root.
    pub fn parent(mut self, parent: RecordKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Resolves the starting record's fields as `root_type`.
    pub fn root_type(mut self, root_type: impl Into<String>) -> Self {
        self.root_type = Some(root_type.into());
        self
    }

    /// Sets the variables.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Includes hidden fields.
    pub fn ignore_masking(mut self, ignore: bool) -> Self {
        self.ignore_masking = ignore;
        self
    }
}

/// A normalized, in-memory cache.
pub struct Cache {
    pub(crate) store: RecordStore,
    pub(crate) lists: ListRegistry,
    subscriptions: SubscriptionManager,
    config: CacheConfig,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// Creates an empty cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates an empty cache.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            store: RecordStore::new(),
            lists: ListRegistry::new(),
            subscriptions: SubscriptionManager::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the record store.
    #[inline]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Returns the list registry.
    #[inline]
    pub fn lists(&self) -> &ListRegistry {
        &self.lists
    }

    /// Writes a payload at the root.
    pub fn write(&mut self, selection: &Selection, data: &JsonValue) -> Result<()> {
        self.write_with(selection, data, WriteOptions::default())
    }

    /// Writes a payload, then notifies every subscription reading a changed field.
    ///
    /// A payload that is not an object is skipped.
    pub fn write_with(
        &mut self,
        selection: &Selection,
        data: &JsonValue,
        options: WriteOptions,
    ) -> Result<()> {
        let Some(object) = data.as_object() else {
            warn!("skipping write of non-object payload");
            return Ok(());
        };

        let parent = options.parent.unwrap_or_else(RecordKey::root);
        let parent_type = if parent.is_root() {
            options
                .root_type
                .unwrap_or_else(|| DEFAULT_ROOT_TYPE.to_string())
        } else {
            self.store
                .get(&parent)
                .map(|record| record.typename().to_string())
                .unwrap_or_else(|| parent.typename().to_string())
        };

        self.mutate(&options.variables, |writer| {
            writer.write_selection(&parent, &parent_type, selection, object)
        })
    }

    /// Reads a selection from the root.
    pub fn read(&self, selection: &Selection) -> ReadResult {
        self.read_with(selection, &ReadOptions::default())
    }

    /// Reads a selection.
    pub fn read_with(&self, selection: &Selection, options: &ReadOptions) -> ReadResult {
        let parent = options.parent.clone().unwrap_or_else(RecordKey::root);
        Reader::new(&self.store, &self.config, &options.variables)
            .ignore_masking(options.ignore_masking)
            .parent_type(options.root_type.as_deref())
            .read(&parent, selection)
    }

    /// Registers a subscription and indexes the fields it currently reads.
    ///
    /// The callback is not invoked until a write changes one of those fields.
    pub fn subscribe(&mut self, spec: SubscriptionSpec) -> SubscriptionId {
        let id = self.subscriptions.subscribe(spec);
        if let Some((_, dependencies)) = self.reread(id) {
            debug!(subscription = id, fields = dependencies.len(), "subscribed");
            self.subscriptions.update_dependencies(id, dependencies);
        }
        id
    }

    /// Removes a subscription. Unknown IDs are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Returns the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns a handle onto every list registered under `name`.
    pub fn list(&mut self, name: &str) -> Result<ListHandle<'_>> {
        if self.lists.get(name).is_none() {
            return Err(Error::unknown_list(name));
        }
        Ok(ListHandle::new(self, name))
    }

    /// Deletes a record, removing it from every registered list first.
    ///
    /// Returns true if the record existed.
    pub fn delete(&mut self, key: &RecordKey) -> bool {
        if !self.store.contains(key) {
            return false;
        }
        let targets = self.lists.all();

        let deleted = self.mutate(&Variables::new(), |writer| {
            for target in &targets {
                writer.remove_from(target, key);
            }
            Ok(writer.delete_record(key))
        });
        self.lists.forget_parent(key);

        debug!(record = %key, lists = targets.len(), "deleted record");
        matches!(deleted, Ok(true))
    }

    /// Runs `f` against a writer, then notifies on whatever it changed.
    ///
    /// If `f` fails, everything it wrote is rolled back and nobody is notified.
    pub(crate) fn mutate<T>(
        &mut self,
        variables: &Variables,
        f: impl FnOnce(&mut Writer<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut writer = Writer::new(&mut self.store, &mut self.lists, &self.config, variables);
        match f(&mut writer) {
            Ok(value) => {
                let changes = writer.finish();
                self.notify(&changes);
                Ok(value)
            }
            Err(err) => {
                let undone = writer.rollback();
                debug!(undone, error = %err, "rolled back failed write");
                Err(err)
            }
        }
    }

    fn notify(&mut self, changes: &ChangeSet) {
        if changes.is_empty() {
            return;
        }

        let affected = self.subscriptions.affected(changes);
        for &id in &affected {
            let Some((result, dependencies)) = self.reread(id) else {
                continue;
            };
            self.subscriptions.update_dependencies(id, dependencies);
            self.subscriptions.notify(id, &result);
        }

        debug!(
            fields = changes.len(),
            subscribers = affected.len(),
            "applied changes"
        );
    }

    fn reread(&self, id: SubscriptionId) -> Option<(ReadResult, HashSet<FieldRef>)> {
        let subscription = self.subscriptions.get(id)?;
        let root_type = subscription
            .parent()
            .is_root()
            .then(|| subscription.root_type());
        let mut reader = Reader::new(&self.store, &self.config, subscription.variables())
            .parent_type(root_type)
            .tracking();
        let result = reader.read(subscription.parent(), subscription.selection());
        Some((result, reader.into_dependencies()))
    }
}
