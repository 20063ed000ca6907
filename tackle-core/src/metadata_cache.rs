use crate::{
    Error, ObjectName, Result, ScalarFunctionMetadata, StoredProcedureMetadata,
    TableOrViewMetadata,
};
use dashmap::DashMap;
use std::sync::Arc;

/// External collaborator that reads schema facts out of a connected database.
///
/// Only `load_table_or_view` is mandatory; the other loaders default to "not
/// supported" so embedded schemas can register metadata directly instead.
pub trait SchemaProvider: Send + Sync {
    fn load_table_or_view(&self, name: &ObjectName) -> Result<Option<TableOrViewMetadata>>;

    fn load_stored_procedure(
        &self,
        _name: &ObjectName,
    ) -> Result<Option<StoredProcedureMetadata>> {
        Ok(None)
    }

    fn load_scalar_function(&self, _name: &ObjectName) -> Result<Option<ScalarFunctionMetadata>> {
        Ok(None)
    }

    fn list_tables(&self) -> Result<Vec<ObjectName>> {
        Ok(Vec::new())
    }

    fn list_views(&self) -> Result<Vec<ObjectName>> {
        Ok(Vec::new())
    }
}

/// Per-object-name schema facts for one data source.
///
/// Read-mostly concurrent maps; each entry is constructed fully before being
/// published, concurrent duplicate builds are tolerated and the loser is
/// discarded (first writer wins). Entries are never invalidated automatically;
/// a schema change requires an explicit [`reset`](MetadataCache::reset).
#[derive(Default)]
pub struct MetadataCache {
    provider: Option<Arc<dyn SchemaProvider>>,
    tables: DashMap<ObjectName, Arc<TableOrViewMetadata>>,
    procedures: DashMap<ObjectName, Arc<StoredProcedureMetadata>>,
    functions: DashMap<ObjectName, Arc<ScalarFunctionMetadata>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: Arc<dyn SchemaProvider>) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }

    /// Publishes metadata directly, bypassing the provider. Used by embedded
    /// schemas and tests.
    pub fn register_table(&self, metadata: TableOrViewMetadata) {
        self.tables
            .insert(metadata.name.clone(), Arc::new(metadata));
    }

    /// Publishes metadata only when the name is not already known, keeping
    /// provider-loaded facts authoritative over entity declarations.
    pub fn register_table_default(&self, metadata: TableOrViewMetadata) {
        self.tables
            .entry(metadata.name.clone())
            .or_insert_with(|| Arc::new(metadata));
    }

    pub fn register_procedure(&self, metadata: StoredProcedureMetadata) {
        self.procedures
            .insert(metadata.name.clone(), Arc::new(metadata));
    }

    pub fn register_function(&self, metadata: ScalarFunctionMetadata) {
        self.functions
            .insert(metadata.name.clone(), Arc::new(metadata));
    }

    /// Resolves a table or view by name, loading it through the provider on
    /// first use. Unknown names fail with [`Error::MissingObject`], never an
    /// empty record.
    pub fn table_or_view(&self, name: &ObjectName) -> Result<Arc<TableOrViewMetadata>> {
        if let Some(hit) = self.tables.get(name) {
            return Ok(hit.value().clone());
        }
        let Some(provider) = &self.provider else {
            return Err(Error::MissingObject(name.clone()));
        };
        let Some(loaded) = provider.load_table_or_view(name)? else {
            return Err(Error::MissingObject(name.clone()));
        };
        // Entry is fully built before publication; a concurrent loser is
        // simply discarded.
        Ok(self
            .tables
            .entry(name.clone())
            .or_insert_with(|| Arc::new(loaded))
            .clone())
    }

    pub fn stored_procedure(&self, name: &ObjectName) -> Result<Arc<StoredProcedureMetadata>> {
        if let Some(hit) = self.procedures.get(name) {
            return Ok(hit.value().clone());
        }
        let loaded = self
            .provider
            .as_ref()
            .and_then(|p| p.load_stored_procedure(name).transpose())
            .transpose()?
            .ok_or_else(|| Error::MissingObject(name.clone()))?;
        Ok(self
            .procedures
            .entry(name.clone())
            .or_insert_with(|| Arc::new(loaded))
            .clone())
    }

    pub fn scalar_function(&self, name: &ObjectName) -> Result<Arc<ScalarFunctionMetadata>> {
        if let Some(hit) = self.functions.get(name) {
            return Ok(hit.value().clone());
        }
        let loaded = self
            .provider
            .as_ref()
            .and_then(|p| p.load_scalar_function(name).transpose())
            .transpose()?
            .ok_or_else(|| Error::MissingObject(name.clone()))?;
        Ok(self
            .functions
            .entry(name.clone())
            .or_insert_with(|| Arc::new(loaded))
            .clone())
    }

    /// Eagerly populates every table the provider can list.
    pub fn preload_tables(&self) -> Result<usize> {
        let Some(provider) = &self.provider else {
            return Ok(0);
        };
        let names = provider.list_tables()?;
        let count = names.len();
        for name in names {
            self.table_or_view(&name)?;
        }
        Ok(count)
    }

    /// Eagerly populates every view the provider can list.
    pub fn preload_views(&self) -> Result<usize> {
        let Some(provider) = &self.provider else {
            return Ok(0);
        };
        let names = provider.list_views()?;
        let count = names.len();
        for name in names {
            self.table_or_view(&name)?;
        }
        Ok(count)
    }

    /// Eagerly populates tables and views, for discovery scenarios.
    pub fn preload(&self) -> Result<usize> {
        Ok(self.preload_tables()? + self.preload_views()?)
    }

    /// Drops every cached entry, the explicit reload point after a schema
    /// change.
    pub fn reset(&self) {
        self.tables.clear();
        self.procedures.clear();
        self.functions.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len() + self.procedures.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
