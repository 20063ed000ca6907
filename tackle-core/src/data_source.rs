use crate::{
    AsValue, AuditRule, BindPlanCache, CommandKind, Entity, ExecutionListener, ExecutionToken,
    Filter, FromBuilder, LockKind, MetadataCache, NonQueryCommand, ObjectCommand, ObjectName,
    OperationKind, ProcedureBuilder, RawBuilder, Result, ResultCache, RowOptions, RowsCommand,
    SchemaProvider, SqlBuilder, SqlDialect, Statement, Value,
};
use crate::sql_builder::DesiredColumns;
use std::{borrow::Cow, marker::PhantomData, sync::Arc, time::Duration};

/// Behavior knobs of a data source. Derived sources copy and adjust these
/// without touching the parent.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    /// Reject argument properties that match no column instead of skipping
    /// them.
    pub strict: bool,
    /// Applied to every token that does not set its own timeout.
    pub default_timeout: Option<Duration>,
}

/// Entry point of the toolkit: one database, one dialect, shared caches.
///
/// Cheap to derive: [`with_settings`](DataSource::with_settings) and friends
/// return an adjusted copy that shares the metadata and bind-plan caches with
/// its parent, so per-call-site variations cost nothing but a clone of the
/// settings struct.
pub struct DataSource<D: SqlDialect> {
    pub(crate) name: String,
    pub(crate) dialect: D,
    pub(crate) settings: Settings,
    pub(crate) metadata: Arc<MetadataCache>,
    pub(crate) plans: Arc<BindPlanCache>,
    pub(crate) audit_rules: Vec<Arc<dyn AuditRule>>,
    pub(crate) cache: Option<Arc<dyn ResultCache>>,
    pub(crate) listeners: Vec<Arc<dyn ExecutionListener>>,
}

impl<D: SqlDialect + Clone> Clone for DataSource<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            dialect: self.dialect.clone(),
            settings: self.settings.clone(),
            metadata: self.metadata.clone(),
            plans: self.plans.clone(),
            audit_rules: self.audit_rules.clone(),
            cache: self.cache.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

impl<D: SqlDialect + Clone> DataSource<D> {
    pub fn new(name: impl Into<String>, dialect: D) -> Self {
        Self {
            name: name.into(),
            dialect,
            settings: Settings::default(),
            metadata: Arc::new(MetadataCache::new()),
            plans: Arc::new(BindPlanCache::new()),
            audit_rules: Vec::new(),
            cache: None,
            listeners: Vec::new(),
        }
    }

    /// A data source loading its metadata from the given provider on demand.
    pub fn with_provider(
        name: impl Into<String>,
        dialect: D,
        provider: Arc<dyn SchemaProvider>,
    ) -> Self {
        Self {
            metadata: Arc::new(MetadataCache::with_provider(provider)),
            ..Self::new(name, dialect)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metadata(&self) -> &MetadataCache {
        self.metadata.as_ref()
    }

    pub fn plans(&self) -> &BindPlanCache {
        self.plans.as_ref()
    }

    pub fn cache(&self) -> Option<&Arc<dyn ResultCache>> {
        self.cache.as_ref()
    }

    /// Derives a copy with adjusted settings, sharing every cache.
    pub fn with_settings(&self, configure: impl FnOnce(&mut Settings)) -> Self {
        let mut derived = self.clone();
        configure(&mut derived.settings);
        derived
    }

    pub fn with_cache(&self, cache: Arc<dyn ResultCache>) -> Self {
        let mut derived = self.clone();
        derived.cache = Some(cache);
        derived
    }

    pub fn with_audit_rule(&self, rule: Arc<dyn AuditRule>) -> Self {
        let mut derived = self.clone();
        derived.audit_rules.push(rule);
        derived
    }

    /// Attaches a listener to every token this source builds.
    pub fn with_listener(&self, listener: Arc<dyn ExecutionListener>) -> Self {
        let mut derived = self.clone();
        derived.listeners.push(listener);
        derived
    }

    pub(crate) fn make_token(
        &self,
        operation: impl Into<Cow<'static, str>>,
        statement: Statement,
        kind: CommandKind,
        lock: LockKind,
    ) -> ExecutionToken {
        let mut token = ExecutionToken::new(
            operation,
            statement.sql,
            kind,
            statement.parameters,
            lock,
        );
        if let Some(timeout) = self.settings.default_timeout {
            token.set_timeout(timeout);
        }
        for listener in &self.listeners {
            token.add_listener(listener.clone());
        }
        token
    }

    pub(crate) fn builder(&self) -> SqlBuilder<'_, D> {
        SqlBuilder::new(&self.dialect, self.settings.strict)
    }

    /// Argument values of a write, after audit rules validated and rewrote
    /// them.
    pub(crate) fn write_values<T: Entity>(
        &self,
        entity: &T,
        operation: OperationKind,
    ) -> Result<Vec<(String, Value)>> {
        let mut values = entity.to_row();
        for rule in &self.audit_rules {
            if rule.applies_to(operation) {
                rule.validate(operation, &values)?;
                rule.apply(operation, &mut values);
            }
        }
        Ok(values)
    }

    /// Every extra predicate the audit rules contribute for `operation`,
    /// ANDed together.
    pub(crate) fn audit_filter(&self, operation: OperationKind) -> Filter {
        let mut filter = Filter::new();
        for rule in &self.audit_rules {
            if rule.applies_to(operation) {
                if let Some(extra) = rule.filter(operation) {
                    filter = filter.and(extra);
                }
            }
        }
        filter
    }

    fn register_entity<T: Entity>(&self) {
        self.metadata.register_table_default(T::table_metadata());
    }

    /// Starts a query over the entity's table, registering its declared
    /// metadata when the cache does not know the table yet.
    pub fn from<T: Entity>(&self) -> FromBuilder<'_, D> {
        self.register_entity::<T>();
        self.from_name(T::object_name())
    }

    /// Starts a query over a table or view known to the metadata cache.
    pub fn from_name(&self, table: impl Into<ObjectName>) -> FromBuilder<'_, D> {
        FromBuilder::new(self, table.into())
    }

    /// Single object by primary key.
    pub fn get_by_key<T: Entity>(
        &self,
        keys: impl IntoIterator<Item = impl AsValue>,
        options: RowOptions,
    ) -> Result<ObjectCommand<T>> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let keys: Vec<Value> = keys.into_iter().map(AsValue::as_value).collect();
        let statement = self.builder().select_by_key(
            &table,
            &DesiredColumns::All,
            &keys,
            &self.audit_filter(OperationKind::Select),
        )?;
        let token = self.make_token(
            format!("{}.get_by_key", table.name),
            statement,
            CommandKind::Text,
            LockKind::Read,
        );
        Ok(ObjectCommand {
            token,
            options,
            plans: None,
            _marker: PhantomData,
        })
    }

    pub fn insert<T: Entity>(&self, entity: &T) -> Result<NonQueryCommand> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let values = self.write_values(entity, OperationKind::Insert)?;
        let statement = self.builder().insert(&table, &values, false)?;
        Ok(NonQueryCommand {
            token: self.make_token(
                format!("{}.insert", table.name),
                statement,
                CommandKind::Text,
                LockKind::Write,
            ),
        })
    }

    /// INSERT echoing the key columns as a result row, on dialects that
    /// support it. Elsewhere the generated key arrives through
    /// [`RowsAffected::last_affected_id`](crate::RowsAffected::last_affected_id).
    pub fn insert_with_keys<T: Entity>(&self, entity: &T) -> Result<RowsCommand> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let values = self.write_values(entity, OperationKind::Insert)?;
        let statement = self.builder().insert(&table, &values, true)?;
        Ok(RowsCommand {
            token: self.make_token(
                format!("{}.insert", table.name),
                statement,
                CommandKind::Text,
                LockKind::Write,
            ),
        })
    }

    pub fn update<T: Entity>(&self, entity: &T) -> Result<NonQueryCommand> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let values = self.write_values(entity, OperationKind::Update)?;
        let statement = self.builder().update(&table, &values)?;
        Ok(NonQueryCommand {
            token: self.make_token(
                format!("{}.update", table.name),
                statement,
                CommandKind::Text,
                LockKind::Write,
            ),
        })
    }

    pub fn upsert<T: Entity>(&self, entity: &T) -> Result<NonQueryCommand> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let values = self.write_values(entity, OperationKind::Upsert)?;
        let statement = self.builder().upsert(&table, &values)?;
        Ok(NonQueryCommand {
            token: self.make_token(
                format!("{}.upsert", table.name),
                statement,
                CommandKind::Text,
                LockKind::Write,
            ),
        })
    }

    /// DELETE keyed on the entity's primary key values.
    pub fn delete<T: Entity>(&self, entity: &T) -> Result<NonQueryCommand> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let statement = self.builder().delete_by_key(&table, &entity.key())?;
        Ok(NonQueryCommand {
            token: self.make_token(
                format!("{}.delete", table.name),
                statement,
                CommandKind::Text,
                LockKind::Write,
            ),
        })
    }

    pub fn delete_by_key<T: Entity>(
        &self,
        keys: impl IntoIterator<Item = impl AsValue>,
    ) -> Result<NonQueryCommand> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let keys: Vec<Value> = keys.into_iter().map(AsValue::as_value).collect();
        let statement = self.builder().delete_by_key(&table, &keys)?;
        Ok(NonQueryCommand {
            token: self.make_token(
                format!("{}.delete", table.name),
                statement,
                CommandKind::Text,
                LockKind::Write,
            ),
        })
    }

    pub fn delete_where<T: Entity>(&self, filter: &Filter) -> Result<NonQueryCommand> {
        self.register_entity::<T>();
        let table = self.metadata.table_or_view(&T::object_name())?;
        let statement = self.builder().delete_where(&table, filter)?;
        Ok(NonQueryCommand {
            token: self.make_token(
                format!("{}.delete_where", table.name),
                statement,
                CommandKind::Text,
                LockKind::Write,
            ),
        })
    }

    /// Starts a stored procedure call; the procedure must be known to the
    /// metadata cache.
    pub fn procedure(&self, name: impl Into<ObjectName>) -> ProcedureBuilder<'_, D> {
        ProcedureBuilder::new(self, name.into())
    }

    /// Starts a raw statement; values bind as ordered parameters replacing
    /// `?` markers.
    pub fn sql(&self, text: impl Into<String>) -> RawBuilder<'_, D> {
        RawBuilder::new(self, text.into())
    }
}
