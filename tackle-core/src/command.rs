use crate::{
    AsValue, CollectionCommand, CollectionOptions, CommandKind, DataSource, Entity, Error,
    ExecutionToken, Filter, ListCommand, ListOptions, LockKind, NonQueryCommand, ObjectCommand,
    ObjectName, OperationKind, OptionalObjectCommand, OptionalScalarCommand, Result, RowOptions,
    RowsCommand,
    ScalarCommand, SortExpression, SqlDialect, TableCommand, TableSetCommand, Value,
};
use crate::sql_builder::{DesiredColumns, is_write_statement, raw_statement};
use std::{borrow::Cow, marker::PhantomData};

fn constructor_columns<T: Entity>() -> Result<DesiredColumns> {
    let plan = T::constructor().ok_or_else(|| {
        Error::Mapping(format!(
            "`{}` declares no constructor to infer columns from",
            T::object_name(),
        ))
    })?;
    Ok(DesiredColumns::Explicit(plan.columns))
}

/// Fluent SELECT over one table or view.
///
/// Accumulates projection, predicates, sort and paging; a terminal method
/// renders the statement and pairs it with a materializer. Generation errors
/// surface at the terminal call, before any connection is involved.
pub struct FromBuilder<'a, D: SqlDialect> {
    source: &'a DataSource<D>,
    table: ObjectName,
    desired: DesiredColumns,
    filter: Filter,
    sort: Vec<SortExpression>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<'a, D: SqlDialect + Clone> FromBuilder<'a, D> {
    pub(crate) fn new(source: &'a DataSource<D>, table: ObjectName) -> Self {
        Self {
            source,
            table,
            desired: DesiredColumns::All,
            filter: Filter::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Trims the projection to the named columns.
    pub fn select(
        mut self,
        columns: impl IntoIterator<Item = impl Into<Cow<'static, str>>>,
    ) -> Self {
        self.desired = DesiredColumns::Explicit(columns.into_iter().map(Into::into).collect());
        self
    }

    /// ANDs a predicate onto the accumulated filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    pub fn sort(mut self, expression: SortExpression) -> Self {
        self.sort.push(expression);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn token(&self, desired: &DesiredColumns) -> Result<ExecutionToken> {
        let table = self.source.metadata.table_or_view(&self.table)?;
        let filter = self
            .filter
            .clone()
            .and(self.source.audit_filter(OperationKind::Select));
        let statement = self.source.builder().select(
            &table,
            desired,
            &filter,
            &self.sort,
            self.limit,
            self.offset,
        )?;
        Ok(self.source.make_token(
            format!("{}.select", table.name),
            statement,
            CommandKind::Text,
            LockKind::Read,
        ))
    }

    fn object_desired<T: Entity>(&self, infer: bool) -> Result<DesiredColumns> {
        if !infer {
            return Ok(self.desired.clone());
        }
        if !matches!(self.desired, DesiredColumns::All) {
            return Err(Error::Validation(
                "explicit columns and an inferred constructor cannot be combined".into(),
            ));
        }
        constructor_columns::<T>()
    }

    pub fn to_object<T: Entity>(self, options: RowOptions) -> Result<ObjectCommand<T>> {
        let desired =
            self.object_desired::<T>(options.contains(RowOptions::INFER_CONSTRUCTOR))?;
        Ok(ObjectCommand {
            token: self.token(&desired)?,
            options,
            plans: None,
            _marker: PhantomData,
        })
    }

    pub fn to_optional_object<T: Entity>(
        self,
        options: RowOptions,
    ) -> Result<OptionalObjectCommand<T>> {
        let desired =
            self.object_desired::<T>(options.contains(RowOptions::INFER_CONSTRUCTOR))?;
        Ok(OptionalObjectCommand {
            token: self.token(&desired)?,
            options,
            plans: None,
            _marker: PhantomData,
        })
    }

    pub fn to_collection<T: Entity>(
        self,
        options: CollectionOptions,
    ) -> Result<CollectionCommand<T>> {
        let infer = options.contains(CollectionOptions::INFER_CONSTRUCTOR);
        let desired = self.object_desired::<T>(infer)?;
        Ok(CollectionCommand {
            token: self.token(&desired)?,
            plans: None,
            infer,
            _marker: PhantomData,
        })
    }

    /// Like [`to_collection`](Self::to_collection) but binding positionally
    /// through the shared bind-plan cache. Output is identical to the
    /// reflective path.
    pub fn to_collection_compiled<T: Entity>(
        self,
        options: CollectionOptions,
    ) -> Result<CollectionCommand<T>> {
        let infer = options.contains(CollectionOptions::INFER_CONSTRUCTOR);
        let desired = self.object_desired::<T>(infer)?;
        let plans = self.source.plans.clone();
        Ok(CollectionCommand {
            token: self.token(&desired)?,
            plans: Some(plans),
            infer,
            _marker: PhantomData,
        })
    }

    pub fn to_object_compiled<T: Entity>(self, options: RowOptions) -> Result<ObjectCommand<T>> {
        let desired =
            self.object_desired::<T>(options.contains(RowOptions::INFER_CONSTRUCTOR))?;
        let plans = self.source.plans.clone();
        Ok(ObjectCommand {
            token: self.token(&desired)?,
            options,
            plans: Some(plans),
            _marker: PhantomData,
        })
    }

    pub fn to_scalar<T: AsValue + Send>(self) -> Result<ScalarCommand<T>> {
        Ok(ScalarCommand {
            token: self.token(&self.desired)?,
            options: RowOptions::NONE,
            _marker: PhantomData,
        })
    }

    pub fn to_optional_scalar<T: AsValue + Send>(self) -> Result<OptionalScalarCommand<T>> {
        Ok(OptionalScalarCommand {
            token: self.token(&self.desired)?,
            _marker: PhantomData,
        })
    }

    pub fn to_list<T: AsValue + Send>(self, options: ListOptions) -> Result<ListCommand<T>> {
        Ok(ListCommand {
            token: self.token(&self.desired)?,
            options,
            _marker: PhantomData,
        })
    }

    pub fn to_table(self) -> Result<TableCommand> {
        Ok(TableCommand {
            token: self.token(&self.desired)?,
        })
    }

    pub fn to_rows(self) -> Result<RowsCommand> {
        Ok(RowsCommand {
            token: self.token(&self.desired)?,
        })
    }
}

/// Fluent stored procedure call. Arguments are matched to the procedure's
/// declared parameters by name, case-insensitively.
pub struct ProcedureBuilder<'a, D: SqlDialect> {
    source: &'a DataSource<D>,
    name: ObjectName,
    arguments: Vec<(String, Value)>,
}

impl<'a, D: SqlDialect + Clone> ProcedureBuilder<'a, D> {
    pub(crate) fn new(source: &'a DataSource<D>, name: ObjectName) -> Self {
        Self {
            source,
            name,
            arguments: Vec::new(),
        }
    }

    pub fn argument(mut self, name: impl Into<String>, value: impl AsValue) -> Self {
        self.arguments.push((name.into(), value.as_value()));
        self
    }

    fn token(&self) -> Result<ExecutionToken> {
        let procedure = self.source.metadata.stored_procedure(&self.name)?;
        let statement = self.source.builder().procedure(&procedure, &self.arguments)?;
        Ok(self.source.make_token(
            format!("{}.call", procedure.name),
            statement,
            CommandKind::Procedure,
            LockKind::Write,
        ))
    }

    pub fn to_affected(self) -> Result<NonQueryCommand> {
        Ok(NonQueryCommand {
            token: self.token()?,
        })
    }

    pub fn to_table(self) -> Result<TableCommand> {
        Ok(TableCommand {
            token: self.token()?,
        })
    }

    /// Buffers every result set the procedure produces.
    pub fn to_table_set(self) -> Result<TableSetCommand> {
        Ok(TableSetCommand {
            token: self.token()?,
        })
    }

    pub fn to_scalar<T: AsValue + Send>(self) -> Result<ScalarCommand<T>> {
        Ok(ScalarCommand {
            token: self.token()?,
            options: RowOptions::NONE,
            _marker: PhantomData,
        })
    }
}

/// Raw statement passthrough with ordered `?` parameters.
///
/// The command text is the caller's responsibility; bound values still never
/// reach the text.
pub struct RawBuilder<'a, D: SqlDialect> {
    source: &'a DataSource<D>,
    sql: String,
    values: Vec<Value>,
}

impl<'a, D: SqlDialect + Clone> RawBuilder<'a, D> {
    pub(crate) fn new(source: &'a DataSource<D>, sql: String) -> Self {
        Self {
            source,
            sql,
            values: Vec::new(),
        }
    }

    pub fn bind(mut self, value: impl AsValue) -> Self {
        self.values.push(value.as_value());
        self
    }

    fn token(&self) -> Result<ExecutionToken> {
        let statement = raw_statement(&self.source.dialect, &self.sql, self.values.clone())?;
        let lock = if is_write_statement(&self.sql) {
            LockKind::Write
        } else {
            LockKind::Read
        };
        Ok(self
            .source
            .make_token("sql", statement, CommandKind::Text, lock))
    }

    pub fn to_affected(self) -> Result<NonQueryCommand> {
        Ok(NonQueryCommand {
            token: self.token()?,
        })
    }

    pub fn to_object<T: Entity>(self, options: RowOptions) -> Result<ObjectCommand<T>> {
        Ok(ObjectCommand {
            token: self.token()?,
            options,
            plans: None,
            _marker: PhantomData,
        })
    }

    pub fn to_optional_object<T: Entity>(
        self,
        options: RowOptions,
    ) -> Result<OptionalObjectCommand<T>> {
        Ok(OptionalObjectCommand {
            token: self.token()?,
            options,
            plans: None,
            _marker: PhantomData,
        })
    }

    pub fn to_collection<T: Entity>(self) -> Result<CollectionCommand<T>> {
        Ok(CollectionCommand {
            token: self.token()?,
            plans: None,
            infer: false,
            _marker: PhantomData,
        })
    }

    pub fn to_collection_compiled<T: Entity>(self) -> Result<CollectionCommand<T>> {
        let plans = self.source.plans.clone();
        Ok(CollectionCommand {
            token: self.token()?,
            plans: Some(plans),
            infer: false,
            _marker: PhantomData,
        })
    }

    pub fn to_scalar<T: AsValue + Send>(self) -> Result<ScalarCommand<T>> {
        Ok(ScalarCommand {
            token: self.token()?,
            options: RowOptions::NONE,
            _marker: PhantomData,
        })
    }

    pub fn to_optional_scalar<T: AsValue + Send>(self) -> Result<OptionalScalarCommand<T>> {
        Ok(OptionalScalarCommand {
            token: self.token()?,
            _marker: PhantomData,
        })
    }

    pub fn to_list<T: AsValue + Send>(self, options: ListOptions) -> Result<ListCommand<T>> {
        Ok(ListCommand {
            token: self.token()?,
            options,
            _marker: PhantomData,
        })
    }

    pub fn to_table(self) -> Result<TableCommand> {
        Ok(TableCommand {
            token: self.token()?,
        })
    }

    pub fn to_table_set(self) -> Result<TableSetCommand> {
        Ok(TableSetCommand {
            token: self.token()?,
        })
    }

    pub fn to_rows(self) -> Result<RowsCommand> {
        Ok(RowsCommand {
            token: self.token()?,
        })
    }
}
