use crate::{
    AsValue, BindPlanCache, CancellationToken, Entity, Error, ExecutionToken, Executor,
    ListOptions, QueryResult, Result, RowLabeled, RowOptions, RowView, RowsAffected, Table,
    TableSet, run_instrumented,
};
use futures::{Stream, TryStreamExt};
use std::{future::Future, pin::pin, sync::Arc};

/// One executable command: a finished [`ExecutionToken`] plus the
/// materialization turning its results into `Output`.
///
/// Appenders wrap a command and forward these three methods, so a decorated
/// command still exposes its token for tagging and still executes through
/// every layer in order.
pub trait Link: Send {
    type Output: Send;

    fn token(&self) -> &ExecutionToken;

    fn token_mut(&mut self) -> &mut ExecutionToken;

    /// Runs the command once and materializes its result.
    fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Self::Output>> + Send;
}

/// Drains an instrumented run, buffering rows and aggregating effects.
async fn drain<E: Executor>(
    executor: &mut E,
    token: &ExecutionToken,
    cancel: &CancellationToken,
) -> Result<(Vec<RowLabeled>, RowsAffected)> {
    let stream = run_instrumented(executor, token, cancel);
    let mut stream = pin!(stream);
    let mut rows = Vec::new();
    let mut affected = RowsAffected::default();
    while let Some(item) = stream.try_next().await? {
        match item {
            QueryResult::Row(row) => rows.push(row),
            QueryResult::Affected(a) => affected.extend(Some(a)),
            QueryResult::SetBoundary => {}
        }
    }
    Ok((rows, affected))
}

/// Applies the single-row policy: zero or many rows resolve per `options`.
fn select_row(rows: Vec<RowLabeled>, options: RowOptions) -> Result<Option<RowLabeled>> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match count {
        0 => {
            if options.contains(RowOptions::ALLOW_EMPTY_RESULTS) {
                Ok(None)
            } else {
                Err(Error::MissingData)
            }
        }
        1 => Ok(rows.next()),
        n => {
            if options.contains(RowOptions::DISCARD_EXTRA_ROWS) {
                Ok(rows.next())
            } else {
                Err(Error::unexpected_row_count(n))
            }
        }
    }
}

fn build_entity<T: Entity>(
    row: &RowLabeled,
    sql: &str,
    plans: Option<&BindPlanCache>,
    infer: bool,
) -> Result<T> {
    if let Some(plans) = plans {
        return plans.materialize::<T>(sql, row);
    }
    // An inferred constructor trimmed the projection to its columns, so the
    // reflective by-label path may not find everything it binds; go through
    // the declared plan instead.
    if infer {
        if let Some(plan) = T::constructor() {
            let values = plan
                .columns
                .iter()
                .map(|target| {
                    row.labels
                        .iter()
                        .position(|l| l.eq_ignore_ascii_case(target))
                        .map(|i| row.values[i].clone())
                        .ok_or_else(|| {
                            Error::Mapping(format!(
                                "column `{}` is missing from the result set",
                                target,
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            return (plan.build)(&values);
        }
    }
    T::from_row(&RowView::new(row))
}

/// Modify command producing its aggregate effect.
#[derive(Debug)]
pub struct NonQueryCommand {
    pub(crate) token: ExecutionToken,
}

impl Link for NonQueryCommand {
    type Output = RowsAffected;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<RowsAffected> {
        let (_, affected) = drain(executor, &self.token, cancel).await?;
        Ok(affected)
    }
}

/// Materializes exactly one object. Zero rows fail; extra rows follow the
/// row options.
#[derive(Debug)]
pub struct ObjectCommand<T: Entity> {
    pub(crate) token: ExecutionToken,
    pub(crate) options: RowOptions,
    pub(crate) plans: Option<Arc<BindPlanCache>>,
    pub(crate) _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Entity> Link for ObjectCommand<T> {
    type Output = T;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        let row = select_row(rows, self.options)?.ok_or(Error::MissingData)?;
        build_entity(
            &row,
            &self.token.sql,
            self.plans.as_deref(),
            self.options.contains(RowOptions::INFER_CONSTRUCTOR),
        )
    }
}

/// Like [`ObjectCommand`] but zero rows materialize as `None`.
#[derive(Debug)]
pub struct OptionalObjectCommand<T: Entity> {
    pub(crate) token: ExecutionToken,
    pub(crate) options: RowOptions,
    pub(crate) plans: Option<Arc<BindPlanCache>>,
    pub(crate) _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Entity> Link for OptionalObjectCommand<T> {
    type Output = Option<T>;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        let options = self.options | RowOptions::ALLOW_EMPTY_RESULTS;
        match select_row(rows, options)? {
            Some(row) => Ok(Some(build_entity(
                &row,
                &self.token.sql,
                self.plans.as_deref(),
                self.options.contains(RowOptions::INFER_CONSTRUCTOR),
            )?)),
            None => Ok(None),
        }
    }
}

/// Materializes every row into an owned collection.
#[derive(Debug)]
pub struct CollectionCommand<T: Entity> {
    pub(crate) token: ExecutionToken,
    pub(crate) plans: Option<Arc<BindPlanCache>>,
    pub(crate) infer: bool,
    pub(crate) _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Entity> Link for CollectionCommand<T> {
    type Output = Vec<T>;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        rows.iter()
            .map(|row| build_entity(row, &self.token.sql, self.plans.as_deref(), self.infer))
            .collect()
    }
}

fn scalar_from_row<T: AsValue>(row: &RowLabeled) -> Result<T> {
    let Some(value) = row.values.first() else {
        return Err(Error::UnexpectedData("the row has no columns".into()));
    };
    T::try_from_value(value.clone()).map_err(|e| match e {
        Error::UnexpectedData(..) => {
            Error::unexpected_null(row.labels.first().map(String::as_str).unwrap_or(""))
        }
        other => other,
    })
}

/// First column of the single row; exactly one row is required.
#[derive(Debug)]
pub struct ScalarCommand<T: AsValue> {
    pub(crate) token: ExecutionToken,
    pub(crate) options: RowOptions,
    pub(crate) _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: AsValue> ScalarCommand<T> {
    /// Applies a row policy, e.g. [`RowOptions::DISCARD_EXTRA_ROWS`] for a
    /// statement that may match several rows.
    pub fn with_options(mut self, options: RowOptions) -> Self {
        self.options = options;
        self
    }
}

impl<T: AsValue + Send> Link for ScalarCommand<T> {
    type Output = T;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        let row = select_row(rows, self.options)?.ok_or(Error::MissingData)?;
        scalar_from_row(&row)
    }
}

/// First column of the first row; zero rows or a NULL value are `None`.
#[derive(Debug)]
pub struct OptionalScalarCommand<T: AsValue> {
    pub(crate) token: ExecutionToken,
    pub(crate) _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: AsValue + Send> Link for OptionalScalarCommand<T> {
    type Output = Option<T>;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        let options = RowOptions::ALLOW_EMPTY_RESULTS | RowOptions::DISCARD_EXTRA_ROWS;
        match select_row(rows, options)? {
            Some(row) if !row.values.first().is_none_or(|v| v.is_null()) => {
                scalar_from_row(&row).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// One value per row (or per column when flattening), per the list options.
#[derive(Debug)]
pub struct ListCommand<T: AsValue> {
    pub(crate) token: ExecutionToken,
    pub(crate) options: ListOptions,
    pub(crate) _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: AsValue + Send> Link for ListCommand<T> {
    type Output = Vec<T>;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let columns = if row.values.len() <= 1
                || self.options.contains(ListOptions::FLATTEN_EXTRA_COLUMNS)
            {
                row.values.len()
            } else if self.options.contains(ListOptions::IGNORE_EXTRA_COLUMNS) {
                1
            } else {
                return Err(Error::UnexpectedData(format!(
                    "the row has {} columns, expected 1",
                    row.values.len(),
                )));
            };
            for (label, value) in row.labels.iter().zip(row.values.iter()).take(columns) {
                if value.is_null() && self.options.contains(ListOptions::DISCARD_NULLS) {
                    continue;
                }
                let item = T::try_from_value(value.clone()).map_err(|e| match e {
                    Error::UnexpectedData(..) => Error::unexpected_null(label),
                    other => other,
                })?;
                out.push(item);
            }
        }
        Ok(out)
    }
}

/// Buffers the whole result set untyped.
#[derive(Debug)]
pub struct TableCommand {
    pub(crate) token: ExecutionToken,
}

impl Link for TableCommand {
    type Output = Table;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<Table> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        let mut table = Table::default();
        for row in rows {
            table.push(row);
        }
        Ok(table)
    }
}

/// Buffers every result set of a batch or procedure call.
#[derive(Debug)]
pub struct TableSetCommand {
    pub(crate) token: ExecutionToken,
}

impl Link for TableSetCommand {
    type Output = TableSet;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<TableSet> {
        let stream = run_instrumented(executor, &self.token, cancel);
        let mut stream = pin!(stream);
        let mut set = TableSet::default();
        let mut current = Table::default();
        let mut saw_rows = false;
        while let Some(item) = stream.try_next().await? {
            match item {
                QueryResult::Row(row) => {
                    saw_rows = true;
                    current.push(row);
                }
                QueryResult::SetBoundary => {
                    set.tables.push(std::mem::take(&mut current));
                }
                QueryResult::Affected(..) => {}
            }
        }
        if saw_rows || !set.tables.is_empty() {
            set.tables.push(current);
        }
        Ok(set)
    }
}

/// Buffered labeled rows, or an incremental cursor via
/// [`stream`](RowsCommand::stream).
#[derive(Debug)]
pub struct RowsCommand {
    pub(crate) token: ExecutionToken,
}

impl RowsCommand {
    /// Consumes rows as they arrive instead of buffering.
    pub fn stream<'a, E: Executor>(
        &'a self,
        executor: &'a mut E,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send + 'a {
        use futures::StreamExt;
        run_instrumented(executor, &self.token, cancel).filter_map(|item| {
            futures::future::ready(match item {
                Ok(QueryResult::Row(row)) => Some(Ok(row)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        })
    }
}

impl Link for RowsCommand {
    type Output = Vec<RowLabeled>;

    fn token(&self) -> &ExecutionToken {
        &self.token
    }

    fn token_mut(&mut self) -> &mut ExecutionToken {
        &mut self.token
    }

    async fn execute<E: Executor>(
        self,
        executor: &mut E,
        cancel: &CancellationToken,
    ) -> Result<Vec<RowLabeled>> {
        let (rows, _) = drain(executor, &self.token, cancel).await?;
        Ok(rows)
    }
}
