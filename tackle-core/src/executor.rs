use crate::{
    Error, ExecutionEvent, ExecutionToken, LockKind, QueryResult, Result, RowLabeled, RowsAffected,
};
use async_stream::{stream, try_stream};
use futures::{Stream, StreamExt, TryStreamExt, future};
use std::{future::Future, pin::pin, sync::Arc, time::Instant};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock, watch};

/// Cooperative cancellation handle.
///
/// Cancellation is observed between rows, never mid-row; a run that has
/// already completed is unaffected. Clones share the same flag.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    flag: watch::Sender<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            flag: watch::channel(false).0,
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_canceled(&self) -> bool {
        *self.flag.borrow()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform statement transport.
///
/// One implementation per backend; everything above this trait is
/// backend-agnostic. `run` is the single entry point, `fetch` and `execute`
/// are conveniences filtering its output.
pub trait Executor: Send {
    /// Runs the statement and streams its results in arrival order. Modify
    /// statements yield [`QueryResult::Affected`]; queries yield
    /// [`QueryResult::Row`] items.
    fn run(
        &mut self,
        token: &ExecutionToken,
        cancel: &CancellationToken,
    ) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Runs the statement keeping only its rows.
    fn fetch(
        &mut self,
        token: &ExecutionToken,
        cancel: &CancellationToken,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(token, cancel).filter_map(|v| {
            future::ready(match v {
                Ok(QueryResult::Row(row)) => Some(Ok(row)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        })
    }

    /// Runs the statement and aggregates its modify effects, draining any
    /// rows it happens to produce.
    fn execute(
        &mut self,
        token: &ExecutionToken,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let stream = self.run(token, cancel);
        async move {
            let mut result = RowsAffected::default();
            let mut stream = pin!(stream);
            while let Some(item) = stream.try_next().await? {
                if let QueryResult::Affected(affected) = item {
                    result.extend(Some(affected));
                }
            }
            Ok(result)
        }
    }
}

impl<E: Executor> Executor for &mut E {
    fn run(
        &mut self,
        token: &ExecutionToken,
        cancel: &CancellationToken,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        (**self).run(token, cancel)
    }
}

/// Wraps [`Executor::run`] with lifecycle events and cooperative cancellation
/// checks between items.
///
/// Emits `Started` before the first poll and exactly one terminal event
/// (`Finished`, `Failed` or `Canceled`) when the stream ends, in either
/// direction.
pub fn run_instrumented<'a, E: Executor>(
    executor: &'a mut E,
    token: &'a ExecutionToken,
    cancel: &'a CancellationToken,
) -> impl Stream<Item = Result<QueryResult>> + Send + 'a {
    stream! {
        token.emit(&ExecutionEvent::Started);
        let started = Instant::now();
        let mut rows = 0u64;
        let mut affected: Option<u64> = None;
        let inner = executor.run(token, cancel);
        let mut inner = pin!(inner);
        let outcome = loop {
            if cancel.is_canceled() {
                break Err(Error::Canceled);
            }
            match inner.next().await {
                Some(Ok(item)) => {
                    match &item {
                        QueryResult::Row(..) => rows += 1,
                        QueryResult::Affected(a) => {
                            affected = Some(affected.unwrap_or(0) + a.rows_affected);
                        }
                        QueryResult::SetBoundary => {}
                    }
                    yield Ok(item);
                }
                Some(Err(e)) => break Err(e),
                None => break Ok(()),
            }
        };
        match outcome {
            Ok(()) => {
                let total = affected.unwrap_or(rows);
                token.emit(&ExecutionEvent::terminal(started.elapsed(), &Ok(Some(total))));
            }
            Err(e) => {
                token.emit(&ExecutionEvent::terminal(started.elapsed(), &Err(&e)));
                yield Err(e);
            }
        }
    }
}

/// Shared reader/writer gate for one embedded database.
///
/// Every executor opened against the same database file clones the same gate;
/// read statements then run concurrently while a write statement excludes
/// everything else. Acquisition is write-preferring per the underlying
/// `tokio` lock.
#[derive(Clone, Debug, Default)]
pub struct AccessGate {
    lock: Arc<RwLock<()>>,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, kind: LockKind) -> GateGuard {
        match kind {
            LockKind::Read => GateGuard::Read(self.lock.clone().read_owned().await),
            LockKind::Write => GateGuard::Write(self.lock.clone().write_owned().await),
        }
    }
}

enum GateGuard {
    Read(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Write(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

/// Executor decorator that holds an [`AccessGate`] guard for the whole life
/// of each statement's cursor, per the token's [`LockKind`].
pub struct SerializedExecutor<E> {
    inner: E,
    gate: AccessGate,
}

impl<E: Executor> SerializedExecutor<E> {
    pub fn new(inner: E, gate: AccessGate) -> Self {
        Self { inner, gate }
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Executor> Executor for SerializedExecutor<E> {
    fn run(
        &mut self,
        token: &ExecutionToken,
        cancel: &CancellationToken,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let gate = self.gate.clone();
        let inner = &mut self.inner;
        try_stream! {
            // Held until the cursor is fully drained or dropped.
            let _guard = gate.acquire(token.lock).await;
            let stream = inner.run(token, cancel);
            let mut stream = pin!(stream);
            while let Some(item) = stream.try_next().await? {
                yield item;
            }
        }
    }
}
