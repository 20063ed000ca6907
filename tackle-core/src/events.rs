use crate::{Error, ExecutionToken, truncate_long};

use log::{debug, error};
use std::time::Duration;

/// Lifecycle notification for one statement run.
#[derive(Debug)]
pub enum ExecutionEvent {
    /// Emitted once, immediately before the statement is handed to the
    /// transport.
    Started,
    /// Emitted once, after the cursor is fully drained.
    Finished {
        elapsed: Duration,
        rows: Option<u64>,
    },
    /// Emitted once, instead of `Finished`, when the run fails.
    Failed { elapsed: Duration, error: String },
    /// Emitted once, instead of `Finished`, when the run is canceled.
    Canceled { elapsed: Duration },
}

impl ExecutionEvent {
    pub(crate) fn terminal(elapsed: Duration, outcome: &Result<Option<u64>, &Error>) -> Self {
        match outcome {
            Ok(rows) => ExecutionEvent::Finished {
                elapsed,
                rows: *rows,
            },
            Err(e) if e.is_canceled() => ExecutionEvent::Canceled { elapsed },
            Err(e) => ExecutionEvent::Failed {
                elapsed,
                error: e.to_string(),
            },
        }
    }
}

/// Observer of statement lifecycle events. Implementations must be cheap and
/// must not panic; they run inline on the execution path.
pub trait ExecutionListener: Send + Sync {
    fn on_event(&self, token: &ExecutionToken, event: &ExecutionEvent);
}

/// Listener that forwards events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogListener;

impl ExecutionListener for LogListener {
    fn on_event(&self, token: &ExecutionToken, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::Started => {
                debug!(
                    "{} started: {}",
                    token.operation,
                    truncate_long!(token.sql),
                );
            }
            ExecutionEvent::Finished { elapsed, rows } => match rows {
                Some(rows) => debug!(
                    "{} finished in {:?}, {} row(s)",
                    token.operation, elapsed, rows
                ),
                None => debug!("{} finished in {:?}", token.operation, elapsed),
            },
            ExecutionEvent::Failed { elapsed, error } => {
                error!("{} failed after {:?}: {}", token.operation, elapsed, error);
            }
            ExecutionEvent::Canceled { elapsed } => {
                debug!("{} canceled after {:?}", token.operation, elapsed);
            }
        }
    }
}
