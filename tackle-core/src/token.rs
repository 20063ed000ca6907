use crate::{ExecutionEvent, ExecutionListener, Value};
use std::{borrow::Cow, fmt, sync::Arc, time::Duration};

/// The logical operation a statement was generated for. Carried for
/// diagnostics and handed to audit rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
    Procedure,
}

/// How the statement is dispatched by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Plain command text.
    Text,
    /// Stored procedure call.
    Procedure,
}

/// Lock discipline a serializing executor applies around the statement.
/// Reads may run concurrently with other reads; a write excludes everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Read,
    Write,
}

/// One bound statement parameter, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Finalized command text, parameters and run metadata for one statement
/// invocation.
///
/// Built entirely before any connection is opened. Appenders may still adjust
/// it (tag comments, timeout, listeners) during their prepare pass; once
/// handed to an executor it is consumed exactly once.
pub struct ExecutionToken {
    /// Diagnostic operation name, e.g. `Employee.insert`.
    pub operation: Cow<'static, str>,
    pub sql: String,
    pub kind: CommandKind,
    pub parameters: Vec<Parameter>,
    pub lock: LockKind,
    pub timeout: Option<Duration>,
    listeners: Vec<Arc<dyn ExecutionListener>>,
}

impl ExecutionToken {
    pub fn new(
        operation: impl Into<Cow<'static, str>>,
        sql: String,
        kind: CommandKind,
        parameters: Vec<Parameter>,
        lock: LockKind,
    ) -> Self {
        Self {
            operation: operation.into(),
            sql,
            kind,
            parameters,
            lock,
            timeout: None,
            listeners: Vec::new(),
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Appends a trailing comment so the statement can be spotted in server
    /// logs. Comment terminators inside the tag are stripped.
    pub fn append_tag(&mut self, tag: &str) {
        let tag = tag.replace("*/", "");
        self.sql.push_str("\n/* ");
        self.sql.push_str(tag.trim());
        self.sql.push_str(" */");
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ExecutionListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn emit(&self, event: &ExecutionEvent) {
        for listener in &self.listeners {
            listener.on_event(self, event);
        }
    }
}

impl fmt::Debug for ExecutionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionToken")
            .field("operation", &self.operation)
            .field("sql", &self.sql)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("lock", &self.lock)
            .field("timeout", &self.timeout)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
