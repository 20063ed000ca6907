use crate::{Filter, OperationKind, Result, Value};

/// Rewrites or validates argument values before SQL generation.
///
/// Rules attach to a data source and run in attachment order on every
/// matching write operation, so audit columns are maintained centrally
/// instead of at each call site.
pub trait AuditRule: Send + Sync {
    fn applies_to(&self, operation: OperationKind) -> bool;

    /// May change, add or remove `(property, value)` entries.
    fn apply(&self, operation: OperationKind, values: &mut Vec<(String, Value)>);

    /// Rejecting an argument aborts the build before any SQL is generated.
    fn validate(&self, _operation: OperationKind, _values: &[(String, Value)]) -> Result<()> {
        Ok(())
    }

    /// Extra predicate ANDed onto matching queries, e.g. a soft-delete
    /// filter that hides retired rows from every SELECT.
    fn filter(&self, _operation: OperationKind) -> Option<Filter> {
        None
    }
}

/// Sets one column to a generated value, replacing any caller-supplied entry.
pub struct SetValueRule {
    column: String,
    operations: Vec<OperationKind>,
    generate: Box<dyn Fn() -> Value + Send + Sync>,
}

impl SetValueRule {
    pub fn new(
        column: impl Into<String>,
        operations: impl IntoIterator<Item = OperationKind>,
        generate: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            column: column.into(),
            operations: operations.into_iter().collect(),
            generate: Box::new(generate),
        }
    }
}

impl AuditRule for SetValueRule {
    fn applies_to(&self, operation: OperationKind) -> bool {
        self.operations.contains(&operation)
    }

    fn apply(&self, _operation: OperationKind, values: &mut Vec<(String, Value)>) {
        values.retain(|(name, _)| !name.eq_ignore_ascii_case(&self.column));
        values.push((self.column.clone(), (self.generate)()));
    }
}
