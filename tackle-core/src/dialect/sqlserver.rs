use super::{SqlDialect, UpsertData};
use crate::{ColumnMetadata, Parameter, separated_by};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl SqlDialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn write_quoted(&self, out: &mut String, identifier: &str) {
        out.push('[');
        for c in identifier.chars() {
            if c == ']' {
                out.push(']');
            }
            out.push(c);
        }
        out.push(']');
    }

    fn write_placeholder(&self, out: &mut String, index: usize, _name: &str) {
        out.push_str("@p");
        out.push_str(itoa::Buffer::new().format(index));
    }

    fn write_limit(&self, out: &mut String, limit: Option<u64>, offset: Option<u64>) {
        if limit.is_none() && offset.is_none() {
            return;
        }
        let mut buf = itoa::Buffer::new();
        out.push_str("\nOFFSET ");
        out.push_str(buf.format(offset.unwrap_or(0)));
        out.push_str(" ROWS");
        if let Some(limit) = limit {
            out.push_str(" FETCH NEXT ");
            out.push_str(buf.format(limit));
            out.push_str(" ROWS ONLY");
        }
    }

    /// OFFSET/FETCH is only legal after an ORDER BY.
    fn requires_order_by_for_limit(&self) -> bool {
        true
    }

    fn returning_before_values(&self) -> bool {
        true
    }

    fn write_returning(&self, out: &mut String, columns: &[&ColumnMetadata]) {
        out.push_str("\nOUTPUT ");
        separated_by(
            out,
            columns,
            |out, c| {
                out.push_str("INSERTED.");
                self.write_quoted(out, &c.column_name);
            },
            ", ",
        );
    }

    fn write_upsert(&self, out: &mut String, params: &mut Vec<Parameter>, upsert: &UpsertData<'_>) {
        out.push_str("MERGE INTO ");
        self.write_object_name(out, &upsert.table.name);
        out.push_str(" AS target\nUSING (SELECT ");
        separated_by(
            out,
            upsert.columns.iter().zip(upsert.values.iter().cloned()),
            |out, (c, v)| {
                self.bind(out, params, v);
                out.push_str(" AS ");
                self.write_quoted(out, &c.column_name);
            },
            ", ",
        );
        out.push_str(") AS source\nON ");
        separated_by(
            out,
            &upsert.keys,
            |out, c| {
                out.push_str("target.");
                self.write_quoted(out, &c.column_name);
                out.push_str(" = source.");
                self.write_quoted(out, &c.column_name);
            },
            " AND ",
        );
        if upsert.update_columns().next().is_some() {
            out.push_str("\nWHEN MATCHED THEN UPDATE SET ");
            separated_by(
                out,
                upsert.update_columns(),
                |out, c| {
                    out.push_str("target.");
                    self.write_quoted(out, &c.column_name);
                    out.push_str(" = source.");
                    self.write_quoted(out, &c.column_name);
                },
                ", ",
            );
        }
        out.push_str("\nWHEN NOT MATCHED THEN INSERT (");
        separated_by(
            out,
            &upsert.columns,
            |out, c| self.write_quoted(out, &c.column_name),
            ", ",
        );
        out.push_str(")\nVALUES (");
        separated_by(
            out,
            &upsert.columns,
            |out, c| {
                out.push_str("source.");
                self.write_quoted(out, &c.column_name);
            },
            ", ",
        );
        out.push(')');
        if !upsert.returning.is_empty() {
            self.write_returning(out, &upsert.returning);
        }
        out.push(';');
    }

    fn write_procedure_call(
        &self,
        out: &mut String,
        params: &mut Vec<Parameter>,
        name: &crate::ObjectName,
        arguments: Vec<crate::Value>,
    ) {
        out.push_str("EXEC ");
        self.write_object_name(out, name);
        if !arguments.is_empty() {
            out.push(' ');
            separated_by(
                out,
                arguments,
                |out, v| self.bind(out, params, v),
                ", ",
            );
        }
    }
}
