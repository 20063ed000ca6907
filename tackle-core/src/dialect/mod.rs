mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;
pub use sqlserver::SqlServer;

use crate::{ColumnMetadata, ObjectName, Parameter, TableOrViewMetadata, Value, separated_by};

/// Everything the generic SQL builder needs to render one dialect's upsert.
pub struct UpsertData<'a> {
    pub table: &'a TableOrViewMetadata,
    /// Insertable columns, in statement order, aligned with `values`.
    pub columns: Vec<&'a ColumnMetadata>,
    pub values: Vec<Value>,
    /// Conflict target, the table's key columns.
    pub keys: Vec<&'a ColumnMetadata>,
    /// Columns echoed back by the statement; empty means none.
    pub returning: Vec<&'a ColumnMetadata>,
}

impl UpsertData<'_> {
    /// Insertable columns that are not part of the conflict target.
    pub fn update_columns(&self) -> impl Iterator<Item = &&ColumnMetadata> {
        self.columns.iter().filter(|c| !c.is_key)
    }
}

/// Renders the SQL a specific database engine understands.
///
/// The default bodies produce the common denominator (double-quoted
/// identifiers, `?` placeholders, `LIMIT`/`OFFSET`, `ON CONFLICT` upsert);
/// each dialect overrides only what its engine spells differently. Values are
/// never inlined into the text, every one goes through [`bind`](Self::bind).
pub trait SqlDialect: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Quotes one identifier, doubling embedded quote characters.
    fn write_quoted(&self, out: &mut String, identifier: &str) {
        out.push('"');
        for c in identifier.chars() {
            if c == '"' {
                out.push('"');
            }
            out.push(c);
        }
        out.push('"');
    }

    fn write_object_name(&self, out: &mut String, name: &ObjectName) {
        if !name.catalog.is_empty() {
            self.write_quoted(out, &name.catalog);
            out.push('.');
        }
        if !name.schema.is_empty() {
            self.write_quoted(out, &name.schema);
            out.push('.');
        }
        self.write_quoted(out, &name.name);
    }

    /// Writes the placeholder for the 1-based parameter `index` named `name`.
    fn write_placeholder(&self, out: &mut String, index: usize, name: &str) {
        let _ = (index, name);
        out.push('?');
    }

    /// Appends a bound parameter: placeholder into `out`, value into `params`.
    /// Parameter names follow the `p{index}` convention.
    fn bind(&self, out: &mut String, params: &mut Vec<Parameter>, value: Value) {
        let index = params.len() + 1;
        let mut name = String::with_capacity(4);
        name.push('p');
        name.push_str(itoa::Buffer::new().format(index));
        self.write_placeholder(out, index, &name);
        params.push(Parameter::new(name, value));
    }

    fn write_limit(&self, out: &mut String, limit: Option<u64>, offset: Option<u64>) {
        let mut buf = itoa::Buffer::new();
        if let Some(limit) = limit {
            out.push_str("\nLIMIT ");
            out.push_str(buf.format(limit));
        }
        if let Some(offset) = offset {
            out.push_str("\nOFFSET ");
            out.push_str(buf.format(offset));
        }
    }

    /// Whether a limited query must carry an ORDER BY to be well defined.
    fn requires_order_by_for_limit(&self) -> bool {
        false
    }

    /// Whether write statements can echo rows back.
    fn supports_returning(&self) -> bool {
        true
    }

    /// Whether the echo clause precedes the VALUES clause (`OUTPUT`) instead
    /// of trailing the statement (`RETURNING`).
    fn returning_before_values(&self) -> bool {
        false
    }

    fn write_returning(&self, out: &mut String, columns: &[&ColumnMetadata]) {
        out.push_str("\nRETURNING ");
        separated_by(
            out,
            columns,
            |out, c| self.write_quoted(out, &c.column_name),
            ", ",
        );
    }

    /// The `INSERT INTO t (..) VALUES (..)` core shared by insert and the
    /// conflict-clause upsert renderings.
    fn write_insert_clause(
        &self,
        out: &mut String,
        params: &mut Vec<Parameter>,
        upsert: &UpsertData<'_>,
    ) {
        out.push_str("INSERT INTO ");
        self.write_object_name(out, &upsert.table.name);
        out.push_str(" (");
        separated_by(
            out,
            &upsert.columns,
            |out, c| self.write_quoted(out, &c.column_name),
            ", ",
        );
        out.push(')');
        if self.returning_before_values() && !upsert.returning.is_empty() {
            self.write_returning(out, &upsert.returning);
        }
        out.push_str("\nVALUES (");
        separated_by(
            out,
            upsert.values.iter().cloned(),
            |out, v| self.bind(out, params, v),
            ", ",
        );
        out.push(')');
    }

    /// Insert-or-update in one statement. The default renders the
    /// `ON CONFLICT` family; engines without it replace the whole statement.
    fn write_upsert(&self, out: &mut String, params: &mut Vec<Parameter>, upsert: &UpsertData<'_>) {
        self.write_insert_clause(out, params, upsert);
        out.push_str("\nON CONFLICT (");
        separated_by(
            out,
            &upsert.keys,
            |out, c| self.write_quoted(out, &c.column_name),
            ", ",
        );
        out.push(')');
        if upsert.update_columns().next().is_none() {
            out.push_str(" DO NOTHING");
        } else {
            out.push_str(" DO UPDATE SET ");
            separated_by(
                out,
                upsert.update_columns(),
                |out, c| {
                    self.write_quoted(out, &c.column_name);
                    out.push_str(" = EXCLUDED.");
                    self.write_quoted(out, &c.column_name);
                },
                ", ",
            );
        }
        if !self.returning_before_values() && !upsert.returning.is_empty() {
            self.write_returning(out, &upsert.returning);
        }
    }

    fn write_procedure_call(
        &self,
        out: &mut String,
        params: &mut Vec<Parameter>,
        name: &ObjectName,
        arguments: Vec<Value>,
    ) {
        out.push_str("CALL ");
        self.write_object_name(out, name);
        out.push('(');
        separated_by(
            out,
            arguments,
            |out, v| self.bind(out, params, v),
            ", ",
        );
        out.push(')');
    }
}
