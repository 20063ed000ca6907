use super::{SqlDialect, UpsertData};
use crate::{ColumnMetadata, Parameter, separated_by};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn write_quoted(&self, out: &mut String, identifier: &str) {
        out.push('`');
        for c in identifier.chars() {
            if c == '`' {
                out.push('`');
            }
            out.push(c);
        }
        out.push('`');
    }

    /// No RETURNING; generated keys surface through
    /// [`RowsAffected::last_affected_id`](crate::RowsAffected::last_affected_id).
    fn supports_returning(&self) -> bool {
        false
    }

    fn write_returning(&self, _out: &mut String, _columns: &[&ColumnMetadata]) {}

    fn write_upsert(&self, out: &mut String, params: &mut Vec<Parameter>, upsert: &UpsertData<'_>) {
        self.write_insert_clause(out, params, upsert);
        out.push_str("\nON DUPLICATE KEY UPDATE ");
        if upsert.update_columns().next().is_none() {
            // Touch a key column with itself so the statement stays valid.
            let key = &upsert.keys[0];
            self.write_quoted(out, &key.column_name);
            out.push_str(" = ");
            self.write_quoted(out, &key.column_name);
        } else {
            separated_by(
                out,
                upsert.update_columns(),
                |out, c| {
                    self.write_quoted(out, &c.column_name);
                    out.push_str(" = VALUES(");
                    self.write_quoted(out, &c.column_name);
                    out.push(')');
                },
                ", ",
            );
        }
    }
}
