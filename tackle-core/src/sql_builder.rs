use crate::{
    ColumnMetadata, Error, Filter, FilterTerm, ObjectName, Parameter, Result, SortExpression,
    SqlDialect, StoredProcedureMetadata, TableOrViewMetadata, UpsertData, Value, separated_by,
};
use std::borrow::Cow;

/// Columns a SELECT projects.
#[derive(Debug, Clone, Default)]
pub enum DesiredColumns {
    /// Every column the metadata knows about.
    #[default]
    All,
    /// A caller- or constructor-chosen subset, validated against metadata.
    Explicit(Vec<Cow<'static, str>>),
}

/// Finished command text plus its bound parameters, in placeholder order.
#[derive(Debug)]
pub struct Statement {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

/// Generates parameterized statements from metadata for one dialect.
///
/// Identifiers always pass through the dialect's quoting and values always
/// become bound parameters, so caller data never reaches the command text.
/// In strict mode a supplied property that matches no column fails the build;
/// otherwise it is silently skipped.
pub struct SqlBuilder<'a, D: SqlDialect> {
    dialect: &'a D,
    strict: bool,
}

impl<'a, D: SqlDialect> SqlBuilder<'a, D> {
    pub fn new(dialect: &'a D, strict: bool) -> Self {
        Self { dialect, strict }
    }

    fn resolve_column<'t>(
        &self,
        table: &'t TableOrViewMetadata,
        name: &str,
    ) -> Result<&'t ColumnMetadata> {
        table.column(name).ok_or_else(|| Error::Validation(format!(
            "unknown column or property {:?} on {}",
            name, table.name,
        )))
    }

    /// Resolves the projection, trimming to the explicit subset when given.
    fn projection<'t>(
        &self,
        table: &'t TableOrViewMetadata,
        desired: &DesiredColumns,
    ) -> Result<Vec<&'t ColumnMetadata>> {
        if table.columns.is_empty() {
            return Err(Error::no_columns(&table.name));
        }
        let columns = match desired {
            DesiredColumns::All => table.columns.iter().collect::<Vec<_>>(),
            DesiredColumns::Explicit(names) => names
                .iter()
                .map(|n| self.resolve_column(table, n))
                .collect::<Result<Vec<_>>>()?,
        };
        if columns.is_empty() {
            return Err(Error::empty_projection(&table.name));
        }
        Ok(columns)
    }

    /// Pairs supplied `(property, value)` entries with their columns. Each
    /// operation then decides what to do with identity columns: they are
    /// never written, but an identity key still drives an UPDATE's WHERE.
    fn resolve_values<'t>(
        &self,
        table: &'t TableOrViewMetadata,
        values: &[(String, Value)],
    ) -> Result<Vec<(&'t ColumnMetadata, Value)>> {
        let mut resolved = Vec::with_capacity(values.len());
        for (name, value) in values {
            let Some(column) = table.column(name) else {
                if self.strict {
                    return Err(Error::StrictMode {
                        property: name.clone(),
                        object: table.name.clone(),
                    });
                }
                continue;
            };
            resolved.push((column, value.clone()));
        }
        Ok(resolved)
    }

    fn write_filter(
        &self,
        out: &mut String,
        params: &mut Vec<Parameter>,
        table: &TableOrViewMetadata,
        filter: &Filter,
    ) -> Result<()> {
        if filter.is_empty() {
            return Ok(());
        }
        out.push_str("\nWHERE ");
        self.write_filter_terms(out, params, table, filter)
    }

    /// Writes the AND-joined terms without a WHERE prefix, so a filter can
    /// also extend an existing predicate.
    fn write_filter_terms(
        &self,
        out: &mut String,
        params: &mut Vec<Parameter>,
        table: &TableOrViewMetadata,
        filter: &Filter,
    ) -> Result<()> {
        let mut first = true;
        for term in &filter.terms {
            if !first {
                out.push_str(" AND ");
            }
            first = false;
            match term {
                FilterTerm::Compare { column, op, value } => {
                    let column = self.resolve_column(table, column)?;
                    self.dialect.write_quoted(out, &column.column_name);
                    out.push_str(op.sql());
                    self.dialect.bind(out, params, value.clone());
                }
                FilterTerm::IsNull { column, negated } => {
                    let column = self.resolve_column(table, column)?;
                    self.dialect.write_quoted(out, &column.column_name);
                    out.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
                }
                FilterTerm::In { column, values } => {
                    if values.is_empty() {
                        // An empty set matches nothing.
                        out.push_str("1 = 0");
                        continue;
                    }
                    let column = self.resolve_column(table, column)?;
                    self.dialect.write_quoted(out, &column.column_name);
                    out.push_str(" IN (");
                    separated_by(
                        out,
                        values.iter().cloned(),
                        |out, v| self.dialect.bind(out, params, v),
                        ", ",
                    );
                    out.push(')');
                }
                FilterTerm::Raw { sql, params: raw } => {
                    let mut pieces = sql.split('?');
                    if pieces.clone().count() != raw.len() + 1 {
                        return Err(Error::Validation(format!(
                            "raw predicate expects {} parameter(s), {} given",
                            sql.matches('?').count(),
                            raw.len(),
                        )));
                    }
                    out.push('(');
                    if let Some(first) = pieces.next() {
                        out.push_str(first);
                    }
                    for (piece, value) in pieces.zip(raw.iter().cloned()) {
                        self.dialect.bind(out, params, value);
                        out.push_str(piece);
                    }
                    out.push(')');
                }
            }
        }
        Ok(())
    }

    fn write_sort(
        &self,
        out: &mut String,
        table: &TableOrViewMetadata,
        sort: &[SortExpression],
    ) -> Result<()> {
        if sort.is_empty() {
            return Ok(());
        }
        out.push_str("\nORDER BY ");
        let mut first = true;
        for expr in sort {
            if !first {
                out.push_str(", ");
            }
            first = false;
            let column = self.resolve_column(table, &expr.column)?;
            self.dialect.write_quoted(out, &column.column_name);
            if expr.descending {
                out.push_str(" DESC");
            }
        }
        Ok(())
    }

    fn key_filter(
        &self,
        out: &mut String,
        params: &mut Vec<Parameter>,
        table: &TableOrViewMetadata,
        keys: &[Value],
    ) -> Result<()> {
        let key_columns: Vec<_> = table.key_columns().collect();
        if key_columns.is_empty() {
            return Err(Error::keys_not_resolved(&table.name));
        }
        if key_columns.len() != keys.len() {
            return Err(Error::Validation(format!(
                "{} expects {} key value(s), {} given",
                table.name,
                key_columns.len(),
                keys.len(),
            )));
        }
        out.push_str("\nWHERE ");
        let mut first = true;
        for (column, value) in key_columns.iter().zip(keys.iter().cloned()) {
            if !first {
                out.push_str(" AND ");
            }
            first = false;
            self.dialect.write_quoted(out, &column.column_name);
            out.push_str(" = ");
            self.dialect.bind(out, params, value);
        }
        Ok(())
    }

    pub fn select(
        &self,
        table: &TableOrViewMetadata,
        desired: &DesiredColumns,
        filter: &Filter,
        sort: &[SortExpression],
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Statement> {
        if (limit.is_some() || offset.is_some())
            && sort.is_empty()
            && self.dialect.requires_order_by_for_limit()
        {
            return Err(Error::Validation(format!(
                "{} requires ORDER BY for a limited query on {}",
                self.dialect.name(),
                table.name,
            )));
        }
        let columns = self.projection(table, desired)?;
        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();
        sql.push_str("SELECT ");
        separated_by(
            &mut sql,
            &columns,
            |out, c| self.dialect.write_quoted(out, &c.column_name),
            ", ",
        );
        sql.push_str("\nFROM ");
        self.dialect.write_object_name(&mut sql, &table.name);
        self.write_filter(&mut sql, &mut params, table, filter)?;
        self.write_sort(&mut sql, table, sort)?;
        self.dialect.write_limit(&mut sql, limit, offset);
        Ok(Statement {
            sql,
            parameters: params,
        })
    }

    /// SELECT keyed on the table's primary key. `filter` extends the key
    /// predicate, which is how audit rules scope key lookups too.
    pub fn select_by_key(
        &self,
        table: &TableOrViewMetadata,
        desired: &DesiredColumns,
        keys: &[Value],
        filter: &Filter,
    ) -> Result<Statement> {
        let columns = self.projection(table, desired)?;
        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();
        sql.push_str("SELECT ");
        separated_by(
            &mut sql,
            &columns,
            |out, c| self.dialect.write_quoted(out, &c.column_name),
            ", ",
        );
        sql.push_str("\nFROM ");
        self.dialect.write_object_name(&mut sql, &table.name);
        self.key_filter(&mut sql, &mut params, table, keys)?;
        if !filter.is_empty() {
            sql.push_str(" AND ");
            self.write_filter_terms(&mut sql, &mut params, table, filter)?;
        }
        Ok(Statement {
            sql,
            parameters: params,
        })
    }

    pub fn insert(
        &self,
        table: &TableOrViewMetadata,
        values: &[(String, Value)],
        echo_keys: bool,
    ) -> Result<Statement> {
        let resolved: Vec<_> = self
            .resolve_values(table, values)?
            .into_iter()
            .filter(|(c, _)| !c.is_identity)
            .collect();
        if resolved.is_empty() {
            return Err(Error::Validation(format!(
                "no insertable values for {}",
                table.name,
            )));
        }
        let returning = if echo_keys && self.dialect.supports_returning() {
            table.key_columns().collect()
        } else {
            Vec::new()
        };
        let upsert = UpsertData {
            table,
            columns: resolved.iter().map(|(c, _)| *c).collect(),
            values: resolved.into_iter().map(|(_, v)| v).collect(),
            keys: Vec::new(),
            returning,
        };
        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();
        self.dialect.write_insert_clause(&mut sql, &mut params, &upsert);
        if !self.dialect.returning_before_values() && !upsert.returning.is_empty() {
            self.dialect.write_returning(&mut sql, &upsert.returning);
        }
        Ok(Statement {
            sql,
            parameters: params,
        })
    }

    /// UPDATE keyed on the table's primary key; key values must be present
    /// among the supplied values.
    pub fn update(&self, table: &TableOrViewMetadata, values: &[(String, Value)]) -> Result<Statement> {
        let resolved = self.resolve_values(table, values)?;
        let keys: Vec<_> = resolved.iter().filter(|(c, _)| c.is_key).collect();
        let expected: Vec<_> = table.key_columns().collect();
        if expected.is_empty() || keys.len() != expected.len() {
            return Err(Error::keys_not_resolved(&table.name));
        }
        let sets: Vec<_> = resolved
            .iter()
            .filter(|(c, _)| !c.is_key && !c.is_identity)
            .collect();
        if sets.is_empty() {
            return Err(Error::Validation(format!(
                "no non-key values to update on {}",
                table.name,
            )));
        }
        let mut sql = String::with_capacity(128);
        let mut params = Vec::new();
        sql.push_str("UPDATE ");
        self.dialect.write_object_name(&mut sql, &table.name);
        sql.push_str("\nSET ");
        let mut first = true;
        for (column, value) in &sets {
            if !first {
                sql.push_str(", ");
            }
            first = false;
            self.dialect.write_quoted(&mut sql, &column.column_name);
            sql.push_str(" = ");
            self.dialect.bind(&mut sql, &mut params, value.clone());
        }
        sql.push_str("\nWHERE ");
        first = true;
        for (column, value) in &keys {
            if !first {
                sql.push_str(" AND ");
            }
            first = false;
            self.dialect.write_quoted(&mut sql, &column.column_name);
            sql.push_str(" = ");
            self.dialect.bind(&mut sql, &mut params, value.clone());
        }
        Ok(Statement {
            sql,
            parameters: params,
        })
    }

    pub fn delete_by_key(&self, table: &TableOrViewMetadata, keys: &[Value]) -> Result<Statement> {
        let mut sql = String::with_capacity(64);
        let mut params = Vec::new();
        sql.push_str("DELETE FROM ");
        self.dialect.write_object_name(&mut sql, &table.name);
        self.key_filter(&mut sql, &mut params, table, keys)?;
        Ok(Statement {
            sql,
            parameters: params,
        })
    }

    /// DELETE by predicate. An empty filter is rejected; truncating a table
    /// must be spelled out by hand.
    pub fn delete_where(&self, table: &TableOrViewMetadata, filter: &Filter) -> Result<Statement> {
        if filter.is_empty() {
            return Err(Error::Validation(format!(
                "refusing to delete from {} without a filter",
                table.name,
            )));
        }
        let mut sql = String::with_capacity(64);
        let mut params = Vec::new();
        sql.push_str("DELETE FROM ");
        self.dialect.write_object_name(&mut sql, &table.name);
        self.write_filter(&mut sql, &mut params, table, filter)?;
        Ok(Statement {
            sql,
            parameters: params,
        })
    }

    pub fn upsert(&self, table: &TableOrViewMetadata, values: &[(String, Value)]) -> Result<Statement> {
        let resolved: Vec<_> = self
            .resolve_values(table, values)?
            .into_iter()
            .filter(|(c, _)| !c.is_identity)
            .collect();
        let keys: Vec<_> = table.key_columns().collect();
        if keys.is_empty() {
            return Err(Error::keys_not_resolved(&table.name));
        }
        for key in &keys {
            if !resolved.iter().any(|(c, _)| c.column_name == key.column_name) {
                return Err(Error::keys_not_resolved(&table.name));
            }
        }
        let upsert = UpsertData {
            table,
            columns: resolved.iter().map(|(c, _)| *c).collect(),
            values: resolved.into_iter().map(|(_, v)| v).collect(),
            keys,
            returning: Vec::new(),
        };
        let mut sql = String::with_capacity(192);
        let mut params = Vec::new();
        self.dialect.write_upsert(&mut sql, &mut params, &upsert);
        Ok(Statement {
            sql,
            parameters: params,
        })
    }

    /// Renders a procedure call with arguments ordered per its metadata.
    /// Every declared parameter must be supplied.
    pub fn procedure(
        &self,
        procedure: &StoredProcedureMetadata,
        arguments: &[(String, Value)],
    ) -> Result<Statement> {
        if self.strict {
            for (name, _) in arguments {
                if !procedure.parameters.iter().any(|p| p.matches(name)) {
                    return Err(Error::StrictMode {
                        property: name.clone(),
                        object: procedure.name.clone(),
                    });
                }
            }
        }
        let mut ordered = Vec::with_capacity(procedure.parameters.len());
        for parameter in &procedure.parameters {
            let supplied = arguments
                .iter()
                .find(|(name, _)| parameter.matches(name))
                .ok_or_else(|| Error::Validation(format!(
                    "missing argument {:?} for {}",
                    parameter.name, procedure.name,
                )))?;
            ordered.push(supplied.1.clone());
        }
        let mut sql = String::with_capacity(64);
        let mut params = Vec::new();
        self.dialect
            .write_procedure_call(&mut sql, &mut params, &procedure.name, ordered);
        Ok(Statement {
            sql,
            parameters: params,
        })
    }
}

/// Raw SQL passthrough: the text is the caller's, the values still bind as
/// ordered parameters replacing `?` markers.
pub fn raw_statement<D: SqlDialect>(
    dialect: &D,
    sql: &str,
    values: Vec<Value>,
) -> Result<Statement> {
    let mut pieces = sql.split('?');
    if pieces.clone().count() != values.len() + 1 {
        return Err(Error::Validation(format!(
            "raw statement expects {} parameter(s), {} given",
            sql.matches('?').count(),
            values.len(),
        )));
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut params = Vec::new();
    if let Some(first) = pieces.next() {
        out.push_str(first);
    }
    for (piece, value) in pieces.zip(values) {
        dialect.bind(&mut out, &mut params, value);
        out.push_str(piece);
    }
    Ok(Statement {
        sql: out,
        parameters: params,
    })
}

/// Returns whether a statement needs the write side of the engine lock.
pub(crate) fn is_write_statement(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    ["INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "DROP", "ALTER", "REPLACE"]
        .iter()
        .any(|kw| {
            // Byte-wise comparison: a prefix slice could land inside a
            // multibyte character.
            trimmed
                .as_bytes()
                .get(..kw.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(kw.as_bytes()))
        })
}
