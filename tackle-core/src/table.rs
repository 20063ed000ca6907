use crate::{AsValue, Entity, Result, Row, RowLabeled, RowNames, RowView, Value};

/// A fully buffered result set: one shared label list plus every row.
///
/// The untyped terminal shape; [`to_objects`](Table::to_objects) converts it
/// to entities after the fact, so one query can be buffered once and
/// materialized as several types.
#[derive(Debug, Default, Clone)]
pub struct Table {
    pub column_names: RowNames,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(column_names: RowNames) -> Self {
        Self {
            column_names,
            rows: Vec::new(),
        }
    }

    /// Appends a row; the first row fixes the label list.
    pub fn push(&mut self, row: RowLabeled) {
        if self.column_names.is_empty() && !row.labels.is_empty() {
            self.column_names = row.labels.clone();
        }
        self.rows.push(row.values);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<TableRow<'_>> {
        (index < self.rows.len()).then_some(TableRow { table: self, index })
    }

    pub fn iter(&self) -> impl Iterator<Item = TableRow<'_>> {
        (0..self.rows.len()).map(|index| TableRow { table: self, index })
    }

    /// Late typed conversion of every buffered row.
    pub fn to_objects<T: Entity>(&self) -> Result<Vec<T>> {
        self.iter().map(|row| row.to_object()).collect()
    }
}

/// One row of a buffered [`Table`], bound to its labels by index.
#[derive(Clone, Copy)]
pub struct TableRow<'a> {
    table: &'a Table,
    index: usize,
}

impl TableRow<'_> {
    pub fn values(&self) -> &[Value] {
        &self.table.rows[self.index]
    }

    /// Case-insensitive column lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.table
            .column_names
            .iter()
            .position(|l| l.eq_ignore_ascii_case(name))
            .map(|i| &self.table.rows[self.index][i])
    }

    pub fn require<T: AsValue>(&self, name: &str) -> Result<T> {
        let row = self.labeled();
        RowView::new(&row).require(name)
    }

    pub fn to_object<T: Entity>(&self) -> Result<T> {
        let row = self.labeled();
        T::from_row(&RowView::new(&row))
    }

    fn labeled(&self) -> RowLabeled {
        RowLabeled::new(
            self.table.column_names.clone(),
            self.table.rows[self.index].clone(),
        )
    }
}

/// Every result set of a statement batch or procedure call, in arrival order.
#[derive(Debug, Default)]
pub struct TableSet {
    pub tables: Vec<Table>,
}

impl TableSet {
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, index: usize) -> Option<&Table> {
        self.tables.get(index)
    }
}
