use crate::{
    AsValue, ColumnMetadata, Error, ObjectName, Result, RowLabeled, TableOrViewMetadata, Value,
};
use std::borrow::Cow;

fn eq_ignore_case(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

/// Case-insensitive label access over one result row.
///
/// A scoped view narrows the row to labels of the form `prefix.column`,
/// which is how a joined query decomposes into nested objects: the outer
/// object binds the bare labels, each nested one binds its own prefix.
#[derive(Clone)]
pub struct RowView<'a> {
    row: &'a RowLabeled,
    prefix: Cow<'a, str>,
}

impl<'a> RowView<'a> {
    pub fn new(row: &'a RowLabeled) -> Self {
        Self {
            row,
            prefix: Cow::Borrowed(""),
        }
    }

    /// Narrows to `prefix.column` labels. Nesting concatenates prefixes.
    pub fn scoped(&self, prefix: &str) -> RowView<'a> {
        let prefix = if self.prefix.is_empty() {
            prefix.to_owned()
        } else {
            let mut p = String::with_capacity(self.prefix.len() + 1 + prefix.len());
            p.push_str(&self.prefix);
            p.push('.');
            p.push_str(prefix);
            p
        };
        RowView {
            row: self.row,
            prefix: Cow::Owned(prefix),
        }
    }

    fn matches_label(&self, label: &str, name: &str) -> bool {
        let label = label.as_bytes();
        if self.prefix.is_empty() {
            return eq_ignore_case(label, name.as_bytes());
        }
        let prefix = self.prefix.as_bytes();
        label.len() == prefix.len() + 1 + name.len()
            && eq_ignore_case(&label[..prefix.len()], prefix)
            && label[prefix.len()] == b'.'
            && eq_ignore_case(&label[prefix.len() + 1..], name.as_bytes())
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.row
            .labels
            .iter()
            .position(|l| self.matches_label(l, name))
            .map(|i| &self.row.values[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether any label in scope holds a non-NULL value. A decomposed view
    /// that is all NULL stands for an absent nested object.
    pub fn has_values(&self) -> bool {
        if self.prefix.is_empty() {
            return self.row.values.iter().any(|v| !v.is_null());
        }
        let prefix = self.prefix.as_bytes();
        self.row
            .labels
            .iter()
            .zip(self.row.values.iter())
            .any(|(label, value)| {
                let label = label.as_bytes();
                label.len() > prefix.len() + 1
                    && eq_ignore_case(&label[..prefix.len()], prefix)
                    && label[prefix.len()] == b'.'
                    && !value.is_null()
            })
    }

    /// Converts the named column, failing when the label is absent or the
    /// value does not fit the target type. NULL into a non-`Option` target
    /// names the offending column.
    pub fn require<T: AsValue>(&self, name: &str) -> Result<T> {
        let Some(value) = self.get(name) else {
            return Err(Error::Mapping(format!(
                "column `{}` is missing from the result set",
                name,
            )));
        };
        T::try_from_value(value.clone()).map_err(|e| match e {
            Error::UnexpectedData(..) => Error::unexpected_null(name),
            other => other,
        })
    }
}

/// Explicit constructor declaration: the columns a type binds, in positional
/// order, and the function that builds it from values in that order.
pub struct BindPlan<T> {
    pub columns: Vec<Cow<'static, str>>,
    pub build: fn(&[Value]) -> Result<T>,
}

/// A type mapped to one table or view.
///
/// `from_row` is the reflective path binding by label; `from_values` the
/// positional path the compiled materializer drives after resolving labels
/// once per distinct statement shape.
pub trait Entity: Sized + Send + 'static {
    fn object_name() -> ObjectName;

    /// Column metadata in positional order, matching [`from_values`](Self::from_values).
    fn columns() -> Vec<ColumnMetadata>;

    fn table_metadata() -> TableOrViewMetadata {
        TableOrViewMetadata::table(Self::object_name(), Self::columns())
    }

    /// Property name / value pairs for writes.
    fn to_row(&self) -> Vec<(String, Value)>;

    /// Primary key values, in the order the key columns appear in
    /// [`columns`](Self::columns).
    fn key(&self) -> Vec<Value>;

    /// Positional construction, values aligned with [`columns`](Self::columns)
    /// (or with [`constructor`](Self::constructor) when one is declared).
    fn from_values(values: &[Value]) -> Result<Self>;

    /// Reflective construction by label.
    fn from_row(view: &RowView<'_>) -> Result<Self>;

    /// Declared constructor used by the constructor-inference options and the
    /// compiled materializer. `None` means every column is bound.
    fn constructor() -> Option<BindPlan<Self>> {
        None
    }
}
