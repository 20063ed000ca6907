use crate::{AsValue, Value};
use std::borrow::Cow;

/// Comparison operators usable in a filter term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Like,
}

impl Comparison {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            Comparison::Equal => " = ",
            Comparison::NotEqual => " <> ",
            Comparison::Less => " < ",
            Comparison::LessEqual => " <= ",
            Comparison::Greater => " > ",
            Comparison::GreaterEqual => " >= ",
            Comparison::Like => " LIKE ",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FilterTerm {
    Compare {
        column: Cow<'static, str>,
        op: Comparison,
        value: Value,
    },
    IsNull {
        column: Cow<'static, str>,
        negated: bool,
    },
    In {
        column: Cow<'static, str>,
        values: Vec<Value>,
    },
    /// Caller-supplied fragment. Values are still bound as parameters, but
    /// identifiers inside the fragment are the caller's responsibility; the
    /// builder cannot quote them.
    Raw {
        sql: String,
        params: Vec<Value>,
    },
}

/// A conjunction of predicates rendered into the WHERE clause.
///
/// Column names are validated against the table metadata and quoted by the
/// dialect; values always become bound parameters.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub(crate) terms: Vec<FilterTerm>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn term(term: FilterTerm) -> Self {
        Self { terms: vec![term] }
    }

    pub fn compare(
        column: impl Into<Cow<'static, str>>,
        op: Comparison,
        value: impl AsValue,
    ) -> Self {
        Self::term(FilterTerm::Compare {
            column: column.into(),
            op,
            value: value.as_value(),
        })
    }

    pub fn eq(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self::compare(column, Comparison::Equal, value)
    }

    pub fn ne(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self::compare(column, Comparison::NotEqual, value)
    }

    pub fn lt(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self::compare(column, Comparison::Less, value)
    }

    pub fn le(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self::compare(column, Comparison::LessEqual, value)
    }

    pub fn gt(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self::compare(column, Comparison::Greater, value)
    }

    pub fn ge(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
        Self::compare(column, Comparison::GreaterEqual, value)
    }

    pub fn like(column: impl Into<Cow<'static, str>>, pattern: impl AsValue) -> Self {
        Self::compare(column, Comparison::Like, pattern)
    }

    pub fn is_null(column: impl Into<Cow<'static, str>>) -> Self {
        Self::term(FilterTerm::IsNull {
            column: column.into(),
            negated: false,
        })
    }

    pub fn is_not_null(column: impl Into<Cow<'static, str>>) -> Self {
        Self::term(FilterTerm::IsNull {
            column: column.into(),
            negated: true,
        })
    }

    pub fn is_in(
        column: impl Into<Cow<'static, str>>,
        values: impl IntoIterator<Item = impl AsValue>,
    ) -> Self {
        Self::term(FilterTerm::In {
            column: column.into(),
            values: values.into_iter().map(AsValue::as_value).collect(),
        })
    }

    /// Escape hatch for predicates the typed terms cannot express. `sql` must
    /// use `?` for each entry in `params`.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self::term(FilterTerm::Raw {
            sql: sql.into(),
            params,
        })
    }

    /// ANDs another filter onto this one.
    pub fn and(mut self, other: Filter) -> Self {
        self.terms.extend(other.terms);
        self
    }
}

/// One ORDER BY expression.
#[derive(Debug, Clone)]
pub struct SortExpression {
    pub column: Cow<'static, str>,
    pub descending: bool,
}

impl SortExpression {
    pub fn asc(column: impl Into<Cow<'static, str>>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<Cow<'static, str>>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}
