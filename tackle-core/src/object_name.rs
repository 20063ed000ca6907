use std::{
    borrow::Cow,
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

/// Schema-qualified name of a table, view, procedure or function.
///
/// Comparison and hashing are ASCII case-insensitive, so `ObjectName` can be
/// used as a cache key regardless of how the caller spells the name. Empty
/// `catalog`/`schema` parts mean "unqualified", matching the convention used
/// for table references elsewhere in the crate.
#[derive(Debug, Clone, Default)]
pub struct ObjectName {
    pub catalog: Cow<'static, str>,
    pub schema: Cow<'static, str>,
    pub name: Cow<'static, str>,
}

impl ObjectName {
    pub fn new(
        schema: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            catalog: "".into(),
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Splits a dotted name right-to-left: `name`, `schema.name` or
    /// `catalog.schema.name`. Extra leading segments are folded into the
    /// catalog part.
    pub fn parse(input: &str) -> Self {
        let mut parts = input.rsplitn(3, '.');
        let name = parts.next().unwrap_or("").trim().to_owned();
        let schema = parts.next().unwrap_or("").trim().to_owned();
        let catalog = parts.next().unwrap_or("").trim().to_owned();
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl From<&str> for ObjectName {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for ObjectName {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.catalog.eq_ignore_ascii_case(&other.catalog)
            && self.schema.eq_ignore_ascii_case(&other.schema)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for ObjectName {}

impl Hash for ObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for part in [&self.catalog, &self.schema, &self.name] {
            for b in part.bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
            state.write_u8(0);
        }
    }
}

impl Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.catalog.is_empty() {
            write!(f, "{}.", self.catalog)?;
        }
        if !self.schema.is_empty() {
            write!(f, "{}.", self.schema)?;
        }
        write!(f, "{}", self.name)
    }
}
