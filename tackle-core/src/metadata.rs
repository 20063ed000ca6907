use crate::{ObjectName, Value, snake_case};

/// Schema facts about one column of a table or view.
///
/// Immutable once loaded; owned by the [`MetadataCache`](crate::MetadataCache)
/// and read concurrently by every SQL builder.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// Column name as the database spells it.
    pub column_name: String,
    /// Mapped property name; defaults to the snake_case of the column name.
    pub property_name: String,
    /// Type tag, an empty [`Value`] prototype.
    pub value: Value,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    /// Part of the primary key.
    pub is_key: bool,
    /// Database-generated; never written by INSERT/UPDATE.
    pub is_identity: bool,
}

impl ColumnMetadata {
    pub fn new(column_name: impl Into<String>, value: Value) -> Self {
        let column_name = column_name.into();
        let property_name = snake_case(&column_name);
        Self {
            column_name,
            property_name,
            value: value.prototype(),
            nullable: true,
            max_length: None,
            precision: None,
            scale: None,
            is_key: false,
            is_identity: false,
        }
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self.nullable = false;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property_name = property.into();
        self
    }

    pub fn with_max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn with_precision_scale(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Case-insensitive match against the source column name or the mapped
    /// property name.
    pub fn matches(&self, name: &str) -> bool {
        self.column_name.eq_ignore_ascii_case(name)
            || self.property_name.eq_ignore_ascii_case(name)
    }
}

/// Schema facts about a table or view: its name plus ordered columns.
///
/// Built once per distinct object name, lazily on first request, and cached
/// for the lifetime of the owning metadata cache.
#[derive(Debug, Clone)]
pub struct TableOrViewMetadata {
    pub name: ObjectName,
    pub is_view: bool,
    pub columns: Vec<ColumnMetadata>,
}

impl TableOrViewMetadata {
    pub fn table(name: impl Into<ObjectName>, columns: Vec<ColumnMetadata>) -> Self {
        Self {
            name: name.into(),
            is_view: false,
            columns,
        }
    }

    pub fn view(name: impl Into<ObjectName>, columns: Vec<ColumnMetadata>) -> Self {
        Self {
            name: name.into(),
            is_view: true,
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.matches(name))
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.is_key)
    }

    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|c| c.is_identity)
    }
}

/// Expected bind variable of a procedure or function.
#[derive(Debug, Clone)]
pub struct ParameterMetadata {
    pub name: String,
    /// Type tag, an empty [`Value`] prototype.
    pub value: Value,
}

impl ParameterMetadata {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: value.prototype(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || snake_case(&self.name).eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone)]
pub struct StoredProcedureMetadata {
    pub name: ObjectName,
    pub parameters: Vec<ParameterMetadata>,
}

#[derive(Debug, Clone)]
pub struct ScalarFunctionMetadata {
    pub name: ObjectName,
    pub parameters: Vec<ParameterMetadata>,
    /// Return type tag.
    pub returns: Value,
}
