//! Field and column definitions.

/// SQL column types supported by fetchwork backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// BOOLEAN
    Boolean,
    /// INTEGER (32-bit)
    Integer,
    /// BIGINT (64-bit)
    BigInt,
    /// DOUBLE PRECISION
    Double,
    /// TEXT / VARCHAR
    Text,
    /// BYTEA / BLOB
    Bytes,
}

impl SqlType {
    /// Get the SQL representation of this type.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Text => "TEXT",
            SqlType::Bytes => "BYTEA",
        }
    }
}

/// Metadata about a model field/column.
///
/// Fields are declared as static metadata on each `Model`, which lets the
/// session generate correct SQL without runtime reflection. The `lazy` flag
/// marks attributes excluded from the default fetch group: they are left
/// uninitialized at materialization time and populated on explicit fetch.
#[derive(Debug, Clone, Copy)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Database column name (may differ from field name)
    pub column_name: &'static str,
    /// SQL type for this field
    pub sql_type: SqlType,
    /// Whether this field is nullable
    pub nullable: bool,
    /// Whether this is a primary key
    pub primary_key: bool,
    /// Whether loading of this attribute is deferred until explicit fetch
    pub lazy: bool,
    /// Foreign key reference ("table.column"), if any
    pub foreign_key: Option<&'static str>,
}

impl FieldInfo {
    /// Create a new eagerly-fetched field.
    #[must_use]
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            column_name: name,
            sql_type,
            nullable: false,
            primary_key: false,
            lazy: false,
            foreign_key: None,
        }
    }

    /// Mark this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark this field as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Exclude this attribute from the default fetch group.
    #[must_use]
    pub const fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Set the database column name.
    #[must_use]
    pub const fn column(mut self, column_name: &'static str) -> Self {
        self.column_name = column_name;
        self
    }

    /// Set the foreign key reference.
    #[must_use]
    pub const fn foreign_key(mut self, reference: &'static str) -> Self {
        self.foreign_key = Some(reference);
        self
    }
}
