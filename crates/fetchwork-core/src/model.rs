//! Model trait for ORM-style struct mapping.
//!
//! The `Model` trait defines the contract for structs that can be mapped to
//! database tables. Implementations are written by hand or generated; either
//! way the metadata is static, so the session can build SQL and resolve lazy
//! attributes without runtime reflection.

use crate::Result;
use crate::field::FieldInfo;
use crate::relationship::RelationshipInfo;
use crate::row::Row;
use crate::value::Value;

/// Contract for structs that map to database tables.
pub trait Model: Sized + Send + Sync {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// The primary key column name(s).
    const PRIMARY_KEY: &'static [&'static str];

    /// Relationship metadata for this model.
    ///
    /// Models with no relationships can rely on the default empty slice.
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[];

    /// Get field metadata for all columns.
    fn fields() -> &'static [FieldInfo];

    /// Convert this model instance to a row of values.
    fn to_row(&self) -> Vec<(&'static str, Value)>;

    /// Construct a model instance from a database row.
    #[allow(clippy::result_large_err)]
    fn from_row(row: &Row) -> Result<Self>;

    /// Get the value of the primary key field(s).
    fn primary_key_value(&self) -> Vec<Value>;

    /// Check if this is a new record (primary key is None/default).
    fn is_new(&self) -> bool;

    /// The columns belonging to the default fetch group.
    ///
    /// Lazy attributes are excluded: they stay uninitialized when the entity
    /// is materialized and are populated only on explicit fetch.
    fn eager_columns() -> Vec<&'static str> {
        Self::fields()
            .iter()
            .filter(|f| !f.lazy)
            .map(|f| f.column_name)
            .collect()
    }
}
