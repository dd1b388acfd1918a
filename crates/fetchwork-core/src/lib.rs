//! Core types and traits for fetchwork.
//!
//! This crate provides the foundational abstractions for lazy-loading
//! persistence sessions:
//!
//! - `Model` trait for ORM-style struct mapping
//! - `Lazy` / `LazyCollection` wrappers for deferred attribute loading
//! - `Connection` trait for database connections
//! - `SessionStatistics` for physical-statement accounting
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome, RegionId, TaskId};

pub mod connection;
pub mod error;
pub mod field;
pub mod model;
pub mod relationship;
pub mod row;
pub mod statistics;
pub mod value;

pub use connection::{Connection, Dialect};
pub use error::{
    Error, LazyError, LazyErrorKind, ParameterError, QueryError, QueryErrorKind, Result,
    SessionError, SessionErrorKind, TypeError,
};
pub use field::{FieldInfo, SqlType};
pub use model::Model;
pub use relationship::{
    FetchTiming, Lazy, LazyCollection, LazyLoader, LazyState, RelationshipInfo, RelationshipKind,
};
pub use row::{ColumnInfo, FromValue, Row};
pub use statistics::SessionStatistics;
pub use value::Value;
