//! Lazy-loading persistence sessions with explicit fetch semantics.
//!
//! fetchwork maps plain structs to rows and defers association loading
//! behind [`Lazy`] and [`LazyCollection`] wrappers. Nothing loads behind
//! your back: an uninitialized attribute stays a cheap sentinel until a
//! [`Session`] fetch initializes it with exactly one query, exactly once.
//!
//! # Quick Start
//!
//! ```ignore
//! use fetchwork::prelude::*;
//!
//! let factory = SessionFactory::default();
//! let mut session = factory.open_session(connection);
//!
//! let student: Student = session.get(&cx, "gavin").await?.unwrap();
//! assert!(!is_initialized(&student.school));
//!
//! session.fetch(&cx, &student.school).await?;
//! let school = student.school.get().unwrap();
//! ```
//!
//! The crates underneath:
//!
//! - `fetchwork-core`: model metadata, values, rows, lazy wrappers, errors
//! - `fetchwork-session`: sessions, the factory, and the engine SPI
//! - `fetchwork-memory`: an in-memory backend for tests and examples

pub use fetchwork_core::{
    Budget, ColumnInfo, Connection, Cx, Dialect, Error, FetchTiming, FieldInfo, FromValue, Lazy,
    LazyCollection, LazyError, LazyErrorKind, LazyLoader, LazyState, Model, Outcome,
    ParameterError, QueryError, QueryErrorKind, RegionId, RelationshipInfo, RelationshipKind,
    Result, Row, SessionError, SessionErrorKind, SessionStatistics, SqlType, TaskId, TypeError,
    Value,
};
pub use fetchwork_session::{
    BoundQuery, EngineOptions, MultiTableMutationStrategy, QueryTranslator, Session, SessionConfig,
    SessionFactory, SessionState, TranslatedQuery,
};

/// Check whether a lazy to-one association has been initialized.
///
/// Structural inspection only: never triggers a load and never fails, even
/// when the owning session is long gone.
#[must_use]
pub fn is_initialized<T: Model>(attribute: &Lazy<T>) -> bool {
    attribute.is_initialized()
}

/// Check whether a lazy collection has been initialized.
#[must_use]
pub fn is_collection_initialized<T: Model>(collection: &LazyCollection<T>) -> bool {
    collection.is_initialized()
}

/// Convenience re-exports for the common surface.
pub mod prelude {
    pub use crate::{
        Connection, Cx, Error, FieldInfo, Lazy, LazyCollection, LazyState, Model, Outcome,
        RelationshipInfo, RelationshipKind, Result, Row, Session, SessionConfig, SessionFactory,
        SqlType, Value, is_collection_initialized, is_initialized,
    };
}
