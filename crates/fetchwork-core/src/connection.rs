//! Database connection traits.
//!
//! This module defines the abstractions fetchwork sessions drive:
//!
//! - [`Connection`] - trait for executing queries and statements
//! - [`Dialect`] - placeholder and identifier-quoting conventions
//!
//! All operations integrate with asupersync's structured concurrency via `Cx`
//! context for proper cancellation and timeout handling.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};
use std::future::Future;

/// SQL dialect conventions for the statements the session emits.
///
/// fetchwork does not generate dialect-specific SQL beyond parameter
/// placeholders and identifier quoting; everything else is plain SQL-92.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// PostgreSQL: `$1` placeholders, double-quoted identifiers.
    #[default]
    Postgres,
    /// SQLite: `?1` placeholders, double-quoted identifiers.
    Sqlite,
    /// MySQL: `?` placeholders, backtick-quoted identifiers.
    MySql,
}

impl Dialect {
    /// The placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::MySql => "?".to_string(),
        }
    }

    /// Quote an identifier (table or column name).
    #[must_use]
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("\"{ident}\""),
            Dialect::MySql => format!("`{ident}`"),
        }
    }
}

/// A database connection capable of executing queries.
///
/// All operations are async and take a `Cx` context for cancellation/timeout
/// support. Implementations must be `Send + Sync` for use across async
/// boundaries.
pub trait Connection: Send + Sync {
    /// The SQL dialect this connection speaks.
    fn dialect(&self) -> Dialect;

    /// Execute a query and return all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, crate::Error>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, crate::Error>> + Send {
        async move {
            match self.query(cx, sql, params).await {
                Outcome::Ok(rows) => Outcome::Ok(rows.into_iter().next()),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }

    /// Execute a statement (INSERT, UPDATE, DELETE) and return rows affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, crate::Error>> + Send;

    /// Check if the connection is still valid by sending a ping.
    fn ping(&self, cx: &Cx) -> impl Future<Output = Outcome<(), crate::Error>> + Send;

    /// Check if the connection is still valid (alias for ping that returns bool).
    fn is_valid(&self, cx: &Cx) -> impl Future<Output = bool> + Send {
        async {
            match self.ping(cx).await {
                Outcome::Ok(()) => true,
                Outcome::Err(_) | Outcome::Cancelled(_) | Outcome::Panicked(_) => false,
            }
        }
    }

    /// Close the connection gracefully.
    fn close(self, cx: &Cx) -> impl Future<Output = Result<()>> + Send;
}
