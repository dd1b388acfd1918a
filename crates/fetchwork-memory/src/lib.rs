//! In-memory connection backend.
//!
//! [`MemoryConnection`] implements [`Connection`] over plain in-process
//! tables. It understands exactly the statement shapes the session layer
//! emits (single-predicate SELECT and positional INSERT) and rejects
//! everything else with a syntax error, which keeps it honest as a test
//! double: a session that starts emitting different SQL fails loudly here.
//!
//! Cloning a `MemoryConnection` shares the underlying tables, so a seeding
//! session and the session under test can observe the same data.

use asupersync::{Cx, Outcome};
use fetchwork_core::{
    ColumnInfo, Connection, Dialect, Error, QueryError, QueryErrorKind, Row, Value,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct Table {
    columns: Arc<ColumnInfo>,
    rows: Vec<Vec<Value>>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Table>,
    statements: Vec<String>,
}

/// An in-memory [`Connection`] speaking the Postgres dialect.
#[derive(Clone, Default)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnection {
    /// Create a connection with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Define a table with the given column order.
    ///
    /// Redefining a table drops its rows.
    pub fn create_table(&self, name: &str, columns: &[&str]) {
        let columns = Arc::new(ColumnInfo::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
        ));
        self.state().tables.insert(
            name.to_string(),
            Table {
                columns,
                rows: Vec::new(),
            },
        );
    }

    /// Number of rows currently stored in `table`.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.state()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Every statement text this connection has received, in order.
    #[must_use]
    pub fn statement_log(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    #[allow(clippy::result_large_err)]
    fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, Error> {
        let shape = parse_select(sql).ok_or_else(|| unsupported(sql))?;
        let [needle] = params else {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Syntax,
                sql: Some(sql.to_string()),
                message: format!("expected 1 parameter, got {}", params.len()),
                source: None,
            }));
        };

        let state = self.state();
        let table = state
            .tables
            .get(shape.table)
            .ok_or_else(|| missing(sql, &format!("no such table '{}'", shape.table)))?;
        let column = table
            .columns
            .index_of(shape.column)
            .ok_or_else(|| missing(sql, &format!("no such column '{}'", shape.column)))?;

        let (out_columns, indices) = match &shape.projection {
            Some(names) => {
                let mut indices = Vec::with_capacity(names.len());
                for name in names {
                    let index = table
                        .columns
                        .index_of(name)
                        .ok_or_else(|| missing(sql, &format!("no such column '{name}'")))?;
                    indices.push(index);
                }
                let info = ColumnInfo::new(names.iter().map(|n| (*n).to_string()).collect());
                (Arc::new(info), Some(indices))
            }
            None => (Arc::clone(&table.columns), None),
        };

        // SQL equality: a NULL predicate value matches nothing.
        let mut out = Vec::new();
        for row in &table.rows {
            if !needle.is_null() && row.get(column) == Some(needle) {
                let values = match &indices {
                    Some(indices) => indices
                        .iter()
                        .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                        .collect(),
                    None => row.clone(),
                };
                out.push(Row::with_columns(Arc::clone(&out_columns), values));
                if shape.limit_one {
                    break;
                }
            }
        }
        Ok(out)
    }

    #[allow(clippy::result_large_err)]
    fn insert(&self, sql: &str, params: &[Value]) -> Result<u64, Error> {
        let shape = parse_insert(sql).ok_or_else(|| unsupported(sql))?;
        if params.len() != shape.columns.len() {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Syntax,
                sql: Some(sql.to_string()),
                message: format!(
                    "expected {} parameter(s), got {}",
                    shape.columns.len(),
                    params.len()
                ),
                source: None,
            }));
        }

        let mut state = self.state();
        let table = state
            .tables
            .get_mut(shape.table)
            .ok_or_else(|| missing(sql, &format!("no such table '{}'", shape.table)))?;

        let mut row = vec![Value::Null; table.columns.len()];
        for (name, value) in shape.columns.iter().zip(params) {
            let index = table
                .columns
                .index_of(name)
                .ok_or_else(|| missing(sql, &format!("no such column '{name}'")))?;
            row[index] = value.clone();
        }
        table.rows.push(row);
        Ok(1)
    }
}

impl Connection for MemoryConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, _cx: &Cx, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        tracing::trace!(sql, "memory query");
        self.state().statements.push(sql.to_string());
        match self.select(sql, params) {
            Ok(rows) => Outcome::Ok(rows),
            Err(e) => Outcome::Err(e),
        }
    }

    async fn execute(&self, _cx: &Cx, sql: &str, params: &[Value]) -> Outcome<u64, Error> {
        tracing::trace!(sql, "memory execute");
        self.state().statements.push(sql.to_string());
        match self.insert(sql, params) {
            Ok(affected) => Outcome::Ok(affected),
            Err(e) => Outcome::Err(e),
        }
    }

    async fn ping(&self, _cx: &Cx) -> Outcome<(), Error> {
        Outcome::Ok(())
    }

    async fn close(self, _cx: &Cx) -> fetchwork_core::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Statement parsing
// ============================================================================

struct SelectShape<'a> {
    table: &'a str,
    /// Projected columns; `None` means `*`.
    projection: Option<Vec<&'a str>>,
    column: &'a str,
    limit_one: bool,
}

struct InsertShape<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
}

fn unquote(ident: &str) -> Option<&str> {
    ident.strip_prefix('"')?.strip_suffix('"')
}

/// `SELECT * FROM "t" WHERE "c" = $1` or
/// `SELECT "c1", "c2" FROM "t" WHERE "c" = $1`, with an optional ` LIMIT 1`.
fn parse_select(sql: &str) -> Option<SelectShape<'_>> {
    let rest = sql.strip_prefix("SELECT ")?;
    let (projected, rest) = rest.split_once(" FROM ")?;
    let projection = if projected == "*" {
        None
    } else {
        Some(
            projected
                .split(", ")
                .map(unquote)
                .collect::<Option<Vec<_>>>()?,
        )
    };
    let (table, predicate) = rest.split_once(" WHERE ")?;
    let (column, tail) = predicate.split_once(" = ")?;
    let limit_one = match tail {
        "$1" => false,
        "$1 LIMIT 1" => true,
        _ => return None,
    };
    Some(SelectShape {
        table: unquote(table)?,
        projection,
        column: unquote(column)?,
        limit_one,
    })
}

/// `INSERT INTO "t" ("c1", "c2") VALUES ($1, $2)`.
fn parse_insert(sql: &str) -> Option<InsertShape<'_>> {
    let rest = sql.strip_prefix("INSERT INTO ")?;
    let (table, rest) = rest.split_once(" (")?;
    let (columns, placeholders) = rest.split_once(") VALUES (")?;
    let placeholders = placeholders.strip_suffix(')')?;

    let columns: Vec<&str> = columns
        .split(", ")
        .map(unquote)
        .collect::<Option<Vec<_>>>()?;
    for (i, placeholder) in placeholders.split(", ").enumerate() {
        if placeholder != format!("${}", i + 1) {
            return None;
        }
    }
    Some(InsertShape {
        table: unquote(table)?,
        columns,
    })
}

fn unsupported(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        message: "unsupported statement shape".to_string(),
        source: None,
    })
}

fn missing(sql: &str, message: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::NotFound,
        sql: Some(sql.to_string()),
        message: message.to_string(),
        source: None,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;

    fn unwrap_outcome<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            Outcome::Err(e) => panic!("operation failed: {e}"),
            Outcome::Cancelled(_) => panic!("operation cancelled"),
            Outcome::Panicked(_) => panic!("operation panicked"),
        }
    }

    #[test]
    fn insert_then_select_round_trip() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("schools", &["name", "age"]);

        rt.block_on(async {
            let affected = unwrap_outcome(
                conn.execute(
                    &cx,
                    "INSERT INTO \"schools\" (\"name\", \"age\") VALUES ($1, $2)",
                    &[Value::Text("BHS".into()), Value::Int(120)],
                )
                .await,
            );
            assert_eq!(affected, 1);
            assert_eq!(conn.row_count("schools"), 1);

            let rows = unwrap_outcome(
                conn.query(
                    &cx,
                    "SELECT * FROM \"schools\" WHERE \"name\" = $1 LIMIT 1",
                    &[Value::Text("BHS".into())],
                )
                .await,
            );
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].get_named::<i32>("age").unwrap(), 120);
        });
    }

    #[test]
    fn clones_share_tables() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("students", &["id", "school_name"]);
        let other = conn.clone();

        rt.block_on(async {
            unwrap_outcome(
                other
                    .execute(
                        &cx,
                        "INSERT INTO \"students\" (\"id\", \"school_name\") VALUES ($1, $2)",
                        &[Value::Text("gavin".into()), Value::Text("BHS".into())],
                    )
                    .await,
            );
        });

        assert_eq!(conn.row_count("students"), 1);
        assert_eq!(conn.statement_log().len(), 1);
    }

    #[test]
    fn projected_select_returns_only_requested_columns() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("schools", &["name", "age"]);

        rt.block_on(async {
            unwrap_outcome(
                conn.execute(
                    &cx,
                    "INSERT INTO \"schools\" (\"name\", \"age\") VALUES ($1, $2)",
                    &[Value::Text("BHS".into()), Value::Int(120)],
                )
                .await,
            );

            let rows = unwrap_outcome(
                conn.query(
                    &cx,
                    "SELECT \"age\" FROM \"schools\" WHERE \"name\" = $1",
                    &[Value::Text("BHS".into())],
                )
                .await,
            );
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].get_named::<i32>("age").unwrap(), 120);
            assert_eq!(rows[0].get_by_name("name"), None);

            let outcome = conn
                .query(
                    &cx,
                    "SELECT \"nope\" FROM \"schools\" WHERE \"name\" = $1",
                    &[Value::Text("BHS".into())],
                )
                .await;
            match outcome {
                Outcome::Err(Error::Query(e)) => assert_eq!(e.kind, QueryErrorKind::NotFound),
                other => panic!("expected not-found error, got {other:?}"),
            }
        });
    }

    #[test]
    fn null_predicate_matches_nothing() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("students", &["id", "school_name"]);

        rt.block_on(async {
            unwrap_outcome(
                conn.execute(
                    &cx,
                    "INSERT INTO \"students\" (\"id\", \"school_name\") VALUES ($1, $2)",
                    &[Value::Text("amy".into()), Value::Null],
                )
                .await,
            );

            let rows = unwrap_outcome(
                conn.query(
                    &cx,
                    "SELECT * FROM \"students\" WHERE \"school_name\" = $1",
                    &[Value::Null],
                )
                .await,
            );
            assert!(rows.is_empty());
        });
    }

    #[test]
    fn unsupported_statement_is_a_syntax_error() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();

        rt.block_on(async {
            let outcome = conn.query(&cx, "SELECT count(*) FROM schools", &[]).await;
            match outcome {
                Outcome::Err(Error::Query(e)) => assert_eq!(e.kind, QueryErrorKind::Syntax),
                other => panic!("expected syntax error, got {other:?}"),
            }
        });
    }

    #[test]
    fn missing_table_is_not_found() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();

        rt.block_on(async {
            let outcome = conn
                .query(
                    &cx,
                    "SELECT * FROM \"nowhere\" WHERE \"id\" = $1",
                    &[Value::Int(1)],
                )
                .await;
            match outcome {
                Outcome::Err(Error::Query(e)) => assert_eq!(e.kind, QueryErrorKind::NotFound),
                other => panic!("expected not-found error, got {other:?}"),
            }
        });
    }

    #[test]
    fn insert_fills_unlisted_columns_with_null() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("schools", &["name", "age"]);

        rt.block_on(async {
            unwrap_outcome(
                conn.execute(
                    &cx,
                    "INSERT INTO \"schools\" (\"name\") VALUES ($1)",
                    &[Value::Text("BHS".into())],
                )
                .await,
            );

            let rows = unwrap_outcome(
                conn.query(
                    &cx,
                    "SELECT * FROM \"schools\" WHERE \"name\" = $1",
                    &[Value::Text("BHS".into())],
                )
                .await,
            );
            assert_eq!(rows[0].get_by_name("age"), Some(&Value::Null));
        });
    }
}
