//! Session layer for fetchwork.
//!
//! `fetchwork-session` is the **unit-of-work layer**. A [`Session`] binds a
//! connection to a single logical transaction boundary: entities are loaded
//! and inserted through it, and lazy attributes read from those entities can
//! only be initialized while the session is active.
//!
//! # Role In The Architecture
//!
//! - **Scoped resource**: a session is opened, used on one thread, and
//!   closed; closing invalidates all pending lazy loads.
//! - **Lazy fetch dispatch**: [`Session::fetch`] and
//!   [`Session::fetch_collection`] initialize deferred attributes with
//!   exactly one physical query, idempotently.
//! - **Statement accounting**: every physical statement is recorded once in
//!   the shared [`SessionStatistics`] block.
//!
//! # Design Philosophy
//!
//! - **Explicit over implicit**: attributes never load behind your back; a
//!   fetch is always a visible call.
//! - **Cancel-correct**: all async operations use `Cx` + `Outcome` via
//!   `fetchwork-core`.
//!
//! # Example
//!
//! ```ignore
//! let factory = SessionFactory::default();
//! let mut session = factory.open_session(conn);
//!
//! session.insert(&cx, &school).await?;
//!
//! let student: Student = session.get(&cx, "gavin").await?.unwrap();
//! assert!(!student.school.is_initialized());
//!
//! session.fetch(&cx, &student.school).await?;
//! assert!(student.school.is_initialized());
//! ```

pub mod engine;
pub mod factory;

pub use engine::{
    BoundQuery, EngineOptions, MultiTableMutationStrategy, QueryTranslator, TranslatedQuery,
};
pub use factory::SessionFactory;

use asupersync::{Cx, Outcome};
use fetchwork_core::{
    Connection, Dialect, Error, Lazy, LazyCollection, LazyError, LazyLoader, Model, Row,
    SessionError, SessionStatistics, Value,
};
use std::future::Future;
use std::sync::Arc;

// ============================================================================
// Session Configuration
// ============================================================================

/// Configuration for Session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether physical work is recorded in the statistics block.
    pub statistics_enabled: bool,
    /// Whether each issued statement is logged at debug level.
    pub log_statements: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            statistics_enabled: true,
            log_statements: false,
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Open and usable.
    Active,
    /// Closed; all operations and pending lazy loads are invalid.
    Closed,
}

// ============================================================================
// Session
// ============================================================================

/// A scoped unit of work over a single connection.
///
/// Single-session, single-thread access is assumed: a session is acquired,
/// used, and released around one unit of work. All lazy initialization must
/// happen within that scope; once [`Session::close`] runs, every pending
/// lazy load fails with a [`LazyError`].
pub struct Session<C: Connection> {
    /// The database connection.
    connection: C,
    /// Lifecycle state.
    state: SessionState,
    /// Shared statistics block (factory-wide when opened via a factory).
    statistics: Arc<SessionStatistics>,
    /// Configuration.
    config: SessionConfig,
}

impl<C: Connection> Session<C> {
    /// Create a new session from an existing connection.
    pub fn new(connection: C) -> Self {
        Self::with_config(connection, SessionConfig::default())
    }

    /// Create a new session with custom configuration.
    pub fn with_config(connection: C, config: SessionConfig) -> Self {
        Self::with_statistics(connection, config, Arc::new(SessionStatistics::new()))
    }

    /// Create a session wired to an externally-owned statistics block.
    ///
    /// This is how [`SessionFactory::open_session`] shares one counter set
    /// across all of its sessions.
    pub fn with_statistics(
        connection: C,
        config: SessionConfig,
        statistics: Arc<SessionStatistics>,
    ) -> Self {
        Self {
            connection,
            state: SessionState::Active,
            statistics,
            config,
        }
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The statistics block this session records into.
    pub fn statistics(&self) -> &Arc<SessionStatistics> {
        &self.statistics
    }

    /// Whether the session is still open.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Close the session, invalidating all pending lazy loads.
    ///
    /// Closing an already-closed session is an error, not a silent no-op.
    #[allow(clippy::result_large_err)]
    pub fn close(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Closed {
            return Err(Error::Session(SessionError::already_closed()));
        }
        tracing::debug!("closing session");
        self.state = SessionState::Closed;
        Ok(())
    }

    /// Record and issue one physical statement returning rows.
    async fn run_query(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<Vec<Row>, Error> {
        if self.config.log_statements {
            tracing::debug!(sql, "executing statement");
        }
        if self.config.statistics_enabled {
            self.statistics.record_prepared_statement();
        }
        self.connection.query(cx, sql, params).await
    }

    /// Record and issue one physical mutation statement.
    async fn run_execute(&self, cx: &Cx, sql: &str, params: &[Value]) -> Outcome<u64, Error> {
        if self.config.log_statements {
            tracing::debug!(sql, "executing statement");
        }
        if self.config.statistics_enabled {
            self.statistics.record_prepared_statement();
        }
        self.connection.execute(cx, sql, params).await
    }

    /// Get an entity by primary key.
    ///
    /// Issues exactly one SELECT. Lazy attributes of the materialized entity
    /// stay uninitialized until explicitly fetched.
    pub async fn get<M: Model>(&self, cx: &Cx, pk: impl Into<Value>) -> Outcome<Option<M>, Error> {
        if !self.is_active() {
            return Outcome::Err(Error::Session(SessionError::closed("load an entity")));
        }

        let dialect = self.connection.dialect();
        let pk_col = M::PRIMARY_KEY.first().unwrap_or(&"id");
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {} LIMIT 1",
            eager_column_list::<M>(dialect),
            dialect.quote_identifier(M::TABLE_NAME),
            dialect.quote_identifier(pk_col),
            dialect.placeholder(1)
        );

        let rows = match self.run_query(cx, &sql, &[pk.into()]).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let Some(row) = rows.first() else {
            return Outcome::Ok(None);
        };

        let entity = match M::from_row(row) {
            Ok(entity) => entity,
            Err(e) => return Outcome::Err(e),
        };

        if self.config.statistics_enabled {
            self.statistics.record_entity_load();
        }

        Outcome::Ok(Some(entity))
    }

    /// Insert an entity.
    ///
    /// Issues exactly one INSERT built from [`Model::to_row`].
    pub async fn insert<M: Model>(&self, cx: &Cx, entity: &M) -> Outcome<(), Error> {
        if !self.is_active() {
            return Outcome::Err(Error::Session(SessionError::closed("insert an entity")));
        }

        let dialect = self.connection.dialect();
        let row_data = entity.to_row();
        let columns: Vec<String> = row_data
            .iter()
            .map(|(name, _)| dialect.quote_identifier(name))
            .collect();
        let placeholders: Vec<String> = (1..=row_data.len())
            .map(|i| dialect.placeholder(i))
            .collect();
        let params: Vec<Value> = row_data.into_iter().map(|(_, v)| v).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote_identifier(M::TABLE_NAME),
            columns.join(", "),
            placeholders.join(", ")
        );

        match self.run_execute(cx, &sql, &params).await {
            Outcome::Ok(_) => {
                if self.config.statistics_enabled {
                    self.statistics.record_entity_insert();
                }
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Initialize a lazy to-one association.
    ///
    /// Idempotent: an already-initialized attribute is a success no-op with
    /// zero additional queries; an uninitialized one is populated with
    /// exactly one query. Fetching through a closed session fails with a
    /// [`LazyError`].
    #[tracing::instrument(level = "debug", skip_all, fields(related = M::TABLE_NAME))]
    pub async fn fetch<M: Model>(&mut self, cx: &Cx, attribute: &Lazy<M>) -> Outcome<(), Error> {
        if attribute.is_initialized() {
            tracing::trace!("attribute already initialized; skipping fetch");
            return Outcome::Ok(());
        }

        if !self.is_active() {
            return Outcome::Err(Error::Lazy(LazyError::session_closed(M::TABLE_NAME)));
        }

        match attribute.load(cx, self).await {
            Outcome::Ok(_) => {
                if self.config.statistics_enabled {
                    self.statistics.record_lazy_fetch();
                }
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Initialize a lazy one-to-many collection.
    ///
    /// Same contract as [`Session::fetch`]: idempotent, at most one physical
    /// query, and a [`LazyError`] on a closed session. A collection whose
    /// owner never passed through a session (no parent key) is treated as
    /// detached.
    #[tracing::instrument(level = "debug", skip_all, fields(related = M::TABLE_NAME))]
    pub async fn fetch_collection<M: Model>(
        &self,
        cx: &Cx,
        collection: &LazyCollection<M>,
    ) -> Outcome<(), Error> {
        if collection.is_initialized() {
            tracing::trace!("collection already initialized; skipping fetch");
            return Outcome::Ok(());
        }

        if !self.is_active() {
            return Outcome::Err(Error::Lazy(LazyError::session_closed(M::TABLE_NAME)));
        }

        let Some(parent_pk) = collection.parent_pk().cloned() else {
            return Outcome::Err(Error::Lazy(LazyError::detached(M::TABLE_NAME)));
        };

        let dialect = self.connection.dialect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            eager_column_list::<M>(dialect),
            dialect.quote_identifier(M::TABLE_NAME),
            dialect.quote_identifier(collection.fk_column()),
            dialect.placeholder(1)
        );

        let rows = match self.run_query(cx, &sql, &[parent_pk]).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match M::from_row(row) {
                Ok(item) => items.push(item),
                Err(e) => return Outcome::Err(e),
            }
        }

        if self.config.statistics_enabled {
            for _ in 0..items.len() {
                self.statistics.record_entity_load();
            }
            self.statistics.record_lazy_fetch();
        }

        // A concurrent initializer would be a usage error under the
        // single-thread session model; last writer loses harmlessly.
        let _ = collection.set_initialized(items);
        Outcome::Ok(())
    }

    /// Execute a translated, parameter-bound query.
    pub async fn query(&self, cx: &Cx, query: &BoundQuery) -> Outcome<Vec<Row>, Error> {
        if !self.is_active() {
            return Outcome::Err(Error::Session(SessionError::closed("execute a query")));
        }
        self.run_query(cx, query.sql(), query.params()).await
    }
}

/// Quoted, comma-joined default fetch group for `M`.
///
/// Lazy attributes are excluded: they stay out of the SELECT list and are
/// populated only on explicit fetch.
fn eager_column_list<M: Model>(dialect: Dialect) -> String {
    M::eager_columns()
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

impl<C, M> LazyLoader<M> for Session<C>
where
    C: Connection,
    M: Model,
{
    fn get(
        &mut self,
        cx: &Cx,
        pk: Value,
    ) -> impl Future<Output = Outcome<Option<M>, Error>> + Send {
        Session::get(self, cx, pk)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;
    use fetchwork_core::{FieldInfo, LazyErrorKind, RelationshipInfo, RelationshipKind, SqlType};
    use fetchwork_memory::MemoryConnection;
    use serde::{Deserialize, Serialize};

    fn unwrap_outcome<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            Outcome::Err(e) => panic!("operation failed: {e}"),
            Outcome::Cancelled(_) => panic!("operation cancelled"),
            Outcome::Panicked(_) => panic!("operation panicked"),
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct School {
        name: Option<String>,
        age: i32,
        #[serde(skip, default = "school_students")]
        students: LazyCollection<Student>,
    }

    fn school_students() -> LazyCollection<Student> {
        LazyCollection::new("school_name")
    }

    impl Model for School {
        const TABLE_NAME: &'static str = "schools";
        const PRIMARY_KEY: &'static [&'static str] = &["name"];
        const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
            "students",
            "students",
            RelationshipKind::OneToMany,
        )
        .remote_key("school_name")
        .back_populates("school")];

        fn fields() -> &'static [FieldInfo] {
            const FIELDS: &[FieldInfo] = &[
                FieldInfo::new("name", SqlType::Text).primary_key(),
                FieldInfo::new("age", SqlType::Integer),
            ];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("name", Value::from(self.name.clone())),
                ("age", Value::Int(self.age)),
            ]
        }

        fn from_row(row: &Row) -> fetchwork_core::Result<Self> {
            let name: Option<String> = row.get_named("name")?;
            let students = match &name {
                Some(pk) => LazyCollection::with_parent_pk("school_name", pk.as_str()),
                None => LazyCollection::new("school_name"),
            };
            Ok(Self {
                name,
                age: row.get_named("age")?,
                students,
            })
        }

        fn primary_key_value(&self) -> Vec<Value> {
            vec![Value::from(self.name.clone())]
        }

        fn is_new(&self) -> bool {
            self.name.is_none()
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Student {
        id: Option<String>,
        school: Lazy<School>,
    }

    impl Model for Student {
        const TABLE_NAME: &'static str = "students";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];
        const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
            "school",
            "schools",
            RelationshipKind::ManyToOne,
        )
        .local_key("school_name")
        .back_populates("students")];

        fn fields() -> &'static [FieldInfo] {
            const FIELDS: &[FieldInfo] = &[
                FieldInfo::new("id", SqlType::Text).primary_key(),
                FieldInfo::new("school_name", SqlType::Text)
                    .nullable()
                    .foreign_key("schools.name"),
            ];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            let school_name = match self.school.fk() {
                Some(fk) => fk.clone(),
                None => Value::from(self.school.get().and_then(|s| s.name.clone())),
            };
            vec![("id", Value::from(self.id.clone())), ("school_name", school_name)]
        }

        fn from_row(row: &Row) -> fetchwork_core::Result<Self> {
            let school = match row.get_by_name("school_name") {
                Some(fk) if !fk.is_null() => Lazy::from_fk(fk.clone()),
                _ => Lazy::empty(),
            };
            Ok(Self {
                id: row.get_named("id")?,
                school,
            })
        }

        fn primary_key_value(&self) -> Vec<Value> {
            vec![Value::from(self.id.clone())]
        }

        fn is_new(&self) -> bool {
            self.id.is_none()
        }
    }

    #[derive(Debug, Clone)]
    struct Report {
        id: i32,
        title: String,
        body: Option<String>,
    }

    impl Model for Report {
        const TABLE_NAME: &'static str = "reports";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn fields() -> &'static [FieldInfo] {
            const FIELDS: &[FieldInfo] = &[
                FieldInfo::new("id", SqlType::Integer).primary_key(),
                FieldInfo::new("title", SqlType::Text),
                FieldInfo::new("body", SqlType::Text).nullable().lazy(),
            ];
            FIELDS
        }

        fn to_row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("id", Value::Int(self.id)),
                ("title", Value::Text(self.title.clone())),
                ("body", Value::from(self.body.clone())),
            ]
        }

        fn from_row(row: &Row) -> fetchwork_core::Result<Self> {
            // "body" is outside the default fetch group and may be absent
            let body = row
                .get_by_name("body")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(Self {
                id: row.get_named("id")?,
                title: row.get_named("title")?,
                body,
            })
        }

        fn primary_key_value(&self) -> Vec<Value> {
            vec![Value::Int(self.id)]
        }

        fn is_new(&self) -> bool {
            self.id == 0
        }
    }

    fn seeded_connection(cx: &Cx, rt: &asupersync::runtime::Runtime) -> MemoryConnection {
        let conn = MemoryConnection::new();
        conn.create_table("schools", &["name", "age"]);
        conn.create_table("students", &["id", "school_name"]);

        let school = School {
            name: Some("BHS".to_string()),
            age: 120,
            students: school_students(),
        };
        let student = Student {
            id: Some("gavin".to_string()),
            school: Lazy::initialized(school.clone()),
        };

        rt.block_on(async {
            let mut session = Session::new(conn.clone());
            unwrap_outcome(session.insert(cx, &school).await);
            unwrap_outcome(session.insert(cx, &student).await);
            session.close().expect("close seed session");
        });

        conn
    }

    #[test]
    fn lazy_to_one_fetch_issues_exactly_one_statement() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = seeded_connection(&cx, &rt);

        let factory = SessionFactory::default();
        let stats = Arc::clone(factory.statistics());

        rt.block_on(async {
            let mut session = factory.open_session(conn);
            stats.clear();

            let student: Student =
                unwrap_outcome(session.get(&cx, "gavin").await).expect("student exists");
            assert!(!student.school.is_initialized());
            assert_eq!(
                student.school.fk(),
                Some(&Value::Text("BHS".to_string()))
            );

            let count = stats.prepared_statement_count();
            unwrap_outcome(session.fetch(&cx, &student.school).await);

            assert!(student.school.is_initialized());
            let school = student.school.get().expect("school loaded");
            assert_eq!(school.name.as_deref(), Some("BHS"));
            assert_eq!(stats.prepared_statement_count(), count + 1);
        });
    }

    #[test]
    fn fetching_initialized_association_is_free() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = seeded_connection(&cx, &rt);

        let factory = SessionFactory::default();
        let stats = Arc::clone(factory.statistics());

        rt.block_on(async {
            let mut session = factory.open_session(conn);
            let student: Student =
                unwrap_outcome(session.get(&cx, "gavin").await).expect("student exists");

            unwrap_outcome(session.fetch(&cx, &student.school).await);
            let count = stats.prepared_statement_count();

            // Second fetch is a success no-op
            unwrap_outcome(session.fetch(&cx, &student.school).await);
            assert_eq!(stats.prepared_statement_count(), count);
        });
    }

    #[test]
    fn lazy_collection_fetch_issues_exactly_one_statement() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = seeded_connection(&cx, &rt);

        let factory = SessionFactory::default();
        let stats = Arc::clone(factory.statistics());

        rt.block_on(async {
            let session = factory.open_session(conn);
            stats.clear();

            let school: School =
                unwrap_outcome(session.get(&cx, "BHS").await).expect("school exists");
            assert!(!school.students.is_initialized());

            let count = stats.prepared_statement_count();
            unwrap_outcome(session.fetch_collection(&cx, &school.students).await);

            assert!(school.students.is_initialized());
            assert_eq!(school.students.len(), 1);
            assert_eq!(
                school.students.iter().next().and_then(|s| s.id.as_deref()),
                Some("gavin")
            );
            assert_eq!(stats.prepared_statement_count(), count + 1);

            // Idempotent
            unwrap_outcome(session.fetch_collection(&cx, &school.students).await);
            assert_eq!(stats.prepared_statement_count(), count + 1);
        });
    }

    #[test]
    fn fetch_on_closed_session_is_a_lazy_error() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = seeded_connection(&cx, &rt);

        rt.block_on(async {
            let mut session = Session::new(conn);
            let student: Student =
                unwrap_outcome(session.get(&cx, "gavin").await).expect("student exists");
            session.close().expect("close session");

            let outcome = session.fetch(&cx, &student.school).await;
            match outcome {
                Outcome::Err(Error::Lazy(e)) => {
                    assert_eq!(e.kind, LazyErrorKind::SessionClosed);
                }
                other => panic!("expected lazy error, got {other:?}"),
            }
            assert!(!student.school.is_initialized());
        });
    }

    #[test]
    fn operations_on_closed_session_fail() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = seeded_connection(&cx, &rt);

        rt.block_on(async {
            let mut session = Session::new(conn);
            session.close().expect("close session");

            let outcome: Outcome<Option<Student>, Error> = session.get(&cx, "gavin").await;
            assert!(matches!(outcome, Outcome::Err(Error::Session(_))));

            assert!(matches!(
                session.close(),
                Err(Error::Session(e)) if e.kind == fetchwork_core::SessionErrorKind::AlreadyClosed
            ));
        });
    }

    #[test]
    fn null_fk_fetch_initializes_without_query() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("schools", &["name", "age"]);
        conn.create_table("students", &["id", "school_name"]);

        rt.block_on(async {
            let mut session = Session::new(conn);
            let orphan = Student {
                id: Some("amy".to_string()),
                school: Lazy::empty(),
            };
            unwrap_outcome(session.insert(&cx, &orphan).await);

            let loaded: Student =
                unwrap_outcome(session.get(&cx, "amy").await).expect("student exists");
            assert!(loaded.school.is_empty());

            let count = session.statistics().prepared_statement_count();
            unwrap_outcome(session.fetch(&cx, &loaded.school).await);

            assert!(loaded.school.is_initialized());
            assert!(loaded.school.get().is_none());
            assert_eq!(session.statistics().prepared_statement_count(), count);
        });
    }

    #[test]
    fn detached_collection_fetch_fails() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("students", &["id", "school_name"]);

        rt.block_on(async {
            let session = Session::new(conn);
            let detached: LazyCollection<Student> = LazyCollection::new("school_name");

            let outcome = session.fetch_collection(&cx, &detached).await;
            match outcome {
                Outcome::Err(Error::Lazy(e)) => assert_eq!(e.kind, LazyErrorKind::Detached),
                other => panic!("expected lazy error, got {other:?}"),
            }
        });
    }

    #[test]
    fn lazy_scalar_columns_stay_out_of_the_select_list() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = MemoryConnection::new();
        conn.create_table("reports", &["id", "title", "body"]);

        rt.block_on(async {
            let session = Session::new(conn);
            let report = Report {
                id: 7,
                title: "annual".to_string(),
                body: Some("very long text".to_string()),
            };
            unwrap_outcome(session.insert(&cx, &report).await);

            let loaded: Report =
                unwrap_outcome(session.get(&cx, 7).await).expect("report exists");
            assert_eq!(loaded.title, "annual");
            // Not in the default fetch group, so it comes back unset
            assert_eq!(loaded.body, None);

            let log = session.connection().statement_log();
            let select = log.last().expect("select recorded");
            assert!(select.starts_with("SELECT \"id\", \"title\" FROM \"reports\""));
            assert!(!select.contains("body"));
        });
    }

    #[test]
    fn bound_query_runs_through_session() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = seeded_connection(&cx, &rt);

        rt.block_on(async {
            let session = Session::new(conn);
            let translated = TranslatedQuery::new(
                "from Student s where s.id = ?1",
                "SELECT * FROM \"students\" WHERE \"id\" = $1",
                1,
            );
            let bound = translated.bind(&[Value::Text("gavin".into())]).unwrap();

            let rows = unwrap_outcome(session.query(&cx, &bound).await);
            assert_eq!(rows.len(), 1);

            let err = translated
                .bind(&[Value::Text("gavin".into()), Value::Int(1)])
                .unwrap_err();
            assert!(matches!(err, Error::Parameter(_)));
        });
    }

    #[test]
    fn statistics_track_loads_and_inserts() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();
        let conn = seeded_connection(&cx, &rt);

        let factory = SessionFactory::default();
        let stats = Arc::clone(factory.statistics());

        rt.block_on(async {
            let mut session = factory.open_session(conn);
            stats.clear();

            let student: Student =
                unwrap_outcome(session.get(&cx, "gavin").await).expect("student exists");
            assert_eq!(stats.entity_load_count(), 1);
            assert_eq!(stats.lazy_fetch_count(), 0);

            unwrap_outcome(session.fetch(&cx, &student.school).await);
            assert_eq!(stats.lazy_fetch_count(), 1);
            // The fetched school counts as a load too
            assert_eq!(stats.entity_load_count(), 2);
        });
    }
}
