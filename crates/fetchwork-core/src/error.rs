//! Error types for fetchwork operations.

use std::fmt;

/// The primary error type for all fetchwork operations.
#[derive(Debug)]
pub enum Error {
    /// Query execution errors
    Query(QueryError),
    /// Invalid runtime argument bound to a parameterized query
    Parameter(ParameterError),
    /// Lazy initialization attempted outside an active session
    Lazy(LazyError),
    /// Operation on a closed or otherwise unusable session
    Session(SessionError),
    /// Type conversion errors
    Type(TypeError),
    /// I/O errors
    Io(std::io::Error),
    /// Operation timed out
    Timeout,
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Statement timeout
    Timeout,
    /// Other database error
    Database,
}

/// A problem with the runtime arguments bound to query parameters.
///
/// Carries the message explaining the condition, the query text that led to
/// it (when known), and the underlying cause (when there is one). Both the
/// message and the query string are preserved verbatim and exposed through
/// accessors.
#[derive(Debug)]
pub struct ParameterError {
    message: String,
    query_string: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ParameterError {
    /// Create a parameter error from a message alone.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            query_string: None,
            source: None,
        }
    }

    /// Create a parameter error carrying the offending query text.
    #[must_use]
    pub fn with_query(message: impl Into<String>, query_string: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            query_string: Some(query_string.into()),
            source: None,
        }
    }

    /// Create a parameter error with query text and an underlying cause.
    #[must_use]
    pub fn with_cause(
        message: impl Into<String>,
        query_string: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            query_string: Some(query_string.into()),
            source: Some(Box::new(cause)),
        }
    }

    /// The message explaining the error condition.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The query that led to the error, if known.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }
}

/// Lazy initialization attempted without an active session.
#[derive(Debug)]
pub struct LazyError {
    pub kind: LazyErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyErrorKind {
    /// The owning session has been closed
    SessionClosed,
    /// The entity is no longer attached to any session
    Detached,
}

impl LazyError {
    /// Lazy access after the owning session was closed.
    #[must_use]
    pub fn session_closed(attribute: &str) -> Self {
        Self {
            kind: LazyErrorKind::SessionClosed,
            message: format!(
                "could not initialize lazy attribute '{attribute}': the owning session is closed"
            ),
        }
    }

    /// Lazy access on a detached entity.
    #[must_use]
    pub fn detached(attribute: &str) -> Self {
        Self {
            kind: LazyErrorKind::Detached,
            message: format!(
                "could not initialize lazy attribute '{attribute}': the entity is detached"
            ),
        }
    }
}

/// Operation on a session in the wrong state.
#[derive(Debug)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// The session is closed
    Closed,
    /// The session was already closed when close was requested again
    AlreadyClosed,
}

impl SessionError {
    /// An operation was attempted on a closed session.
    #[must_use]
    pub fn closed(operation: &str) -> Self {
        Self {
            kind: SessionErrorKind::Closed,
            message: format!("cannot {operation}: the session is closed"),
        }
    }

    /// Close was requested on a session that is already closed.
    #[must_use]
    pub fn already_closed() -> Self {
        Self {
            kind: SessionErrorKind::AlreadyClosed,
            message: "the session was already closed".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl Error {
    /// Get the SQL that caused this error, if available.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            Error::Parameter(p) => p.query_string(),
            _ => None,
        }
    }

    /// Is this a session-state error (closed session or detached entity)?
    #[must_use]
    pub fn is_session_state(&self) -> bool {
        matches!(self, Error::Lazy(_) | Error::Session(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Parameter(e) => write!(f, "Parameter error: {}", e),
            Error::Lazy(e) => write!(f, "Lazy initialization error: {}", e.message),
            Error::Session(e) => write!(f, "Session error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.query_string {
            Some(query) => write!(f, "{} [{}]", self.message, query),
            None => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for LazyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Parameter(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<ParameterError> for Error {
    fn from(err: ParameterError) -> Self {
        Error::Parameter(err)
    }
}

impl From<LazyError> for Error {
    fn from(err: LazyError) -> Self {
        Error::Lazy(err)
    }
}

impl From<SessionError> for Error {
    fn from(err: SessionError) -> Self {
        Error::Session(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

/// Result type alias for fetchwork operations.
pub type Result<T> = std::result::Result<T, Error>;
