//! Engine options and query-translation SPI.
//!
//! fetchwork does not ship a query language or a translation engine; the
//! translation pipeline is a pluggable black box. This module defines the
//! seams a host can plug into:
//!
//! - [`QueryTranslator`] turns a source query string into a
//!   [`TranslatedQuery`] (executable SQL plus parameter arity).
//! - [`MultiTableMutationStrategy`] expands a logical mutation targeting a
//!   multi-table entity into the per-table statements to run.
//! - [`EngineOptions`] collects the configured hooks for a factory.
//!
//! Runtime argument binding happens in [`TranslatedQuery::bind`]; invalid
//! arguments surface as [`ParameterError`] carrying the query text.

use fetchwork_core::{Error, ParameterError, Value};
use std::fmt;
use std::sync::Arc;

/// Translator for transforming a source query string into executable form.
///
/// For standard setups this is some form of SQL generation; fetchwork itself
/// provides no default implementation.
pub trait QueryTranslator: Send + Sync {
    /// Translate `source` into an executable query.
    #[allow(clippy::result_large_err)]
    fn translate(&self, source: &str) -> Result<TranslatedQuery, Error>;
}

/// Contract for handling mutations (UPDATE or DELETE) whose target entity
/// spans multiple tables.
pub trait MultiTableMutationStrategy: Send + Sync {
    /// Expand a single logical mutation into the per-table statements to run.
    #[allow(clippy::result_large_err)]
    fn expand(&self, mutation: &TranslatedQuery) -> Result<Vec<TranslatedQuery>, Error>;
}

/// The output of query translation: executable SQL plus the number of
/// parameters the caller must bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedQuery {
    source: String,
    sql: String,
    param_count: usize,
}

impl TranslatedQuery {
    /// Create a translated query.
    #[must_use]
    pub fn new(source: impl Into<String>, sql: impl Into<String>, param_count: usize) -> Self {
        Self {
            source: source.into(),
            sql: sql.into(),
            param_count,
        }
    }

    /// The original source query text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The executable SQL.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The number of parameters this query expects.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Bind runtime arguments, validating arity.
    ///
    /// Binding the wrong number of arguments is a [`ParameterError`] carrying
    /// the source query text; it is surfaced to the caller, never swallowed.
    #[allow(clippy::result_large_err)]
    pub fn bind(&self, params: &[Value]) -> Result<BoundQuery, Error> {
        if params.len() != self.param_count {
            return Err(Error::Parameter(ParameterError::with_query(
                format!(
                    "query expects {} parameter(s), {} bound",
                    self.param_count,
                    params.len()
                ),
                self.source.clone(),
            )));
        }
        Ok(BoundQuery {
            sql: self.sql.clone(),
            params: params.to_vec(),
        })
    }
}

/// A translated query with its runtime arguments bound, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    sql: String,
    params: Vec<Value>,
}

impl BoundQuery {
    /// The executable SQL.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameter values.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// User configuration options for the query engine seams of a factory.
///
/// All hooks are optional; a factory without a translator simply cannot
/// translate source queries, and a mutation strategy is consulted only when
/// one is configured.
#[derive(Clone, Default)]
pub struct EngineOptions {
    translator: Option<Arc<dyn QueryTranslator>>,
    mutation_strategy: Option<Arc<dyn MultiTableMutationStrategy>>,
    factory_name: Option<String>,
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("translator", &self.translator.is_some())
            .field("mutation_strategy", &self.mutation_strategy.is_some())
            .field("factory_name", &self.factory_name)
            .finish()
    }
}

impl EngineOptions {
    /// Create options with no hooks configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the custom query translator.
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn QueryTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Set the custom multi-table mutation strategy.
    #[must_use]
    pub fn with_mutation_strategy(
        mut self,
        strategy: Arc<dyn MultiTableMutationStrategy>,
    ) -> Self {
        self.mutation_strategy = Some(strategy);
        self
    }

    /// Set the factory name.
    #[must_use]
    pub fn with_factory_name(mut self, name: impl Into<String>) -> Self {
        self.factory_name = Some(name.into());
        self
    }

    /// The configured translator, if any.
    #[must_use]
    pub fn translator(&self) -> Option<&Arc<dyn QueryTranslator>> {
        self.translator.as_ref()
    }

    /// The configured multi-table mutation strategy, if any.
    #[must_use]
    pub fn mutation_strategy(&self) -> Option<&Arc<dyn MultiTableMutationStrategy>> {
        self.mutation_strategy.as_ref()
    }

    /// The factory name, if set.
    #[must_use]
    pub fn factory_name(&self) -> Option<&str> {
        self.factory_name.as_deref()
    }

    /// Translate a source query through the configured translator.
    #[allow(clippy::result_large_err)]
    pub fn translate(&self, source: &str) -> Result<TranslatedQuery, Error> {
        match &self.translator {
            Some(translator) => translator.translate(source),
            None => Err(Error::Custom(format!(
                "no query translator configured; cannot translate '{source}'"
            ))),
        }
    }
}
