//! Session factory.
//!
//! A [`SessionFactory`] is the long-lived object a host configures once and
//! opens short-lived sessions from. It owns the shared
//! [`SessionStatistics`] block (so statement counts survive individual
//! sessions) and the [`EngineOptions`] SPI hooks.

use crate::engine::{EngineOptions, TranslatedQuery};
use crate::{Session, SessionConfig};
use fetchwork_core::{Connection, Error, SessionStatistics};
use std::sync::Arc;

/// Factory for sessions sharing statistics and engine configuration.
#[derive(Debug)]
pub struct SessionFactory {
    statistics: Arc<SessionStatistics>,
    config: SessionConfig,
    options: EngineOptions,
}

impl Default for SessionFactory {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl SessionFactory {
    /// Create a factory with the given engine options and default session
    /// configuration.
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        Self::with_config(options, SessionConfig::default())
    }

    /// Create a factory with explicit session configuration.
    #[must_use]
    pub fn with_config(options: EngineOptions, config: SessionConfig) -> Self {
        Self {
            statistics: Arc::new(SessionStatistics::new()),
            config,
            options,
        }
    }

    /// The statistics block shared by every session this factory opens.
    #[must_use]
    pub fn statistics(&self) -> &Arc<SessionStatistics> {
        &self.statistics
    }

    /// The configured engine options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The session configuration applied to opened sessions.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a session over `connection`, wired to this factory's statistics.
    pub fn open_session<C: Connection>(&self, connection: C) -> Session<C> {
        tracing::debug!(
            factory = self.options.factory_name().unwrap_or("anonymous"),
            "opening session"
        );
        Session::with_statistics(connection, self.config.clone(), Arc::clone(&self.statistics))
    }

    /// Translate a source query through the configured translator hook.
    #[allow(clippy::result_large_err)]
    pub fn translate(&self, source: &str) -> Result<TranslatedQuery, Error> {
        self.options.translate(source)
    }
}
