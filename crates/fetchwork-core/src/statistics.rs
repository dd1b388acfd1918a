//! Session statistics.
//!
//! Counters are monotonic between calls to [`SessionStatistics::clear`] and
//! are incremented once per physical event, which makes them usable as exact
//! round-trip assertions in tests: fetching an uninitialized lazy attribute
//! must move `prepared_statement_count` by exactly one, fetching an
//! initialized one by exactly zero.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters describing the physical work a session (or a factory's
/// worth of sessions) has performed.
///
/// Shared via `Arc` between a `SessionFactory` and the sessions it opens.
/// All counters use relaxed atomics: they are accounting data, not
/// synchronization points.
#[derive(Debug, Default)]
pub struct SessionStatistics {
    prepared_statements: AtomicU64,
    entity_loads: AtomicU64,
    entity_inserts: AtomicU64,
    lazy_fetches: AtomicU64,
}

impl SessionStatistics {
    /// Create a fresh statistics block with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical statements prepared and executed.
    ///
    /// Incremented exactly once per query or mutation sent to the
    /// connection.
    #[must_use]
    pub fn prepared_statement_count(&self) -> u64 {
        self.prepared_statements.load(Ordering::Relaxed)
    }

    /// Number of entities materialized from rows.
    #[must_use]
    pub fn entity_load_count(&self) -> u64 {
        self.entity_loads.load(Ordering::Relaxed)
    }

    /// Number of entities inserted.
    #[must_use]
    pub fn entity_insert_count(&self) -> u64 {
        self.entity_inserts.load(Ordering::Relaxed)
    }

    /// Number of lazy attributes initialized on explicit fetch.
    #[must_use]
    pub fn lazy_fetch_count(&self) -> u64 {
        self.lazy_fetches.load(Ordering::Relaxed)
    }

    /// Record one physical statement.
    pub fn record_prepared_statement(&self) {
        self.prepared_statements.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one entity materialization.
    pub fn record_entity_load(&self) {
        self.entity_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one entity insert.
    pub fn record_entity_insert(&self) {
        self.entity_inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one lazy-attribute initialization.
    pub fn record_lazy_fetch(&self) {
        self.lazy_fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset all counters to zero.
    pub fn clear(&self) {
        self.prepared_statements.store(0, Ordering::Relaxed);
        self.entity_loads.store(0, Ordering::Relaxed);
        self.entity_inserts.store(0, Ordering::Relaxed);
        self.lazy_fetches.store(0, Ordering::Relaxed);
    }
}
