//! Relationship metadata and lazy attribute wrappers.
//!
//! Relationships are defined as static metadata on each `Model`, which lets
//! the session layer generate correct SQL and resolve related objects without
//! runtime reflection. Deferred loading is expressed with explicit wrapper
//! types ([`Lazy`], [`LazyCollection`]) carrying an interception state machine
//! instead of generated proxy subclasses: an attribute starts
//! [`LazyState::Uninitialized`] and transitions to [`LazyState::Initialized`]
//! exactly once, on the first successful load.

use crate::{Error, Model, Value};
use asupersync::{Cx, Outcome};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::future::Future;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// Many-to-one: many `Student`s belong to one `School`.
    #[default]
    ManyToOne,
    /// One-to-one: a `Student` has one `Transcript`.
    OneToOne,
    /// One-to-many: one `School` has many `Student`s.
    OneToMany,
}

/// When a related attribute is populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchTiming {
    /// Populated when the owning entity is materialized.
    Eager,
    /// Left uninitialized until an explicit fetch.
    #[default]
    Lazy,
}

/// Metadata about a relationship between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship field.
    pub name: &'static str,

    /// The related model's table name.
    pub related_table: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Local foreign key column (for ManyToOne).
    /// e.g., `"school_name"` on `Student`.
    pub local_key: Option<&'static str>,

    /// Remote foreign key column (for OneToMany).
    /// e.g., `"school_name"` on `Student` when accessed from `School`.
    pub remote_key: Option<&'static str>,

    /// The field on the related model that points back.
    pub back_populates: Option<&'static str>,

    /// When this attribute is populated.
    pub fetch: FetchTiming,

    /// Default ordering for related items (e.g., "name", "enrolled_at DESC").
    pub order_by: Option<&'static str>,
}

impl RelationshipInfo {
    /// Create a new relationship with required fields.
    #[must_use]
    pub const fn new(
        name: &'static str,
        related_table: &'static str,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            name,
            related_table,
            kind,
            local_key: None,
            remote_key: None,
            back_populates: None,
            fetch: FetchTiming::Lazy,
            order_by: None,
        }
    }

    /// Set the local foreign key column (ManyToOne).
    #[must_use]
    pub const fn local_key(mut self, key: &'static str) -> Self {
        self.local_key = Some(key);
        self
    }

    /// Set the remote foreign key column (OneToMany).
    #[must_use]
    pub const fn remote_key(mut self, key: &'static str) -> Self {
        self.remote_key = Some(key);
        self
    }

    /// Set the back-populates field name (bidirectional relationships).
    #[must_use]
    pub const fn back_populates(mut self, field: &'static str) -> Self {
        self.back_populates = Some(field);
        self
    }

    /// Set the fetch timing.
    #[must_use]
    pub const fn fetch(mut self, timing: FetchTiming) -> Self {
        self.fetch = timing;
        self
    }

    /// Set default ordering for related items.
    #[must_use]
    pub const fn order_by(mut self, ordering: &'static str) -> Self {
        self.order_by = Some(ordering);
        self
    }
}

/// Minimal session interface needed to load lazy relationships.
///
/// This trait lives in `fetchwork-core` to avoid circular dependencies: the
/// concrete `Session` type is defined in `fetchwork-session` (which depends
/// on `fetchwork-core`). `fetchwork-session` provides the blanket impl.
pub trait LazyLoader<M: Model> {
    /// Load an object by primary key.
    fn get(&mut self, cx: &Cx, pk: Value)
    -> impl Future<Output = Outcome<Option<M>, Error>> + Send;
}

/// Interception state of a lazy attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyState {
    /// Not yet populated; only the key sentinel is available.
    Uninitialized,
    /// Populated (possibly with a null value) exactly once.
    Initialized,
}

// ============================================================================
// Lazy<T> - deferred to-one association
// ============================================================================

/// A lazily-loaded to-one association (many-to-one or one-to-one).
///
/// The wrapper holds the foreign key sentinel read from the owning row and
/// defers the actual load until [`Lazy::load`] runs against a session. Before
/// that, structural inspection (`state()`, `fk()`, `Debug`) sees the sentinel,
/// never a premature query and never a panic.
///
/// # States
///
/// - **Uninitialized**: FK sentinel only (or null FK), nothing fetched
/// - **Initialized**: the object (or a cached null) has been fetched
///
/// The transition happens exactly once: a second load, or a fetch through an
/// already-initialized wrapper, performs no physical query.
///
/// ```ignore
/// struct Student {
///     school: Lazy<School>,
/// }
///
/// session.fetch(&cx, &student.school).await?;
/// if let Some(school) = student.school.get() {
///     println!("{}", school.name);
/// }
/// ```
pub struct Lazy<T: Model> {
    /// Foreign key sentinel (if any).
    fk_value: Option<Value>,
    /// Initialized object (cached after first load).
    value: OnceLock<Option<T>>,
    /// Whether initialization has happened.
    initialized: AtomicBool,
}

impl<T: Model> Lazy<T> {
    /// Create an uninitialized association with a null FK.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            fk_value: None,
            value: OnceLock::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Create from a foreign key sentinel (not yet initialized).
    #[must_use]
    pub fn from_fk(fk: impl Into<Value>) -> Self {
        Self {
            fk_value: Some(fk.into()),
            value: OnceLock::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Create with an already-initialized object.
    #[must_use]
    pub fn initialized(obj: T) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Some(obj));
        Self {
            fk_value: None,
            value: cell,
            initialized: AtomicBool::new(true),
        }
    }

    /// Load the related object via the provided loader (cached after first
    /// success).
    ///
    /// - If already initialized, returns the cached value without a query.
    /// - If the FK is null, this caches `None` and returns `Ok(None)` without
    ///   a query.
    /// - Otherwise issues exactly one query through the loader.
    /// - If the loader errors/cancels/panics, the attribute stays
    ///   uninitialized, allowing retries.
    pub async fn load<L>(&self, cx: &Cx, loader: &mut L) -> Outcome<Option<&T>, Error>
    where
        L: LazyLoader<T> + ?Sized,
    {
        if self.is_initialized() {
            return Outcome::Ok(self.get());
        }

        let Some(fk) = self.fk_value.clone() else {
            let _ = self.set_initialized(None);
            return Outcome::Ok(None);
        };

        tracing::trace!(
            related = T::TABLE_NAME,
            "initializing lazy to-one association"
        );

        match loader.get(cx, fk).await {
            Outcome::Ok(obj) => {
                let _ = self.set_initialized(obj);
                Outcome::Ok(self.get())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Get the initialized object (None if uninitialized or FK is null).
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.value.get().and_then(|o| o.as_ref())
    }

    /// Current interception state.
    #[must_use]
    pub fn state(&self) -> LazyState {
        if self.is_initialized() {
            LazyState::Initialized
        } else {
            LazyState::Uninitialized
        }
    }

    /// Check whether the attribute has been initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Check if the association is empty (null FK).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fk_value.is_none()
    }

    /// Get the foreign key sentinel.
    #[must_use]
    pub fn fk(&self) -> Option<&Value> {
        self.fk_value.as_ref()
    }

    /// Set the initialized object (internal use by the session).
    ///
    /// Returns `Ok(())` if successfully set, `Err` if already initialized.
    pub fn set_initialized(&self, obj: Option<T>) -> Result<(), Option<T>> {
        match self.value.set(obj) {
            Ok(()) => {
                self.initialized.store(true, Ordering::Release);
                Ok(())
            }
            Err(v) => Err(v),
        }
    }

    /// Reset the attribute to the uninitialized state.
    ///
    /// Useful when refreshing an entity after the owning session ends.
    pub fn reset(&mut self) {
        self.value = OnceLock::new();
        self.initialized = AtomicBool::new(false);
    }
}

impl<T: Model> Default for Lazy<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Model + Clone> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        let cloned = Self {
            fk_value: self.fk_value.clone(),
            value: OnceLock::new(),
            initialized: AtomicBool::new(false),
        };

        if let Some(value) = self.value.get() {
            let _ = cloned.value.set(value.clone());
            cloned.initialized.store(true, Ordering::Release);
        }

        cloned
    }
}

impl<T: Model + fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state() {
            LazyState::Initialized => "initialized",
            LazyState::Uninitialized if self.is_empty() => "uninitialized(null)",
            LazyState::Uninitialized => "uninitialized",
        };

        f.debug_struct("Lazy")
            .field("state", &state)
            .field("fk", &self.fk_value)
            .field("value", &self.get())
            .finish()
    }
}

impl<T> Serialize for Lazy<T>
where
    T: Model + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value.get() {
            Some(Some(obj)) => obj.serialize(serializer),
            Some(None) | None => serializer.serialize_none(),
        }
    }
}

impl<'de, T> Deserialize<'de> for Lazy<T>
where
    T: Model + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let opt = Option::<T>::deserialize(deserializer)?;
        Ok(match opt {
            Some(obj) => Self::initialized(obj),
            None => Self::empty(),
        })
    }
}

// ============================================================================
// LazyCollection<T> - deferred one-to-many collection
// ============================================================================

/// A lazily-loaded collection of related objects (one-to-many).
///
/// Until initialized, the collection holds only the remote FK column name and
/// the parent's key value; iteration yields nothing and `get()` is `None`.
/// A session fetch issues one `SELECT ... WHERE fk = ?` and initializes the
/// collection exactly once.
pub struct LazyCollection<T: Model> {
    /// The initialized objects (if fetched).
    items: OnceLock<Vec<T>>,
    /// Foreign key column on the related model.
    fk_column: &'static str,
    /// Parent's primary key value.
    parent_pk: Option<Value>,
}

impl<T: Model> LazyCollection<T> {
    /// Create a new uninitialized collection keyed by the FK column on the
    /// related model.
    #[must_use]
    pub fn new(fk_column: &'static str) -> Self {
        Self {
            items: OnceLock::new(),
            fk_column,
            parent_pk: None,
        }
    }

    /// Create with the parent primary key needed for loading.
    #[must_use]
    pub fn with_parent_pk(fk_column: &'static str, pk: impl Into<Value>) -> Self {
        Self {
            items: OnceLock::new(),
            fk_column,
            parent_pk: Some(pk.into()),
        }
    }

    /// Create with already-initialized items.
    #[must_use]
    pub fn initialized(fk_column: &'static str, items: Vec<T>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(items);
        Self {
            items: cell,
            fk_column,
            parent_pk: None,
        }
    }

    /// Check whether the collection has been initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.items.get().is_some()
    }

    /// Current interception state.
    #[must_use]
    pub fn state(&self) -> LazyState {
        if self.is_initialized() {
            LazyState::Initialized
        } else {
            LazyState::Uninitialized
        }
    }

    /// Get the initialized objects as a slice (None if uninitialized).
    #[must_use]
    pub fn get(&self) -> Option<&[T]> {
        self.items.get().map(Vec::as_slice)
    }

    /// Number of initialized items (0 if uninitialized).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.get().map_or(0, Vec::len)
    }

    /// Check if the collection is empty (true if uninitialized or
    /// initialized empty).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.get().is_none_or(Vec::is_empty)
    }

    /// Iterate over the initialized items.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.get().map_or([].iter(), |v| v.iter())
    }

    /// Get the FK column name.
    #[must_use]
    pub fn fk_column(&self) -> &'static str {
        self.fk_column
    }

    /// Get the parent PK value (if set).
    #[must_use]
    pub fn parent_pk(&self) -> Option<&Value> {
        self.parent_pk.as_ref()
    }

    /// Set the parent PK value.
    pub fn set_parent_pk(&mut self, pk: impl Into<Value>) {
        self.parent_pk = Some(pk.into());
    }

    /// Set the initialized objects (internal use by the session).
    ///
    /// Returns `Ok(())` if successfully set, `Err` if already initialized.
    pub fn set_initialized(&self, items: Vec<T>) -> Result<(), Vec<T>> {
        self.items.set(items)
    }

    /// Reset the collection to the uninitialized state.
    pub fn reset(&mut self) {
        self.items = OnceLock::new();
    }
}

impl<T: Model> Default for LazyCollection<T> {
    fn default() -> Self {
        Self::new("")
    }
}

impl<T: Model + Clone> Clone for LazyCollection<T> {
    fn clone(&self) -> Self {
        let cloned = Self {
            items: OnceLock::new(),
            fk_column: self.fk_column,
            parent_pk: self.parent_pk.clone(),
        };

        if let Some(items) = self.items.get() {
            let _ = cloned.items.set(items.clone());
        }

        cloned
    }
}

impl<T: Model + fmt::Debug> fmt::Debug for LazyCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state() {
            LazyState::Initialized => "initialized",
            LazyState::Uninitialized => "uninitialized",
        };

        f.debug_struct("LazyCollection")
            .field("state", &state)
            .field("fk_column", &self.fk_column)
            .field("parent_pk", &self.parent_pk)
            .field("len", &self.len())
            .finish()
    }
}

impl<T> Serialize for LazyCollection<T>
where
    T: Model + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.items.get() {
            Some(items) => items.serialize(serializer),
            None => Vec::<T>::new().serialize(serializer),
        }
    }
}

impl<'de, T> Deserialize<'de> for LazyCollection<T>
where
    T: Model + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(Self::initialized("", items))
    }
}

impl<'a, T: Model> IntoIterator for &'a LazyCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.get().map_or([].iter(), |v| v.iter())
    }
}
