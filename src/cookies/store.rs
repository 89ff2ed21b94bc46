//! Cookie store infrastructure.
//!
//! A **cookie store** is a provisioner and persistence layer for per-database
//! cookie jars.
//! - A replicator only *holds a [`CookieJarHandle`]*, never a store.
//! - A **CookieStore** can *mint* a jar for a given [`DatabaseId`] and
//!   optionally persist/flush all database jars in one place (e.g., a single
//!   JSON file or SQLite DB).
//!
//! Typical usage patterns:
//! - During replicator setup, ask a store for the database's jar and hand the
//!   handle to `HttpClientFactory`.
//! - For ephemeral/test replications, skip the store and use an in-memory jar.
//!
//! This module exports three reference implementations:
//! - [`InMemoryCookieStore`]: no persistence (tests, private replications).
//! - [`JsonCookieStore`]: file-backed JSON store (good for simple setups).
//! - [`SqliteCookieStore`]: SQLite-backed store (good for concurrency and scale).
//!
//! ## Design notes
//! - Stores are *only used at setup time* to obtain a jar; nothing else holds
//!   a store reference at request time.
//! - Implementations should be `Send + Sync` and safe for concurrent access.
//! - `CookieStore::jar_for(database_id)` should return the *same logical jar
//!   instance* for a database for the lifetime of the store, so all handles
//!   observe consistent state.
//! - Runtime persistence is **best-effort**: failures are logged, never
//!   panicked on.

mod in_memory;
mod json;
#[cfg(feature = "sqlite_cookie_store")]
mod sqlite;

use crate::cookies::cookie_jar::MemoryCookieJar;
use crate::cookies::cookies::CookieJarHandle;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// In-memory cookie store (no persistence).
pub use in_memory::InMemoryCookieStore;
/// File-backed JSON cookie store (one file for all databases).
pub use json::JsonCookieStore;
/// SQLite-backed cookie store (one database file for all databases).
#[cfg(feature = "sqlite_cookie_store")]
pub use sqlite::SqliteCookieStore;

/// A unique identifier for a local replicating database, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseId(Uuid);

impl DatabaseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DatabaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DatabaseId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for DatabaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cookie **store** mints per-database cookie **jars** and (optionally)
/// persists them.
///
/// Replicators never hold a `CookieStore`; they only hold a
/// [`CookieJarHandle`]. The store exists to:
/// 1) provide the jar for a given [`DatabaseId`], and
/// 2) write/read cookie state to/from durable storage.
///
/// Implementations must be `Send + Sync` and safe for concurrent use.
pub trait CookieStore: Send + Sync {
    /// Returns (or creates and returns) the cookie jar handle for `database_id`.
    ///
    /// ### Expectations
    /// - Should return the *same logical jar instance* for a given
    ///   `database_id` across calls, so all holders observe consistent state.
    /// - May create the jar lazily on first request.
    /// - Return `None` if the store no longer manages this database (e.g.,
    ///   after removal) or if provisioning fails irrecoverably.
    fn jar_for(&self, database_id: DatabaseId) -> Option<CookieJarHandle>;

    /// Persists the cookie state for `database_id` from a provided snapshot.
    ///
    /// This allows the sync layer to push the current in-memory state
    /// (captured in a [`MemoryCookieJar`] snapshot) into the store without
    /// requiring the store to hold a direct reference to the live jar.
    ///
    /// This is **best-effort** and must not panic.
    fn persist_database_from_snapshot(&self, database_id: DatabaseId, snapshot: &MemoryCookieJar);

    /// Removes all persisted cookie data for `database_id` from the store.
    ///
    /// Implementations should also drop any internal cache for this database
    /// so that subsequent calls to [`CookieStore::jar_for`] can recreate a
    /// fresh, empty jar.
    ///
    /// This operation should be **idempotent** and must not panic.
    fn remove_database(&self, database_id: DatabaseId);

    /// Persists all known database jars to durable storage.
    ///
    /// Called during graceful shutdown or at explicit flush points.
    /// Implementations should make a **best-effort** to write all dirty state
    /// and avoid panicking.
    fn persist_all(&self);
}
