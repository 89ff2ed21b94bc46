//! SQLite-backed cookie store.
//!
//! `SqliteCookieStore` persists **all databases'** cookie jars in a single
//! SQLite file. It implements the [`CookieStore`] trait and returns
//! per-database jars wrapped in a [`PersistentCookieJar`], so that **every
//! mutation** to a jar triggers a snapshot write back to this store.
//!
//! ## Design
//! - One **table** (`cookies`) for all databases; each row is a single cookie.
//! - In-memory cache: `jars: RwLock<HashMap<DatabaseId, CookieJarHandle>>` for
//!   quick reuse.
//! - The store keeps a self handle (`store_self`) so persistent jars can call
//!   back into `persist_database_from_snapshot`.
//! - Database access is via an `r2d2` pool for safe multi-threaded use.
//!
//! ## Concurrency
//! - The store is internally synchronized with `RwLock` and intended to be
//!   used behind a `CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>`.
//! - Each jar handle returned is an `Arc<RwLock<...>>` and may be shared
//!   safely across threads.
//!
//! ## I/O characteristics & caveats
//! - `save_database` **rewrites** the set of cookies for a database
//!   (DELETE + INSERT) in one transaction.
//! - Runtime persistence failures are logged and skipped; only opening the
//!   store itself is fallible.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;

use crate::cookies::cookie_jar::MemoryCookieJar;
use crate::cookies::persistent_cookie_jar::PersistentCookieJar;
use crate::cookies::store::{CookieStore, DatabaseId};
use crate::cookies::{Cookie, CookieJarHandle, CookieStoreHandle};
use crate::errors::SyncError;

fn db_err(e: impl std::fmt::Display) -> SyncError {
    SyncError::CookieStore(e.to_string())
}

/// A SQLite-based cookie store that persists cookies across sessions.
///
/// Creates per-database jars on demand, caches them in memory, and snapshots
/// them back to SQLite after each mutation (via [`PersistentCookieJar`]).
pub struct SqliteCookieStore {
    /// Connection pool for the SQLite file (so it can run multithreaded)
    pool: Pool<SqliteConnectionManager>,
    /// Cookie jars per database
    jars: RwLock<HashMap<DatabaseId, CookieJarHandle>>,
    /// Self handle provided to persistent jars for callback persistence.
    store_self: RwLock<Option<CookieStoreHandle>>,
}

impl SqliteCookieStore {
    /// Opens (or creates) a SQLite database at `path` and ensures the schema
    /// exists.
    ///
    /// Returns an `Arc<Self>` ready to be used as a `CookieStoreHandle`, or
    /// [`SyncError::CookieStore`] when the pool or schema cannot be created.
    pub fn new(path: PathBuf) -> Result<Arc<Self>, SyncError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager).map_err(db_err)?;

        {
            let conn = pool.get().map_err(db_err)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS cookies (
                    database_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    value TEXT NOT NULL,
                    path TEXT,
                    domain TEXT,
                    secure INTEGER NOT NULL,
                    expires TEXT,
                    same_site TEXT,
                    http_only INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS cookies_database_id ON cookies (database_id);",
            )
            .map_err(db_err)?;
        }

        let store = Arc::new(Self {
            pool,
            jars: RwLock::new(HashMap::new()),
            store_self: RwLock::new(None),
        });

        {
            let mut self_ref = store.store_self.write().unwrap();
            *self_ref = Some(store.clone() as CookieStoreHandle);
        }

        Ok(store)
    }

    /// Borrows a pooled SQLite connection.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, SyncError> {
        self.pool.get().map_err(db_err)
    }

    /// Loads all cookies for `database_id` into a new [`MemoryCookieJar`].
    ///
    /// Query failures are logged and yield an empty jar.
    fn load_database(&self, database_id: DatabaseId) -> MemoryCookieJar {
        match self.try_load_database(database_id) {
            Ok(jar) => jar,
            Err(e) => {
                log::warn!("failed to load cookies for database {database_id}: {e}");
                MemoryCookieJar::new()
            }
        }
    }

    fn try_load_database(&self, database_id: DatabaseId) -> Result<MemoryCookieJar, SyncError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT name, value, path, domain, secure, expires, same_site, http_only
             FROM cookies WHERE database_id = ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map([database_id.to_string()], |row| {
                Ok(Cookie {
                    name: row.get(0)?,
                    value: row.get(1)?,
                    path: row.get(2)?,
                    domain: row.get(3)?,
                    secure: row.get::<_, i64>(4)? != 0,
                    expires: row.get(5)?,
                    same_site: row.get(6)?,
                    http_only: row.get::<_, i64>(7)? != 0,
                })
            })
            .map_err(db_err)?;

        let mut jar = MemoryCookieJar::new();
        for cookie in rows.flatten() {
            jar.entries.push(cookie);
        }

        Ok(jar)
    }

    /// Replaces all cookies for `database_id` with the contents of `jar` in a
    /// transaction (DELETE the existing rows, INSERT the new set).
    ///
    /// Failures are logged; the previous on-disk state is kept.
    fn save_database(&self, database_id: DatabaseId, jar: &MemoryCookieJar) {
        if let Err(e) = self.try_save_database(database_id, jar) {
            log::warn!("failed to persist cookies for database {database_id}: {e}");
        }
    }

    fn try_save_database(
        &self,
        database_id: DatabaseId,
        jar: &MemoryCookieJar,
    ) -> Result<(), SyncError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute(
            "DELETE FROM cookies WHERE database_id = ?1",
            [database_id.to_string()],
        )
        .map_err(db_err)?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO cookies (database_id, name, value, path, domain, secure, expires, same_site, http_only)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ).map_err(db_err)?;

            for cookie in &jar.entries {
                stmt.execute(params![
                    database_id.to_string(),
                    cookie.name,
                    cookie.value,
                    cookie.path,
                    cookie.domain,
                    cookie.secure as i64,
                    cookie.expires,
                    cookie.same_site,
                    cookie.http_only as i64
                ])
                .map_err(db_err)?;
            }
        }

        tx.commit().map_err(db_err)
    }

    /// Deletes all cookies for `database_id` from the SQLite file.
    fn remove_database_from_db(&self, database_id: DatabaseId) {
        let result = self.conn().and_then(|conn| {
            conn.execute(
                "DELETE FROM cookies WHERE database_id = ?1",
                [database_id.to_string()],
            )
            .map_err(db_err)
        });

        if let Err(e) = result {
            log::warn!("failed to remove cookies for database {database_id}: {e}");
        }
    }
}

impl CookieStore for SqliteCookieStore {
    /// Returns the cookie jar handle for `database_id`, creating it if needed.
    ///
    /// Behavior:
    /// - If a jar for `database_id` exists in the in-memory cache, it is
    ///   returned.
    /// - Otherwise, a serialized jar is loaded from SQLite (if present) or an
    ///   empty [`MemoryCookieJar`] is created.
    /// - That jar is wrapped in a [`PersistentCookieJar`] bound to this store
    ///   (via `store_self`) so that subsequent mutations persist automatically.
    fn jar_for(&self, database_id: DatabaseId) -> Option<CookieJarHandle> {
        {
            let jars = self.jars.read().unwrap();
            if let Some(jar) = jars.get(&database_id) {
                return Some(jar.clone());
            }
        }

        let jar = self.load_database(database_id);
        let arc_jar: CookieJarHandle = Arc::new(RwLock::new(jar));

        let store_ref = self.store_self.read().unwrap();
        let store = store_ref.as_ref()?.clone();

        let persistent: CookieJarHandle = Arc::new(RwLock::new(PersistentCookieJar::new(
            database_id,
            arc_jar,
            store,
        )));

        self.jars
            .write()
            .unwrap()
            .insert(database_id, persistent.clone());

        Some(persistent)
    }

    /// Persists a snapshot of `database_id`'s jar to SQLite.
    ///
    /// Called by [`PersistentCookieJar`] after each mutation.
    fn persist_database_from_snapshot(&self, database_id: DatabaseId, snapshot: &MemoryCookieJar) {
        self.save_database(database_id, snapshot);
    }

    /// Removes `database_id` from both the in-memory cache and the SQLite file.
    fn remove_database(&self, database_id: DatabaseId) {
        self.jars.write().unwrap().remove(&database_id);
        self.remove_database_from_db(database_id);
    }

    /// Persists **all** in-memory jars to SQLite by snapshotting them.
    ///
    /// Only jars of type [`PersistentCookieJar`] that wrap a [`MemoryCookieJar`]
    /// are snapshotted here to keep the on-disk format stable.
    fn persist_all(&self) {
        let jars = self.jars.read().unwrap();

        for (database_id, jar_handle) in jars.iter() {
            if let Ok(jar) = jar_handle.read() {
                if let Some(persist) = jar.as_any().downcast_ref::<PersistentCookieJar>() {
                    if let Ok(inner) = persist.inner.read() {
                        if let Some(snapshot) = inner.as_any().downcast_ref::<MemoryCookieJar>() {
                            self.save_database(*database_id, snapshot);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(name: &str, value: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
            path: Some("/".to_string()),
            domain: Some("example.com".to_string()),
            secure: true,
            expires: Some("2026-12-31T23:59:59Z".to_string()),
            same_site: Some("Lax".to_string()),
            http_only: true,
        }
    }

    #[test]
    fn cookies_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.sqlite");
        let database_id = DatabaseId::new();

        {
            let store = SqliteCookieStore::new(path.clone()).unwrap();
            let jar = store.jar_for(database_id).unwrap();
            jar.write()
                .unwrap()
                .save_from_response(None, vec![cookie("session", "abc")]);
        }

        let reopened = SqliteCookieStore::new(path).unwrap();
        let jar = reopened.jar_for(database_id).unwrap();
        let cookies = jar.read().unwrap().load_for_request(None);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0], cookie("session", "abc"));
    }

    #[test]
    fn remove_database_deletes_persisted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.sqlite");
        let database_id = DatabaseId::new();

        {
            let store = SqliteCookieStore::new(path.clone()).unwrap();
            let jar = store.jar_for(database_id).unwrap();
            jar.write()
                .unwrap()
                .save_from_response(None, vec![cookie("session", "abc")]);
            store.remove_database(database_id);
        }

        let reopened = SqliteCookieStore::new(path).unwrap();
        let jar = reopened.jar_for(database_id).unwrap();
        assert!(jar.read().unwrap().load_for_request(None).is_empty());
    }

    #[test]
    fn snapshot_rewrite_replaces_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.sqlite");
        let database_id = DatabaseId::new();

        let store = SqliteCookieStore::new(path).unwrap();
        let jar = store.jar_for(database_id).unwrap();
        jar.write()
            .unwrap()
            .save_from_response(None, vec![cookie("a", "1"), cookie("b", "2")]);

        // Overwrite one of them; the rewrite must not duplicate rows
        jar.write()
            .unwrap()
            .save_from_response(None, vec![cookie("a", "updated")]);

        let loaded = store.try_load_database(database_id).unwrap();
        assert_eq!(loaded.entries.len(), 2);
    }
}
