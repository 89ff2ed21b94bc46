//! JSON-backed cookie store.
//!
//! `JsonCookieStore` persists **all databases'** cookie jars in a single JSON
//! file on disk. It implements the [`CookieStore`] trait and returns per-database
//! jars wrapped in [`PersistentCookieJar`], so that **every mutation** to a jar
//! triggers a snapshot write back to this store.
//!
//! ### Design
//! - One file for all databases
//!   (`CookieStoreFile { databases: HashMap<DatabaseId, MemoryCookieJar> }`).
//! - In-memory cache: `jars: RwLock<HashMap<DatabaseId, CookieJarHandle>>` for
//!   quick reuse.
//! - The store keeps a self handle (`store_self`) so the persistent jars can
//!   call back into `persist_database_from_snapshot`.
//!
//! ### Concurrency
//! - This type is internally synchronized via `RwLock`s and is `Send + Sync`
//!   behind a `CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>`.
//! - Returned jars are `Arc<RwLock<_>>` and safe to share across threads.
//!
//! ### I/O characteristics & caveats
//! - `persist_database_from_snapshot` and `remove_database` **read then
//!   rewrite** the entire JSON file. For large datasets, use
//!   [`SqliteCookieStore`](crate::cookies::SqliteCookieStore).
//! - File writes are not atomic.
//! - I/O and serialization failures are logged and skipped, never panicked on.
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::cookies::cookie_jar::MemoryCookieJar;
use crate::cookies::persistent_cookie_jar::PersistentCookieJar;
use crate::cookies::store::{CookieStore, DatabaseId};
use crate::cookies::{CookieJarHandle, CookieStoreHandle};

/// On-disk representation of all databases' cookie jars.
///
/// This is the JSON payload stored at `JsonCookieStore::path`.
#[derive(Debug, Serialize, Deserialize)]
struct CookieStoreFile {
    databases: HashMap<DatabaseId, MemoryCookieJar>,
}

impl CookieStoreFile {
    fn empty() -> Self {
        Self {
            databases: HashMap::new(),
        }
    }
}

/// A JSON-based cookie store that persists cookies across sessions.
///
/// The store caches per-database jars in memory and loads/saves them to a
/// single JSON file. Jars returned by this store are wrapped in
/// [`PersistentCookieJar`], so that writes automatically trigger persistence
/// to disk.
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,

    /// Actual list of cookie jars per database
    jars: RwLock<HashMap<DatabaseId, CookieJarHandle>>,

    /// Self handle, so `PersistentCookieJar` can call back into this store.
    ///
    /// This is initialized in [`new`](Self::new) and then read-only thereafter.
    store_self: RwLock<Option<CookieStoreHandle>>,
}

impl JsonCookieStore {
    /// Creates (or opens) a JSON cookie store at `path`.
    ///
    /// If the file does not exist, an empty structure is written to disk.
    /// A failing initial write is logged; the store still works for the
    /// lifetime of the process.
    pub fn new(path: PathBuf) -> Arc<Self> {
        if !path.exists() {
            match serde_json::to_vec(&CookieStoreFile::empty()) {
                Ok(bytes) => {
                    if let Err(e) = fs::write(&path, bytes) {
                        log::warn!("failed to initialize cookie store file {path:?}: {e}");
                    }
                }
                Err(e) => log::warn!("failed to serialize empty cookie store: {e}"),
            }
        }

        let store = Arc::new(Self {
            path,
            jars: RwLock::new(HashMap::new()),
            store_self: RwLock::new(None),
        });

        {
            let mut self_ref = store.store_self.write().unwrap();
            *self_ref = Some(store.clone() as CookieStoreHandle);
        }

        store
    }

    /// Loads and deserializes the full cookie store file.
    ///
    /// Returns an empty structure when the file cannot be read or parsed.
    fn load_file(&self) -> CookieStoreFile {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("failed to read cookie store file {:?}: {e}", self.path);
                return CookieStoreFile::empty();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|_| CookieStoreFile::empty())
    }

    /// Serializes and writes the full cookie store file (pretty-printed).
    ///
    /// Failures are logged and the on-disk state is left as it was.
    fn save_file(&self, store_file: &CookieStoreFile) {
        let contents = match serde_json::to_string_pretty(store_file) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("failed to serialize cookie store: {e}");
                return;
            }
        };

        if let Err(e) = fs::write(&self.path, contents) {
            log::warn!("failed to write cookie store file {:?}: {e}", self.path);
        }
    }
}

impl CookieStore for JsonCookieStore {
    /// Returns the cookie jar handle for `database_id`, creating it if needed.
    ///
    /// Behavior:
    /// - If a jar for `database_id` exists in the in-memory cache, it is
    ///   returned.
    /// - Otherwise, a serialized jar is loaded from disk (if present) or an
    ///   empty [`MemoryCookieJar`] is created.
    /// - That jar is wrapped in a [`PersistentCookieJar`] bound to this store
    ///   (via `store_self`) so that subsequent mutations persist automatically.
    fn jar_for(&self, database_id: DatabaseId) -> Option<CookieJarHandle> {
        {
            // Fast path: already in memory
            let jars = self.jars.read().unwrap();
            if let Some(jar) = jars.get(&database_id) {
                return Some(jar.clone());
            }
        }

        // Load from disk
        let mut file = self.load_file();
        let jar = file
            .databases
            .remove(&database_id)
            .unwrap_or_else(MemoryCookieJar::new);
        let arc_jar: CookieJarHandle = Arc::new(RwLock::new(jar));

        let store_ref = self.store_self.read().unwrap();
        let store = store_ref.as_ref()?.clone();

        // Wrap in PersistentCookieJar
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

    /// Persists a snapshot of `database_id`'s jar to disk.
    ///
    /// Called by [`PersistentCookieJar`] after each mutation. This method
    /// reads the current file, updates/replaces the database entry, and
    /// writes the file back.
    fn persist_database_from_snapshot(&self, database_id: DatabaseId, snapshot: &MemoryCookieJar) {
        let mut store_file = self.load_file();
        store_file.databases.insert(database_id, snapshot.clone());
        self.save_file(&store_file);
    }

    /// Removes `database_id` from both the in-memory cache and the on-disk file.
    fn remove_database(&self, database_id: DatabaseId) {
        self.jars.write().unwrap().remove(&database_id);

        let mut file = self.load_file();
        file.databases.remove(&database_id);
        self.save_file(&file);
    }

    /// Persists **all** in-memory jars to disk by snapshotting them.
    ///
    /// Only jars of type [`PersistentCookieJar`] that wrap a [`MemoryCookieJar`]
    /// are snapshotted here. This avoids double-wrapping and keeps the format
    /// stable.
    fn persist_all(&self) {
        let jars = self.jars.read().unwrap();

        let mut file = self.load_file();
        for (database_id, jar) in jars.iter() {
            if let Ok(jar) = jar.read() {
                if let Some(persist) = jar.as_any().downcast_ref::<PersistentCookieJar>() {
                    if let Ok(inner) = persist.inner.read() {
                        if let Some(snapshot) = inner.as_any().downcast_ref::<MemoryCookieJar>() {
                            file.databases.insert(*database_id, snapshot.clone());
                        }
                    }
                }
            }
        }

        self.save_file(&file);
    }
}
