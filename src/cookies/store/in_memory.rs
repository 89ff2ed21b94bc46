use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::cookies::cookie_jar::MemoryCookieJar;
use crate::cookies::store::{CookieStore, DatabaseId};
use crate::cookies::CookieJarHandle;

pub struct InMemoryCookieStore {
    /// Cookie jars per database
    jars: RwLock<HashMap<DatabaseId, CookieJarHandle>>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self {
            jars: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCookieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieStore for InMemoryCookieStore {
    fn jar_for(&self, database_id: DatabaseId) -> Option<CookieJarHandle> {
        use std::collections::hash_map::Entry;

        let mut jars = self.jars.write().unwrap();
        let handle = match jars.entry(database_id) {
            Entry::Occupied(o) => o.get().clone(),
            Entry::Vacant(v) => {
                let jar_handle: CookieJarHandle = Arc::new(RwLock::new(MemoryCookieJar::new()));
                v.insert(jar_handle.clone());
                jar_handle
            }
        };
        Some(handle)
    }

    fn persist_database_from_snapshot(
        &self,
        _database_id: DatabaseId,
        _snapshot: &MemoryCookieJar,
    ) {
    }

    fn remove_database(&self, database_id: DatabaseId) {
        self.jars.write().unwrap().remove(&database_id);
    }

    fn persist_all(&self) {}
}
