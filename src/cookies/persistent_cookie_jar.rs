use crate::cookies::cookie_jar::MemoryCookieJar;
use crate::cookies::store::DatabaseId;
use crate::cookies::{ClearableCookieJar, Cookie, CookieJarHandle, CookieStoreHandle};
use url::Url;

/// A `ClearableCookieJar` decorator that persists changes after each mutation.
///
/// This type is *transparent* for reads but *eagerly* persists after writes.
pub struct PersistentCookieJar {
    /// Database ID associated with this jar (used to address the store).
    database_id: DatabaseId,
    /// Inner cookie jar that holds the actual cookie state.
    pub inner: CookieJarHandle,
    /// Handle to the cookie store responsible for persistence.
    store_handle: CookieStoreHandle,
}

impl PersistentCookieJar {
    /// Creates a new persistence-enabled wrapper around an existing jar.
    ///
    /// The `store_handle` will be used to persist snapshots after each mutation.
    pub fn new(
        database_id: DatabaseId,
        jar: CookieJarHandle,
        store_handle: CookieStoreHandle,
    ) -> Self {
        Self {
            database_id,
            inner: jar,
            store_handle,
        }
    }

    /// Snapshots the inner jar and persists it to the backing store.
    ///
    /// Persistence is best-effort: a jar that is not a [`MemoryCookieJar`]
    /// cannot be snapshotted and is logged rather than persisted.
    fn persist(&self) {
        let snapshot = {
            let inner = self.inner.read().unwrap();
            match inner.as_any().downcast_ref::<MemoryCookieJar>() {
                Some(jar) => jar.clone(),
                None => {
                    log::warn!(
                        "cookie jar for database {} is not snapshot-capable, skipping persist",
                        self.database_id
                    );
                    return;
                }
            }
        };

        self.store_handle
            .persist_database_from_snapshot(self.database_id, &snapshot);
    }
}

impl ClearableCookieJar for PersistentCookieJar {
    /// Returns a type-erased reference to this jar (the wrapper itself).
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    /// Returns the applicable cookies without persisting.
    fn load_for_request(&self, url: Option<&Url>) -> Vec<Cookie> {
        self.inner.read().unwrap().load_for_request(url)
    }

    /// Stores cookies from a response, then persists the updated state.
    fn save_from_response(&mut self, url: Option<&Url>, cookies: Vec<Cookie>) {
        self.inner.write().unwrap().save_from_response(url, cookies);
        self.persist();
    }

    /// Clears all cookies in the jar, then persists the updated state.
    fn clear(&mut self) {
        self.inner.write().unwrap().clear();
        self.persist();
    }
}
