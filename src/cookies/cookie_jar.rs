//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** holds the session cookies for one replicating database.
//! The sync layer hands parsed cookies to the jar and asks it for the set
//! applicable to a request.
//!
//! This module defines the [`ClearableCookieJar`] trait and a reference
//! implementation, [`MemoryCookieJar`], which stores cookies **in memory
//! only** (no persistence).
//!
//! ## Notes & limitations
//! - The jar exposes no single-item deletion; callers that need to remove
//!   individual cookies snapshot the contents, filter, `clear()`, and
//!   re-save (see `HttpClientFactory`).
//! - `load_for_request(None)` is *defined* to return every cookie in the
//!   jar. The reconciliation transactions rely on this.
//! - Expiration is stored but not enforced.
//! - This module is **not** internally synchronized. Use it via a
//!   `CookieJarHandle = Arc<RwLock<dyn ClearableCookieJar + Send + Sync>>`.

use crate::cookies::Cookie;
use serde::{Deserialize, Serialize};
use std::any::Any;
use url::Url;

/// A clearable cookie jar: the capability set the sync layer needs from any
/// cookie storage collaborator.
///
/// ### Type erasure
/// `as_any` / `as_any_mut` enable downcasting when callers need access to
/// concrete implementations (e.g., for snapshotting/persistence).
pub trait ClearableCookieJar: Send + Sync {
    /// Returns a type-erased reference to the jar.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference to the jar.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the cookies applicable to a request for `url`.
    ///
    /// With `None` as the request context the jar returns **all** of its
    /// cookies; with a URL it filters by domain, path, and the `Secure`
    /// flag via [`Cookie::matches`].
    fn load_for_request(&self, url: Option<&Url>) -> Vec<Cookie>;

    /// Stores `cookies` received in a response for `url`.
    ///
    /// A cookie replaces an existing entry when name, domain, and path all
    /// collide ("last write wins"); otherwise it is appended. The URL
    /// context is informational and may be `None` (e.g., when re-saving a
    /// filtered snapshot).
    fn save_from_response(&mut self, url: Option<&Url>, cookies: Vec<Cookie>);

    /// Removes all cookies from the jar.
    fn clear(&mut self);
}

/// Default in-memory cookie jar for a single database.
///
/// This implementation performs **no persistence**; wrap it in a
/// `PersistentCookieJar` (via a `CookieStore`) to keep session cookies
/// across process restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCookieJar {
    /// Flat list of cookie records.
    pub entries: Vec<Cookie>,
}

impl MemoryCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        MemoryCookieJar {
            entries: Vec::new(),
        }
    }
}

impl ClearableCookieJar for MemoryCookieJar {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn load_for_request(&self, url: Option<&Url>) -> Vec<Cookie> {
        match url {
            Some(url) => self
                .entries
                .iter()
                .filter(|c| c.matches(url))
                .cloned()
                .collect(),
            None => self.entries.clone(),
        }
    }

    fn save_from_response(&mut self, _url: Option<&Url>, cookies: Vec<Cookie>) {
        for cookie in cookies {
            // Replace existing cookie with the same identity
            if let Some(existing) = self
                .entries
                .iter_mut()
                .find(|c| c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
            {
                *existing = cookie;
            } else {
                self.entries.push(cookie);
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
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
            secure: false,
            expires: None,
            same_site: None,
            http_only: false,
        }
    }

    #[test]
    fn save_appends_and_replaces() {
        let mut jar = MemoryCookieJar::new();
        jar.save_from_response(None, vec![cookie("a", "1"), cookie("b", "2")]);
        assert_eq!(jar.entries.len(), 2);

        // Same name/domain/path replaces
        jar.save_from_response(None, vec![cookie("a", "updated")]);
        assert_eq!(jar.entries.len(), 2);
        assert_eq!(jar.entries[0].value, "updated");

        // Same name, different path is a distinct cookie
        let mut scoped = cookie("a", "3");
        scoped.path = Some("/db".to_string());
        jar.save_from_response(None, vec![scoped]);
        assert_eq!(jar.entries.len(), 3);
    }

    #[test]
    fn load_without_context_returns_everything() {
        let mut jar = MemoryCookieJar::new();
        let mut secure = cookie("s", "1");
        secure.secure = true;
        jar.save_from_response(None, vec![cookie("a", "1"), secure]);

        assert_eq!(jar.load_for_request(None).len(), 2);
    }

    #[test]
    fn load_with_url_filters_by_match() {
        let mut jar = MemoryCookieJar::new();
        let mut other_domain = cookie("other", "1");
        other_domain.domain = Some("example.org".to_string());
        jar.save_from_response(None, vec![cookie("a", "1"), other_domain]);

        let url = "http://example.com/db".parse().unwrap();
        let loaded = jar.load_for_request(Some(&url));
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "a");
    }

    #[test]
    fn clear_empties_the_jar() {
        let mut jar = MemoryCookieJar::new();
        jar.save_from_response(None, vec![cookie("a", "1")]);
        jar.clear();
        assert!(jar.entries.is_empty());
        assert!(jar.load_for_request(None).is_empty());
    }
}
