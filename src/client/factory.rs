//! Shared transport client for the replicator.
//!
//! [`HttpClientFactory`] lazily builds, exactly once, a configured
//! [`reqwest::Client`] shared by every replication against the factory's
//! database: pull/push changes feeds, attachment transfers, and session
//! authentication all reuse the same connection pool and cookie jar.
//!
//! The factory is a passive, multi-thread-accessible configuration object:
//! one internal lock serializes the first build, the pool-eviction escape
//! hatch, and every cookie-jar rewrite, so a concurrent reader never
//! observes a partially-cleared jar.

use std::sync::{Arc, Mutex};

use url::Url;

use crate::client::bridge::JarCookieProvider;
use crate::client::tls;
use crate::config::{ClientOptions, ConnectionSpec};
use crate::cookies::{Cookie, CookieJarHandle};

pub struct HttpClientFactory {
    /// Frozen at construction; the factory exposes no way to change it.
    options: ClientOptions,
    /// Session cookie jar shared with the client. Absent for replications
    /// that carry no session state.
    cookie_jar: Option<CookieJarHandle>,
    /// Lazily-built client. The lock also serializes cookie rewrites.
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpClientFactory {
    /// Creates a factory without a cookie jar. Cookie operations on such a
    /// factory are silent no-ops.
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            cookie_jar: None,
            client: Mutex::new(None),
        }
    }

    /// Creates a factory whose client loads and stores session cookies
    /// through `cookie_jar`.
    pub fn with_cookie_jar(options: ClientOptions, cookie_jar: CookieJarHandle) -> Self {
        Self {
            options,
            cookie_jar: Some(cookie_jar),
            client: Mutex::new(None),
        }
    }

    /// Returns the shared client, building it on first use.
    ///
    /// Thread-safe and idempotent: concurrent callers observe a single
    /// construction and every call returns a handle onto the same client
    /// (handles are cheap clones sharing one pool and cookie jar).
    ///
    /// Never fails. When minimum-TLS enforcement cannot be initialized the
    /// failure is logged and the client is built without the hardening.
    pub fn client(&self) -> reqwest::Client {
        let mut slot = self.client.lock().unwrap();
        if let Some(client) = slot.as_ref() {
            return client.clone();
        }

        let client = self.build_client();
        *slot = Some(client.clone());
        client
    }

    /// Whether the shared client has been built.
    pub fn is_built(&self) -> bool {
        self.client.lock().unwrap().is_some()
    }

    /// Pool-wide cleanup escape hatch.
    ///
    /// The transport exposes no eviction call on a live client, so the
    /// stored client is replaced with a fresh one built from the same
    /// frozen options; the old pool closes its idle connections once the
    /// remaining handles drop. No-op if the client was never built.
    pub fn evict_all_connections(&self) {
        let mut slot = self.client.lock().unwrap();
        if slot.is_some() {
            log::debug!("evicting pooled connections by replacing the shared client");
            *slot = Some(self.build_client());
        }
    }

    /// The connection specs the built client negotiates, most secure first.
    /// Empty when minimum-TLS enforcement is off.
    pub fn connection_specs(&self) -> &[ConnectionSpec] {
        self.options.connection_specs()
    }

    /// The attached cookie jar, if any. External callers should only read
    /// through this handle; mutation goes through the factory so rewrites
    /// stay serialized.
    pub fn cookie_jar(&self) -> Option<CookieJarHandle> {
        self.cookie_jar.clone()
    }

    /// Stores `cookies` in the jar (e.g., a session cookie obtained out of
    /// band). No-op without a jar.
    pub fn add_cookies(&self, cookies: Vec<Cookie>) {
        let _serialized = self.client.lock().unwrap();
        let Some(jar) = &self.cookie_jar else {
            return;
        };
        jar.write().unwrap().save_from_response(None, cookies);
    }

    /// Deletes every cookie named `name`. No-op without a jar.
    pub fn delete_cookie(&self, name: &str) {
        self.reconcile(|cookie| cookie.name != name);
    }

    /// Deletes every cookie that applies to `url` (domain, path, and
    /// `Secure` rules). No-op without a jar.
    pub fn delete_cookies_matching(&self, url: &Url) {
        self.reconcile(|cookie| !cookie.matches(url));
    }

    /// Removes all cookies from the jar. No-op without a jar.
    pub fn reset_cookie_store(&self) {
        let _serialized = self.client.lock().unwrap();
        let Some(jar) = &self.cookie_jar else {
            return;
        };
        jar.write().unwrap().clear();
    }

    /// The jar exposes no single-item deletion, so removal is a rewrite
    /// transaction: under the factory lock, snapshot the full contents,
    /// retain what the predicate keeps, clear, and re-save the remainder.
    /// The jar's write lock is held across clear + save, so readers never
    /// observe the intermediate empty state.
    fn reconcile(&self, retain: impl Fn(&Cookie) -> bool) {
        let _serialized = self.client.lock().unwrap();
        let Some(jar) = &self.cookie_jar else {
            return;
        };

        let mut jar = jar.write().unwrap();
        let retained: Vec<Cookie> = jar
            .load_for_request(None)
            .into_iter()
            .filter(|cookie| retain(cookie))
            .collect();
        jar.clear();
        jar.save_from_response(None, retained);
    }

    fn build_client(&self) -> reqwest::Client {
        if self.options.enforces_min_tls() {
            match self.configured_builder(true).build() {
                Ok(client) => return client,
                Err(e) => {
                    log::error!("TLS 1.2 enforcement failed, continuing without it: {e}");
                }
            }
        }

        match self.configured_builder(false).build() {
            Ok(client) => client,
            Err(e) => {
                log::error!("failed to build transport client: {e}");
                reqwest::Client::new()
            }
        }
    }

    fn configured_builder(&self, hardened: bool) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.options.connect_timeout_value())
            .read_timeout(self.options.read_timeout_value())
            .timeout(self.options.request_deadline());

        if let Some(jar) = &self.cookie_jar {
            builder = builder.cookie_provider(Arc::new(JarCookieProvider::new(jar.clone())));
        }

        if !self.options.follows_redirects() {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        builder = tls::apply_transport_security(builder, &self.options);

        if hardened {
            builder = tls::apply_connection_specs(builder, self.options.connection_specs());
        }

        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::MemoryCookieJar;
    use std::sync::RwLock;

    fn jar_with(names: &[&str]) -> CookieJarHandle {
        let mut jar = MemoryCookieJar::new();
        for name in names {
            jar.entries.push(Cookie {
                name: name.to_string(),
                value: "v".to_string(),
                path: Some("/".to_string()),
                domain: Some("example.com".to_string()),
                secure: false,
                expires: None,
                same_site: None,
                http_only: false,
            });
        }
        Arc::new(RwLock::new(jar))
    }

    fn names(jar: &CookieJarHandle) -> Vec<String> {
        jar.read()
            .unwrap()
            .load_for_request(None)
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    #[test]
    fn concurrent_callers_share_one_client() {
        let jar = jar_with(&[]);
        let factory = HttpClientFactory::with_cookie_jar(ClientOptions::default(), jar.clone());

        // jar + factory's copy
        assert_eq!(Arc::strong_count(&jar), 2);
        assert!(!factory.is_built());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let _client = factory.client();
                });
            }
        });

        assert!(factory.is_built());
        // Exactly one build happened: one bridge holds the third reference
        assert_eq!(Arc::strong_count(&jar), 3);
    }

    #[test]
    fn evict_before_build_is_a_no_op() {
        let factory = HttpClientFactory::new(ClientOptions::default());
        factory.evict_all_connections();
        assert!(!factory.is_built());
    }

    #[test]
    fn evict_replaces_the_built_client() {
        let jar = jar_with(&[]);
        let factory = HttpClientFactory::with_cookie_jar(ClientOptions::default(), jar.clone());

        let _ = factory.client();
        assert_eq!(Arc::strong_count(&jar), 3);

        factory.evict_all_connections();
        assert!(factory.is_built());
        // Old client (and its bridge) dropped, replacement holds the jar
        assert_eq!(Arc::strong_count(&jar), 3);
    }

    #[test]
    fn delete_cookie_retains_the_rest() {
        let jar = jar_with(&["A", "B", "C"]);
        let factory = HttpClientFactory::with_cookie_jar(ClientOptions::default(), jar.clone());

        factory.delete_cookie("B");
        assert_eq!(names(&jar), vec!["A", "C"]);

        // Absent target leaves the set unchanged
        factory.delete_cookie("missing");
        assert_eq!(names(&jar), vec!["A", "C"]);
    }

    #[test]
    fn delete_cookies_matching_uses_cookie_rules() {
        let jar = jar_with(&["A"]);
        jar.write().unwrap().save_from_response(
            None,
            vec![Cookie {
                name: "other".to_string(),
                value: "v".to_string(),
                path: Some("/".to_string()),
                domain: Some("example.org".to_string()),
                secure: false,
                expires: None,
                same_site: None,
                http_only: false,
            }],
        );
        let factory = HttpClientFactory::with_cookie_jar(ClientOptions::default(), jar.clone());

        let url: Url = "http://example.com/db".parse().unwrap();
        factory.delete_cookies_matching(&url);

        assert_eq!(names(&jar), vec!["other"]);
    }

    #[test]
    fn reset_empties_a_populated_jar() {
        let jar = jar_with(&["A", "B"]);
        let factory = HttpClientFactory::with_cookie_jar(ClientOptions::default(), jar.clone());

        factory.reset_cookie_store();
        assert!(names(&jar).is_empty());
    }

    #[test]
    fn cookie_operations_without_a_jar_are_no_ops() {
        let factory = HttpClientFactory::new(ClientOptions::default());

        factory.add_cookies(vec![]);
        factory.delete_cookie("anything");
        factory
            .delete_cookies_matching(&"http://example.com/".parse().unwrap());
        factory.reset_cookie_store();

        assert!(factory.cookie_jar().is_none());
        assert!(!factory.is_built());
    }

    #[test]
    fn hardened_build_reports_enforced_specs() {
        let factory = HttpClientFactory::new(ClientOptions::default());
        let _client = factory.client();

        assert_eq!(
            factory.connection_specs(),
            &[
                ConnectionSpec::ModernTls,
                ConnectionSpec::CompatibleTls,
                ConnectionSpec::Cleartext,
            ]
        );
    }

    #[test]
    fn redirects_can_be_disabled() {
        let factory =
            HttpClientFactory::new(ClientOptions::default().follow_redirects(false));
        let _client = factory.client();
        assert!(factory.is_built());
    }

    #[test]
    fn self_signed_factory_still_builds() {
        let options = ClientOptions::default()
            .allow_self_signed_certificates()
            .unwrap();
        let factory = HttpClientFactory::new(options);
        let _client = factory.client();
        assert!(factory.is_built());
    }
}
