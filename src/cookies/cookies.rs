//! Cookie core types.
//!
//! This module defines the **type-erased handles** used throughout the sync
//! layer and the serializable [`Cookie`] data structure.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn ClearableCookieJar + Send + Sync>>`.
//!   - Callers take a **read lock** for non-mutating operations and a **write lock**
//!     for mutating operations on the underlying jar.
//! - [`CookieStoreHandle`] is `Arc<dyn CookieStore + Send + Sync>`.
//!   - Stores are expected to manage their **own internal synchronization** (e.g. via
//!     `RwLock`, connection pools, etc.). The trait methods take `&self`.
//!
//! The [`Cookie`] struct is used for persistence/inspection and can be (de)serialized
//! via `serde` to JSON or other formats.
//!
//! ```rust,no_run
//! use emberlite_sync::cookies::Cookie;
//!
//! let c = Cookie {
//!     name: "SyncGatewaySession".into(),
//!     value: "abc123".into(),
//!     path: Some("/".into()),
//!     domain: Some("example.com".into()),
//!     secure: true,
//!     expires: Some("2026-12-31T23:59:59Z".into()), // ISO 8601 recommended
//!     same_site: Some("Lax".into()),                // "Strict" | "Lax" | "None"
//!     http_only: true,
//! };
//! ```

use crate::cookies::cookie_jar::ClearableCookieJar;
use crate::cookies::store::CookieStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use url::Url;

/// A handle to a cookie jar trait.
///
/// This is a reference-counted, read/write-locked pointer to a type-erased
/// [`ClearableCookieJar`]. Obtain a **read lock** for queries and a **write lock**
/// for mutations.
pub type CookieJarHandle = Arc<RwLock<dyn ClearableCookieJar + Send + Sync>>;

/// A handle to a cookie store trait.
///
/// This is a reference-counted pointer to a type-erased [`CookieStore`].
/// Store implementations must be **`Send + Sync` and internally synchronized**,
/// since callers hold only `&self` when invoking trait methods.
pub type CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>;

/// A cookie as stored/serialized by the sync layer.
///
/// This structure captures the essential attributes of an HTTP cookie and
/// is suitable for persistence (e.g., JSON, SQLite) via `serde`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Path scoping (e.g., `"/"`). If `None`, path-matching follows RFC defaults.
    pub path: Option<String>,

    /// Domain scoping (host-only if `None`). When present, should be a registrable domain
    /// or subdomain (e.g., `"example.com"`).
    pub domain: Option<String>,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// Expiration timestamp, if any. Session cookies have `None`.
    pub expires: Option<String>,

    /// SameSite policy (`"Strict"`, `"Lax"`, or `"None"`).
    pub same_site: Option<String>,

    /// If `true`, cookie is blocked from access by client-side scripts.
    pub http_only: bool,
}

impl Cookie {
    /// Parses a single `Set-Cookie` header value into a [`Cookie`].
    ///
    /// Handles a subset of RFC 6265: `Path`, `Domain` (leading dot stripped),
    /// `Expires` (stored as raw string), `SameSite` (normalized to
    /// `Strict`/`Lax`/`None`), `Secure`, `HttpOnly`. `Max-Age`, priorities,
    /// size limits, and eviction policies are not interpreted.
    ///
    /// If `Path` is absent, `default_path` (derived from the request URL) is
    /// used. Returns `None` when the header carries no `name=value` pair.
    pub fn parse_set_cookie(header: &str, default_path: &str) -> Option<Cookie> {
        let (name, rest) = header.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut parts = rest.split(';');
        let value = parts.next().unwrap_or("").trim().to_string();

        let mut cookie = Cookie {
            name: name.to_string(),
            value,
            path: None,
            domain: None,
            secure: false,
            expires: None,
            same_site: None,
            http_only: false,
        };

        for part in parts {
            let part = part.trim();
            if let Some((k, v)) = part.split_once('=') {
                match k.trim().to_ascii_lowercase().as_str() {
                    "path" => cookie.path = Some(v.trim().to_string()),
                    "domain" => cookie.domain = Some(v.trim().trim_start_matches('.').to_string()),
                    "expires" => cookie.expires = Some(v.trim().to_string()),
                    "samesite" => {
                        // normalize to "Lax" | "Strict" | "None"
                        let val = v.trim();
                        if val.eq_ignore_ascii_case("lax") {
                            cookie.same_site = Some("Lax".to_string());
                        } else if val.eq_ignore_ascii_case("strict") {
                            cookie.same_site = Some("Strict".to_string());
                        } else if val.eq_ignore_ascii_case("none") {
                            cookie.same_site = Some("None".to_string());
                        } else {
                            cookie.same_site = Some(val.to_string());
                        }
                    }
                    _ => {}
                }
            } else if part.eq_ignore_ascii_case("secure") {
                cookie.secure = true;
            } else if part.eq_ignore_ascii_case("httponly") {
                cookie.http_only = true;
            }
        }

        if cookie.path.is_none() {
            cookie.path = Some(default_path.to_string());
        }

        Some(cookie)
    }

    /// Returns `true` when this cookie applies to `url`.
    ///
    /// Rules: the host must equal the cookie domain or be a subdomain of it
    /// (a cookie without a domain applies to any host), the URL path must be
    /// prefixed by the cookie path, and a `Secure` cookie only matches HTTPS.
    ///
    /// This is the single matching implementation in the crate; request
    /// assembly and URL-scoped deletion both go through it.
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        let is_https = url.scheme() == "https";

        let domain_ok = match &self.domain {
            Some(domain) => host == domain || host.ends_with(&format!(".{domain}")),
            None => true,
        };

        let path_ok = match &self.path {
            Some(cookie_path) => path.starts_with(cookie_path.as_str()),
            None => true,
        };

        domain_ok && path_ok && (!self.secure || is_https)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[test]
    fn parse_plain_name_value() {
        let c = Cookie::parse_set_cookie("session=abc123", "/db").unwrap();
        assert_eq!(c.name, "session");
        assert_eq!(c.value, "abc123");
        assert_eq!(c.path.as_deref(), Some("/db"));
        assert!(!c.secure);
        assert!(!c.http_only);
    }

    #[test]
    fn parse_attributes() {
        let c = Cookie::parse_set_cookie(
            "SyncGatewaySession=xyz; Path=/; Domain=.example.com; Secure; HttpOnly; SameSite=LAX",
            "/fallback",
        )
        .unwrap();
        assert_eq!(c.path.as_deref(), Some("/"));
        assert_eq!(c.domain.as_deref(), Some("example.com"));
        assert!(c.secure);
        assert!(c.http_only);
        assert_eq!(c.same_site.as_deref(), Some("Lax"));
    }

    #[test]
    fn parse_rejects_headers_without_pair() {
        assert!(Cookie::parse_set_cookie("no-equals-sign", "/").is_none());
        assert!(Cookie::parse_set_cookie("=value-only", "/").is_none());
    }

    #[test]
    fn matches_domain_and_subdomain() {
        let c = Cookie::parse_set_cookie("a=1; Domain=example.com; Path=/", "/").unwrap();
        assert!(c.matches(&url("http://example.com/db")));
        assert!(c.matches(&url("http://sync.example.com/db")));
        assert!(!c.matches(&url("http://example.org/db")));
        assert!(!c.matches(&url("http://badexample.com/db")));
    }

    #[test]
    fn matches_path_prefix() {
        let c = Cookie::parse_set_cookie("a=1; Path=/db", "/").unwrap();
        assert!(c.matches(&url("http://example.com/db/_changes")));
        assert!(!c.matches(&url("http://example.com/other")));
    }

    #[test]
    fn secure_cookie_requires_https() {
        let c = Cookie::parse_set_cookie("a=1; Path=/; Secure", "/").unwrap();
        assert!(c.matches(&url("https://example.com/")));
        assert!(!c.matches(&url("http://example.com/")));
    }
}
