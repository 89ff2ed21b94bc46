//! Adapter between the transport client and the sync layer's cookie jar.
//!
//! reqwest only knows its own `cookie::CookieStore` trait; this bridge
//! implements it on top of a [`CookieJarHandle`], so every request/response
//! of the shared client reads and writes the engine jar. One bridge is
//! created per client build and holds its own reference to the jar.

use crate::cookies::{Cookie, CookieJarHandle};
use http::HeaderValue;
use url::Url;

/// Derives the default cookie path from the request URL (the directory of
/// the request path).
pub(crate) fn default_request_path(url: &Url) -> &str {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(a, _)| if a.is_empty() { "/" } else { a })
}

pub(crate) struct JarCookieProvider {
    jar: CookieJarHandle,
}

impl JarCookieProvider {
    pub(crate) fn new(jar: CookieJarHandle) -> Self {
        Self { jar }
    }
}

impl reqwest::cookie::CookieStore for JarCookieProvider {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let default_path = default_request_path(url);

        let cookies: Vec<Cookie> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|header| Cookie::parse_set_cookie(header, default_path))
            .map(|mut cookie| {
                // Host-only cookie: scope it to the responding host
                if cookie.domain.is_none() {
                    cookie.domain = url.host_str().map(str::to_string);
                }
                cookie
            })
            .collect();

        if cookies.is_empty() {
            return;
        }

        self.jar
            .write()
            .unwrap()
            .save_from_response(Some(url), cookies);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let cookies = self.jar.read().unwrap().load_for_request(Some(url));
        if cookies.is_empty() {
            return None;
        }

        let header = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        HeaderValue::from_str(&header).ok()
    }
}
