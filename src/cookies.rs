// src/cookies.rs
//! Cookies: [`ClearableCookieJar`], [`CookieStore`] and backends.

mod cookie_jar;
mod cookies;
mod persistent_cookie_jar;
mod store;

pub use cookies::Cookie;
pub use cookies::CookieJarHandle;
pub use cookies::CookieStoreHandle;

pub use cookie_jar::ClearableCookieJar;
pub use cookie_jar::MemoryCookieJar;
pub use persistent_cookie_jar::PersistentCookieJar;

pub use store::CookieStore;
pub use store::DatabaseId;
pub use store::InMemoryCookieStore;
pub use store::JsonCookieStore;
#[cfg(feature = "sqlite_cookie_store")]
pub use store::SqliteCookieStore;
