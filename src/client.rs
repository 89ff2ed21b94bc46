// src/client.rs
//! Shared HTTP client: [`HttpClientFactory`] and its transport integration.

mod bridge;
mod factory;
mod tls;

pub use factory::HttpClientFactory;
