pub mod client;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod net;

pub use client::*;
