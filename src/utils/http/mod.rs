//! Shared HTTP utilities for the provider and completion clients
//!
//! Both upstream APIs are reached through one configured `reqwest::Client` so
//! every outbound call carries the same deadline and user agent.

use std::time::Duration;

pub mod client;
pub mod fallback;
pub mod headers;

pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
pub use fallback::try_with_fallback;
pub use headers::{CommonHeaders, HeaderBuilder};

/// Default deadline for outbound requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// User agent sent upstream; GitHub rejects requests without one
pub const DEFAULT_USER_AGENT: &str = concat!("repochat/", env!("CARGO_PKG_VERSION"));
