//! HTTP utilities for Sleeper API communication

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use std::time::Duration;

use crate::Result;

const CLIENT_USER_AGENT: &str = concat!("sleeper-sync/", env!("CARGO_PKG_VERSION"));

/// Headers sent with every Sleeper request.
///
/// The API is public, so no credentials are attached.
pub fn default_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    h.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    h
}

/// Build the shared reqwest client with the given per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .default_headers(default_headers())
        .timeout(timeout)
        .build()?;
    Ok(client)
}
