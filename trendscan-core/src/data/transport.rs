//! HTTP transport seam.
//!
//! Providers speak to the network through [`Transport`] so the retry and
//! anti-bot recovery logic can be driven by scripted responses in tests.

use super::provider::DataError;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Minimal response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

pub trait Transport: Send + Sync {
    /// Issue a GET. Only connection-level failures are errors; any HTTP status is `Ok`.
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, DataError>;

    /// Drop all cookies held for the session.
    fn reset_cookies(&self) -> Result<(), DataError>;
}

/// Blocking reqwest client with a cookie store.
///
/// Clearing cookies rebuilds the client; in-flight requests keep the old one.
pub struct ReqwestTransport {
    client: RwLock<reqwest::blocking::Client>,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, DataError> {
        Ok(Self {
            client: RwLock::new(Self::build(timeout)?),
            timeout,
        })
    }

    fn build(timeout: Duration) -> Result<reqwest::blocking::Client, DataError> {
        reqwest::blocking::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, DataError> {
        let client = self
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut request = client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let resp = request
            .send()
            .map_err(|e| DataError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| DataError::Network(format!("failed to read body: {e}")))?;
        Ok(HttpResponse { status, body })
    }

    fn reset_cookies(&self) -> Result<(), DataError> {
        let fresh = Self::build(self.timeout)?;
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }
}
