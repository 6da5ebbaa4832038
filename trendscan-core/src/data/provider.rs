//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over the chart-API provider and the CSV
//! download provider so the fetcher can orchestrate fallback explicitly and
//! tests can substitute scripted providers.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error types for data operations.
///
/// Transient errors are retried inside a provider; permanent ones end that
/// provider's attempt immediately.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("rate limited by {provider} (HTTP 429)")]
    RateLimited { provider: &'static str },

    #[error("{provider} server error (HTTP {status})")]
    ServerError { provider: &'static str, status: u16 },

    #[error("{provider} blocked the request: {detail}")]
    AntiBotBlocked {
        provider: &'static str,
        detail: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("{provider} returned HTTP {status}")]
    HttpStatus { provider: &'static str, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("{0} is disabled")]
    Disabled(&'static str),
}

impl DataError {
    /// Whether retrying the same provider could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::RateLimited { .. }
                | DataError::ServerError { .. }
                | DataError::AntiBotBlocked { .. }
                | DataError::Network(_)
        )
    }
}

/// Both providers failed for a symbol. The symbol is skipped for this run.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub symbol: String,
    pub primary: DataError,
    pub secondary: DataError,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetch failed for {}: primary: {}; secondary: {}",
            self.symbol, self.primary, self.secondary
        )
    }
}

impl std::error::Error for FetchFailure {}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    Yahoo,
    Stooq,
    Cache,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::Yahoo => "yahoo",
            DataSource::Stooq => "stooq",
            DataSource::Cache => "cache",
        })
    }
}

/// Trait for daily-bar providers.
///
/// Providers own their retry policy; the cache and fallback sit above this trait.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &'static str;

    /// Source tag recorded on successful fetches.
    fn source(&self) -> DataSource;

    /// Fetch roughly one year of daily bars for a normalized symbol.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, DataError>;
}
