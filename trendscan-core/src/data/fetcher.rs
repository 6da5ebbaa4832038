//! Market data fetcher: cache → primary provider → secondary provider.
//!
//! Fallback is explicit: the primary's `Result` is inspected, and only on
//! failure is the secondary consulted. When both fail the caller receives a
//! [`FetchFailure`] carrying both errors.

use super::cache::BarCache;
use super::context::{FetchConfig, FetchContext};
use super::provider::{DataError, DataProvider, DataSource, FetchFailure};
use super::stooq::StooqProvider;
use super::throttle::{Clock, SystemClock};
use super::transport::{ReqwestTransport, Transport};
use super::universe::normalize_symbol;
use super::yahoo::YahooProvider;
use crate::domain::{Bar, BarStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// A successful fetch and where it came from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub store: Arc<BarStore>,
    pub source: DataSource,
}

pub struct MarketDataFetcher {
    primary: Box<dyn DataProvider>,
    secondary: Option<Box<dyn DataProvider>>,
    cache: BarCache,
}

impl MarketDataFetcher {
    pub fn new(
        primary: Box<dyn DataProvider>,
        secondary: Option<Box<dyn DataProvider>>,
        cache: BarCache,
    ) -> Self {
        Self {
            primary,
            secondary,
            cache,
        }
    }

    /// Production wiring: reqwest transport, wall clock, Yahoo then Stooq.
    pub fn from_config(config: &FetchConfig) -> Result<Self, DataError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.timeout())?);
        Ok(Self::with_transport(config, transport, clock))
    }

    /// Wire both providers over a given transport and clock.
    pub fn with_transport(
        config: &FetchConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let context = Arc::new(FetchContext::new(config, clock.clone()));
        let primary = YahooProvider::new(transport.clone(), context, config.clone());
        let secondary = config.enable_secondary.then(|| {
            Box::new(StooqProvider::new(transport, clock.clone(), config.clone()))
                as Box<dyn DataProvider>
        });
        Self::new(
            Box::new(primary),
            secondary,
            BarCache::new(config.cache_ttl(), clock),
        )
    }

    pub fn cache(&self) -> &BarCache {
        &self.cache
    }

    pub fn fetch(&self, raw_symbol: &str) -> Result<Fetched, FetchFailure> {
        let symbol = normalize_symbol(raw_symbol).unwrap_or_else(|| raw_symbol.to_string());

        if let Some(store) = self.cache.get(&symbol) {
            debug!(symbol, "cache hit");
            return Ok(Fetched {
                store,
                source: DataSource::Cache,
            });
        }
        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!(purged, "dropped expired cache entries");
        }

        let primary = match self.from_provider(self.primary.as_ref(), &symbol) {
            Ok(fetched) => return Ok(fetched),
            Err(e) => e,
        };
        debug!(symbol, error = %primary, "primary provider failed, trying secondary");

        let secondary = match &self.secondary {
            Some(provider) => match self.from_provider(provider.as_ref(), &symbol) {
                Ok(fetched) => return Ok(fetched),
                Err(e) => e,
            },
            None => DataError::Disabled("secondary provider"),
        };

        warn!(symbol, %primary, %secondary, "both providers failed");
        Err(FetchFailure {
            symbol,
            primary,
            secondary,
        })
    }

    fn from_provider(
        &self,
        provider: &dyn DataProvider,
        symbol: &str,
    ) -> Result<Fetched, DataError> {
        let bars = provider.fetch_bars(symbol)?;
        let store = Arc::new(into_store(symbol, bars, provider.name())?);
        self.cache.insert(symbol, store.clone());
        debug!(symbol, bars = store.len(), provider = provider.name(), "fetched");
        Ok(Fetched {
            store,
            source: provider.source(),
        })
    }
}

fn into_store(symbol: &str, bars: Vec<Bar>, provider: &'static str) -> Result<BarStore, DataError> {
    let store = BarStore::new(symbol, bars);
    if store.is_empty() {
        return Err(DataError::EmptyResponse { provider });
    }
    Ok(store)
}
