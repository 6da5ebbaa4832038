//! Market data access: providers, throttling, session state and caching.
//!
//! Everything that touches the network lives here. Providers issue HTTP
//! through the [`Transport`] seam and share one [`FetchContext`] so the
//! in-flight limit and request spacing hold process-wide.

pub mod cache;
pub mod context;
pub mod fetcher;
pub mod provider;
pub mod session;
pub mod stooq;
pub mod throttle;
pub mod transport;
pub mod universe;
pub mod yahoo;

pub use cache::BarCache;
pub use context::{FetchConfig, FetchContext};
pub use fetcher::{Fetched, MarketDataFetcher};
pub use provider::{DataError, DataProvider, DataSource, FetchFailure};
pub use session::SessionState;
pub use stooq::StooqProvider;
pub use throttle::{Clock, IntervalGate, ManualClock, Permit, RequestGate, Semaphore, SystemClock};
pub use transport::{HttpResponse, ReqwestTransport, Transport};
pub use universe::{normalize_symbol, Universe, UniverseEntry, UniverseError};
pub use yahoo::YahooProvider;
