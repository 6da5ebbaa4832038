//! Stooq CSV provider: best-effort fallback.
//!
//! Downloads `Date,Open,High,Low,Close,Volume` rows. Any malformed or empty
//! response is a failure, never a partial result. Every request, successful
//! or not, is followed by a fixed delay plus jitter.

use super::context::FetchConfig;
use super::provider::{DataError, DataProvider, DataSource};
use super::throttle::Clock;
use super::transport::Transport;
use crate::domain::Bar;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

const PROVIDER: &str = "stooq";
const HEADERS: [(&str, &str); 1] = [(
    "User-Agent",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
)];

pub struct StooqProvider {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    config: FetchConfig,
}

impl StooqProvider {
    pub fn new(transport: Arc<dyn Transport>, clock: Arc<dyn Clock>, config: FetchConfig) -> Self {
        Self {
            transport,
            clock,
            config,
        }
    }

    /// `7203.T` → `7203.jp`; other symbols are lowercased as-is.
    pub fn stooq_code(symbol: &str) -> String {
        let lower = symbol.to_lowercase();
        match lower.strip_suffix(".t") {
            Some(code) => format!("{code}.jp"),
            None => lower,
        }
    }

    fn download(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let url = format!(
            "https://stooq.com/q/d/l/?s={}&i=d",
            Self::stooq_code(symbol)
        );
        let resp = self.transport.get(&url, &HEADERS)?;
        if resp.status != 200 {
            return Err(DataError::HttpStatus {
                provider: PROVIDER,
                status: resp.status,
            });
        }
        parse_csv(&resp.body)
    }
}

impl DataProvider for StooqProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn source(&self) -> DataSource {
        DataSource::Stooq
    }

    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let result = self.download(symbol);
        self.clock.sleep(self.config.secondary_delay());
        if let Err(e) = &result {
            debug!(symbol, error = %e, "stooq download failed");
        }
        result
    }
}

fn parse_csv(body: &str) -> Result<Vec<Bar>, DataError> {
    let body = body.trim_start_matches('\u{feff}').trim();
    if body.is_empty() {
        return Err(DataError::EmptyResponse { provider: PROVIDER });
    }
    if !body.starts_with("Date") || body.lines().count() < 2 {
        let head: String = body.chars().take(40).collect();
        return Err(DataError::ResponseFormat(format!(
            "unexpected stooq payload: {head}"
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut bars = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| DataError::ResponseFormat(format!("stooq CSV: {e}")))?;
        if record.len() < 6 {
            continue;
        }
        let num = |i: usize| record.get(i).and_then(|s| s.trim().parse::<f64>().ok());
        let Some(date) = record
            .get(0)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        else {
            continue;
        };
        let Some(close) = num(4) else {
            continue;
        };
        bars.push(Bar {
            date,
            open: num(1).unwrap_or(f64::NAN),
            high: num(2).unwrap_or(f64::NAN),
            low: num(3).unwrap_or(f64::NAN),
            close,
            volume: num(5).map_or(0, |v| v.max(0.0) as u64),
        });
    }

    if bars.is_empty() {
        return Err(DataError::EmptyResponse { provider: PROVIDER });
    }
    Ok(bars)
}
