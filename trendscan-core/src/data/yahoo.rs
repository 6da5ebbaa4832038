//! Yahoo Finance chart provider.
//!
//! Fetches one year of daily bars from the v8 chart API. Handles the shared
//! request gate, retries with exponential backoff, and anti-bot recovery:
//! an HTML page where JSON was expected, or HTTP 401, clears cookies, flips
//! between the two API hosts, re-warms the session and cools down.

use super::context::{FetchConfig, FetchContext};
use super::provider::{DataError, DataProvider, DataSource};
use super::transport::Transport;
use crate::domain::Bar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const PROVIDER: &str = "yahoo";
const WARM_UP_URL: &str = "https://finance.yahoo.com/quote/7203.T";
const HEADERS: [(&str, &str); 4] = [
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    ),
    ("Accept", "application/json,text/plain,*/*"),
    ("Accept-Language", "ja,en-US;q=0.9,en;q=0.8"),
    ("Referer", "https://finance.yahoo.com/"),
];

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(Result<Vec<Bar>, DataError>),
    /// Anti-bot response, with the cooldown unit to apply.
    Blocked(DataError, u64),
    Retry(DataError),
}

pub struct YahooProvider {
    transport: Arc<dyn Transport>,
    context: Arc<FetchContext>,
    config: FetchConfig,
}

impl YahooProvider {
    pub fn new(transport: Arc<dyn Transport>, context: Arc<FetchContext>, config: FetchConfig) -> Self {
        Self {
            transport,
            context,
            config,
        }
    }

    fn chart_url(host: &str, symbol: &str) -> String {
        let encoded = symbol.replace('^', "%5E");
        format!("https://{host}/v8/finance/chart/{encoded}?range=1y&interval=1d")
    }

    fn warm_up(&self) {
        let _permit = self.context.gate.enter();
        match self.transport.get(WARM_UP_URL, &HEADERS) {
            Ok(resp) => debug!(status = resp.status, "chart session warmed up"),
            Err(e) => debug!(error = %e, "chart session warm-up failed"),
        }
    }

    /// Clear cookies, switch hosts and re-warm after an anti-bot response.
    fn recover(&self) {
        if let Err(e) = self.transport.reset_cookies() {
            warn!(error = %e, "failed to reset cookies");
        }
        let host = self.context.session.flip_host();
        debug!(host, "switched chart host");
        self.context.session.invalidate();
        self.context.session.ensure_primed(|| self.warm_up());
    }

    fn attempt(&self, symbol: &str) -> Attempt {
        let url = Self::chart_url(self.context.session.host(), symbol);
        let response = {
            let _permit = self.context.gate.enter();
            self.transport.get(&url, &HEADERS)
        };
        let resp = match response {
            Ok(resp) => resp,
            Err(e) if e.is_transient() => return Attempt::Retry(e),
            Err(e) => return Attempt::Done(Err(e)),
        };

        match resp.status {
            200 => {
                let body = resp.body.trim_start();
                if body.is_empty() {
                    Attempt::Done(Err(DataError::EmptyResponse { provider: PROVIDER }))
                } else if body.starts_with('<') {
                    Attempt::Blocked(
                        DataError::AntiBotBlocked {
                            provider: PROVIDER,
                            detail: "HTML page instead of JSON".into(),
                        },
                        self.config.html_cooldown_ms,
                    )
                } else {
                    Attempt::Done(parse_chart(symbol, body))
                }
            }
            401 => Attempt::Blocked(
                DataError::AntiBotBlocked {
                    provider: PROVIDER,
                    detail: "HTTP 401".into(),
                },
                self.config.unauthorized_cooldown_ms,
            ),
            429 => Attempt::Retry(DataError::RateLimited { provider: PROVIDER }),
            status @ 500..=599 => Attempt::Retry(DataError::ServerError {
                provider: PROVIDER,
                status,
            }),
            status => Attempt::Done(Err(DataError::HttpStatus {
                provider: PROVIDER,
                status,
            })),
        }
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn source(&self) -> DataSource {
        DataSource::Yahoo
    }

    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        self.context.session.ensure_primed(|| self.warm_up());
        let clock = &self.context.clock;
        let mut last_error = DataError::Network("no attempt made".into());

        for attempt in 0..=self.config.max_retries {
            let more = attempt < self.config.max_retries;
            match self.attempt(symbol) {
                Attempt::Done(result) => return result,
                Attempt::Blocked(err, unit) => {
                    debug!(symbol, attempt, error = %err, "anti-bot response");
                    self.recover();
                    if more {
                        clock.sleep(self.config.cooldown(unit, attempt));
                    }
                    last_error = err;
                }
                Attempt::Retry(err) => {
                    debug!(symbol, attempt, error = %err, "transient chart error");
                    if more {
                        clock.sleep(self.config.backoff(attempt));
                    }
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

/// Parse a chart body into bars. Bars without a usable close are dropped.
fn parse_chart(symbol: &str, body: &str) -> Result<Vec<Bar>, DataError> {
    let resp: ChartResponse = serde_json::from_str(body)
        .map_err(|e| DataError::ResponseFormat(format!("chart JSON for {symbol}: {e}")))?;

    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormat(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )),
        None => DataError::ResponseFormat("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormat("result array is empty".into()))?;
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = data
        .timestamp
        .ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormat("no quote data".into()))?;

    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();
    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = at(&quote.close, i).filter(|c| c.is_finite()) else {
            continue;
        };
        let date = chrono::DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormat(format!("invalid timestamp: {ts}")))?;
        bars.push(Bar {
            date,
            open: at(&quote.open, i).unwrap_or(f64::NAN),
            high: at(&quote.high, i).unwrap_or(f64::NAN),
            low: at(&quote.low, i).unwrap_or(f64::NAN),
            close,
            volume: at(&quote.volume, i).map_or(0, |v| v.max(0.0) as u64),
        });
    }

    if bars.is_empty() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::session::{ALTERNATE_HOST, PRIMARY_HOST};
    use crate::data::throttle::ManualClock;
    use crate::data::transport::testing::ScriptedTransport;
    use crate::data::transport::HttpResponse;
    use std::time::Duration;

    const BODY: &str = r#"{"chart":{"result":[{
        "meta":{"gmtoffset":32400},
        "timestamp":[1704153600,1704240000,1704326400],
        "indicators":{"quote":[{
            "open":[100.0,101.0,null],
            "high":[102.0,103.0,null],
            "low":[99.0,100.0,null],
            "close":[101.0,102.5,null],
            "volume":[1000,2000,null]}]}}],"error":null}}"#;

    fn provider(
        script: Vec<Result<HttpResponse, DataError>>,
    ) -> (YahooProvider, Arc<ScriptedTransport>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(1_000_000));
        let config = FetchConfig::default();
        let context = Arc::new(FetchContext::new(&config, clock.clone()));
        let transport = Arc::new(ScriptedTransport::new(script));
        let provider = YahooProvider::new(transport.clone(), context, config);
        (provider, transport, clock)
    }

    fn chart_sleeps(clock: &ManualClock) -> Vec<Duration> {
        // Gate waits are at most one gap; recovery and backoff sleeps are longer.
        clock
            .sleeps()
            .into_iter()
            .filter(|d| *d > Duration::from_millis(150))
            .collect()
    }

    #[test]
    fn parses_bars_and_drops_missing_close() {
        let bars = parse_chart("7203.T", BODY).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[1].volume, 2000);
        // 2024-01-02 00:00 JST
        assert_eq!(
            bars[0].date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn not_found_error_object() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(matches!(
            parse_chart("XXXX.T", body),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn garbage_json_is_format_error() {
        assert!(matches!(
            parse_chart("7203.T", "{\"chart\":"),
            Err(DataError::ResponseFormat(_))
        ));
    }

    #[test]
    fn success_on_first_attempt_warms_once() {
        let (p, transport, _) = provider(vec![Ok(HttpResponse::new(200, BODY))]);
        let bars = p.fetch_bars("7203.T").unwrap();
        assert_eq!(bars.len(), 2);
        let urls = transport.requested();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("/quote/"));
        assert!(urls[1].contains(PRIMARY_HOST));
        assert!(urls[1].ends_with("/v8/finance/chart/7203.T?range=1y&interval=1d"));
    }

    #[test]
    fn html_body_triggers_recovery_and_host_flip() {
        let (p, transport, clock) = provider(vec![
            Ok(HttpResponse::new(200, "<!doctype html><html>blocked</html>")),
            Ok(HttpResponse::new(200, BODY)),
        ]);
        assert!(p.fetch_bars("7203.T").is_ok());
        assert_eq!(transport.resets(), 1);
        let chart_urls: Vec<String> = transport
            .requested()
            .into_iter()
            .filter(|u| u.contains("/v8/"))
            .collect();
        assert!(chart_urls[0].contains(PRIMARY_HOST));
        assert!(chart_urls[1].contains(ALTERNATE_HOST));
        // Two warm-ups: initial and after recovery.
        let warmups = transport
            .requested()
            .iter()
            .filter(|u| u.contains("/quote/"))
            .count();
        assert_eq!(warmups, 2);
        assert_eq!(chart_sleeps(&clock), vec![Duration::from_millis(800)]);
    }

    #[test]
    fn unauthorized_uses_longer_cooldown() {
        let (p, transport, clock) = provider(vec![
            Ok(HttpResponse::new(401, "")),
            Ok(HttpResponse::new(401, "")),
            Ok(HttpResponse::new(200, BODY)),
        ]);
        assert!(p.fetch_bars("7203.T").is_ok());
        assert_eq!(transport.resets(), 2);
        assert_eq!(
            chart_sleeps(&clock),
            vec![Duration::from_millis(1200), Duration::from_millis(2400)]
        );
    }

    #[test]
    fn rate_limit_exhausts_retries() {
        let script = (0..5)
            .map(|_| Ok(HttpResponse::new(429, "Too Many Requests")))
            .collect();
        let (p, transport, clock) = provider(script);
        let err = p.fetch_bars("7203.T").unwrap_err();
        assert!(matches!(err, DataError::RateLimited { .. }));
        let chart_calls = transport
            .requested()
            .iter()
            .filter(|u| u.contains("/v8/"))
            .count();
        assert_eq!(chart_calls, 5);
        let backoffs = chart_sleeps(&clock);
        assert_eq!(backoffs.len(), 4);
        for (i, d) in backoffs.iter().enumerate() {
            let base = 500u64 << i;
            assert!((base..=base + 400).contains(&(d.as_millis() as u64)));
        }
    }

    #[test]
    fn server_error_then_success() {
        let (p, _, _) = provider(vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(200, BODY)),
        ]);
        assert_eq!(p.fetch_bars("7203.T").unwrap().len(), 2);
    }

    #[test]
    fn client_error_is_permanent() {
        let (p, transport, _) = provider(vec![Ok(HttpResponse::new(404, ""))]);
        let err = p.fetch_bars("7203.T").unwrap_err();
        assert_eq!(
            err,
            DataError::HttpStatus {
                provider: "yahoo",
                status: 404
            }
        );
        assert_eq!(transport.requested().len(), 2);
    }

    #[test]
    fn transport_errors_retry_only_when_transient() {
        let (p, _, _) = provider(vec![
            Err(DataError::Network("connection reset".into())),
            Ok(HttpResponse::new(200, BODY)),
        ]);
        assert_eq!(p.fetch_bars("7203.T").unwrap().len(), 2);

        let (p, transport, _) = provider(vec![
            Err(DataError::ResponseFormat("body is not UTF-8".into())),
            Ok(HttpResponse::new(200, BODY)),
        ]);
        assert!(matches!(
            p.fetch_bars("7203.T"),
            Err(DataError::ResponseFormat(_))
        ));
        let chart_calls = transport
            .requested()
            .iter()
            .filter(|u| u.contains("/v8/"))
            .count();
        assert_eq!(chart_calls, 1);
    }

    #[test]
    fn empty_body_is_permanent() {
        let (p, _, _) = provider(vec![Ok(HttpResponse::new(200, "   "))]);
        assert!(matches!(
            p.fetch_bars("7203.T"),
            Err(DataError::EmptyResponse { .. })
        ));
    }
}
