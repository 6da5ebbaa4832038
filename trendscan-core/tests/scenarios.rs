//! End-to-end scenarios for the screener and the sell engine on synthetic
//! histories.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use trendscan_core::domain::{Bar, BarStore, Lot, Position};
use trendscan_core::indicators::sma_at;
use trendscan_core::screen::{
    classify, sort_candidates, RejectReason, ScreenConfig, Screener, Signal, Strictness,
};
use trendscan_core::sell::{SellAction, SellConfig, SellEngine};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// `n` bars with closes from `close_at`, fixed volume and a ±3 range.
fn series(n: usize, volume: u64, close_at: impl Fn(usize) -> f64) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = close_at(i);
            Bar {
                date: start() + Duration::days(i as i64),
                open: close - 1.0,
                high: close + 3.0,
                low: close - 3.0,
                close,
                volume,
            }
        })
        .collect()
}

/// Uptrend whose last bar clears the 20-day high on 2.5× volume after a
/// week of rising participation.
fn breakout_bars() -> Vec<Bar> {
    let mut bars = series(300, 1_000_000, |i| 1000.0 + i as f64 * 2.0);
    let last = bars.len() - 1;
    for (k, b) in bars[last - 4..].iter_mut().enumerate() {
        b.volume = 1_300_000 + 100_000 * k as u64;
    }
    bars[last].close += 20.0;
    bars[last].high = bars[last].close + 1.0;
    bars[last].volume = 2_500_000;
    bars
}

// ── Screening ────────────────────────────────────────────────────────

#[test]
fn breakout_on_volume_is_reported() {
    let store = BarStore::new("7203.T", breakout_bars());
    let screener = Screener::default();
    assert!(screener.prefilter(&store).is_ok());

    let rec = screener.evaluate("Toyota Motor", &store).unwrap();
    assert_eq!(rec.signal, Signal::Breakout);
    assert_eq!(rec.today_volume, 2_500_000);
    assert!(rec.close > rec.trigger_20h);
    assert!(rec.median_turnover_20 > 0.0);
}

#[test]
fn price_breakout_without_volume_is_not_a_breakout() {
    let mut bars = series(300, 1_000_000, |i| 1000.0 + i as f64 * 2.0);
    let last = bars.len() - 1;
    bars[last].close += 20.0;
    bars[last].high = bars[last].close + 1.0;
    let store = BarStore::new("7203.T", bars);

    assert_eq!(
        Screener::default().evaluate("", &store),
        Err(RejectReason::Volume)
    );
    let loose = Screener::new(ScreenConfig {
        strictness: Strictness::Loose,
        ..ScreenConfig::default()
    });
    assert_eq!(loose.evaluate("", &store).unwrap().signal, Signal::Setup);
}

#[test]
fn cheap_stock_fails_price_floor() {
    let store = BarStore::new("2222.T", series(300, 5_000_000, |i| 300.0 + i as f64 * 0.1));
    assert_eq!(
        Screener::default().prefilter(&store),
        Err(RejectReason::PriceFloor)
    );
}

#[test]
fn thin_stock_fails_liquidity() {
    let store = BarStore::new("3333.T", series(300, 10_000, |i| 1000.0 + i as f64));
    assert_eq!(
        Screener::default().prefilter(&store),
        Err(RejectReason::Liquidity)
    );
}

#[test]
fn downtrend_fails_structure() {
    let store = BarStore::new("4444.T", series(300, 1_000_000, |i| 2000.0 - i as f64 * 2.0));
    assert!(Screener::default().prefilter(&store).is_ok());
    assert_eq!(
        Screener::default().evaluate("", &store),
        Err(RejectReason::Structure)
    );
}

#[test]
fn triggers_sort_ahead_of_setups() {
    let loose = Screener::new(ScreenConfig {
        strictness: Strictness::Loose,
        ..ScreenConfig::default()
    });
    let setup = loose
        .evaluate("", &BarStore::new("1111.T", series(300, 1_000_000, |i| 1000.0 + i as f64 * 2.0)))
        .unwrap();
    let breakout = loose
        .evaluate("", &BarStore::new("9999.T", breakout_bars()))
        .unwrap();
    assert_eq!(setup.signal, Signal::Setup);

    let mut records = vec![setup, breakout];
    sort_candidates(&mut records);
    assert_eq!(records[0].symbol, "9999.T");
    assert_eq!(records[1].symbol, "1111.T");
}

#[test]
fn weak_close_on_thin_volume_is_never_a_breakout() {
    let mut bars = breakout_bars();
    let last = bars.len() - 1;
    let prev_close = bars[last - 1].close;
    bars[last] = Bar {
        open: prev_close,
        high: prev_close + 1.0,
        low: prev_close - 63.0,
        close: prev_close - 60.0,
        volume: 200_000,
        ..bars[last]
    };
    assert!(bars[last].close < sma_at(&bars, 20, 0).unwrap());

    assert_ne!(classify(&bars, 1.5).signal, Signal::Breakout);
    let store = BarStore::new("7203.T", bars);
    for strictness in [Strictness::Strict, Strictness::Normal, Strictness::Loose] {
        let screener = Screener::new(ScreenConfig {
            strictness,
            ..ScreenConfig::default()
        });
        if let Ok(rec) = screener.evaluate("", &store) {
            assert_ne!(rec.signal, Signal::Breakout);
        }
    }
}

// ── Sell decisions ───────────────────────────────────────────────────

/// 99 bars rising by 1 from 100, then `last` on thin volume.
fn rally_then(last: f64) -> BarStore {
    rally_from(100.0, last)
}

/// 99 bars rising by 1 from `first`, then `last` on thin volume.
fn rally_from(first: f64, last: f64) -> BarStore {
    let mut closes: Vec<f64> = (0..99).map(|i| first + i as f64).collect();
    closes.push(last);
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: start() + Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: if i == 99 { 500 } else { 1000 },
            }
        })
        .collect();
    BarStore::new("6861.T", bars)
}

fn bought(index: usize) -> NaiveDateTime {
    (start() + Duration::days(index as i64))
        .and_hms_opt(10, 15, 0)
        .unwrap()
}

fn two_lots(first_price: f64, second_price: f64) -> Position {
    Position::new(
        "6861.T",
        vec![
            Lot::new(bought(80), first_price, 100, None),
            Lot::new(bought(95), second_price, 100, None),
        ],
    )
}

#[test]
fn first_tier_halves_below_sma30() {
    let store = rally_then(181.0);
    let decision = SellEngine::default().decide(&two_lots(150.0, 170.0), &store);
    assert_eq!(decision.action, SellAction::SellHalf);
    assert!(decision.reason_text().contains("30-day"));
    assert_eq!(decision.planned_quantity(), 100);
    assert_eq!(decision.sell_plan[0].lot_index, 1);
}

#[test]
fn profit_drawdown_trims_when_peak_rule_is_off() {
    let store = rally_then(186.0);
    let config = SellConfig {
        enable_peak_drawdown: false,
        ..SellConfig::default()
    };
    let decision = SellEngine::new(config).decide(&two_lots(160.0, 170.0), &store);
    assert_eq!(decision.action, SellAction::SellPercent(30));
    assert_eq!(decision.plan_text(), "lot#1:60");
    assert_eq!(decision.refs.get("DDTrig%"), Some(&5.0));
    assert!(decision.refs.get("PnL%").is_some_and(|p| *p > 10.0 && *p < 20.0));
}

#[test]
fn insufficient_history_holds_without_plan() {
    let store = BarStore::new("6861.T", series(40, 1000, |i| 100.0 + i as f64));
    let position = Position::new("6861.T", vec![Lot::new(bought(10), 100.0, 100, None)]);
    let decision = SellEngine::default().decide(&position, &store);
    assert_eq!(decision.action, SellAction::Hold);
    assert_eq!(decision.reason_text(), "insufficient history");
    assert!(decision.plan_text().is_empty());
}

#[test]
fn quarter_gain_retraced_to_the_peak_limit_exits() {
    // Closes 41..139, then 133 on thin volume: the peak high is 140 and the
    // last close sits exactly 5% below it.
    let store = rally_from(41.0, 133.0);
    let position = Position::new(
        "6861.T",
        vec![
            Lot::new(bought(80), 100.0, 100, None),
            Lot::new(bought(90), 112.8, 100, None),
        ],
    );
    let decision = SellEngine::default().decide(&position, &store);

    assert!(decision.refs["PnL%"] > 24.99 && decision.refs["PnL%"] < 25.01);
    assert_eq!(decision.action, SellAction::SellAll);
    assert!(decision.reason_text().starts_with("peak drawdown: 5.00%"));
    assert_eq!(decision.refs.get("PeakHigh"), Some(&140.0));
    assert_eq!(decision.plan_text(), "lot#1:100 | lot#0:100");
}
