//! CSV exports for screening candidates and sell decisions.
//!
//! Free-text fields have commas and line breaks replaced with spaces so the
//! files stay one record per line for spreadsheet import. Numbers that are
//! unavailable are written as empty fields.

use std::path::Path;

use anyhow::{Context, Result};
use trendscan_core::screen::CandidateRecord;
use trendscan_core::sell::Decision;

use crate::advisor::{AdviceOutcome, AdviceRow};

pub const CANDIDATE_HEADER: [&str; 14] = [
    "Symbol",
    "Name",
    "Date",
    "Close",
    "SMA10",
    "SMA20",
    "SMA50",
    "52WHigh",
    "Dist52W",
    "VolMA20",
    "TurnoverMA20",
    "Trigger20H",
    "TodayVol",
    "Signal",
];

pub const DECISION_HEADER: [&str; 19] = [
    "Symbol",
    "Date",
    "LastClose",
    "LastVol",
    "AvgCost",
    "TotalQty",
    "Action",
    "Reason",
    "M10",
    "M15",
    "M20",
    "ATR14",
    "RSI14",
    "Trail",
    "LossMA",
    "Adds",
    "MarketOK",
    "ReAddSignal",
    "SellPlan",
];

/// Replace delimiter and line-break characters with spaces.
pub fn sanitize(text: &str) -> String {
    text.replace([',', '\n', '\r'], " ")
}

fn fixed2(v: Option<f64>) -> String {
    v.filter(|v| v.is_finite())
        .map(|v| format!("{v:.2}"))
        .unwrap_or_default()
}

fn flag(decision: &Decision, key: &str) -> String {
    let on = decision.refs.get(key).is_some_and(|v| *v > 0.0);
    u8::from(on).to_string()
}

pub fn candidates_csv(records: &[CandidateRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CANDIDATE_HEADER)?;

    for r in records {
        wtr.write_record([
            sanitize(&r.symbol),
            sanitize(&r.name),
            r.date.to_string(),
            format!("{:.2}", r.close),
            format!("{:.2}", r.sma10),
            format!("{:.2}", r.sma20),
            format!("{:.2}", r.sma50),
            format!("{:.2}", r.high_52w),
            format!("{:.3}", r.dist_52w),
            format!("{:.0}", r.vol_ma20),
            format!("{:.0}", r.turnover_ma20),
            format!("{:.2}", r.trigger_20h),
            r.today_volume.to_string(),
            r.signal.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn decision_record(row: &AdviceRow) -> Vec<String> {
    let position = &row.position;
    let avg_cost = fixed2(position.average_cost());
    let total_qty = position.total_quantity().to_string();

    let (store, decision) = match &row.outcome {
        AdviceOutcome::Decided { store, decision } => (store, decision),
        AdviceOutcome::FetchFailed(failure) => {
            return error_record(position.symbol(), &failure.to_string(), avg_cost, total_qty)
        }
        AdviceOutcome::TimedOut => {
            return error_record(position.symbol(), "timed out", avg_cost, total_qty)
        }
    };

    let last = store.last();
    let refs = |key: &str| fixed2(decision.refs.get(key).copied());
    let adds = decision
        .refs
        .get("Adds")
        .map_or(position.add_count(), |a| *a as u32);

    vec![
        sanitize(position.symbol()),
        last.map(|b| b.date.to_string()).unwrap_or_default(),
        fixed2(last.map(|b| b.close)),
        last.map(|b| b.volume.to_string()).unwrap_or_default(),
        avg_cost,
        total_qty,
        decision.action.to_string(),
        sanitize(&decision.reason_text()),
        refs("M10"),
        refs("M15"),
        refs("M20"),
        refs("ATR14"),
        refs("RSI14"),
        refs("Trail"),
        refs("LossMA"),
        adds.to_string(),
        flag(decision, "MarketOK"),
        flag(decision, "ReAddSignal"),
        sanitize(&decision.plan_text()),
    ]
}

/// Row for a position whose data could not be obtained.
fn error_record(symbol: &str, reason: &str, avg_cost: String, total_qty: String) -> Vec<String> {
    let mut rec = vec![String::new(); DECISION_HEADER.len()];
    rec[0] = sanitize(symbol);
    rec[4] = avg_cost;
    rec[5] = total_qty;
    rec[6] = "ERROR".to_string();
    rec[7] = sanitize(reason);
    rec
}

pub fn decisions_csv(rows: &[AdviceRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(DECISION_HEADER)?;
    for row in rows {
        wtr.write_record(decision_record(row))?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `content` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use trendscan_core::data::{DataError, FetchFailure};
    use trendscan_core::domain::{Bar, BarStore, Lot, Position};
    use trendscan_core::screen::Signal;
    use trendscan_core::sell::{LotSale, SellAction};

    fn position() -> Position {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Position::new(
            "7203.T",
            vec![
                Lot::new(at, 2000.0, 100, None),
                Lot::new(at + chrono::Duration::days(7), 2200.0, 100, None),
            ],
        )
    }

    fn store() -> Arc<BarStore> {
        let bar = Bar {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            open: 2400.0,
            high: 2450.0,
            low: 2380.0,
            close: 2431.5,
            volume: 1_234_567,
        };
        Arc::new(BarStore::new("7203.T", vec![bar]))
    }

    fn lines(csv: &str) -> Vec<&str> {
        csv.lines().collect()
    }

    #[test]
    fn candidate_row_formats() {
        let record = CandidateRecord {
            symbol: "7203.T".into(),
            name: "Toyota Motor, Corp".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            close: 2431.5,
            sma10: 2400.0,
            sma20: 2380.123,
            sma50: 2300.0,
            high_52w: 2500.0,
            dist_52w: 0.0274,
            vol_ma20: 1_000_000.4,
            turnover_ma20: 2.4e9,
            trigger_20h: 2420.0,
            today_volume: 2_500_000,
            signal: Signal::Breakout,
            adx: None,
            plus_di: None,
            minus_di: None,
            atr_pct: None,
            median_turnover_20: 2.3e9,
            today_turnover: 6e9,
        };
        let out = candidates_csv(&[record]).unwrap();
        let rows = lines(&out);
        assert_eq!(rows[0], CANDIDATE_HEADER.join(","));
        assert_eq!(
            rows[1],
            "7203.T,Toyota Motor  Corp,2024-06-03,2431.50,2400.00,2380.12,2300.00,2500.00,0.027,1000000,2400000000,2420.00,2500000,BREAKOUT"
        );
    }

    #[test]
    fn decision_row_with_plan_and_missing_refs() {
        let mut decision = Decision::hold("unused");
        decision.action = SellAction::SellHalf;
        decision.reasons = vec!["first tier: close below 30-day average, halve".into(), "x".into()];
        decision.refs.insert("M10".into(), 2440.0);
        decision.refs.insert("RSI14".into(), 55.556);
        decision.refs.insert("Adds".into(), 1.0);
        decision.refs.insert("MarketOK".into(), 1.0);
        decision.sell_plan = vec![LotSale { lot_index: 1, quantity: 100 }];

        let row = AdviceRow {
            position: position(),
            outcome: AdviceOutcome::Decided { store: store(), decision },
        };
        let out = decisions_csv(&[row]).unwrap();
        assert_eq!(
            lines(&out)[1],
            "7203.T,2024-06-03,2431.50,1234567,2100.00,200,SELL_1_2,\
             first tier: close below 30-day average  halve | x,\
             2440.00,,,,55.56,,,1,1,0,lot#1:100"
        );
    }

    #[test]
    fn fetch_failure_becomes_error_row() {
        let failure = FetchFailure {
            symbol: "7203.T".into(),
            primary: DataError::Disabled("primary"),
            secondary: DataError::Disabled("secondary provider"),
        };
        let row = AdviceRow {
            position: position(),
            outcome: AdviceOutcome::FetchFailed(failure),
        };
        let out = decisions_csv(&[row]).unwrap();
        let fields: Vec<&str> = lines(&out)[1].split(',').collect();
        assert_eq!(fields.len(), DECISION_HEADER.len());
        assert_eq!(fields[0], "7203.T");
        assert_eq!(fields[1], "");
        assert_eq!(fields[4], "2100.00");
        assert_eq!(fields[5], "200");
        assert_eq!(fields[6], "ERROR");
        assert!(fields[7].contains("fetch failed"));
        assert!(fields[8..].iter().all(|f| f.is_empty()));
    }

    #[test]
    fn sanitize_strips_delimiters() {
        assert_eq!(sanitize("a,b\nc\r"), "a b c ");
    }

    #[test]
    fn write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/decisions.csv");
        write_file(&path, "x\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x\n");
    }
}
