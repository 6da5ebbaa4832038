//! Positions CSV reader.
//!
//! One row per lot: `symbol,buy_price,buy_time,quantity[,tier]`. Header
//! names are matched case-insensitively and a few aliases are accepted
//! (`code`, `price`, `date`, `qty`, `level`). Rows for the same symbol are
//! grouped into one [`Position`], in first-appearance order.
//!
//! Rows with a non-positive price are skipped; a missing or non-positive
//! quantity counts as 1 share; a negative tier is treated as absent.

use crate::config::ConfigError;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use trendscan_core::data::normalize_symbol;
use trendscan_core::domain::{Lot, Position};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

pub fn load_positions(path: &Path) -> Result<Vec<Position>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_positions(&content, path)
}

/// Parse purchase time; a bare date means midnight.
pub fn parse_buy_time(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

struct Columns {
    symbol: usize,
    price: usize,
    time: usize,
    quantity: usize,
    tier: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, path: &Path) -> Result<Self, ConfigError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&str], column: &'static str| {
            find(names).ok_or_else(|| ConfigError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
        };
        Ok(Self {
            symbol: require(&["symbol", "code"], "symbol")?,
            price: require(&["buy_price", "price"], "buy_price")?,
            time: require(&["buy_time", "buy_date", "date"], "buy_time")?,
            quantity: require(&["quantity", "qty"], "quantity")?,
            tier: find(&["tier", "level"]),
        })
    }
}

pub fn parse_positions(content: &str, path: &Path) -> Result<Vec<Position>, ConfigError> {
    let csv_err = |source| ConfigError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());
    let cols = Columns::locate(reader.headers().map_err(csv_err)?, path)?;

    let mut grouped: IndexMap<String, Vec<Lot>> = IndexMap::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let Some(symbol) = normalize_symbol(field(cols.symbol)) else {
            continue;
        };
        let price = parse_number(field(cols.price), "buy_price", path, line)?;
        if !(price > 0.0) {
            continue;
        }
        let raw_time = field(cols.time);
        let bought_at = parse_buy_time(raw_time).ok_or_else(|| ConfigError::BadDate {
            path: path.to_path_buf(),
            line,
            value: raw_time.to_string(),
        })?;
        let quantity = match field(cols.quantity) {
            "" => 1,
            raw => {
                let q = parse_number(raw, "quantity", path, line)?;
                if q >= 1.0 {
                    q as u64
                } else {
                    1
                }
            }
        };
        let tier = match cols.tier.map(field) {
            None | Some("") => None,
            Some(raw) => {
                let t = parse_number(raw, "tier", path, line)?;
                (t >= 0.0).then_some(t as u32)
            }
        };

        let lot = Lot::new(bought_at, price, quantity, tier);
        grouped.entry(symbol).or_default().push(lot);
    }

    Ok(grouped
        .into_iter()
        .map(|(symbol, lots)| Position::new(symbol, lots))
        .collect())
}

fn parse_number(raw: &str, field: &'static str, path: &Path, line: u64) -> Result<f64, ConfigError> {
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::BadNumber {
            path: PathBuf::from(path),
            line,
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<Position>, ConfigError> {
        parse_positions(text, Path::new("positions.csv"))
    }

    #[test]
    fn groups_lots_by_symbol() {
        let positions = parse(
            "symbol,buy_price,buy_time,quantity\n\
             7203,2500,2024-03-01 09:30,100\n\
             6758.T,13000,2024/03/05,50\n\
             7203.T,2650,2024-04-10 10:00,100\n",
        )
        .unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].symbol(), "7203.T");
        assert_eq!(positions[0].lots().len(), 2);
        assert_eq!(positions[0].add_count(), 1);
        assert_eq!(positions[1].symbol(), "6758.T");
        assert_eq!(
            positions[1].lots()[0].bought_at,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn interleaved_rows_keep_first_appearance_order() {
        let mut text = String::from("symbol,buy_price,buy_time,quantity\n");
        for round in 0..3 {
            for code in (1000..1500).rev() {
                text.push_str(&format!("{code},{},2024-03-0{} 09:30,100\n", 500 + round, round + 1));
            }
        }
        let positions = parse(&text).unwrap();
        assert_eq!(positions.len(), 500);
        assert_eq!(positions[0].symbol(), "1499.T");
        assert_eq!(positions[499].symbol(), "1000.T");
        assert!(positions.iter().all(|p| p.lots().len() == 3));
    }

    #[test]
    fn aliases_and_optional_tier() {
        let positions = parse(
            "Code,Price,Date,Qty,Level\n\
             9984,8000,2024-01-10 09:00,0,1\n\
             9984,7800,2024-02-10 09:00,,\n",
        )
        .unwrap();
        let lots = positions[0].lots();
        // The untiered lot takes chronological slot 1 and sorts after the tier-1 lot.
        assert_eq!(lots.len(), 2);
        assert_eq!(lots[1].tier, Some(1));
        assert_eq!(lots[0].quantity, 1);
        assert_eq!(lots.iter().map(|l| l.quantity).sum::<u64>(), 2);
    }

    #[test]
    fn non_positive_price_rows_are_skipped() {
        let positions = parse(
            "symbol,buy_price,buy_time,quantity\n\
             7203,0,2024-03-01,100\n\
             8306,1500,2024-03-01,200\n",
        )
        .unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol(), "8306.T");
    }

    #[test]
    fn missing_column_fails_fast() {
        let err = parse("symbol,buy_price,quantity\n7203,2500,100\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingColumn { column: "buy_time", .. }));
    }

    #[test]
    fn bad_date_reports_line() {
        let err = parse(
            "symbol,buy_price,buy_time,quantity\n\
             7203,2500,2024-03-01,100\n\
             7203,2500,yesterday,100\n",
        )
        .unwrap_err();
        match err {
            ConfigError::BadDate { line, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_price_is_an_error() {
        let err = parse("symbol,buy_price,buy_time,quantity\n7203,abc,2024-03-01,100\n").unwrap_err();
        assert!(matches!(err, ConfigError::BadNumber { field: "buy_price", .. }));
    }

    #[test]
    fn buy_time_formats() {
        for raw in ["2024-03-01 09:30", "2024/03/01 09:30", "2024-03-01 09:30:00"] {
            assert_eq!(
                parse_buy_time(raw).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
            );
        }
        assert!(parse_buy_time("03/01/2024").is_none());
    }
}
