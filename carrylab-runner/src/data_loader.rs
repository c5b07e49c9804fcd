//! Input normalization: CSV market and coupon series.
//!
//! Market files carry one row per day with a date, a price and a trend
//! signal. Loading:
//! 1. Locate columns by name (several spellings accepted)
//! 2. Parse dates (`YYYY-MM-DD`, optionally followed by a time) and numbers
//!    (thousands separators stripped)
//! 3. Sort rows by date (stable)
//! 4. Forward-fill empty price/trend cells from the previous row
//!
//! Duplicate dates are passed through untouched; the simulation rejects them.

use chrono::NaiveDate;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use carrylab_core::{CouponEvent, MarketDay};

use crate::bond::BondPrice;

pub const MARKET_DATE_COLUMNS: &[&str] = &["date", "Date", "Tanggal"];
pub const PRICE_COLUMNS: &[&str] = &["price", "Price", "close", "Close"];
pub const TREND_COLUMNS: &[&str] = &["trend", "Trend", "Trend_Indicator", "trend_signal"];
pub const COUPON_DATE_COLUMNS: &[&str] = &["date", "Date", "coupon_date"];
pub const AMOUNT_COLUMNS: &[&str] = &["amount", "coupon_usd", "coupon"];
pub const BOND_DATE_COLUMNS: &[&str] = &["date", "Date", "Tanggal", "price_date"];
pub const BOND_PRICE_COLUMNS: &[&str] = &["bond_price", "price_value_price", "price", "Price"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column: expected one of {candidates:?}")]
    MissingColumn { candidates: Vec<String> },

    #[error("line {line}: invalid date '{value}'")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: invalid number '{value}' in column '{column}'")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },

    #[error("{date}: empty '{column}' with no earlier value to forward-fill")]
    NothingToFill { date: NaiveDate, column: String },
}

/// Normalized market series plus a count of the cells that were filled.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMarket {
    pub days: Vec<MarketDay>,
    pub filled_cells: usize,
}

// ─── Market series ───────────────────────────────────────────────────

/// Load a market CSV from disk.
pub fn load_market_csv(path: &Path) -> Result<LoadedMarket, LoadError> {
    let file = open(path)?;
    let loaded = parse_market_csv(file)?;
    tracing::info!(
        path = %path.display(),
        days = loaded.days.len(),
        filled = loaded.filled_cells,
        "loaded market series"
    );
    Ok(loaded)
}

/// Parse a market CSV from any reader.
pub fn parse_market_csv<R: Read>(reader: R) -> Result<LoadedMarket, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let date_col = find_column(&headers, MARKET_DATE_COLUMNS)?;
    let price_col = find_column(&headers, PRICE_COLUMNS)?;
    let trend_col = find_column(&headers, TREND_COLUMNS)?;

    let mut rows: Vec<(NaiveDate, Option<f64>, Option<f64>)> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = line_of(&record);
        let raw_date = record.get(date_col).unwrap_or_default();
        if raw_date.is_empty() && record.iter().all(str::is_empty) {
            continue;
        }
        let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
            line,
            value: raw_date.to_string(),
        })?;
        let price = parse_cell(&record, price_col, &headers, line)?;
        let trend = parse_cell(&record, trend_col, &headers, line)?;
        rows.push((date, price, trend));
    }

    rows.sort_by_key(|(date, _, _)| *date);

    let mut days = Vec::with_capacity(rows.len());
    let mut filled_cells = 0;
    let mut last_price: Option<f64> = None;
    let mut last_trend: Option<f64> = None;
    for (date, price, trend) in rows {
        let price = fill(price, last_price, &mut filled_cells)
            .ok_or_else(|| nothing_to_fill(date, &headers, price_col))?;
        let trend = fill(trend, last_trend, &mut filled_cells)
            .ok_or_else(|| nothing_to_fill(date, &headers, trend_col))?;
        last_price = Some(price);
        last_trend = Some(trend);
        days.push(MarketDay::new(date, price, trend));
    }

    Ok(LoadedMarket { days, filled_cells })
}

fn fill(value: Option<f64>, previous: Option<f64>, filled: &mut usize) -> Option<f64> {
    match value {
        Some(v) => Some(v),
        None => {
            let prev = previous?;
            *filled += 1;
            Some(prev)
        }
    }
}

fn nothing_to_fill(date: NaiveDate, headers: &csv::StringRecord, col: usize) -> LoadError {
    LoadError::NothingToFill {
        date,
        column: headers.get(col).unwrap_or_default().to_string(),
    }
}

// ─── Coupon series ───────────────────────────────────────────────────

/// Load a coupon CSV from disk.
pub fn load_coupon_csv(path: &Path) -> Result<Vec<CouponEvent>, LoadError> {
    let file = open(path)?;
    let coupons = parse_coupon_csv(file)?;
    tracing::info!(path = %path.display(), coupons = coupons.len(), "loaded coupon series");
    Ok(coupons)
}

/// Parse a coupon CSV from any reader. Rows come back sorted by date.
pub fn parse_coupon_csv<R: Read>(reader: R) -> Result<Vec<CouponEvent>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let date_col = find_column(&headers, COUPON_DATE_COLUMNS)?;
    let amount_col = find_column(&headers, AMOUNT_COLUMNS)?;

    let mut coupons = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = line_of(&record);
        let raw_date = record.get(date_col).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
            line,
            value: raw_date.to_string(),
        })?;
        let amount =
            parse_cell(&record, amount_col, &headers, line)?.ok_or_else(|| {
                LoadError::InvalidNumber {
                    line,
                    column: headers.get(amount_col).unwrap_or_default().to_string(),
                    value: String::new(),
                }
            })?;
        coupons.push(CouponEvent::new(date, amount));
    }

    coupons.sort_by_key(|c| c.date);
    Ok(coupons)
}

// ─── Bond quotes ─────────────────────────────────────────────────────

/// Load bond quotes (% of par) from disk.
pub fn load_bond_csv(path: &Path) -> Result<Vec<BondPrice>, LoadError> {
    let file = open(path)?;
    let prices = parse_bond_csv(file)?;
    tracing::info!(path = %path.display(), quotes = prices.len(), "loaded bond prices");
    Ok(prices)
}

/// Parse bond quotes. Rows with an empty price are skipped; valuation uses
/// the most recent earlier quote for those days.
pub fn parse_bond_csv<R: Read>(reader: R) -> Result<Vec<BondPrice>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let date_col = find_column(&headers, BOND_DATE_COLUMNS)?;
    let price_col = find_column(&headers, BOND_PRICE_COLUMNS)?;

    let mut prices = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = line_of(&record);
        let raw_date = record.get(date_col).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| LoadError::InvalidDate {
            line,
            value: raw_date.to_string(),
        })?;
        if let Some(price) = parse_cell(&record, price_col, &headers, line)? {
            prices.push(BondPrice::new(date, price));
        }
    }

    prices.sort_by_key(|p| p.date);
    Ok(prices)
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Result<usize, LoadError> {
    candidates
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or_else(|| LoadError::MissingColumn {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
        })
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

/// Accepts `YYYY-MM-DD`, with or without a trailing time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}

/// Empty cell → `None`. Thousands separators are stripped before parsing.
fn parse_cell(
    record: &csv::StringRecord,
    col: usize,
    headers: &csv::StringRecord,
    line: u64,
) -> Result<Option<f64>, LoadError> {
    let raw = record.get(col).unwrap_or_default();
    if raw.is_empty() {
        return Ok(None);
    }
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| LoadError::InvalidNumber {
            line,
            column: headers.get(col).unwrap_or_default().to_string(),
            value: raw.to_string(),
        })
}
