//! Bond leg: the fixed-income position whose coupons fund the asset sleeve.
//!
//! The bond is bought once, on the first simulated day, and held:
//! - `nominal = initial_investment / (purchase_price / 100)`
//! - `market_value[t] = nominal * price[t] / 100`
//! - `pnl[t] = market_value[t] - initial_investment`
//!
//! Prices are quoted as a percentage of par. A day without its own quote uses
//! the most recent earlier one. The combined portfolio is the bond's market
//! value plus the simulated sleeve's total value.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use carrylab_core::PortfolioState;

use crate::metrics::SummaryStats;

/// Errors from valuing the bond leg.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BondError {
    #[error("bond initial investment {0} is not finite and positive")]
    InvalidInvestment(f64),

    #[error("bond price {price} on {date} is not finite and positive")]
    InvalidPrice { date: NaiveDate, price: f64 },

    #[error("no bond price on or before the purchase date {date} (set [bond].purchase_price or extend the price file)")]
    NoPurchasePrice { date: NaiveDate },

    #[error("the bond leg needs at least one simulated day")]
    NoMarketDays,
}

/// `[bond]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondConfig {
    /// Cash paid for the bond on the first simulated day.
    pub initial_investment: f64,
    /// CSV with a date column and a bond price column (% of par). The market
    /// CSV itself works when it carries a `bond_price` column.
    #[serde(default)]
    pub price_csv: Option<PathBuf>,
    /// Purchase price in % of par; defaults to the quote on the first simulated day.
    #[serde(default)]
    pub purchase_price: Option<f64>,
}

/// One bond quote, in % of par.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondPrice {
    pub date: NaiveDate,
    pub price: f64,
}

impl BondPrice {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Bond valuation on one simulated day, alongside the combined portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondDay {
    pub date: NaiveDate,
    pub price: f64,
    pub market_value: f64,
    pub pnl: f64,
    /// Bond market value plus the sleeve's total value.
    pub combined_value: f64,
}

/// Bond position and combined-portfolio figures at the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondSummary {
    pub initial_investment: f64,
    pub purchase_date: NaiveDate,
    pub purchase_price: f64,
    pub nominal_owned: f64,
    pub final_price: f64,
    pub market_value: f64,
    pub pnl: f64,
    /// `pnl / initial_investment`.
    pub pnl_pct: f64,
    pub combined_value: f64,
    /// Bond P&L plus sleeve P&L.
    pub combined_pnl: f64,
    /// `combined_pnl / (initial_investment + initial_cash)`.
    pub combined_return: f64,
    /// Simple annualization of `combined_return`.
    pub combined_annualized_return: f64,
}

/// Daily bond valuations plus the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondLeg {
    pub summary: BondSummary,
    pub days: Vec<BondDay>,
}

/// Most recent quote on or before `date`. `prices` must be sorted by date.
fn price_as_of(prices: &[BondPrice], date: NaiveDate) -> Option<f64> {
    let idx = prices.partition_point(|p| p.date <= date);
    idx.checked_sub(1).map(|i| prices[i].price)
}

fn check_price(date: NaiveDate, price: f64) -> Result<f64, BondError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(BondError::InvalidPrice { date, price })
    }
}

/// Value the bond leg over the simulated days.
pub fn value_bond_leg(
    config: &BondConfig,
    prices: &[BondPrice],
    states: &[PortfolioState],
    sleeve: &SummaryStats,
) -> Result<BondLeg, BondError> {
    let investment = config.initial_investment;
    if !(investment.is_finite() && investment > 0.0) {
        return Err(BondError::InvalidInvestment(investment));
    }
    let first = states.first().ok_or(BondError::NoMarketDays)?;
    let purchase_date = first.date;
    let purchase_price = match config.purchase_price {
        Some(price) => price,
        None => price_as_of(prices, purchase_date)
            .ok_or(BondError::NoPurchasePrice { date: purchase_date })?,
    };
    let purchase_price = check_price(purchase_date, purchase_price)?;
    let nominal_owned = investment / (purchase_price / 100.0);

    let mut days = Vec::with_capacity(states.len());
    for state in states {
        let price = check_price(
            state.date,
            price_as_of(prices, state.date).unwrap_or(purchase_price),
        )?;
        let market_value = nominal_owned * price / 100.0;
        days.push(BondDay {
            date: state.date,
            price,
            market_value,
            pnl: market_value - investment,
            combined_value: market_value + state.total_value,
        });
    }

    let last = days.last().copied().ok_or(BondError::NoMarketDays)?;
    let combined_pnl = last.pnl + sleeve.total_pnl;
    let combined_base = investment + sleeve.initial_cash;
    let combined_return = combined_pnl / combined_base;

    tracing::info!(
        nominal = nominal_owned,
        purchase_price,
        final_price = last.price,
        bond_pnl = last.pnl,
        "valued bond leg"
    );

    Ok(BondLeg {
        summary: BondSummary {
            initial_investment: investment,
            purchase_date,
            purchase_price,
            nominal_owned,
            final_price: last.price,
            market_value: last.market_value,
            pnl: last.pnl,
            pnl_pct: last.pnl / investment,
            combined_value: last.combined_value,
            combined_pnl,
            combined_return,
            combined_annualized_return: crate::metrics::annualized_return(
                combined_return,
                sleeve.days_held,
            ),
        },
        days,
    })
}
