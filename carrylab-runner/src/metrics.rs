//! Summary statistics: pure functions over the per-day state table.
//!
//! Coupons are external contributions, not performance. Every metric that
//! looks at day-to-day changes therefore strips the coupon received that day:
//! `day P&L = total_value[t] - total_value[t-1] - coupon[t]`, with the
//! initial cash standing in for `total_value[-1]`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use carrylab_core::{PortfolioState, SimulationResult};

/// Relative declines smaller than this are float noise from the
/// `value / price * price` round trip, not drawdowns.
pub const DRAWDOWN_EPSILON: f64 = 1e-12;

/// P&L of a single day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayPnl {
    pub date: NaiveDate,
    pub pnl: f64,
}

/// Aggregate statistics for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Calendar days between the first and last simulated day.
    pub days_held: i64,
    pub trading_days: usize,
    pub initial_cash: f64,
    pub total_coupons: f64,
    /// Days on which coupon cash arrived (same-day coupons count once).
    pub coupon_payments: usize,
    /// `total_coupons / coupon_payments`, 0.0 without payments.
    pub average_coupon: f64,
    /// Initial cash plus every coupon actually applied.
    pub contributed_capital: f64,
    pub final_value: f64,
    pub final_cash: f64,
    pub final_asset_units: f64,
    pub final_allocation: Option<f64>,
    /// Contributed capital per asset unit held at the end; `None` with no units.
    pub average_buy_price: Option<f64>,
    pub total_pnl: f64,
    /// `total_pnl / contributed_capital`.
    pub total_return: f64,
    /// `total_return / (days_held / 365)`, not compounded.
    pub annualized_return: f64,
    /// Compounded coupon-neutral return.
    pub time_weighted_return: f64,
    pub best_day: Option<DayPnl>,
    pub worst_day: Option<DayPnl>,
    /// Largest peak-to-trough decline of the coupon-neutral growth index,
    /// as a negative fraction.
    pub max_drawdown: f64,
    pub rebalance_count: usize,
    pub warning_count: usize,
}

impl SummaryStats {
    pub fn compute(result: &SimulationResult, initial_cash: f64) -> Self {
        let states = &result.states;
        let first_date = states.first().map(|s| s.date);
        let last_date = states.last().map(|s| s.date);
        let days_held = match (first_date, last_date) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        };

        let total_coupons = result.total_coupons();
        let coupon_payments = states.iter().filter(|s| s.coupon_received > 0.0).count();
        let average_coupon = if coupon_payments > 0 {
            total_coupons / coupon_payments as f64
        } else {
            0.0
        };
        let contributed_capital = initial_cash + total_coupons;
        let final_state = result.final_state();
        let final_value = final_state.map_or(initial_cash, |s| s.total_value);
        let total_pnl = final_value - contributed_capital;
        let total_return = if contributed_capital > 0.0 {
            total_pnl / contributed_capital
        } else {
            0.0
        };

        let final_asset_units = final_state.map_or(0.0, |s| s.asset_units);
        let average_buy_price =
            (final_asset_units > 0.0).then(|| contributed_capital / final_asset_units);

        let pnl = daily_pnl(states, initial_cash);
        let index = growth_index(states, initial_cash);

        Self {
            first_date,
            last_date,
            days_held,
            trading_days: states.len(),
            initial_cash,
            total_coupons,
            coupon_payments,
            average_coupon,
            contributed_capital,
            final_value,
            final_cash: final_state.map_or(initial_cash, |s| s.cash),
            final_asset_units,
            final_allocation: final_state.and_then(|s| s.allocation),
            average_buy_price,
            total_pnl,
            total_return,
            annualized_return: annualized_return(total_return, days_held),
            time_weighted_return: index.last().map_or(0.0, |v| v - 1.0),
            best_day: best_day(&pnl),
            worst_day: worst_day(&pnl),
            max_drawdown: max_drawdown(&index),
            rebalance_count: result.rebalances.len(),
            warning_count: result.warnings.len(),
        }
    }
}

/// Coupon-adjusted P&L for every simulated day.
pub fn daily_pnl(states: &[PortfolioState], initial_cash: f64) -> Vec<DayPnl> {
    let mut previous = initial_cash;
    states
        .iter()
        .map(|s| {
            let pnl = s.total_value - previous - s.coupon_received;
            previous = s.total_value;
            DayPnl { date: s.date, pnl }
        })
        .collect()
}

/// Coupon-neutral growth index starting at 1.0.
///
/// Each day compounds by `1 + pnl / previous_value`. Days with no prior value
/// (empty portfolio before the first coupon) leave the index unchanged.
pub fn growth_index(states: &[PortfolioState], initial_cash: f64) -> Vec<f64> {
    let mut previous = initial_cash;
    let mut level = 1.0;
    states
        .iter()
        .map(|s| {
            if previous > 0.0 {
                level *= 1.0 + (s.total_value - previous - s.coupon_received) / previous;
            }
            previous = s.total_value;
            level
        })
        .collect()
}

/// Simple annualization: `total_return / (days_held / 365)`.
///
/// Returns 0.0 when fewer than one calendar day elapsed.
pub fn annualized_return(total_return: f64, days_held: i64) -> f64 {
    if days_held <= 0 {
        return 0.0;
    }
    total_return / (days_held as f64 / 365.0)
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if the curve never falls more than `DRAWDOWN_EPSILON` below a
/// previous peak.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    let Some(&first) = curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in curve {
        peak = peak.max(value);
        if peak > 0.0 {
            let dd = (value - peak) / peak;
            if dd < -DRAWDOWN_EPSILON {
                max_dd = max_dd.min(dd);
            }
        }
    }
    max_dd
}

/// Highest-P&L day; ties keep the earliest date.
pub fn best_day(pnl: &[DayPnl]) -> Option<DayPnl> {
    pnl.iter()
        .copied()
        .fold(None, |best: Option<DayPnl>, d| match best {
            Some(b) if b.pnl >= d.pnl => Some(b),
            _ => Some(d),
        })
}

/// Lowest-P&L day; ties keep the earliest date.
pub fn worst_day(pnl: &[DayPnl]) -> Option<DayPnl> {
    pnl.iter()
        .copied()
        .fold(None, |worst: Option<DayPnl>, d| match worst {
            Some(w) if w.pnl <= d.pnl => Some(w),
            _ => Some(d),
        })
}
