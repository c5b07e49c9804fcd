//! Holdings and the per-day portfolio snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::market::MarketDay;

/// Cash plus units of the volatile asset.
///
/// The accounting identity `total_value == cash + asset_units * price` holds
/// by construction: value is always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    pub cash: f64,
    pub asset_units: f64,
}

impl Holdings {
    pub fn all_cash(cash: f64) -> Self {
        Self {
            cash,
            asset_units: 0.0,
        }
    }

    pub fn asset_value(&self, price: f64) -> f64 {
        self.asset_units * price
    }

    pub fn total_value(&self, price: f64) -> f64 {
        self.cash + self.asset_value(price)
    }

    /// Fraction of total value held in the asset, `None` when the portfolio is empty.
    pub fn asset_fraction(&self, price: f64) -> Option<f64> {
        let total = self.total_value(price);
        if total == 0.0 {
            None
        } else {
            Some(self.asset_value(price) / total)
        }
    }

    /// Add coupon cash. Never touches asset units.
    pub fn accrue(&mut self, amount: f64) {
        self.cash += amount;
    }
}

/// Snapshot of the portfolio at the end of one simulated day.
///
/// Immutable once recorded; the ordered sequence of these is the simulation's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub date: NaiveDate,
    pub price: f64,
    pub trend_signal: f64,
    /// Confirmed trend value after today's window check (`None` before the first confirmation).
    pub confirmed_signal: Option<f64>,
    pub cash: f64,
    pub asset_units: f64,
    pub asset_value: f64,
    pub total_value: f64,
    /// Allocation in force at the end of the day (`None` before the first buy).
    pub allocation: Option<f64>,
    pub coupon_received: f64,
}

impl PortfolioState {
    pub fn record(
        day: &MarketDay,
        confirmed_signal: Option<f64>,
        holdings: Holdings,
        allocation: Option<f64>,
        coupon_received: f64,
    ) -> Self {
        let asset_value = holdings.asset_value(day.price);
        Self {
            date: day.date,
            price: day.price,
            trend_signal: day.trend_signal,
            confirmed_signal,
            cash: holdings.cash,
            asset_units: holdings.asset_units,
            asset_value,
            total_value: holdings.cash + asset_value,
            allocation,
            coupon_received,
        }
    }

    pub fn holdings(&self) -> Holdings {
        Holdings {
            cash: self.cash,
            asset_units: self.asset_units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_value_is_cash_plus_asset() {
        let h = Holdings {
            cash: 500.0,
            asset_units: 5.0,
        };
        assert_eq!(h.asset_value(100.0), 500.0);
        assert_eq!(h.total_value(100.0), 1000.0);
        assert_eq!(h.asset_fraction(100.0), Some(0.5));
    }

    #[test]
    fn empty_portfolio_has_no_fraction() {
        assert_eq!(Holdings::all_cash(0.0).asset_fraction(100.0), None);
    }

    #[test]
    fn tiny_portfolio_still_has_a_fraction() {
        let h = Holdings {
            cash: 1e-18,
            asset_units: 1e-20,
        };
        let fraction = h.asset_fraction(100.0).unwrap();
        assert!((fraction - 0.5).abs() < 1e-12);
    }

    #[test]
    fn accrue_only_touches_cash() {
        let mut h = Holdings {
            cash: 10.0,
            asset_units: 0.25,
        };
        h.accrue(1990.29);
        assert_eq!(h.cash, 10.0 + 1990.29);
        assert_eq!(h.asset_units, 0.25);
    }

    #[test]
    fn record_derives_values_from_holdings() {
        let day = MarketDay::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 60_000.0, 0.5);
        let holdings = Holdings {
            cash: 250.0,
            asset_units: 0.0125,
        };
        let state = PortfolioState::record(&day, Some(0.5), holdings, Some(0.75), 0.0);
        assert_eq!(state.asset_value, 750.0);
        assert_eq!(state.total_value, 1000.0);
        assert_eq!(state.holdings(), holdings);
    }
}
