//! Market days and coupon events: the two input series of a simulation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of the volatile asset: close price plus the raw trend signal.
///
/// The trend signal is one of a small set of values (e.g. -1.0, -0.5, 0.0,
/// 0.5, 1.0) produced upstream. Series of market days are expected in strictly
/// increasing date order with no duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketDay {
    pub date: NaiveDate,
    pub price: f64,
    pub trend_signal: f64,
}

impl MarketDay {
    pub fn new(date: NaiveDate, price: f64, trend_signal: f64) -> Self {
        Self {
            date,
            price,
            trend_signal,
        }
    }

    /// Whether the price can be used to size a rebalance (finite and > 0).
    pub fn is_priced(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// A scheduled cash inflow from the fixed-income leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouponEvent {
    pub date: NaiveDate,
    pub amount: f64,
}

impl CouponEvent {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self { date, amount }
    }

    /// Amount is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.amount.is_finite() && self.amount >= 0.0
    }
}
