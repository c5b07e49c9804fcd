//! Coupon schedules: generate fixed-interval coupon series.
//!
//! A bond paying a fixed annual rate on a nominal amount produces equal
//! coupons every `interval_months` months. The amount is either given
//! directly or derived as `nominal * annual_rate * interval_months / 12`.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use carrylab_core::CouponEvent;

/// Errors from schedule generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("coupon interval must be at least one month")]
    ZeroInterval,

    #[error("coupon schedule needs either `amount` or both `nominal` and `annual_rate`")]
    MissingAmount,

    #[error("coupon schedule sets `amount` together with `nominal`/`annual_rate`")]
    AmbiguousAmount,

    #[error("coupon amount {0} is not finite and non-negative")]
    InvalidAmount(f64),

    #[error("coupon #{index} falls outside the supported date range")]
    DateOverflow { index: u32 },
}

fn default_interval_months() -> u32 {
    6
}

/// Fixed-interval coupon schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponSchedule {
    /// Payment date of the first coupon.
    pub first_date: NaiveDate,
    /// Months between payments (6 = semiannual).
    #[serde(default = "default_interval_months")]
    pub interval_months: u32,
    /// Number of coupons to generate.
    pub count: u32,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub nominal: Option<f64>,
    #[serde(default)]
    pub annual_rate: Option<f64>,
}

impl CouponSchedule {
    /// Schedule with a fixed cash amount per coupon.
    pub fn fixed(first_date: NaiveDate, interval_months: u32, count: u32, amount: f64) -> Self {
        Self {
            first_date,
            interval_months,
            count,
            amount: Some(amount),
            nominal: None,
            annual_rate: None,
        }
    }

    /// Schedule derived from a bond's nominal and annual coupon rate.
    pub fn from_bond(
        first_date: NaiveDate,
        interval_months: u32,
        count: u32,
        nominal: f64,
        annual_rate: f64,
    ) -> Self {
        Self {
            first_date,
            interval_months,
            count,
            amount: None,
            nominal: Some(nominal),
            annual_rate: Some(annual_rate),
        }
    }

    /// Cash paid per coupon.
    pub fn coupon_amount(&self) -> Result<f64, ScheduleError> {
        if self.interval_months == 0 {
            return Err(ScheduleError::ZeroInterval);
        }
        let amount = match (self.amount, self.nominal, self.annual_rate) {
            (Some(amount), None, None) => amount,
            (Some(_), _, _) => return Err(ScheduleError::AmbiguousAmount),
            (None, Some(nominal), Some(rate)) => {
                nominal * rate * f64::from(self.interval_months) / 12.0
            }
            _ => return Err(ScheduleError::MissingAmount),
        };
        if !(amount.is_finite() && amount >= 0.0) {
            return Err(ScheduleError::InvalidAmount(amount));
        }
        Ok(amount)
    }

    /// All coupon events, in date order.
    ///
    /// Each date is computed from `first_date` directly, so a schedule starting
    /// on the 31st clamps to month end without drifting.
    pub fn generate(&self) -> Result<Vec<CouponEvent>, ScheduleError> {
        let amount = self.coupon_amount()?;
        (0..self.count)
            .map(|index| {
                let months = self
                    .interval_months
                    .checked_mul(index)
                    .ok_or(ScheduleError::DateOverflow { index })?;
                self.first_date
                    .checked_add_months(Months::new(months))
                    .map(|date| CouponEvent::new(date, amount))
                    .ok_or(ScheduleError::DateOverflow { index })
            })
            .collect()
    }
}
