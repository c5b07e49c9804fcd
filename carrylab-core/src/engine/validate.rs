//! Input checks that run before the first simulated day.
//!
//! Gap filling and deduplication happen upstream. Anything that still
//! reaches the engine out of order or duplicated is rejected here, never
//! repaired.

use crate::domain::{CouponEvent, MarketDay};
use crate::error::{PreconditionError, SimulationError};

use super::state::SimulationConfig;

/// Every check `run_simulation` performs before the first day, in the same order.
pub fn validate_inputs(
    market: &[MarketDay],
    coupons: &[CouponEvent],
    config: &SimulationConfig,
) -> Result<(), SimulationError> {
    config.validate()?;
    validate_initial_cash(config.initial_cash)?;
    validate_market(market)?;
    validate_coupons(coupons)?;
    Ok(())
}

/// Market dates must be strictly increasing.
pub fn validate_market(days: &[MarketDay]) -> Result<(), PreconditionError> {
    for (index, pair) in days.windows(2).enumerate() {
        let (previous, current) = (pair[0].date, pair[1].date);
        if current == previous {
            return Err(PreconditionError::DuplicateDate {
                date: current,
                index: index + 1,
            });
        }
        if current < previous {
            return Err(PreconditionError::NonMonotonicDates {
                index: index + 1,
                previous,
                current,
            });
        }
    }
    Ok(())
}

/// Coupon amounts must be finite and non-negative. Order does not matter.
pub fn validate_coupons(coupons: &[CouponEvent]) -> Result<(), PreconditionError> {
    match coupons.iter().find(|c| !c.is_valid()) {
        Some(bad) => Err(PreconditionError::InvalidCoupon {
            date: bad.date,
            amount: bad.amount,
        }),
        None => Ok(()),
    }
}

/// Starting cash must be finite and non-negative.
pub fn validate_initial_cash(cash: f64) -> Result<(), PreconditionError> {
    if cash.is_finite() && cash >= 0.0 {
        Ok(())
    } else {
        Err(PreconditionError::InvalidInitialCash(cash))
    }
}
