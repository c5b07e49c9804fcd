//! Rebalancer: value-neutral redistribution between cash and the asset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Holdings;
use crate::error::PreconditionError;

/// Audit record of one rebalance, including the initial buy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebalanceEvent {
    pub date: NaiveDate,
    pub price: f64,
    /// Allocation before the rebalance; `None` marks the first buy.
    pub from_allocation: Option<f64>,
    pub to_allocation: f64,
    pub before: Holdings,
    pub after: Holdings,
    pub value_before: f64,
    pub value_after: f64,
}

impl RebalanceEvent {
    pub fn is_initial(&self) -> bool {
        self.from_allocation.is_none()
    }

    /// Signed change in asset units (positive = bought).
    pub fn units_traded(&self) -> f64 {
        self.after.asset_units - self.before.asset_units
    }

    /// Cash value moved into (positive) or out of (negative) the asset.
    pub fn notional(&self) -> f64 {
        self.units_traded() * self.price
    }
}

/// Move `holdings` to `target` fraction of total value at `price`.
///
/// Returns `Ok(None)` without touching anything when `target` equals the
/// `current` allocation. Otherwise the new split is:
/// - `target_asset_value = total * target`
/// - `asset_units = target_asset_value / price`
/// - `cash = total - target_asset_value`
///
/// A price that is not finite and strictly positive cannot size the trade
/// and aborts the run.
pub fn rebalance(
    date: NaiveDate,
    holdings: Holdings,
    price: f64,
    current: Option<f64>,
    target: f64,
) -> Result<Option<RebalanceEvent>, PreconditionError> {
    if current == Some(target) {
        return Ok(None);
    }
    if !(price.is_finite() && price > 0.0) {
        return Err(PreconditionError::NonPositivePrice { date, price });
    }

    let value_before = holdings.total_value(price);
    let target_asset_value = value_before * target;
    let after = Holdings {
        cash: value_before - target_asset_value,
        asset_units: target_asset_value / price,
    };

    Ok(Some(RebalanceEvent {
        date,
        price,
        from_allocation: current,
        to_allocation: target,
        before: holdings,
        after,
        value_before,
        value_after: after.total_value(price),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    #[test]
    fn first_buy_from_all_cash() {
        let event = rebalance(date(), Holdings::all_cash(1000.0), 100.0, None, 1.0)
            .unwrap()
            .unwrap();
        assert!(event.is_initial());
        assert_eq!(event.after.asset_units, 10.0);
        assert_eq!(event.after.cash, 0.0);
        assert_eq!(event.value_after, 1000.0);
    }

    #[test]
    fn partial_derisk_is_value_neutral() {
        let holdings = Holdings {
            cash: 0.0,
            asset_units: 10.0,
        };
        let event = rebalance(date(), holdings, 100.0, Some(1.0), 0.5)
            .unwrap()
            .unwrap();
        assert_eq!(event.after.cash, 500.0);
        assert_eq!(event.after.asset_units, 5.0);
        assert_eq!(event.value_before, event.value_after);
        assert_eq!(event.units_traded(), -5.0);
        assert_eq!(event.notional(), -500.0);
    }

    #[test]
    fn same_target_is_a_no_op() {
        let holdings = Holdings {
            cash: 123.456,
            asset_units: 0.789,
        };
        assert_eq!(
            rebalance(date(), holdings, 60_000.0, Some(0.25), 0.25),
            Ok(None)
        );
    }

    #[test]
    fn same_target_skips_price_check() {
        let holdings = Holdings::all_cash(10.0);
        assert_eq!(rebalance(date(), holdings, 0.0, Some(0.0), 0.0), Ok(None));
    }

    #[test]
    fn non_positive_price_is_fatal() {
        let holdings = Holdings::all_cash(1000.0);
        for price in [0.0, -1.0, f64::NAN] {
            let err = rebalance(date(), holdings, price, None, 1.0).unwrap_err();
            assert!(matches!(err, PreconditionError::NonPositivePrice { .. }));
        }
    }

    #[test]
    fn rebalance_to_zero_sells_everything() {
        let holdings = Holdings {
            cash: 100.0,
            asset_units: 0.05,
        };
        let event = rebalance(date(), holdings, 60_000.0, Some(0.75), 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(event.after.asset_units, 0.0);
        assert_eq!(event.after.cash, 3100.0);
    }
}
