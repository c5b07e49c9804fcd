//! Recoverable edge cases surfaced by the simulation.
//!
//! The loop keeps going when it hits one of these, but each occurrence is
//! recorded so callers can tell "nothing happened" apart from "an edge case
//! was absorbed".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationWarning {
    /// The confirmed signal has no row in the allocation table; the current
    /// allocation was held.
    UnmappedSignal { date: NaiveDate, signal: f64 },
    /// A coupon could not be matched to a market day and its cash was dropped.
    MissingCouponTarget { date: NaiveDate, amount: f64 },
    /// A coupon dated on a non-trading day was applied on the next market day.
    CouponCarriedForward {
        coupon_date: NaiveDate,
        applied_on: NaiveDate,
        amount: f64,
    },
}

impl SimulationWarning {
    /// Date the warning is attributed to (the coupon's own date for coupon warnings).
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::UnmappedSignal { date, .. } => *date,
            Self::MissingCouponTarget { date, .. } => *date,
            Self::CouponCarriedForward { coupon_date, .. } => *coupon_date,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnmappedSignal { .. } => "unmapped_signal",
            Self::MissingCouponTarget { .. } => "missing_coupon_target",
            Self::CouponCarriedForward { .. } => "coupon_carried_forward",
        }
    }
}

impl fmt::Display for SimulationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedSignal { date, signal } => {
                write!(f, "{date}: confirmed signal {signal} is unmapped, allocation held")
            }
            Self::MissingCouponTarget { date, amount } => {
                write!(f, "{date}: coupon of {amount:.2} has no market day, dropped")
            }
            Self::CouponCarriedForward {
                coupon_date,
                applied_on,
                amount,
            } => write!(
                f,
                "{coupon_date}: coupon of {amount:.2} carried forward to {applied_on}"
            ),
        }
    }
}
