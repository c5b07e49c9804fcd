//! Error types shared across the engine.
//!
//! Two families:
//! - `PreconditionError`: the input violates an assumption the simulation
//!   cannot repair. Fatal; the run aborts.
//! - `ConfigError`: the simulation parameters themselves are invalid.

use chrono::NaiveDate;
use thiserror::Error;

/// Fatal input violations detected before or during the simulation loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("price {price} on {date} is not positive but a rebalance is required")]
    NonPositivePrice { date: NaiveDate, price: f64 },

    #[error("duplicate market date {date} at index {index}")]
    DuplicateDate { date: NaiveDate, index: usize },

    #[error("market dates out of order at index {index}: {current} follows {previous}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("coupon on {date} has invalid amount {amount} (must be finite and >= 0)")]
    InvalidCoupon { date: NaiveDate, amount: f64 },

    #[error("initial cash must be finite and >= 0, got {0}")]
    InvalidInitialCash(f64),
}

/// Invalid simulation parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("confirmation window must be at least 1")]
    ZeroWindow,

    #[error("allocation table is empty")]
    EmptyAllocationTable,

    #[error("allocation signal {0} is not a finite number")]
    NonFiniteSignal(f64),

    #[error("allocation signal {0} is mapped more than once")]
    DuplicateSignal(f64),

    #[error("allocation fraction {fraction} for signal {signal} is outside [0, 1]")]
    FractionOutOfRange { signal: f64, fraction: f64 },

    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}

/// Anything that stops a simulation from producing a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("precondition violated: {0}")]
    Precondition(#[from] PreconditionError),
}
