//! CarryLab Core: coupon-reinvestment trend strategy engine.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (market days, coupon events, holdings, per-day portfolio state)
//! - Signal confirmer: a raw trend value only counts after a full window of repeats
//! - Allocation mapper: confirmed trend value → target asset fraction
//! - Rebalancer: value-neutral cash/asset split at mark-to-market
//! - Day-by-day simulation loop with coupon accrual and warning capture
//! - Run fingerprinting (config and dataset hashes)

pub mod allocation;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod signals;

pub use allocation::{AllocationMap, AllocationRule};
pub use domain::{CouponEvent, Holdings, MarketDay, PortfolioState};
pub use engine::{
    run_simulation, validate_inputs, CouponPolicy, RebalanceEvent, SimulationConfig,
    SimulationResult, SimulationWarning,
};
pub use error::{ConfigError, PreconditionError, SimulationError};
pub use signals::SignalConfirmer;
