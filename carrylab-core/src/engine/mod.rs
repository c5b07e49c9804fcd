//! Simulation engine: the day-by-day loop and its supporting pieces.
//!
//! Per day, in order:
//! 1. Coupon accrual: today's coupon cash is added before any rebalance
//! 2. Signal confirmation over the window ending today
//! 3. Target derivation through the allocation table
//! 4. First buy when no allocation is active yet and a target exists
//! 5. Rebalance when the target differs from the active allocation
//! 6. Record the day's `PortfolioState`

pub mod coupons;
pub mod loop_runner;
pub mod rebalance;
pub mod state;
pub mod validate;
pub mod warning;

pub use coupons::{route_coupons, CouponRouting};
pub use loop_runner::run_simulation;
pub use rebalance::{rebalance, RebalanceEvent};
pub use state::{
    AllocationState, CouponPolicy, SimulationConfig, SimulationResult, SimulationState,
};
pub use validate::{validate_coupons, validate_initial_cash, validate_inputs, validate_market};
pub use warning::SimulationWarning;
