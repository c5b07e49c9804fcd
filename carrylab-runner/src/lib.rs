//! CarryLab Runner: input loading, run orchestration, metrics, and export.
//!
//! This crate builds on `carrylab-core` to provide:
//! - TOML run configuration
//! - CSV loading with column aliases, sorting, and forward-fill
//! - Fixed-interval coupon schedule generation
//! - Single-run orchestration with config and dataset fingerprints
//! - Summary statistics (coupon-adjusted P&L, drawdown, simple annualization)
//! - Bond leg valuation and combined bond + sleeve figures
//! - CSV, JSON, and Markdown artifacts

pub mod bond;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod schedule;

pub use bond::{BondConfig, BondDay, BondError, BondLeg, BondPrice, BondSummary};
pub use config::{CarryConfig, ConfigFileError, DataSection, OutputSection, SimulationSection};
pub use data_loader::{load_bond_csv, load_coupon_csv, load_market_csv, LoadError, LoadedMarket};
pub use metrics::{DayPnl, SummaryStats};
pub use runner::{
    load_bond_prices, load_inputs, run_backtest, run_from_config, BacktestResult, RunError, RunInputs,
    SCHEMA_VERSION,
};
pub use schedule::{CouponSchedule, ScheduleError};
