//! Backtest runner: wires together input loading, the simulation, and metrics.
//!
//! Two entry points:
//! - `run_from_config()`: loads CSVs and/or generates coupons, then runs. Used by the CLI.
//! - `run_backtest()`: takes pre-loaded series. Used by tests and embedding callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use carrylab_core::domain::{ConfigHash, DatasetHash};
use carrylab_core::fingerprint::{config_hash, dataset_hash};
use carrylab_core::{run_simulation, CouponEvent, MarketDay, SimulationConfig, SimulationError, SimulationResult};

use crate::bond::{value_bond_leg, BondConfig, BondError, BondLeg, BondPrice};
use crate::config::{CarryConfig, ConfigFileError, DataSection};
use crate::data_loader::{load_bond_csv, load_coupon_csv, load_market_csv, LoadError};
use crate::metrics::SummaryStats;
use crate::schedule::{CouponSchedule, ScheduleError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("coupon schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
    #[error("bond leg error: {0}")]
    Bond(#[from] BondError),
    #[error("no market data configured (set [data].market_csv or pass --market)")]
    NoMarketData,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: SimulationConfig,
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    /// Market cells filled from the previous row while loading.
    #[serde(default)]
    pub filled_cells: usize,
    pub summary: SummaryStats,
    pub simulation: SimulationResult,
    /// Present when the config has a `[bond]` section.
    #[serde(default)]
    pub bond: Option<BondLeg>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Market and coupon series ready for simulation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInputs {
    pub market: Vec<MarketDay>,
    pub coupons: Vec<CouponEvent>,
    pub filled_cells: usize,
}

/// Load the market CSV plus coupons from a CSV, a schedule, or both.
///
/// When both sources are given their events are merged; same-date coupons
/// are summed by the simulation.
pub fn load_inputs(
    data: &DataSection,
    schedule: Option<&CouponSchedule>,
) -> Result<RunInputs, RunError> {
    let market_path = data.market_csv.as_deref().ok_or(RunError::NoMarketData)?;
    let market = load_market_csv(market_path)?;

    let mut coupons = match data.coupon_csv.as_deref() {
        Some(path) => load_coupon_csv(path)?,
        None => Vec::new(),
    };
    if let Some(schedule) = schedule {
        let generated = schedule.generate()?;
        tracing::info!(coupons = generated.len(), first = %schedule.first_date, "generated coupon schedule");
        coupons.extend(generated);
        coupons.sort_by_key(|c| c.date);
    }

    Ok(RunInputs {
        market: market.days,
        coupons,
        filled_cells: market.filled_cells,
    })
}

/// Bond quotes from `[bond].price_csv`; empty when only a purchase price is given.
pub fn load_bond_prices(bond: &BondConfig) -> Result<Vec<BondPrice>, RunError> {
    match bond.price_csv.as_deref() {
        Some(path) => Ok(load_bond_csv(path)?),
        None => Ok(Vec::new()),
    }
}

/// Run a backtest from a parsed config file.
pub fn run_from_config(config: &CarryConfig) -> Result<BacktestResult, RunError> {
    let sim_config = config.to_simulation_config()?;
    let inputs = load_inputs(&config.data, config.coupon_schedule.as_ref())?;
    let mut result = run_backtest(&inputs.market, &inputs.coupons, &sim_config)?;
    result.filled_cells = inputs.filled_cells;
    if let Some(bond) = &config.bond {
        let prices = load_bond_prices(bond)?;
        result.bond = Some(value_bond_leg(
            bond,
            &prices,
            &result.simulation.states,
            &result.summary,
        )?);
    }
    Ok(result)
}

/// Run a backtest on pre-loaded series.
pub fn run_backtest(
    market: &[MarketDay],
    coupons: &[CouponEvent],
    config: &SimulationConfig,
) -> Result<BacktestResult, RunError> {
    let config_hash = config_hash(config);
    let dataset_hash = dataset_hash(market, coupons);
    tracing::info!(config = config_hash.short(), dataset = dataset_hash.short(), "running backtest");

    let simulation = run_simulation(market, coupons, config)?;
    let summary = SummaryStats::compute(&simulation, config.initial_cash);

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash,
        dataset_hash,
        filled_cells: 0,
        summary,
        simulation,
        bond: None,
    })
}
