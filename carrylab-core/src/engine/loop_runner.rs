//! Day-by-day simulation loop: the heart of the engine.

use crate::domain::{CouponEvent, MarketDay};
use crate::error::SimulationError;
use crate::signals::SignalConfirmer;

use super::coupons::route_coupons;
use super::state::{SimulationConfig, SimulationResult, SimulationState};
use super::validate::validate_inputs;

/// Run a simulation over preloaded market and coupon series.
///
/// This is the main entry point for the engine. It:
/// 1. Validates the configuration and both input series
/// 2. Restricts the market series to the configured date range
/// 3. Routes coupon cash onto simulated days
/// 4. Steps through every day strictly in date order
/// 5. Returns the per-day states, rebalance log, and warnings
///
/// Any `PreconditionError` aborts the run immediately; recoverable edge
/// cases are collected in `SimulationResult::warnings`.
pub fn run_simulation(
    market: &[MarketDay],
    coupons: &[CouponEvent],
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    validate_inputs(market, coupons, config)?;
    let confirmer = SignalConfirmer::new(config.confirmation_window)?;

    // Dates are strictly increasing, so the range is a contiguous slice.
    let start = market.partition_point(|d| config.start_date.is_some_and(|s| d.date < s));
    let end = market.partition_point(|d| config.end_date.map_or(true, |e| d.date <= e));
    let days = &market[start..end.max(start)];

    let routing = route_coupons(days, coupons, config);
    let raw: Vec<f64> = days.iter().map(|d| d.trend_signal).collect();

    tracing::info!(
        days = days.len(),
        first = ?days.first().map(|d| d.date),
        last = ?days.last().map(|d| d.date),
        coupons = coupons.len(),
        window = confirmer.window(),
        initial_cash = config.initial_cash,
        "starting simulation"
    );

    let mut state = SimulationState::new(config.initial_cash, days.len());
    state.push_warnings(routing.warnings);

    for (day, &coupon) in days.iter().zip(&routing.per_day) {
        state.step(day, &raw, coupon, &confirmer, &config.allocation)?;
    }

    let result = state.finish();
    tracing::info!(
        final_value = result.final_value(),
        rebalances = result.rebalances.len(),
        warnings = result.warnings.len(),
        "simulation complete"
    );
    Ok(result)
}
