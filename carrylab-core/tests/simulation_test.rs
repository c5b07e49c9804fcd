//! Integration tests for the simulation loop.
//!
//! Tests:
//! 1. Trend scenario: confirmation, first buy, rebalance, suppressed spike
//! 2. Coupon scenarios: exact accrual, dropped coupon, carried-forward coupon
//! 3. Ordering: coupon cash participates in the same day's rebalance
//! 4. Output shape: one state per input day, same dates, same order

use carrylab_core::engine::AllocationState;
use carrylab_core::{
    run_simulation, AllocationMap, CouponEvent, CouponPolicy, MarketDay, SimulationConfig,
    SimulationWarning,
};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days starting at `start`, one per signal.
fn market(start: NaiveDate, prices: &[f64], signals: &[f64]) -> Vec<MarketDay> {
    assert_eq!(prices.len(), signals.len());
    prices
        .iter()
        .zip(signals)
        .enumerate()
        .map(|(i, (&p, &s))| MarketDay::new(start + chrono::Duration::days(i as i64), p, s))
        .collect()
}

fn three_level_table() -> AllocationMap {
    AllocationMap::from_pairs(&[(1.0, 1.0), (0.0, 0.5), (-1.0, 0.0)]).unwrap()
}

// ──────────────────────────────────────────────
// Trend scenario
// ──────────────────────────────────────────────

#[test]
fn trend_scenario_confirms_buys_and_rebalances() {
    let signals = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, -1.0];
    let days = market(date(2024, 1, 1), &[100.0; 7], &signals);
    let config = SimulationConfig::new(1000.0)
        .with_window(3)
        .with_allocation(three_level_table());

    let result = run_simulation(&days, &[], &config).unwrap();
    let s = &result.states;

    // Days 0-1: nothing confirmed, all cash
    for state in &s[..2] {
        assert_eq!(state.confirmed_signal, None);
        assert_eq!(state.allocation, None);
        assert_eq!(state.cash, 1000.0);
        assert_eq!(state.asset_units, 0.0);
    }

    // Day 2: first run of three 1.0 values → fully invested
    assert_eq!(s[2].confirmed_signal, Some(1.0));
    assert_eq!(s[2].allocation, Some(1.0));
    assert_eq!(s[2].asset_units, 10.0);
    assert_eq!(s[2].cash, 0.0);

    // Days 3-4: raw 0.0 not yet confirmed
    assert_eq!(s[3].allocation, Some(1.0));
    assert_eq!(s[4].allocation, Some(1.0));
    assert_eq!(s[4].asset_units, 10.0);

    // Day 5: three 0.0 values → half invested
    assert_eq!(s[5].confirmed_signal, Some(0.0));
    assert_eq!(s[5].allocation, Some(0.5));
    assert_eq!(s[5].cash, 500.0);
    assert_eq!(s[5].asset_units, 5.0);

    // Day 6: single -1.0 does not confirm
    assert_eq!(s[6].confirmed_signal, Some(0.0));
    assert_eq!(s[6].allocation, Some(0.5));
    assert_eq!(s[6].cash, 500.0);
    assert_eq!(s[6].asset_units, 5.0);

    assert_eq!(result.rebalances.len(), 2);
    assert!(result.rebalances[0].is_initial());
    assert_eq!(result.rebalances[1].from_allocation, Some(1.0));
    assert!(result.warnings.is_empty());
}

#[test]
fn total_value_is_marked_to_market_daily() {
    let days = market(
        date(2024, 1, 1),
        &[100.0, 100.0, 100.0, 120.0, 90.0],
        &[1.0; 5],
    );
    let result = run_simulation(&days, &[], &SimulationConfig::new(1000.0)).unwrap();
    assert_eq!(result.states[3].total_value, 1200.0);
    assert_eq!(result.states[4].total_value, 900.0);
    assert_eq!(result.final_value(), 900.0);
}

#[test]
fn no_liquidation_at_end() {
    let days = market(date(2024, 1, 1), &[100.0; 4], &[0.5; 4]);
    let result = run_simulation(&days, &[], &SimulationConfig::new(1000.0)).unwrap();
    let last = result.final_state().unwrap();
    assert_eq!(last.allocation, Some(0.75));
    assert!((last.asset_units - 7.5).abs() < 1e-12);
}

#[test]
fn unmapped_confirmation_before_first_buy_stays_uninitialized() {
    let days = market(date(2024, 1, 1), &[100.0; 6], &[0.5, 0.5, 0.5, 1.0, 1.0, 1.0]);
    let config = SimulationConfig::new(1000.0).with_allocation(three_level_table());
    let result = run_simulation(&days, &[], &config).unwrap();

    assert_eq!(result.states[2].confirmed_signal, Some(0.5));
    assert_eq!(result.states[2].allocation, None);
    assert_eq!(result.states[4].allocation, None);
    assert_eq!(result.states[5].allocation, Some(1.0));
    // Days 2, 3, 4 carried the unmapped 0.5 confirmation
    assert_eq!(
        result.unmapped_signal_dates(),
        vec![date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5)]
    );
}

#[test]
fn unmapped_confirmation_while_active_holds_allocation() {
    let days = market(
        date(2024, 1, 1),
        &[100.0; 6],
        &[1.0, 1.0, 1.0, 0.5, 0.5, 0.5],
    );
    let config = SimulationConfig::new(1000.0).with_allocation(three_level_table());
    let result = run_simulation(&days, &[], &config).unwrap();

    assert_eq!(result.states[5].confirmed_signal, Some(0.5));
    assert_eq!(result.states[5].allocation, Some(1.0));
    assert_eq!(result.states[5].asset_units, 10.0);
    assert_eq!(result.unmapped_signal_dates(), vec![date(2024, 1, 6)]);
    assert_eq!(result.rebalances.len(), 1);
}

// ──────────────────────────────────────────────
// Coupon scenarios
// ──────────────────────────────────────────────

#[test]
fn coupon_at_zero_allocation_only_adds_cash() {
    let start = date(2021, 7, 12);
    let days = market(start, &[60_000.0; 6], &[-1.0; 6]);
    let coupon_day = date(2021, 7, 15);
    let coupons = [CouponEvent::new(coupon_day, 1990.29)];

    let result = run_simulation(&days, &coupons, &SimulationConfig::new(0.0)).unwrap();

    let idx = result
        .states
        .iter()
        .position(|s| s.date == coupon_day)
        .unwrap();
    let before = &result.states[idx - 1];
    let on = &result.states[idx];

    assert_eq!(before.allocation, Some(0.0));
    assert_eq!(on.allocation, Some(0.0));
    assert_eq!(on.coupon_received, 1990.29);
    assert_eq!(on.cash, before.cash + 1990.29);
    assert_eq!(on.asset_units, before.asset_units);
    assert_eq!(on.asset_units, 0.0);
    assert!(result.warnings.is_empty());
}

#[test]
fn coupon_on_missing_date_is_dropped_and_reported() {
    // Market skips 2022-01-15 (a Saturday)
    let mut days = market(date(2022, 1, 12), &[40_000.0; 3], &[-1.0; 3]);
    days.extend(market(date(2022, 1, 17), &[40_000.0; 3], &[-1.0; 3]));
    let coupons = [CouponEvent::new(date(2022, 1, 15), 1990.29)];

    let result = run_simulation(&days, &coupons, &SimulationConfig::new(100.0)).unwrap();

    assert_eq!(result.day_count(), 6);
    assert!(result.states.iter().all(|s| s.coupon_received == 0.0));
    assert!(result.states.iter().all(|s| s.cash == 100.0));
    assert_eq!(result.missing_coupon_dates(), vec![date(2022, 1, 15)]);
    assert_eq!(
        result.warnings,
        vec![SimulationWarning::MissingCouponTarget {
            date: date(2022, 1, 15),
            amount: 1990.29
        }]
    );
}

#[test]
fn carry_forward_policy_applies_on_next_trading_day() {
    let mut days = market(date(2022, 1, 12), &[40_000.0; 3], &[-1.0; 3]);
    days.extend(market(date(2022, 1, 17), &[40_000.0; 3], &[-1.0; 3]));
    let coupons = [CouponEvent::new(date(2022, 1, 15), 1990.29)];
    let config = SimulationConfig::new(100.0).with_coupon_policy(CouponPolicy::CarryForward);

    let result = run_simulation(&days, &coupons, &config).unwrap();

    let monday = result
        .states
        .iter()
        .find(|s| s.date == date(2022, 1, 17))
        .unwrap();
    assert_eq!(monday.coupon_received, 1990.29);
    assert_eq!(monday.cash, 100.0 + 1990.29);
    assert!(result.missing_coupon_dates().is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].kind(), "coupon_carried_forward");
}

#[test]
fn coupon_cash_joins_same_day_rebalance() {
    // Confirmation of 0.0 lands on the same day as the coupon.
    let days = market(date(2024, 1, 1), &[100.0; 6], &[1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    let coupons = [CouponEvent::new(date(2024, 1, 6), 200.0)];
    let config = SimulationConfig::new(1000.0).with_allocation(three_level_table());

    let result = run_simulation(&days, &coupons, &config).unwrap();
    let last = result.final_state().unwrap();

    // 10 units * 100 + 200 coupon = 1200, split 50/50
    assert_eq!(last.total_value, 1200.0);
    assert_eq!(last.cash, 600.0);
    assert_eq!(last.asset_units, 6.0);
    let event = result.rebalances.last().unwrap();
    assert_eq!(event.before.cash, 200.0);
    assert_eq!(event.value_before, 1200.0);
}

#[test]
fn coupons_before_first_buy_fund_the_first_buy() {
    let days = market(date(2024, 1, 1), &[50.0; 3], &[1.0; 3]);
    let coupons = [
        CouponEvent::new(date(2024, 1, 1), 100.0),
        CouponEvent::new(date(2024, 1, 2), 100.0),
    ];
    let result = run_simulation(&days, &coupons, &SimulationConfig::new(0.0)).unwrap();
    let last = result.final_state().unwrap();
    assert_eq!(last.asset_units, 4.0);
    assert_eq!(last.cash, 0.0);
    assert_eq!(result.total_coupons(), 200.0);
}

// ──────────────────────────────────────────────
// Output shape
// ──────────────────────────────────────────────

#[test]
fn recorded_dates_match_input_dates() {
    let mut days = market(date(2023, 12, 28), &[10.0; 4], &[1.0, -1.0, 1.0, 0.5]);
    days.extend(market(date(2024, 1, 8), &[11.0; 3], &[0.5; 3]));

    let result = run_simulation(&days, &[], &SimulationConfig::new(10.0)).unwrap();

    let recorded: Vec<NaiveDate> = result.states.iter().map(|s| s.date).collect();
    let input: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
    assert_eq!(recorded, input);
    assert!(recorded.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn allocation_state_tracks_first_buy() {
    assert_eq!(AllocationState::Uninitialized.current(), None);
    assert!(AllocationState::Active(0.0).is_active());
    assert_eq!(AllocationState::Active(0.25).current(), Some(0.25));
}
