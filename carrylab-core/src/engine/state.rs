//! Simulation configuration, mutable loop state, and run result types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationMap;
use crate::domain::{Holdings, MarketDay, PortfolioState};
use crate::error::{ConfigError, PreconditionError};
use crate::signals::{SignalConfirmer, DEFAULT_CONFIRMATION_WINDOW};

use super::rebalance::{rebalance, RebalanceEvent};
use super::warning::SimulationWarning;

/// What to do with a coupon whose date is not a market day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponPolicy {
    /// Drop the cash and record `MissingCouponTarget`.
    #[default]
    Drop,
    /// Apply the cash on the next market day and record `CouponCarriedForward`.
    CarryForward,
}

/// Parameters of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    pub confirmation_window: usize,
    pub allocation: AllocationMap,
    /// First simulated date (inclusive). `None` = from the first market day.
    pub start_date: Option<NaiveDate>,
    /// Last simulated date (inclusive). `None` = through the last market day.
    pub end_date: Option<NaiveDate>,
    pub coupon_policy: CouponPolicy,
}

impl SimulationConfig {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            confirmation_window: DEFAULT_CONFIRMATION_WINDOW,
            allocation: AllocationMap::default(),
            start_date: None,
            end_date: None,
            coupon_policy: CouponPolicy::Drop,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.confirmation_window = window;
        self
    }

    pub fn with_allocation(mut self, allocation: AllocationMap) -> Self {
        self.allocation = allocation;
        self
    }

    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_coupon_policy(mut self, policy: CouponPolicy) -> Self {
        self.coupon_policy = policy;
        self
    }

    /// Check parameter consistency. Initial cash is checked separately as a
    /// precondition because it usually comes from the data side.
    pub fn validate(&self) -> Result<(), ConfigError> {
        SignalConfirmer::new(self.confirmation_window)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ConfigError::InvertedDateRange { start, end });
            }
        }
        Ok(())
    }

    /// Whether `date` falls inside the configured range.
    pub fn in_range(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| date >= s) && self.end_date.map_or(true, |e| date <= e)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Loop state machine: no allocation yet, or holding a defined allocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AllocationState {
    Uninitialized,
    Active(f64),
}

impl AllocationState {
    pub fn current(&self) -> Option<f64> {
        match self {
            Self::Uninitialized => None,
            Self::Active(fraction) => Some(*fraction),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// Mutable state carried from one day to the next.
///
/// Owned exclusively by the loop; callers only ever see the finished
/// `SimulationResult`.
#[derive(Debug)]
pub struct SimulationState {
    pub holdings: Holdings,
    pub allocation: AllocationState,
    pub confirmed: Option<f64>,
    pub day_index: usize,
    states: Vec<PortfolioState>,
    rebalances: Vec<RebalanceEvent>,
    warnings: Vec<SimulationWarning>,
}

impl SimulationState {
    pub fn new(initial_cash: f64, expected_days: usize) -> Self {
        Self {
            holdings: Holdings::all_cash(initial_cash),
            allocation: AllocationState::Uninitialized,
            confirmed: None,
            day_index: 0,
            states: Vec::with_capacity(expected_days),
            rebalances: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Process one market day. `raw` is the full raw-signal series of the run.
    pub fn step(
        &mut self,
        day: &MarketDay,
        raw: &[f64],
        coupon: f64,
        confirmer: &SignalConfirmer,
        allocation: &AllocationMap,
    ) -> Result<(), PreconditionError> {
        // 1. Coupon accrual
        self.holdings.accrue(coupon);

        // 2. Signal confirmation
        self.confirmed = confirmer.confirm(raw, self.day_index, self.confirmed);

        // 3. Target derivation
        let target = match self.confirmed {
            Some(signal) => match allocation.target(signal) {
                Some(fraction) => Some(fraction),
                None => {
                    tracing::warn!(date = %day.date, signal, "confirmed signal has no allocation, holding");
                    self.warnings
                        .push(SimulationWarning::UnmappedSignal { date: day.date, signal });
                    self.allocation.current()
                }
            },
            None => self.allocation.current(),
        };

        // 4 + 5. First buy or rebalance
        if let Some(target) = target {
            let current = self.allocation.current();
            if let Some(event) = rebalance(day.date, self.holdings, day.price, current, target)? {
                tracing::debug!(
                    date = %day.date,
                    price = day.price,
                    from = ?event.from_allocation,
                    to = event.to_allocation,
                    value = event.value_after,
                    "rebalanced"
                );
                self.holdings = event.after;
                self.rebalances.push(event);
            }
            self.allocation = AllocationState::Active(target);
        }

        // 6. Record
        self.states.push(PortfolioState::record(
            day,
            self.confirmed,
            self.holdings,
            self.allocation.current(),
            coupon,
        ));
        self.day_index += 1;
        Ok(())
    }

    pub(crate) fn push_warnings(&mut self, warnings: impl IntoIterator<Item = SimulationWarning>) {
        self.warnings.extend(warnings);
    }

    pub fn finish(mut self) -> SimulationResult {
        // Stable: same-day warnings keep their insertion order.
        self.warnings.sort_by_key(|w| w.date());
        SimulationResult {
            states: self.states,
            rebalances: self.rebalances,
            warnings: self.warnings,
        }
    }
}

/// Result of a complete simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// One state per simulated market day, in date order.
    pub states: Vec<PortfolioState>,
    /// Every rebalance, including the first buy.
    pub rebalances: Vec<RebalanceEvent>,
    /// Recoverable edge cases, ordered by date.
    pub warnings: Vec<SimulationWarning>,
}

impl SimulationResult {
    pub fn day_count(&self) -> usize {
        self.states.len()
    }

    pub fn final_state(&self) -> Option<&PortfolioState> {
        self.states.last()
    }

    pub fn final_value(&self) -> f64 {
        self.final_state().map_or(0.0, |s| s.total_value)
    }

    pub fn total_coupons(&self) -> f64 {
        self.states.iter().map(|s| s.coupon_received).sum()
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.total_value).collect()
    }

    /// Dates on which an unmapped confirmed signal forced the allocation to be held.
    pub fn unmapped_signal_dates(&self) -> Vec<NaiveDate> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                SimulationWarning::UnmappedSignal { date, .. } => Some(*date),
                _ => None,
            })
            .collect()
    }

    /// Coupon dates whose cash was dropped.
    pub fn missing_coupon_dates(&self) -> Vec<NaiveDate> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                SimulationWarning::MissingCouponTarget { date, .. } => Some(*date),
                _ => None,
            })
            .collect()
    }
}
