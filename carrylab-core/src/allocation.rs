//! Allocation mapping: confirmed trend value to target asset fraction.
//!
//! The mapper is a pure lookup with no state. A confirmed value that has no
//! row in the table yields `None`; the simulation loop decides what to do
//! with that (hold the current allocation and record a warning).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One row of the allocation table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationRule {
    /// Confirmed trend value this row matches (exact equality).
    pub signal: f64,
    /// Target fraction of total portfolio value held in the asset, in `[0, 1]`.
    pub fraction: f64,
}

/// Validated trend → allocation table.
///
/// Serializes as a plain list of rules; deserialization re-runs validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AllocationRule>", into = "Vec<AllocationRule>")]
pub struct AllocationMap {
    rules: Vec<AllocationRule>,
}

impl AllocationMap {
    pub fn new(rules: Vec<AllocationRule>) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::EmptyAllocationTable);
        }
        for (i, rule) in rules.iter().enumerate() {
            if !rule.signal.is_finite() {
                return Err(ConfigError::NonFiniteSignal(rule.signal));
            }
            if !(0.0..=1.0).contains(&rule.fraction) {
                return Err(ConfigError::FractionOutOfRange {
                    signal: rule.signal,
                    fraction: rule.fraction,
                });
            }
            if rules[..i].iter().any(|r| r.signal == rule.signal) {
                return Err(ConfigError::DuplicateSignal(rule.signal));
            }
        }
        Ok(Self { rules })
    }

    /// Build from `(signal, fraction)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ConfigError> {
        Self::new(
            pairs
                .iter()
                .map(|&(signal, fraction)| AllocationRule { signal, fraction })
                .collect(),
        )
    }

    /// Target fraction for a confirmed signal, `None` if the signal is unmapped.
    pub fn target(&self, signal: f64) -> Option<f64> {
        self.rules
            .iter()
            .find(|r| r.signal == signal)
            .map(|r| r.fraction)
    }

    pub fn rules(&self) -> &[AllocationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for AllocationMap {
    /// Five-step table: full trend up → fully invested, full trend down → all cash.
    fn default() -> Self {
        Self {
            rules: [(1.0, 1.0), (0.5, 0.75), (0.0, 0.5), (-0.5, 0.25), (-1.0, 0.0)]
                .into_iter()
                .map(|(signal, fraction)| AllocationRule { signal, fraction })
                .collect(),
        }
    }
}

impl TryFrom<Vec<AllocationRule>> for AllocationMap {
    type Error = ConfigError;

    fn try_from(rules: Vec<AllocationRule>) -> Result<Self, Self::Error> {
        Self::new(rules)
    }
}

impl From<AllocationMap> for Vec<AllocationRule> {
    fn from(map: AllocationMap) -> Self {
        map.rules
    }
}
