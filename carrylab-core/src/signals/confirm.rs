//! Window-based signal confirmation.

use crate::error::ConfigError;

/// Default number of consecutive identical raw signals required to confirm.
pub const DEFAULT_CONFIRMATION_WINDOW: usize = 3;

/// Confirms a raw trend signal once it has been constant for `window` days.
///
/// # Invariants
/// - Output is a step function: it only changes on a day whose trailing
///   window holds `window` identical raw values.
/// - Before the first confirmation the output is `None`.
/// - A run shorter than `window` never moves the output, so a one-day spike
///   inside a constant signal is suppressed.
///
/// Raw values are compared with `==`. A NaN raw value therefore never
/// confirms and blocks confirmation for every window that contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalConfirmer {
    window: usize,
}

impl SignalConfirmer {
    pub fn new(window: usize) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Confirmed signal for day `index`, given the previous day's confirmed value.
    ///
    /// Returns `previous` unchanged when there is not yet a full window of
    /// history or when the trailing window is not uniform.
    pub fn confirm(&self, raw: &[f64], index: usize, previous: Option<f64>) -> Option<f64> {
        if index >= raw.len() || index + 1 < self.window {
            return previous;
        }
        let trailing = &raw[index + 1 - self.window..=index];
        let first = trailing[0];
        if trailing.iter().all(|&v| v == first) {
            Some(first)
        } else {
            previous
        }
    }

    /// Confirmed signal for every day of `raw`.
    pub fn confirm_series(&self, raw: &[f64]) -> Vec<Option<f64>> {
        let mut confirmed = None;
        (0..raw.len())
            .map(|i| {
                confirmed = self.confirm(raw, i, confirmed);
                confirmed
            })
            .collect()
    }
}

impl Default for SignalConfirmer {
    fn default() -> Self {
        Self {
            window: DEFAULT_CONFIRMATION_WINDOW,
        }
    }
}
