//! TOML run configuration.
//!
//! A config file describes one backtest end to end:
//! - `[simulation]`: initial cash, confirmation window, date range, coupon policy
//! - `[[allocation]]`: signal → fraction rows (omitted = default table)
//! - `[data]`: market and coupon CSV paths
//! - `[coupon_schedule]`: generated coupons, as an alternative to a coupon CSV
//! - `[bond]`: optional bond leg valued alongside the simulated sleeve
//! - `[output]`: artifact directory

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use carrylab_core::signals::DEFAULT_CONFIRMATION_WINDOW;
use carrylab_core::{AllocationMap, AllocationRule, CouponPolicy, SimulationConfig};

use crate::bond::BondConfig;
use crate::schedule::CouponSchedule;

/// Errors from reading or interpreting a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid simulation parameters: {0}")]
    Invalid(#[from] carrylab_core::ConfigError),
}

fn default_window() -> usize {
    DEFAULT_CONFIRMATION_WINDOW
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSection {
    #[serde(default)]
    pub initial_cash: f64,
    #[serde(default = "default_window")]
    pub confirmation_window: usize,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub coupon_policy: CouponPolicy,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            initial_cash: 0.0,
            confirmation_window: default_window(),
            start_date: None,
            end_date: None,
            coupon_policy: CouponPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default)]
    pub market_csv: Option<PathBuf>,
    #[serde(default)]
    pub coupon_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Full contents of a run config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarryConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub allocation: Vec<AllocationRule>,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub coupon_schedule: Option<CouponSchedule>,
    #[serde(default)]
    pub bond: Option<BondConfig>,
    #[serde(default)]
    pub output: OutputSection,
}

impl CarryConfig {
    /// Parse a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file. Relative data and output paths are
    /// resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.data.market_csv.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.data.coupon_csv.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.bond.as_mut().and_then(|b| b.price_csv.as_mut()) {
            resolve(p);
        }
        resolve(&mut self.output.dir);
    }

    /// The allocation table: configured rows, or the default table when none are given.
    pub fn allocation_map(&self) -> Result<AllocationMap, ConfigFileError> {
        if self.allocation.is_empty() {
            Ok(AllocationMap::default())
        } else {
            Ok(AllocationMap::new(self.allocation.clone())?)
        }
    }

    /// Validated core configuration.
    pub fn to_simulation_config(&self) -> Result<SimulationConfig, ConfigFileError> {
        let sim = &self.simulation;
        let config = SimulationConfig::new(sim.initial_cash)
            .with_window(sim.confirmation_window)
            .with_allocation(self.allocation_map()?)
            .with_date_range(sim.start_date, sim.end_date)
            .with_coupon_policy(sim.coupon_policy);
        config.validate()?;
        Ok(config)
    }
}
