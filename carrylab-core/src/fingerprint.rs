//! Run fingerprinting: deterministic identification of inputs and parameters.
//!
//! - `config_hash()`: BLAKE3 over the canonical simulation parameters.
//! - `dataset_hash()`: BLAKE3 over the market and coupon series.
//!
//! Floats are hashed by their bit patterns so the hashes are stable across
//! platforms and independent of float formatting.

use crate::domain::{ConfigHash, CouponEvent, DatasetHash, MarketDay};
use crate::engine::{CouponPolicy, SimulationConfig};

fn update_date(hasher: &mut blake3::Hasher, date: Option<chrono::NaiveDate>) {
    match date {
        Some(d) => {
            hasher.update(&[1]);
            hasher.update(d.to_string().as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

/// Structural + parameter hash of a `SimulationConfig`.
pub fn config_hash(config: &SimulationConfig) -> ConfigHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"carrylab-config-v1");
    hasher.update(&config.initial_cash.to_bits().to_le_bytes());
    hasher.update(&(config.confirmation_window as u64).to_le_bytes());
    for rule in config.allocation.rules() {
        hasher.update(&rule.signal.to_bits().to_le_bytes());
        hasher.update(&rule.fraction.to_bits().to_le_bytes());
    }
    update_date(&mut hasher, config.start_date);
    update_date(&mut hasher, config.end_date);
    let policy: &str = match config.coupon_policy {
        CouponPolicy::Drop => "drop",
        CouponPolicy::CarryForward => "carry_forward",
    };
    hasher.update(policy.as_bytes());
    ConfigHash::from_hasher(&hasher)
}

/// Content hash of both input series, in the order given.
pub fn dataset_hash(market: &[MarketDay], coupons: &[CouponEvent]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"carrylab-dataset-v1");
    hasher.update(&(market.len() as u64).to_le_bytes());
    for day in market {
        hasher.update(day.date.to_string().as_bytes());
        hasher.update(&day.price.to_bits().to_le_bytes());
        hasher.update(&day.trend_signal.to_bits().to_le_bytes());
    }
    hasher.update(&(coupons.len() as u64).to_le_bytes());
    for coupon in coupons {
        hasher.update(coupon.date.to_string().as_bytes());
        hasher.update(&coupon.amount.to_bits().to_le_bytes());
    }
    DatasetHash::from_hasher(&hasher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn market() -> Vec<MarketDay> {
        vec![
            MarketDay::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 100.0, 1.0),
            MarketDay::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 101.0, 1.0),
        ]
    }

    #[test]
    fn config_hash_is_deterministic() {
        let a = config_hash(&SimulationConfig::new(1000.0));
        let b = config_hash(&SimulationConfig::new(1000.0));
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn config_hash_changes_with_params() {
        let base = config_hash(&SimulationConfig::new(1000.0));
        assert_ne!(base, config_hash(&SimulationConfig::new(1000.0).with_window(5)));
        assert_ne!(base, config_hash(&SimulationConfig::new(999.0)));
        assert_ne!(
            base,
            config_hash(&SimulationConfig::new(1000.0).with_coupon_policy(CouponPolicy::CarryForward))
        );
        assert_ne!(
            base,
            config_hash(
                &SimulationConfig::new(1000.0)
                    .with_date_range(NaiveDate::from_ymd_opt(2024, 1, 1), None)
            )
        );
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let m = market();
        let base = dataset_hash(&m, &[]);
        assert_eq!(base, dataset_hash(&m, &[]));

        let mut changed = m.clone();
        changed[1].price = 101.5;
        assert_ne!(base, dataset_hash(&changed, &[]));

        let coupon = CouponEvent::new(m[0].date, 10.0);
        assert_ne!(base, dataset_hash(&m, &[coupon]));
    }
}
