//! Coupon routing: assign each coupon's cash to a simulated day.
//!
//! Coupons are matched to market days by exact date. Several coupons on the
//! same date are summed. A coupon whose date is not a market day is handled
//! per `CouponPolicy`; either way the outcome is recorded as a warning.

use crate::domain::{CouponEvent, MarketDay};

use super::state::{CouponPolicy, SimulationConfig};
use super::warning::SimulationWarning;

/// Coupon cash per simulated day plus the warnings produced while routing.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponRouting {
    /// Same length as the simulated days; zero where no coupon lands.
    pub per_day: Vec<f64>,
    pub warnings: Vec<SimulationWarning>,
}

impl CouponRouting {
    pub fn total_applied(&self) -> f64 {
        self.per_day.iter().sum()
    }
}

/// Route `coupons` onto `days` (already restricted to the configured range).
///
/// Coupons dated outside the configured range are ignored without a warning.
/// Under `CarryForward`, a coupon falling between two market days lands on
/// the later one. A coupon before the first or after the last simulated day
/// has no target under either policy.
pub fn route_coupons(
    days: &[MarketDay],
    coupons: &[CouponEvent],
    config: &SimulationConfig,
) -> CouponRouting {
    let mut per_day = vec![0.0; days.len()];
    let mut warnings = Vec::new();

    for coupon in coupons {
        if !config.in_range(coupon.date) {
            tracing::debug!(date = %coupon.date, amount = coupon.amount, "coupon outside date range, ignored");
            continue;
        }
        match days.binary_search_by_key(&coupon.date, |d| d.date) {
            Ok(i) => per_day[i] += coupon.amount,
            Err(pos) => {
                let carry = config.coupon_policy == CouponPolicy::CarryForward
                    && pos > 0
                    && pos < days.len();
                if carry {
                    per_day[pos] += coupon.amount;
                    tracing::warn!(
                        coupon_date = %coupon.date,
                        applied_on = %days[pos].date,
                        amount = coupon.amount,
                        "coupon has no market day, carried forward"
                    );
                    warnings.push(SimulationWarning::CouponCarriedForward {
                        coupon_date: coupon.date,
                        applied_on: days[pos].date,
                        amount: coupon.amount,
                    });
                } else {
                    tracing::warn!(date = %coupon.date, amount = coupon.amount, "coupon has no market day, dropped");
                    warnings.push(SimulationWarning::MissingCouponTarget {
                        date: coupon.date,
                        amount: coupon.amount,
                    });
                }
            }
        }
    }

    CouponRouting { per_day, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn days(dates: &[u32]) -> Vec<MarketDay> {
        dates
            .iter()
            .map(|&x| MarketDay::new(d(x), 100.0, 1.0))
            .collect()
    }

    #[test]
    fn exact_match_lands_on_day() {
        let routing = route_coupons(
            &days(&[1, 2, 3]),
            &[CouponEvent::new(d(2), 50.0)],
            &SimulationConfig::default(),
        );
        assert_eq!(routing.per_day, vec![0.0, 50.0, 0.0]);
        assert!(routing.warnings.is_empty());
    }

    #[test]
    fn same_date_coupons_are_summed() {
        let routing = route_coupons(
            &days(&[1, 2]),
            &[CouponEvent::new(d(1), 10.0), CouponEvent::new(d(1), 5.5)],
            &SimulationConfig::default(),
        );
        assert_eq!(routing.per_day[0], 15.5);
    }

    #[test]
    fn drop_policy_records_missing_target() {
        let routing = route_coupons(
            &days(&[1, 3]),
            &[CouponEvent::new(d(2), 1990.29)],
            &SimulationConfig::default(),
        );
        assert_eq!(routing.total_applied(), 0.0);
        assert_eq!(
            routing.warnings,
            vec![SimulationWarning::MissingCouponTarget {
                date: d(2),
                amount: 1990.29
            }]
        );
    }

    #[test]
    fn carry_forward_lands_on_next_day() {
        let config = SimulationConfig::default().with_coupon_policy(CouponPolicy::CarryForward);
        let routing = route_coupons(&days(&[1, 4]), &[CouponEvent::new(d(2), 7.0)], &config);
        assert_eq!(routing.per_day, vec![0.0, 7.0]);
        assert_eq!(
            routing.warnings,
            vec![SimulationWarning::CouponCarriedForward {
                coupon_date: d(2),
                applied_on: d(4),
                amount: 7.0
            }]
        );
    }

    #[test]
    fn carry_forward_past_last_day_is_missing() {
        let config = SimulationConfig::default().with_coupon_policy(CouponPolicy::CarryForward);
        let routing = route_coupons(
            &days(&[2, 3]),
            &[CouponEvent::new(d(9), 7.0), CouponEvent::new(d(1), 3.0)],
            &config,
        );
        assert_eq!(routing.total_applied(), 0.0);
        assert_eq!(routing.warnings.len(), 2);
        assert!(routing
            .warnings
            .iter()
            .all(|w| w.kind() == "missing_coupon_target"));
    }

    #[test]
    fn out_of_range_coupon_is_ignored_silently() {
        let config = SimulationConfig::default().with_date_range(Some(d(2)), Some(d(3)));
        let routing = route_coupons(&days(&[2, 3]), &[CouponEvent::new(d(20), 7.0)], &config);
        assert_eq!(routing.total_applied(), 0.0);
        assert!(routing.warnings.is_empty());
    }

    // ── Logging ──

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn route_logged(coupons: &[CouponEvent], config: &SimulationConfig) -> String {
        let out = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(out.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            route_coupons(&days(&[1, 3]), coupons, config);
        });
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn every_recorded_coupon_warning_is_logged() {
        let carry = SimulationConfig::default().with_coupon_policy(CouponPolicy::CarryForward);
        let log = route_logged(&[CouponEvent::new(d(2), 7.0)], &carry);
        assert!(log.contains("WARN"));
        assert!(log.contains("carried forward"));
        assert!(log.contains("applied_on=2024-01-03"));

        let log = route_logged(&[CouponEvent::new(d(2), 7.0)], &SimulationConfig::default());
        assert!(log.contains("WARN"));
        assert!(log.contains("dropped"));
    }
}
