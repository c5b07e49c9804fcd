//! Criterion benchmarks for CarryLab hot paths.
//!
//! Benchmarks:
//! 1. Full simulation over multi-year daily series with semiannual coupons
//! 2. Signal confirmation over a long raw series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use carrylab_core::{run_simulation, CouponEvent, MarketDay, SignalConfirmer, SimulationConfig};

// ── Helpers ──────────────────────────────────────────────────────────

const LEVELS: [f64; 5] = [-1.0, -0.5, 0.0, 0.5, 1.0];

fn make_market(n: usize) -> Vec<MarketDay> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let price = 30_000.0 + (i as f64 * 0.05).sin() * 10_000.0;
            // Regimes of varying length so confirmations actually happen
            let signal = LEVELS[(i / 7 + i / 13) % LEVELS.len()];
            MarketDay::new(base_date + chrono::Duration::days(i as i64), price, signal)
        })
        .collect()
}

fn make_coupons(market: &[MarketDay]) -> Vec<CouponEvent> {
    market
        .iter()
        .step_by(182)
        .map(|d| CouponEvent::new(d.date, 1990.29))
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    for &n in &[365usize, 365 * 4, 365 * 11] {
        let market = make_market(n);
        let coupons = make_coupons(&market);
        let config = SimulationConfig::new(0.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| run_simulation(black_box(&market), black_box(&coupons), &config))
        });
    }
    group.finish();
}

fn bench_confirmation(c: &mut Criterion) {
    let raw: Vec<f64> = make_market(365 * 11).iter().map(|d| d.trend_signal).collect();
    let confirmer = SignalConfirmer::default();
    c.bench_function("confirm_series_4015", |b| {
        b.iter(|| confirmer.confirm_series(black_box(&raw)))
    });
}

criterion_group!(benches, bench_simulation, bench_confirmation);
criterion_main!(benches);
