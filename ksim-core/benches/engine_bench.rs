//! Benchmarks for the day-advance loop: bare clock ticks versus bars that
//! keep the trigger and risk passes busy.

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use ksim_core::{Bar, BarSeries, OrderKind, SimConfig, SimulationState, TradeMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_walk(n: usize, seed: u64) -> BarSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let mut price = 100.0f64;
    let bars = (0..n)
        .map(|i| {
            let drift: f64 = rng.gen_range(-0.02..0.02);
            let open = price;
            price = (price * (1.0 + drift)).max(1.0);
            let close = price;
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(1_000.0..100_000.0),
            }
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

fn bench_advance_idle(c: &mut Criterion) {
    let bars = random_walk(2_000, 7);
    c.bench_function("advance_2000_bars_idle", |b| {
        b.iter(|| {
            let mut sim = SimulationState::new(bars.clone(), 0, SimConfig::default());
            while sim.advance_one().can_continue {}
            sim.equity_history().len()
        })
    });
}

fn bench_advance_with_books(c: &mut Criterion) {
    let bars = random_walk(2_000, 7);
    c.bench_function("advance_2000_bars_with_positions_and_orders", |b| {
        b.iter(|| {
            let mut sim = SimulationState::new(bars.clone(), 0, SimConfig::default());
            let open = sim.current_bar().open;
            let _ = sim.execute_trade(TradeMode::Spot, 50.0, open, 1.0);
            if let Ok(id) = sim.execute_trade(TradeMode::MarginLong, 10.0, open, 3.0) {
                let _ = sim.set_exits(id, open * 0.8, open * 1.5);
            }
            let _ = sim.place_order(TradeMode::Spot, OrderKind::Limit, 5.0, open * 0.9, 1.0);
            let _ = sim.place_order(
                TradeMode::MarginShort,
                OrderKind::Limit,
                5.0,
                open * 1.1,
                2.0,
            );
            while sim.advance_n(10).can_continue {}
            sim.transactions().len()
        })
    });
}

criterion_group!(benches, bench_advance_idle, bench_advance_with_books);
criterion_main!(benches);
