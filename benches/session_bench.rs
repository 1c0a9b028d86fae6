//! Session Benchmarks - Per-Callback Cost
//!
//! Benchmarks the work done inside one engine callback: settling a
//! trade, rolling XP into levels, a price tick over the trend lines and
//! a full blob serialization.
//!
//! Run with: cargo bench --bench session_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chrono::Utc;
use rust_decimal_macros::dec;

use trading_dojo::adapters::persistence::MemoryProfileStore;
use trading_dojo::adapters::random::SeededRandom;
use trading_dojo::config::AppConfig;
use trading_dojo::domain::{Direction, LevelCurve, Profile, check_achievements};
use trading_dojo::usecases::{DeskSettings, MarketDesk, SessionSettings, TradeSession};

fn session() -> TradeSession<MemoryProfileStore, SeededRandom> {
    let config = AppConfig::default();
    TradeSession::new(
        MemoryProfileStore::new(),
        SeededRandom::new(Some(1)),
        SessionSettings::from_config(&config),
        TradeSession::<MemoryProfileStore, SeededRandom>::template(&config),
    )
}

/// Benchmark select + execute, including the blob save.
fn bench_execute_trade(c: &mut Criterion) {
    let mut s = session();
    let now = Utc::now();

    c.bench_function("select_execute_trade", |b| {
        b.iter(|| {
            if s.select_direction(Direction::Buy, now).is_err() {
                s = session();
                let _ = s.select_direction(Direction::Buy, now);
            }
            let _ = s.execute(black_box(dec!(45320.50)), now);
        });
    });
}

/// Benchmark a multi-level XP award.
fn bench_award_xp(c: &mut Criterion) {
    let curve = LevelCurve::default();

    c.bench_function("award_xp_multi_level", |b| {
        b.iter(|| {
            let mut p = Profile::new(dec!(10000), 100);
            let _events = curve.award(&mut p, black_box(5_000));
        });
    });
}

/// Benchmark the achievement table on a busy profile.
fn bench_check_achievements(c: &mut Criterion) {
    let mut base = Profile::new(dec!(10000), 100);
    base.total_trades = 120;
    base.wins = 90;
    base.win_rate = base.compute_win_rate();

    c.bench_function("check_achievements", |b| {
        b.iter(|| {
            let mut p = base.clone();
            let _unlocked = check_achievements(black_box(&mut p));
        });
    });
}

/// Benchmark one price tick with the seeded sample lines.
fn bench_price_tick(c: &mut Criterion) {
    let now = Utc::now();
    let mut desk = MarketDesk::new(SeededRandom::new(Some(2)), DeskSettings::default(), now);

    c.bench_function("desk_price_tick", |b| {
        b.iter(|| {
            let _touches = desk.tick(black_box(now));
        });
    });
}

criterion_group!(
    benches,
    bench_execute_trade,
    bench_award_xp,
    bench_check_achievements,
    bench_price_tick,
);
criterion_main!(benches);
