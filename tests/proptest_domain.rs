//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that profile stats, the XP curve and the
//! achievement table hold their invariants across random inputs.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use trading_dojo::domain::{LevelCurve, Profile, check_achievements};

// ── Trade Outcome Properties ────────────────────────────────

proptest! {
    /// Every settled trade is either a win or a loss.
    #[test]
    fn trades_split_into_wins_and_losses(outcomes in prop::collection::vec(any::<bool>(), 0..200)) {
        let mut p = Profile::new(dec!(10000), 100);
        for &win in &outcomes {
            let profit = if win { dec!(100) } else { dec!(-50) };
            p.record_outcome(win, profit);
        }
        prop_assert_eq!(p.total_trades, p.wins + p.losses);
        prop_assert_eq!(p.total_trades, outcomes.len() as u64);
        prop_assert!(p.win_rate <= 100);
    }

    /// The streak counts trailing wins and never exceeds the best streak.
    #[test]
    fn streak_tracks_trailing_wins(outcomes in prop::collection::vec(any::<bool>(), 1..200)) {
        let mut p = Profile::new(dec!(10000), 100);
        for &win in &outcomes {
            p.record_outcome(win, if win { dec!(10) } else { dec!(-5) });
        }
        let trailing = outcomes.iter().rev().take_while(|&&w| w).count() as u32;
        prop_assert_eq!(p.win_streak, trailing);
        prop_assert!(p.win_streak <= p.best_streak);
    }

    /// Cumulative profit only counts winning trades.
    #[test]
    fn profit_sums_wins_only(outcomes in prop::collection::vec(any::<bool>(), 0..100)) {
        let mut p = Profile::new(dec!(10000), 100);
        for &win in &outcomes {
            p.record_outcome(win, if win { dec!(100) } else { dec!(-50) });
        }
        prop_assert_eq!(p.profit, Decimal::from(p.wins) * dec!(100));
        prop_assert!(p.profit >= Decimal::ZERO);
    }
}

// ── XP Curve Properties ─────────────────────────────────────

proptest! {
    /// After any award, leftover XP sits below the next threshold.
    #[test]
    fn award_leaves_xp_below_threshold(
        start_xp in 0u64..100,
        amount in 0u64..100_000,
        growth in 1.01f64..3.0,
    ) {
        let mut p = Profile::new(dec!(1000), 100);
        p.xp = start_xp;
        LevelCurve::new(growth).award(&mut p, amount);
        prop_assert!(p.xp < p.xp_needed);
    }

    /// Level-up events are ascending, one per level gained.
    #[test]
    fn level_ups_are_ascending(amount in 0u64..50_000) {
        let mut p = Profile::new(dec!(1000), 100);
        let events = LevelCurve::default().award(&mut p, amount);

        prop_assert_eq!(p.level, 1 + events.len() as u32);
        prop_assert_eq!(p.signals_unlocked, events.len() as u32);
        for pair in events.windows(2) {
            prop_assert_eq!(pair[1].level, pair[0].level + 1);
            prop_assert!(pair[1].xp_needed >= pair[0].xp_needed);
        }
    }

    /// Landing exactly on the threshold levels up once with zero XP left.
    #[test]
    fn exact_threshold_levels_once(needed in 1u64..10_000, start in 0u64..10_000) {
        let start = start % needed;
        let mut p = Profile::new(dec!(1000), needed);
        p.xp = start;
        let events = LevelCurve::default().award(&mut p, needed - start);
        prop_assert_eq!(events.len(), 1);
        prop_assert_eq!(p.xp, 0);
        prop_assert_eq!(p.level, 2);
    }
}

// ── Achievement Properties ──────────────────────────────────

proptest! {
    /// A second check on an unchanged profile unlocks nothing.
    #[test]
    fn achievements_are_idempotent(
        trades in 0u64..150,
        streak in 0u32..10,
        level in 1u32..15,
        lessons in 0usize..12,
    ) {
        let mut p = Profile::new(dec!(1000), 100);
        p.total_trades = trades;
        p.wins = trades;
        p.win_rate = p.compute_win_rate();
        p.win_streak = streak;
        p.level = level;
        p.lessons_completed = (0..lessons).map(|i| format!("lesson-{i}")).collect();

        let first = check_achievements(&mut p);
        prop_assert_eq!(first.len(), p.achievements.len());
        prop_assert!(check_achievements(&mut p).is_empty());
    }
}

#[test]
fn worked_level_up_example() {
    let mut p = Profile::new(dec!(1000), 100);
    p.level = 3;
    p.xp = 90;

    let events = LevelCurve::default().award(&mut p, 25);

    assert_eq!(p.xp, 15);
    assert_eq!(p.xp_needed, 120);
    assert_eq!(p.level, 4);
    assert_eq!(events.len(), 1);
}
