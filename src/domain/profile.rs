//! Gamification profile.
//!
//! The profile is the single owned record of a trainee's progress. It is
//! serialized wholesale as the `user` field of the persisted blob, with
//! camelCase keys so older blobs written by the browser build still load.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::achievements::AchievementId;

/// Level, XP, trading stats and unlock state for one trainee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Practice currency. Only trade settlement moves it.
    pub balance: Decimal,
    /// Current level, starting at 1.
    pub level: u32,
    /// XP accumulated towards the next level. Always `< xp_needed`.
    pub xp: u64,
    /// XP required to reach the next level.
    pub xp_needed: u64,
    /// Executed trades. Always `wins + losses`.
    pub total_trades: u64,
    pub wins: u64,
    pub losses: u64,
    /// Rounded win percentage, refreshed on every trade.
    pub win_rate: u32,
    /// Consecutive wins since the last loss.
    pub win_streak: u32,
    /// Longest win streak ever reached.
    pub best_streak: u32,
    /// Cumulative profit total from winning trades.
    pub profit: Decimal,
    /// Ids of completed lessons.
    pub lessons_completed: BTreeSet<String>,
    /// One signal unlocks per level gained.
    pub signals_unlocked: u32,
    pub achievements: BTreeSet<AchievementId>,
    /// Minutes spent in the dojo while the engine was running.
    pub training_minutes: u64,
}

impl Profile {
    /// Fresh profile with the given starting balance and first XP threshold.
    pub fn new(balance: Decimal, xp_needed: u64) -> Self {
        Self {
            balance,
            level: 1,
            xp: 0,
            xp_needed: xp_needed.max(1),
            total_trades: 0,
            wins: 0,
            losses: 0,
            win_rate: 0,
            win_streak: 0,
            best_streak: 0,
            profit: Decimal::ZERO,
            lessons_completed: BTreeSet::new(),
            signals_unlocked: 0,
            achievements: BTreeSet::new(),
            training_minutes: 0,
        }
    }

    /// Rounded `wins / total_trades * 100`, or 0 before the first trade.
    pub fn compute_win_rate(&self) -> u32 {
        if self.total_trades == 0 {
            return 0;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rate = (self.wins as f64 / self.total_trades as f64 * 100.0).round() as u32;
        rate
    }

    /// Apply a settled trade to the stats block.
    pub fn record_outcome(&mut self, is_win: bool, profit: Decimal) {
        self.balance += profit;
        self.total_trades += 1;
        if is_win {
            self.wins += 1;
            self.win_streak += 1;
            self.best_streak = self.best_streak.max(self.win_streak);
            self.profit += profit;
        } else {
            self.losses += 1;
            self.win_streak = 0;
        }
        self.win_rate = self.compute_win_rate();
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(Decimal::new(10_000, 0), 100)
    }
}
