//! XP curve and award policy.
//!
//! Each level costs `round(previous * growth)` XP. Awards that overshoot
//! several thresholds roll over into consecutive level-ups, one event per
//! level, so the presentation layer can animate each of them.

use serde::{Deserialize, Serialize};

use super::profile::Profile;

/// Default multiplier applied to the XP threshold on each level-up.
pub const DEFAULT_GROWTH: f64 = 1.2;

/// Emitted once for every level gained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpEvent {
    /// The level just reached.
    pub level: u32,
    /// Threshold for the following level.
    pub xp_needed: u64,
    /// Total signals unlocked after this level-up.
    pub signals_unlocked: u32,
}

/// How much XP a settled trade is worth.
///
/// Deployments pick one policy explicitly; the browser variants disagreed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpPolicy {
    /// Different flat amounts for a win and a loss.
    Outcome { win: u64, loss: u64 },
    /// Same amount regardless of outcome.
    Flat { per_trade: u64 },
}

impl XpPolicy {
    pub fn trade_award(self, is_win: bool) -> u64 {
        match self {
            Self::Outcome { win, loss } => {
                if is_win {
                    win
                } else {
                    loss
                }
            }
            Self::Flat { per_trade } => per_trade,
        }
    }
}

impl Default for XpPolicy {
    fn default() -> Self {
        Self::Outcome { win: 25, loss: 10 }
    }
}

/// Threshold growth between levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCurve {
    growth: f64,
}

impl LevelCurve {
    /// Growth factors at or below 1.0 fall back to the default.
    pub fn new(growth: f64) -> Self {
        let growth = if growth.is_finite() && growth > 1.0 {
            growth
        } else {
            DEFAULT_GROWTH
        };
        Self { growth }
    }

    pub fn growth(&self) -> f64 {
        self.growth
    }

    /// Threshold for the level after one whose threshold was `current`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn next_threshold(&self, current: u64) -> u64 {
        let next = (current as f64 * self.growth).round() as u64;
        next.max(current).max(1)
    }

    /// Add `amount` XP and roll any overflow into level-ups.
    pub fn award(&self, profile: &mut Profile, amount: u64) -> Vec<LevelUpEvent> {
        let mut events = Vec::new();
        profile.xp = profile.xp.saturating_add(amount);

        while profile.xp >= profile.xp_needed {
            profile.xp -= profile.xp_needed;
            profile.level += 1;
            profile.xp_needed = self.next_threshold(profile.xp_needed);
            profile.signals_unlocked += 1;
            events.push(LevelUpEvent {
                level: profile.level,
                xp_needed: profile.xp_needed,
                signals_unlocked: profile.signals_unlocked,
            });
        }

        events
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::new(DEFAULT_GROWTH)
    }
}
