//! Achievement thresholds.
//!
//! A fixed table of predicates over the profile. Unlocks are monotonic:
//! once an id is in `Profile::achievements` it is never reported again.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstLesson,
    FirstTrade,
    HotStreak,
    ProfitMaker,
    Scholar,
    Veteran,
    Sharpshooter,
    BlackBelt,
}

impl AchievementId {
    pub fn title(self) -> &'static str {
        match self {
            Self::FirstLesson => "First Lesson",
            Self::FirstTrade => "First Trade",
            Self::HotStreak => "Hot Streak",
            Self::ProfitMaker => "Profit Maker",
            Self::Scholar => "Scholar",
            Self::Veteran => "Veteran",
            Self::Sharpshooter => "Sharpshooter",
            Self::BlackBelt => "Black Belt",
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Every achievement paired with its unlock predicate, in display order.
const TABLE: &[(AchievementId, fn(&Profile) -> bool)] = &[
    (AchievementId::FirstLesson, |p| !p.lessons_completed.is_empty()),
    (AchievementId::FirstTrade, |p| p.total_trades >= 1),
    (AchievementId::HotStreak, |p| p.win_streak >= 5),
    (AchievementId::ProfitMaker, |p| p.profit >= Decimal::ONE_THOUSAND),
    (AchievementId::Scholar, |p| p.lessons_completed.len() >= 10),
    (AchievementId::Veteran, |p| p.total_trades >= 100),
    (AchievementId::Sharpshooter, |p| p.total_trades >= 20 && p.win_rate >= 70),
    (AchievementId::BlackBelt, |p| p.level >= 10),
];

/// Record and return every achievement newly crossed by `profile`.
pub fn check_achievements(profile: &mut Profile) -> Vec<AchievementId> {
    let current: &Profile = profile;
    let unlocked: Vec<AchievementId> = TABLE
        .iter()
        .filter(|(id, met)| !current.achievements.contains(id) && met(current))
        .map(|(id, _)| *id)
        .collect();

    profile.achievements.extend(unlocked.iter().copied());
    unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fresh_profile_unlocks_nothing() {
        let mut p = Profile::new(dec!(1000), 100);
        assert!(check_achievements(&mut p).is_empty());
    }

    #[test]
    fn test_lesson_unlocks_once() {
        let mut p = Profile::new(dec!(1000), 100);
        p.lessons_completed.insert("candlesticks".to_string());

        assert_eq!(check_achievements(&mut p), vec![AchievementId::FirstLesson]);
        assert!(check_achievements(&mut p).is_empty());
    }

    #[test]
    fn test_multiple_thresholds_in_table_order() {
        let mut p = Profile::new(dec!(1000), 100);
        p.total_trades = 5;
        p.wins = 5;
        p.win_streak = 5;
        p.profit = dec!(1000);

        assert_eq!(
            check_achievements(&mut p),
            vec![
                AchievementId::FirstTrade,
                AchievementId::HotStreak,
                AchievementId::ProfitMaker,
            ]
        );
    }

    #[test]
    fn test_unlocks_survive_regression() {
        let mut p = Profile::new(dec!(1000), 100);
        p.win_streak = 6;
        check_achievements(&mut p);
        p.win_streak = 0;
        assert!(p.achievements.contains(&AchievementId::HotStreak));
    }

    #[test]
    fn test_sharpshooter_needs_sample() {
        let mut p = Profile::new(dec!(1000), 100);
        p.total_trades = 10;
        p.win_rate = 90;
        let unlocked = check_achievements(&mut p);
        assert!(!unlocked.contains(&AchievementId::Sharpshooter));
    }
}
