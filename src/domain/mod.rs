//! Domain layer - Core practice-trading rules and models.
//!
//! Pure logic for the dojo: profile stats, XP leveling, achievements,
//! simulated trade settlement, price alerts and the mock chart.
//! Nothing here touches IO, clocks or random number generators; callers
//! pass in timestamps and uniform samples.

pub mod achievements;
pub mod alert;
pub mod assets;
pub mod error;
pub mod leveling;
pub mod market;
pub mod mentor;
pub mod profile;
pub mod sessions;
pub mod state;
pub mod trade;
pub mod trendline;

// Re-export core types for convenience
pub use achievements::{AchievementId, check_achievements};
pub use alert::{Alert, AlertCondition, AlertTrigger};
pub use assets::{AssetInfo, Timeframe};
pub use error::DojoError;
pub use leveling::{LevelCurve, LevelUpEvent, XpPolicy};
pub use market::{Candle, CandleSeries, StructureBreak};
pub use profile::Profile;
pub use sessions::TradingWindow;
pub use state::{PersistedState, RestoreOutcome};
pub use trade::{Direction, PayoutModel, PendingTrade, TradeRecord};
pub use trendline::{SetupAnalysis, TouchEvent, TrendKind, TrendLine};
