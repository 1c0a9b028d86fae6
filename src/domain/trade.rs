//! Practice trade types.
//!
//! A trade lives in two shapes: a `PendingTrade` between direction
//! selection and execution, and an immutable `TradeRecord` once settled.
//! Settlement is a weighted coin-flip; `PayoutModel` holds the odds and
//! the payout multipliers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Side of a practice trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A selected but not yet executed trade. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTrade {
    pub direction: Direction,
    pub asset: String,
    pub position_size: Decimal,
    pub risk_percent: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Win odds and payout multipliers applied at settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutModel {
    /// Probability in [0, 1] that a trade wins.
    pub win_probability: f64,
    /// Fraction of the position paid out on a win (e.g. 0.1).
    pub win_multiplier: f64,
    /// Fraction of the position lost on a loss; negative (e.g. -0.05).
    pub loss_multiplier: f64,
}

impl PayoutModel {
    /// A sample strictly below the win probability is a win.
    pub fn is_win(&self, sample: f64) -> bool {
        sample < self.win_probability.clamp(0.0, 1.0)
    }

    /// Signed profit for a settled position, rounded to cents.
    pub fn profit(&self, position_size: Decimal, is_win: bool) -> Decimal {
        let multiplier = if is_win {
            self.win_multiplier
        } else {
            self.loss_multiplier
        };
        let multiplier = Decimal::from_f64(multiplier).unwrap_or(Decimal::ZERO);
        (position_size * multiplier).round_dp(2)
    }
}

impl Default for PayoutModel {
    fn default() -> Self {
        Self {
            win_probability: 0.6,
            win_multiplier: 0.1,
            loss_multiplier: -0.05,
        }
    }
}

/// Settled trade. Immutable once appended to the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: Uuid,
    pub asset: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub profit: Decimal,
    pub is_win: bool,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    /// Build the record for a settled pending trade.
    ///
    /// The exit price is implied by the return: a winning BUY exits above
    /// entry, a winning SELL below it.
    pub fn settle(
        pending: &PendingTrade,
        entry_price: Decimal,
        profit: Decimal,
        is_win: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let ret = if pending.position_size.is_zero() {
            Decimal::ZERO
        } else {
            profit / pending.position_size
        };
        let move_factor = match pending.direction {
            Direction::Buy => Decimal::ONE + ret,
            Direction::Sell => Decimal::ONE - ret,
        };
        Self {
            id: Uuid::new_v4(),
            asset: pending.asset.clone(),
            direction: pending.direction,
            entry_price,
            exit_price: (entry_price * move_factor).round_dp(4),
            size: pending.position_size,
            profit,
            is_win,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending(direction: Direction) -> PendingTrade {
        PendingTrade {
            direction,
            asset: "BTC/USD".to_string(),
            position_size: dec!(1000),
            risk_percent: dec!(2),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_certain_win_and_certain_loss() {
        let always = PayoutModel {
            win_probability: 1.0,
            ..PayoutModel::default()
        };
        let never = PayoutModel {
            win_probability: 0.0,
            ..PayoutModel::default()
        };
        assert!(always.is_win(0.999_999));
        assert!(!never.is_win(0.0));
    }

    #[test]
    fn test_profit_uses_side_multiplier() {
        let model = PayoutModel::default();
        assert_eq!(model.profit(dec!(1000), true), dec!(100));
        assert_eq!(model.profit(dec!(1000), false), dec!(-50));
    }

    #[test]
    fn test_buy_win_exits_above_entry() {
        let rec = TradeRecord::settle(&pending(Direction::Buy), dec!(45000), dec!(100), true, Utc::now());
        assert_eq!(rec.exit_price, dec!(49500));
    }

    #[test]
    fn test_sell_win_exits_below_entry() {
        let rec = TradeRecord::settle(&pending(Direction::Sell), dec!(45000), dec!(100), true, Utc::now());
        assert_eq!(rec.exit_price, dec!(40500));
    }

    #[test]
    fn test_direction_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Buy).unwrap(), "\"buy\"");
        assert_eq!(format!("{}", Direction::Sell), "SELL");
    }
}
