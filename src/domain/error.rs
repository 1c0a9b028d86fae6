//! Session error taxonomy.
//!
//! Every variant is recoverable and user-facing: the engine turns it into
//! a warning event and the session keeps running.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by `TradeSession` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DojoError {
    /// `execute` was called while no direction was selected.
    #[error("select BUY or SELL before executing a trade")]
    NoPendingTrade,

    /// The position size is larger than the practice balance.
    #[error("insufficient balance: position {requested} exceeds balance {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// Alert target was zero, negative or not a number.
    #[error("invalid alert price: {0}")]
    InvalidAlertPrice(String),

    /// Position size must be strictly positive.
    #[error("invalid position size: {0}")]
    InvalidPositionSize(Decimal),

    /// Risk percent must be in (0, 100].
    #[error("invalid risk percent: {0}")]
    InvalidRiskPercent(Decimal),

    /// No alert with the given id exists.
    #[error("unknown alert {0}")]
    UnknownAlert(Uuid),

    /// Symbol not in the asset catalog.
    #[error("unknown asset '{0}'")]
    UnknownAsset(String),

    #[error("unknown timeframe '{0}', expected one of 1m, 5m, 15m, 1h, 4h, 1d")]
    UnknownTimeframe(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_balance_message() {
        let err = DojoError::InsufficientBalance {
            requested: dec!(2000),
            available: dec!(1000),
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: position 2000 exceeds balance 1000"
        );
    }
}
