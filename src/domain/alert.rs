//! One-shot price alerts.
//!
//! Alerts fire once when the mock price crosses their threshold in the
//! direction they watch. Fired alerts stay in the book, inactive, until the
//! purge delay has passed so the presentation layer can still show them.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DojoError;

/// Which side of the target price triggers the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    /// Watch for a move from `current` towards `target`.
    pub fn towards(current: Decimal, target: Decimal) -> Self {
        if target >= current { Self::Above } else { Self::Below }
    }

    pub fn is_crossed(self, price: Decimal, target: Decimal) -> bool {
        match self {
            Self::Above => price >= target,
            Self::Below => price <= target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub asset: String,
    pub target_price: Decimal,
    pub condition: AlertCondition,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Notification produced when an alert fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTrigger {
    pub alert_id: Uuid,
    pub asset: String,
    pub target_price: Decimal,
    pub condition: AlertCondition,
    pub price: Decimal,
}

/// Validate a raw alert price.
pub fn parse_alert_price(raw: &str) -> Result<Decimal, DojoError> {
    let price: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| DojoError::InvalidAlertPrice(raw.trim().to_string()))?;
    if price <= Decimal::ZERO {
        return Err(DojoError::InvalidAlertPrice(raw.trim().to_string()));
    }
    Ok(price)
}

/// Scan active alerts on `asset` against its `price`; fired alerts are
/// deactivated. Alerts on other assets are left alone.
pub fn scan(alerts: &mut [Alert], asset: &str, price: Decimal, now: DateTime<Utc>) -> Vec<AlertTrigger> {
    let mut fired = Vec::new();
    for alert in alerts.iter_mut().filter(|a| a.active && a.asset == asset) {
        if alert.condition.is_crossed(price, alert.target_price) {
            alert.active = false;
            alert.triggered_at = Some(now);
            fired.push(AlertTrigger {
                alert_id: alert.id,
                asset: alert.asset.clone(),
                target_price: alert.target_price,
                condition: alert.condition,
                price,
            });
        }
    }
    fired
}

/// Drop triggered alerts older than `delay`. Returns how many were removed.
pub fn purge(alerts: &mut Vec<Alert>, now: DateTime<Utc>, delay: Duration) -> usize {
    let before = alerts.len();
    alerts.retain(|a| match a.triggered_at {
        Some(at) if !a.active => now - at < delay,
        _ => true,
    });
    before - alerts.len()
}
