//! Persisted session blob.
//!
//! Shape: `{ user, tradeHistory, alerts, positionSize, riskPercent }`.
//! Loading shallow-merges the saved blob over a fresh template, at the top
//! level and one level down inside `user`, so blobs written before a field
//! existed still load with that field at its initial value.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::alert::Alert;
use super::profile::Profile;
use super::trade::TradeRecord;

/// Default storage key.
pub const STORAGE_KEY: &str = "tradersDojoData";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub user: Profile,
    /// Most recent first.
    pub trade_history: VecDeque<TradeRecord>,
    pub alerts: Vec<Alert>,
    pub position_size: Decimal,
    pub risk_percent: Decimal,
}

/// How a restore went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing was stored; the template is used as is.
    Fresh,
    /// Saved fields were merged over the template.
    Merged,
    /// The blob could not be read; the template is used. Carries the reason.
    Fallback(String),
}

impl PersistedState {
    pub fn new(user: Profile, position_size: Decimal, risk_percent: Decimal) -> Self {
        Self {
            user,
            trade_history: VecDeque::new(),
            alerts: Vec::new(),
            position_size,
            risk_percent,
        }
    }

    /// Merge `blob` over `template`, falling back to the template when the
    /// blob is malformed.
    pub fn restore(blob: Option<&str>, template: &Self) -> (Self, RestoreOutcome) {
        let Some(blob) = blob else {
            return (template.clone(), RestoreOutcome::Fresh);
        };
        match Self::merge(blob, template) {
            Ok(state) => (state, RestoreOutcome::Merged),
            Err(e) => (template.clone(), RestoreOutcome::Fallback(e.to_string())),
        }
    }

    fn merge(blob: &str, template: &Self) -> serde_json::Result<Self> {
        let saved: Value = serde_json::from_str(blob)?;
        let Value::Object(saved) = saved else {
            return Err(serde::de::Error::custom("persisted state is not an object"));
        };
        let mut merged = serde_json::to_value(template)?;
        if let Value::Object(base) = &mut merged {
            for (key, value) in saved {
                if let (Some(Value::Object(user)), Value::Object(saved_user)) = (base.get_mut("user"), &value) {
                    if key == "user" {
                        user.extend(saved_user.clone());
                        continue;
                    }
                }
                base.insert(key, value);
            }
        }
        serde_json::from_value(merged)
    }

    /// Serialize for the store.
    pub fn to_blob(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn template() -> PersistedState {
        PersistedState::new(Profile::new(dec!(10000), 100), dec!(1000), dec!(2))
    }

    #[test]
    fn test_missing_blob_is_fresh() {
        let (state, outcome) = PersistedState::restore(None, &template());
        assert_eq!(outcome, RestoreOutcome::Fresh);
        assert_eq!(state, template());
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let mut state = template();
        state.user.level = 4;
        state.user.lessons_completed.insert("basics".to_string());
        state.position_size = dec!(250.50);

        let blob = state.to_blob().unwrap();
        let (restored, outcome) = PersistedState::restore(Some(&blob), &template());
        assert_eq!(outcome, RestoreOutcome::Merged);
        assert_eq!(restored, state);
    }

    #[test]
    fn test_partial_user_keeps_template_fields() {
        let blob = r#"{"user":{"level":7,"xp":12},"riskPercent":"1.5"}"#;
        let (state, _) = PersistedState::restore(Some(blob), &template());
        assert_eq!(state.user.level, 7);
        assert_eq!(state.user.xp, 12);
        assert_eq!(state.user.xp_needed, 100);
        assert_eq!(state.risk_percent, dec!(1.5));
        assert_eq!(state.position_size, dec!(1000));
    }

    #[test]
    fn test_malformed_blob_falls_back() {
        let (state, outcome) = PersistedState::restore(Some("{not json"), &template());
        assert!(matches!(outcome, RestoreOutcome::Fallback(_)));
        assert_eq!(state, template());

        let (_, outcome) = PersistedState::restore(Some("[1,2]"), &template());
        assert!(matches!(outcome, RestoreOutcome::Fallback(_)));
    }

    #[test]
    fn test_wrong_field_type_falls_back() {
        let blob = r#"{"user":{"level":"high"}}"#;
        let (state, outcome) = PersistedState::restore(Some(blob), &template());
        assert!(matches!(outcome, RestoreOutcome::Fallback(_)));
        assert_eq!(state.user.level, 1);
    }
}
