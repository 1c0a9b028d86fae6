//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;
use crate::domain::market::MAX_CANDLES;

/// Upper bound on `live_candle_seconds` (one day).
const MAX_LIVE_CANDLE_SECONDS: u64 = 86_400;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    asset = %config.session.asset,
    win_probability = config.session.win_probability,
    growth = config.xp.growth,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
pub fn validate_config(config: &AppConfig) -> Result<()> {
  let session = &config.session;
  anyhow::ensure!(
    (0.0..=1.0).contains(&session.win_probability),
    "win_probability must be in [0, 1], got {}",
    session.win_probability
  );
  anyhow::ensure!(
    session.win_multiplier.is_finite() && session.win_multiplier >= 0.0,
    "win_multiplier must be >= 0, got {}",
    session.win_multiplier
  );
  anyhow::ensure!(
    session.loss_multiplier.is_finite() && session.loss_multiplier <= 0.0,
    "loss_multiplier must be <= 0, got {}",
    session.loss_multiplier
  );
  anyhow::ensure!(
    session.initial_balance > Decimal::ZERO,
    "initial_balance must be positive"
  );
  anyhow::ensure!(
    session.position_size > Decimal::ZERO,
    "position_size must be positive"
  );
  anyhow::ensure!(!session.asset.is_empty(), "asset must not be empty");

  anyhow::ensure!(
    config.xp.growth.is_finite() && config.xp.growth > 1.0,
    "xp growth must be > 1, got {}",
    config.xp.growth
  );
  anyhow::ensure!(config.xp.initial_xp_needed > 0, "initial_xp_needed must be positive");

  let market = &config.market;
  anyhow::ensure!(!market.assets.is_empty(), "market.assets must not be empty");
  for asset in &market.assets {
    anyhow::ensure!(
      asset.price.is_finite() && asset.price > 0.0,
      "asset {} price must be positive, got {}",
      asset.symbol,
      asset.price
    );
  }
  anyhow::ensure!(
    market.asset(&session.asset).is_some(),
    "session asset {} is not in market.assets",
    session.asset
  );
  anyhow::ensure!(
    (1..=MAX_CANDLES).contains(&market.candle_count),
    "candle_count must be in 1..={}, got {}",
    MAX_CANDLES,
    market.candle_count
  );
  anyhow::ensure!(
    market.touch_tolerance > 0.0 && market.touch_tolerance < 1.0,
    "touch_tolerance must be in (0, 1), got {}",
    market.touch_tolerance
  );
  anyhow::ensure!(
    market.session_close_hour < 24 && market.session_open_hour < market.session_close_hour,
    "trading window must satisfy open < close < 24, got {}..{}",
    market.session_open_hour,
    market.session_close_hour
  );
  anyhow::ensure!(market.tick_interval_ms > 0, "tick_interval_ms must be positive");
  anyhow::ensure!(
    (1..=MAX_LIVE_CANDLE_SECONDS).contains(&market.live_candle_seconds),
    "live_candle_seconds must be in 1..={}, got {}",
    MAX_LIVE_CANDLE_SECONDS,
    market.live_candle_seconds
  );
  anyhow::ensure!(
    (0.0..1.0).contains(&market.volatility) && (0.0..1.0).contains(&market.jitter),
    "volatility and jitter must be fractions in [0, 1)"
  );
  anyhow::ensure!(config.alerts.scan_interval_ms > 0, "scan_interval_ms must be positive");

  anyhow::ensure!(
    !config.persistence.storage_key.is_empty(),
    "storage_key must not be empty"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::XpPolicyKind;
  use crate::domain::{Timeframe, XpPolicy};

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.xp.policy(), XpPolicy::Outcome { win: 25, loss: 10 });
    assert_eq!(config.persistence.storage_key, "tradersDojoData");
  }

  #[test]
  fn test_flat_policy_and_overrides() {
    let config = parse_config(
      r#"
      [session]
      win_probability = 1.0
      position_size = 250

      [xp]
      policy = "flat"
      flat_xp = 15
      "#,
    )
    .unwrap();
    assert_eq!(config.xp.policy, XpPolicyKind::Flat);
    assert_eq!(config.xp.policy(), XpPolicy::Flat { per_trade: 15 });
    assert_eq!(config.session.position_size, Decimal::new(250, 0));
  }

  #[test]
  fn test_rejects_bad_probability() {
    let err = parse_config("[session]\nwin_probability = 1.5\n").unwrap_err();
    assert!(err.to_string().contains("win_probability"));
  }

  #[test]
  fn test_rejects_flat_growth() {
    assert!(parse_config("[xp]\ngrowth = 1.0\n").is_err());
  }

  #[test]
  fn test_rejects_inverted_window() {
    assert!(parse_config("[market]\nsession_open_hour = 18\nsession_close_hour = 9\n").is_err());
  }

  #[test]
  fn test_rejects_oversized_chart() {
    let err = parse_config("[market]\ncandle_count = 1000\n").unwrap_err();
    assert!(err.to_string().contains("candle_count"));
    assert!(parse_config("[market]\ncandle_count = 0\n").is_err());
    let err = parse_config("[market]\nlive_candle_seconds = 9223372036854775807\n").unwrap_err();
    assert!(err.to_string().contains("live_candle_seconds"));
  }

  #[test]
  fn test_custom_catalog_and_timeframe() {
    let config = parse_config(
      r#"
      [session]
      asset = "ETH/USD"

      [market]
      timeframe = "15m"

      [[market.assets]]
      symbol = "ETH/USD"
      name = "Ethereum"
      price = 2450.75
      "#,
    )
    .unwrap();
    assert_eq!(config.market.timeframe, Timeframe::M15);
    assert_eq!(config.market.assets.len(), 1);
    assert_eq!(config.market.asset("eth").map(|a| a.price), Some(2450.75));
  }

  #[test]
  fn test_rejects_asset_outside_catalog() {
    let err = parse_config("[session]\nasset = \"PEPE/USD\"\n").unwrap_err();
    assert!(err.to_string().contains("PEPE/USD"));
    assert!(parse_config("[market]\nassets = []\n").is_err());
    assert!(parse_config("[market]\ntimeframe = \"2h\"\n").is_err());
  }
}
