//! Configuration Module - TOML-based Dojo Configuration
//!
//! Loads and validates configuration from `config.toml`. Payout odds,
//! the XP curve, alert timing and the mock chart are all externalized
//! here so one parameterized session covers every game variant.
//!
//! Every section and field has a default, so an empty file is valid.

pub mod hot_reload;
pub mod loader;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::assets::{self, AssetInfo, Timeframe};
use crate::domain::{LevelCurve, PayoutModel, TradingWindow, XpPolicy};

/// Top-level dojo configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AppConfig {
  /// Identity, logging and reload settings.
  #[serde(default)]
  pub app: AppSection,
  /// Trade sizing and payout odds.
  #[serde(default)]
  pub session: SessionConfig,
  /// XP curve and award policy.
  #[serde(default)]
  pub xp: XpConfig,
  /// Alert scan and purge timing.
  #[serde(default)]
  pub alerts: AlertConfig,
  /// Mock chart parameters.
  #[serde(default)]
  pub market: MarketConfig,
  #[serde(default)]
  pub persistence: PersistenceConfig,
  #[serde(default)]
  pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppSection {
  /// Human-readable dojo name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Fixed RNG seed for reproducible sessions.
  #[serde(default)]
  pub rng_seed: Option<u64>,
  /// Seconds between config file checks. 0 disables hot reload.
  #[serde(default = "default_reload_interval")]
  pub reload_interval_seconds: u64,
}

/// Trade sizing and the coin-flip payout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
  /// Starting asset; must be in `market.assets`.
  #[serde(default = "default_asset")]
  pub asset: String,
  /// Balance of a fresh profile.
  #[serde(default = "default_initial_balance")]
  pub initial_balance: Decimal,
  /// Position size for a fresh session.
  #[serde(default = "default_position_size")]
  pub position_size: Decimal,
  /// Risk percent for a fresh session.
  #[serde(default = "default_risk_percent")]
  pub risk_percent: Decimal,
  /// Probability in [0, 1] that a trade wins.
  #[serde(default = "default_win_probability")]
  pub win_probability: f64,
  #[serde(default = "default_win_multiplier")]
  pub win_multiplier: f64,
  /// Must be <= 0.
  #[serde(default = "default_loss_multiplier")]
  pub loss_multiplier: f64,
}

/// Which XP policy a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpPolicyKind {
  Outcome,
  Flat,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct XpConfig {
  /// Threshold from level 1 to level 2.
  #[serde(default = "default_initial_xp_needed")]
  pub initial_xp_needed: u64,
  /// Threshold multiplier per level (> 1).
  #[serde(default = "default_growth")]
  pub growth: f64,
  #[serde(default = "default_policy")]
  pub policy: XpPolicyKind,
  #[serde(default = "default_win_xp")]
  pub win_xp: u64,
  #[serde(default = "default_loss_xp")]
  pub loss_xp: u64,
  /// Award per trade under the flat policy.
  #[serde(default = "default_flat_xp")]
  pub flat_xp: u64,
  /// Award for the first completion of a lesson.
  #[serde(default = "default_lesson_xp")]
  pub lesson_xp: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertConfig {
  /// Milliseconds between alert scans.
  #[serde(default = "default_scan_interval")]
  pub scan_interval_ms: u64,
  /// Seconds a triggered alert stays listed before purge.
  #[serde(default = "default_purge_delay")]
  pub purge_delay_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketConfig {
  /// Asset picker. Each chart is generated around the asset's price.
  #[serde(default = "assets::default_catalog")]
  pub assets: Vec<AssetInfo>,
  /// Starting candle width of the generated history.
  #[serde(default)]
  pub timeframe: Timeframe,
  /// Candles generated per chart, at most `MAX_CANDLES`.
  #[serde(default = "default_candle_count")]
  pub candle_count: usize,
  /// Seconds after which the live feed opens a new candle.
  #[serde(default = "default_live_candle")]
  pub live_candle_seconds: u64,
  /// Random-walk band as a fraction of the base price.
  #[serde(default = "default_volatility")]
  pub volatility: f64,
  /// Max fractional move of the last close per jitter tick.
  #[serde(default = "default_jitter")]
  pub jitter: f64,
  /// Milliseconds between price jitter ticks.
  #[serde(default = "default_tick_interval")]
  pub tick_interval_ms: u64,
  /// Trend-line touch tolerance as a fraction of the line price.
  #[serde(default = "default_touch_tolerance")]
  pub touch_tolerance: f64,
  /// UTC hour the trading window opens.
  #[serde(default = "default_open_hour")]
  pub session_open_hour: u32,
  /// UTC hour the trading window closes.
  #[serde(default = "default_close_hour")]
  pub session_close_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersistenceConfig {
  /// Directory holding the session blob.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Blob key; the file is `{data_dir}/{storage_key}.json`.
  #[serde(default = "default_storage_key")]
  pub storage_key: String,
  /// Keep the blob in memory only.
  #[serde(default)]
  pub ephemeral: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics and health endpoints.
  #[serde(default)]
  pub enabled: bool,
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  #[serde(default = "default_health_addr")]
  pub health_address: String,
}

impl SessionConfig {
  pub fn payout(&self) -> PayoutModel {
    PayoutModel {
      win_probability: self.win_probability,
      win_multiplier: self.win_multiplier,
      loss_multiplier: self.loss_multiplier,
    }
  }
}

impl XpConfig {
  pub fn policy(&self) -> XpPolicy {
    match self.policy {
      XpPolicyKind::Outcome => XpPolicy::Outcome {
        win: self.win_xp,
        loss: self.loss_xp,
      },
      XpPolicyKind::Flat => XpPolicy::Flat { per_trade: self.flat_xp },
    }
  }

  pub fn curve(&self) -> LevelCurve {
    LevelCurve::new(self.growth)
  }
}

impl MarketConfig {
  pub fn asset(&self, symbol: &str) -> Option<&AssetInfo> {
    assets::find(&self.assets, symbol)
  }

  pub fn window(&self) -> TradingWindow {
    TradingWindow {
      open_hour: self.session_open_hour,
      close_hour: self.session_close_hour,
    }
  }
}

impl Default for AppSection {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
      rng_seed: None,
      reload_interval_seconds: default_reload_interval(),
    }
  }
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      asset: default_asset(),
      initial_balance: default_initial_balance(),
      position_size: default_position_size(),
      risk_percent: default_risk_percent(),
      win_probability: default_win_probability(),
      win_multiplier: default_win_multiplier(),
      loss_multiplier: default_loss_multiplier(),
    }
  }
}

impl Default for XpConfig {
  fn default() -> Self {
    Self {
      initial_xp_needed: default_initial_xp_needed(),
      growth: default_growth(),
      policy: default_policy(),
      win_xp: default_win_xp(),
      loss_xp: default_loss_xp(),
      flat_xp: default_flat_xp(),
      lesson_xp: default_lesson_xp(),
    }
  }
}

impl Default for AlertConfig {
  fn default() -> Self {
    Self {
      scan_interval_ms: default_scan_interval(),
      purge_delay_seconds: default_purge_delay(),
    }
  }
}

impl Default for MarketConfig {
  fn default() -> Self {
    Self {
      assets: assets::default_catalog(),
      timeframe: Timeframe::default(),
      candle_count: default_candle_count(),
      live_candle_seconds: default_live_candle(),
      volatility: default_volatility(),
      jitter: default_jitter(),
      tick_interval_ms: default_tick_interval(),
      touch_tolerance: default_touch_tolerance(),
      session_open_hour: default_open_hour(),
      session_close_hour: default_close_hour(),
    }
  }
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      storage_key: default_storage_key(),
      ephemeral: false,
    }
  }
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
      health_address: default_health_addr(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "trading-dojo".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_reload_interval() -> u64 {
  60
}

fn default_asset() -> String {
  "BTC/USD".to_string()
}

fn default_initial_balance() -> Decimal {
  Decimal::new(10_000, 0)
}

fn default_position_size() -> Decimal {
  Decimal::new(1_000, 0)
}

fn default_risk_percent() -> Decimal {
  Decimal::new(2, 0)
}

fn default_win_probability() -> f64 {
  0.6
}

fn default_win_multiplier() -> f64 {
  0.1
}

fn default_loss_multiplier() -> f64 {
  -0.05
}

fn default_initial_xp_needed() -> u64 {
  100
}

fn default_growth() -> f64 {
  1.2
}

fn default_policy() -> XpPolicyKind {
  XpPolicyKind::Outcome
}

fn default_win_xp() -> u64 {
  25
}

fn default_loss_xp() -> u64 {
  10
}

fn default_flat_xp() -> u64 {
  10
}

fn default_lesson_xp() -> u64 {
  50
}

fn default_scan_interval() -> u64 {
  1_000
}

fn default_purge_delay() -> u64 {
  5
}

fn default_candle_count() -> usize {
  100
}

fn default_volatility() -> f64 {
  0.02
}

fn default_jitter() -> f64 {
  0.0005
}

fn default_tick_interval() -> u64 {
  3_000
}

fn default_live_candle() -> u64 {
  60
}

fn default_touch_tolerance() -> f64 {
  crate::domain::trendline::DEFAULT_TOLERANCE
}

fn default_open_hour() -> u32 {
  8
}

fn default_close_hour() -> u32 {
  17
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_storage_key() -> String {
  crate::domain::state::STORAGE_KEY.to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_addr() -> String {
  "0.0.0.0:8080".to_string()
}
