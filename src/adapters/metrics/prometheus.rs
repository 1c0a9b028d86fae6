//! Prometheus Metrics Registry - Session Observability
//!
//! Registers and exposes Prometheus metrics for the practice session:
//! trade outcomes, level-ups, achievements, alert triggers and the
//! balance / XP / level gauges.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::Profile;

/// Prometheus metrics for one dojo session.
///
/// All metrics follow the naming convention `trading_dojo_*`.
pub struct SessionMetrics {
  registry: Registry,
  /// Executed trades by outcome (`win` / `loss`) and direction.
  pub trades: IntCounterVec,
  /// Rejected commands by error kind.
  pub rejections: IntCounterVec,
  pub level_ups: IntCounter,
  pub achievements: IntCounterVec,
  pub alerts_triggered: IntCounter,
  /// Practice balance.
  pub balance: Gauge,
  pub xp: IntGauge,
  pub level: IntGauge,
  /// Last mock price seen by the engine.
  pub price: Gauge,
}

impl SessionMetrics {
  /// Create and register all Prometheus metrics.
  pub fn new() -> anyhow::Result<Self> {
    let registry = Registry::new();

    let trades = IntCounterVec::new(
      Opts::new("trading_dojo_trades_total", "Executed practice trades"),
      &["outcome", "direction"],
    )?;
    let rejections = IntCounterVec::new(
      Opts::new("trading_dojo_rejections_total", "Commands rejected by the session"),
      &["reason"],
    )?;
    let level_ups = IntCounter::new("trading_dojo_level_ups_total", "Levels gained")?;
    let achievements = IntCounterVec::new(
      Opts::new("trading_dojo_achievements_total", "Achievements unlocked"),
      &["achievement"],
    )?;
    let alerts_triggered = IntCounter::new("trading_dojo_alerts_triggered_total", "Price alerts fired")?;
    let balance = Gauge::new("trading_dojo_balance", "Practice balance")?;
    let xp = IntGauge::new("trading_dojo_xp", "XP towards the next level")?;
    let level = IntGauge::new("trading_dojo_level", "Current level")?;
    let price = Gauge::new("trading_dojo_mock_price", "Last mock chart price")?;

    registry.register(Box::new(trades.clone()))?;
    registry.register(Box::new(rejections.clone()))?;
    registry.register(Box::new(level_ups.clone()))?;
    registry.register(Box::new(achievements.clone()))?;
    registry.register(Box::new(alerts_triggered.clone()))?;
    registry.register(Box::new(balance.clone()))?;
    registry.register(Box::new(xp.clone()))?;
    registry.register(Box::new(level.clone()))?;
    registry.register(Box::new(price.clone()))?;

    Ok(Self {
      registry,
      trades,
      rejections,
      level_ups,
      achievements,
      alerts_triggered,
      balance,
      xp,
      level,
      price,
    })
  }

  /// Refresh the profile gauges.
  pub fn observe_profile(&self, profile: &Profile) {
    use rust_decimal::prelude::ToPrimitive;

    self.balance.set(profile.balance.to_f64().unwrap_or_default());
    self.xp.set(i64::try_from(profile.xp).unwrap_or(i64::MAX));
    self.level.set(i64::from(profile.level));
  }

  /// Text exposition of every registered metric.
  pub fn render(&self) -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
      warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
  }

  /// Serve Prometheus metrics on the configured bind address.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn serve(
    self: Arc<Self>,
    bind_address: String,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> anyhow::Result<()> {
    let metrics = Arc::clone(&self);
    let app = Router::new().route(
      "/metrics",
      get(move || {
        let metrics = Arc::clone(&metrics);
        async move { metrics.render() }
      }),
    );

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Prometheus metrics server started");

    axum::serve(listener, app)
      .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
      })
      .await?;

    Ok(())
  }
}
