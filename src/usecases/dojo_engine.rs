//! Dojo Engine - Single-Task Event Loop
//!
//! Serializes every input through one `tokio::select!` loop so each
//! callback runs to completion before the next:
//! - user commands from an mpsc channel
//! - price jitter ticks (market desk)
//! - alert scan ticks (scan + purge)
//! - training-time ticks (one per minute)
//! - config reloads from the hot-reload watch channel
//!
//! Results are published as `SessionEvent`s on a broadcast channel for
//! the presentation layer. Every handler also returns its events, so the
//! engine can be driven synchronously in tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::metrics::{HealthState, SessionMetrics};
use crate::config::AppConfig;
use crate::domain::mentor::{self, Tool};
use crate::domain::trendline::Anchor;
use crate::domain::{
  AchievementId, Alert, AlertCondition, AlertTrigger, AssetInfo, Direction, DojoError, LevelUpEvent,
  PendingTrade, SetupAnalysis, Timeframe, TouchEvent, TradeRecord, TrendLine,
};
use crate::ports::{ProfileStore, RandomSource};

use super::market_desk::{DeskSettings, MarketDesk};
use super::trade_session::{SessionSettings, SessionStats, TradeResult, TradeSession};

/// Minutes of training time are counted on this cadence.
const TRAINING_TICK: Duration = Duration::from_secs(60);

/// Trades listed by the `history` command.
pub const HISTORY_LEN: usize = 5;

/// User intent, as parsed by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Select(Direction),
  Cancel,
  Execute,
  SetPositionSize(Decimal),
  SetRiskPercent(Decimal),
  AddAlert {
    price: Decimal,
    condition: Option<AlertCondition>,
  },
  RemoveAlert(Uuid),
  ListAlerts,
  CompleteLesson(String),
  Ask(String),
  ToolTip(Tool),
  DrawLine {
    start: Anchor,
    end: Anchor,
  },
  Setup,
  /// Switch to a catalog asset by symbol or base.
  ChangeAsset(String),
  /// Catalog entries matching a search term; empty lists all.
  ListAssets(String),
  ChangeTimeframe(Timeframe),
  /// Regenerate the chart for the current asset and timeframe.
  NewChart,
  Stats,
  History,
  Quit,
}

/// Something the presentation layer should render.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
  Selected {
    pending: PendingTrade,
    analysis: String,
  },
  Cancelled,
  TradeSettled(TradeResult),
  LevelUp(LevelUpEvent),
  AchievementUnlocked(AchievementId),
  LessonCompleted {
    lesson: String,
    xp: u64,
  },
  Mentor(String),
  Warning(String),
  PositionSizeChanged(Decimal),
  RiskPercentChanged(Decimal),
  AlertAdded(Alert),
  AlertRemoved(Uuid),
  AlertTriggered(AlertTrigger),
  Alerts(Vec<Alert>),
  TrendLineAdded(TrendLine),
  TrendLineTouched(TouchEvent),
  Setup(SetupAnalysis),
  ChartLoaded {
    asset: AssetInfo,
    timeframe: Timeframe,
    price: Decimal,
  },
  Assets(Vec<AssetInfo>),
  Stats {
    stats: SessionStats,
    price: Decimal,
    session_active: bool,
    countdown: String,
  },
  History(Vec<TradeRecord>),
  ConfigReloaded,
  Shutdown,
}

/// Loop cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
  pub price_tick: Duration,
  pub alert_scan: Duration,
}

impl EngineTiming {
  pub fn from_config(config: &AppConfig) -> Self {
    Self {
      price_tick: Duration::from_millis(config.market.tick_interval_ms),
      alert_scan: Duration::from_millis(config.alerts.scan_interval_ms),
    }
  }
}

/// Owns the session and the desk and runs the event loop.
pub struct DojoEngine<S: ProfileStore, R: RandomSource, D: RandomSource> {
  session: TradeSession<S, R>,
  desk: MarketDesk<D>,
  timing: EngineTiming,
  events_tx: broadcast::Sender<SessionEvent>,
  metrics: Option<Arc<SessionMetrics>>,
  health: Option<Arc<HealthState>>,
}

impl<S: ProfileStore, R: RandomSource, D: RandomSource> DojoEngine<S, R, D> {
  pub fn new(
    session: TradeSession<S, R>,
    desk: MarketDesk<D>,
    timing: EngineTiming,
    events_tx: broadcast::Sender<SessionEvent>,
  ) -> Self {
    Self {
      session,
      desk,
      timing,
      events_tx,
      metrics: None,
      health: None,
    }
  }

  pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
    metrics.observe_profile(self.session.profile());
    self.metrics = Some(metrics);
    self
  }

  pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
    self.health = Some(health);
    self
  }

  pub fn session(&self) -> &TradeSession<S, R> {
    &self.session
  }

  pub fn desk(&self) -> &MarketDesk<D> {
    &self.desk
  }

  /// Run until `quit`, a closed command channel or the shutdown signal.
  #[instrument(skip_all, name = "dojo_loop")]
  pub async fn run(
    mut self,
    mut commands: mpsc::Receiver<Command>,
    mut config_rx: watch::Receiver<AppConfig>,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) -> Result<()> {
    info!(
      price_tick_ms = self.timing.price_tick.as_millis(),
      alert_scan_ms = self.timing.alert_scan.as_millis(),
      "Dojo engine started"
    );
    self.set_running(true);
    self.publish(vec![
      SessionEvent::Mentor(mentor::WELCOME.to_string()),
      self.chart_loaded(),
    ]);

    let mut price_tick = interval(self.timing.price_tick);
    let mut alert_tick = interval(self.timing.alert_scan);
    let mut training_tick = interval(TRAINING_TICK);
    for t in [&mut price_tick, &mut alert_tick, &mut training_tick] {
      t.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }
    // The first tick of an interval completes immediately.
    training_tick.tick().await;
    let mut config_open = true;

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received");
          break;
        }
        cmd = commands.recv() => {
          let Some(cmd) = cmd else {
            info!("Command channel closed");
            break;
          };
          if cmd == Command::Quit {
            break;
          }
          let events = self.handle_command(cmd, Utc::now());
          self.publish(events);
        }
        changed = config_rx.changed(), if config_open => {
          if changed.is_err() {
            config_open = false;
            continue;
          }
          let config = config_rx.borrow_and_update().clone();
          let events = self.apply_config(&config);
          self.publish(events);
        }
        _ = price_tick.tick() => {
          let events = self.on_price_tick(Utc::now());
          self.publish(events);
        }
        _ = alert_tick.tick() => {
          let events = self.on_alert_scan(Utc::now());
          self.publish(events);
        }
        _ = training_tick.tick() => {
          self.on_training_tick();
        }
      }
    }

    self.session.persist();
    self.set_running(false);
    self.publish(vec![SessionEvent::Shutdown]);
    info!(
      balance = %self.session.profile().balance,
      level = self.session.profile().level,
      "Dojo engine stopped"
    );
    Ok(())
  }

  fn publish(&self, events: Vec<SessionEvent>) {
    for event in events {
      // No subscribers is fine: the engine runs headless in tests.
      let _ = self.events_tx.send(event);
    }
  }

  fn set_running(&self, running: bool) {
    if let Some(h) = &self.health {
      h.set_engine_running(running);
    }
  }

  fn sync_health(&self) {
    if let Some(h) = &self.health {
      h.set_store_healthy(self.session.store_healthy());
    }
    if let Some(m) = &self.metrics {
      m.observe_profile(self.session.profile());
    }
  }

  fn warn_event(&self, err: &DojoError) -> SessionEvent {
    warn!(error = %err, "Command rejected");
    if let Some(m) = &self.metrics {
      let reason = match err {
        DojoError::NoPendingTrade => "no_pending_trade",
        DojoError::InsufficientBalance { .. } => "insufficient_balance",
        DojoError::InvalidAlertPrice(_) => "invalid_alert_price",
        DojoError::InvalidPositionSize(_) => "invalid_position_size",
        DojoError::InvalidRiskPercent(_) => "invalid_risk_percent",
        DojoError::UnknownAlert(_) => "unknown_alert",
        DojoError::UnknownAsset(_) => "unknown_asset",
        DojoError::UnknownTimeframe(_) => "unknown_timeframe",
      };
      m.rejections.with_label_values(&[reason]).inc();
    }
    SessionEvent::Warning(err.to_string())
  }

  fn chart_loaded(&self) -> SessionEvent {
    if let Some(m) = &self.metrics {
      m.price.set(self.desk.last_price());
    }
    SessionEvent::ChartLoaded {
      asset: self.desk.asset().clone(),
      timeframe: self.desk.timeframe(),
      price: self.desk.current_price(),
    }
  }

  fn progress_events(&self, level_ups: &[LevelUpEvent], achievements: &[AchievementId]) -> Vec<SessionEvent> {
    if let Some(m) = &self.metrics {
      m.level_ups.inc_by(level_ups.len() as u64);
      for id in achievements {
        let label = id.to_string();
        m.achievements.with_label_values(&[label.as_str()]).inc();
      }
    }
    level_ups
      .iter()
      .copied()
      .map(SessionEvent::LevelUp)
      .chain(achievements.iter().copied().map(SessionEvent::AchievementUnlocked))
      .collect()
  }

  /// Apply one command and return the resulting events.
  #[instrument(skip(self, now))]
  pub fn handle_command(&mut self, command: Command, now: DateTime<Utc>) -> Vec<SessionEvent> {
    let events = match command {
      Command::Select(direction) => match self.session.select_direction(direction, now) {
        Ok(pending) => {
          let analysis = self.session.direction_analysis(direction);
          vec![SessionEvent::Selected { pending, analysis }]
        }
        Err(e) => vec![self.warn_event(&e)],
      },
      Command::Cancel => match self.session.cancel() {
        Some(_) => vec![SessionEvent::Cancelled],
        None => vec![self.warn_event(&DojoError::NoPendingTrade)],
      },
      Command::Execute => self.execute(now),
      Command::SetPositionSize(size) => match self.session.set_position_size(size) {
        Ok(()) => vec![SessionEvent::PositionSizeChanged(size)],
        Err(e) => vec![self.warn_event(&e)],
      },
      Command::SetRiskPercent(pct) => match self.session.set_risk_percent(pct) {
        Ok(()) => vec![SessionEvent::RiskPercentChanged(pct)],
        Err(e) => vec![self.warn_event(&e)],
      },
      Command::AddAlert { price, condition } => {
        let current = self.desk.current_price();
        match self.session.add_alert(price, condition, current, now) {
          Ok(alert) => vec![SessionEvent::AlertAdded(alert)],
          Err(e) => vec![self.warn_event(&e)],
        }
      }
      Command::RemoveAlert(id) => match self.session.remove_alert(id) {
        Ok(alert) => vec![SessionEvent::AlertRemoved(alert.id)],
        Err(e) => vec![self.warn_event(&e)],
      },
      Command::ListAlerts => vec![SessionEvent::Alerts(self.session.alerts().to_vec())],
      Command::CompleteLesson(lesson) => {
        let result = self.session.complete_lesson(&lesson);
        if result.newly_completed {
          let mut events = vec![SessionEvent::LessonCompleted {
            lesson,
            xp: result.xp_awarded,
          }];
          events.extend(self.progress_events(&result.level_ups, &result.achievements));
          events
        } else {
          vec![SessionEvent::Warning(format!("lesson '{lesson}' already completed"))]
        }
      }
      Command::Ask(question) => vec![SessionEvent::Mentor(self.session.ask_mentor(&question).to_string())],
      Command::ToolTip(tool) => {
        if tool == Tool::Clear {
          self.desk.clear_trend_lines();
        }
        vec![SessionEvent::Mentor(tool.tip().to_string())]
      }
      Command::DrawLine { start, end } => vec![SessionEvent::TrendLineAdded(self.desk.add_trend_line(start, end))],
      Command::Setup => match self.desk.analyze_setup(now) {
        Some(analysis) => vec![SessionEvent::Setup(analysis)],
        None => vec![SessionEvent::Warning("No active trend line setup detected".to_string())],
      },
      Command::ChangeAsset(query) => self.change_asset(&query, now),
      Command::ListAssets(term) => vec![SessionEvent::Assets(self.desk.filter_assets(&term))],
      Command::ChangeTimeframe(timeframe) => {
        self.desk.change_timeframe(timeframe, now);
        vec![
          self.chart_loaded(),
          SessionEvent::Mentor(mentor::timeframe_switched(timeframe)),
        ]
      }
      Command::NewChart => {
        self.desk.regenerate(now);
        vec![self.chart_loaded(), SessionEvent::Mentor(mentor::NEW_CHART.to_string())]
      }
      Command::Stats => {
        let window = self.desk.window();
        vec![SessionEvent::Stats {
          stats: self.session.stats(),
          price: self.desk.current_price(),
          session_active: window.is_active(now),
          countdown: window.countdown(now),
        }]
      }
      Command::History => vec![SessionEvent::History(
        self.session.recent_trades(HISTORY_LEN).cloned().collect(),
      )],
      Command::Quit => vec![SessionEvent::Shutdown],
    };
    self.sync_health();
    events
  }

  /// Regenerate the chart for another asset. A pending trade on the old
  /// asset is cancelled.
  fn change_asset(&mut self, query: &str, now: DateTime<Utc>) -> Vec<SessionEvent> {
    let changed = self.desk.change_asset(query, now).map(|asset| asset.symbol.clone());
    let symbol = match changed {
      Ok(symbol) => symbol,
      Err(e) => return vec![self.warn_event(&e)],
    };
    let mut events = Vec::new();
    if self.session.set_asset(&symbol).is_some() {
      events.push(SessionEvent::Cancelled);
    }
    events.push(self.chart_loaded());
    events
  }

  fn execute(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
    let entry = self.desk.current_price();
    match self.session.execute(entry, now) {
      Ok(result) => {
        if let Some(m) = &self.metrics {
          let outcome = if result.record.is_win { "win" } else { "loss" };
          let direction = result.record.direction.to_string().to_lowercase();
          m.trades.with_label_values(&[outcome, direction.as_str()]).inc();
        }
        let mut events = self.progress_events(&result.level_ups, &result.achievements);
        events.insert(0, SessionEvent::TradeSettled(result));
        events
      }
      Err(e) => vec![self.warn_event(&e)],
    }
  }

  /// Move the mock price and report new trend-line touches.
  pub fn on_price_tick(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
    let touches = self.desk.tick(now);
    if let Some(m) = &self.metrics {
      m.price.set(self.desk.last_price());
    }
    touches.into_iter().map(SessionEvent::TrendLineTouched).collect()
  }

  /// Fire crossed alerts, then purge old triggered ones.
  pub fn on_alert_scan(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
    let price = self.desk.current_price();
    let fired = self.session.scan_alerts(price, now);
    let purged = self.session.purge_alerts(now);
    if purged > 0 {
      debug!(purged, "Purged triggered alerts");
    }
    if let Some(m) = &self.metrics {
      m.alerts_triggered.inc_by(fired.len() as u64);
    }
    self.sync_health();
    fired.into_iter().map(SessionEvent::AlertTriggered).collect()
  }

  pub fn on_training_tick(&mut self) {
    self.session.record_training_minute();
    self.sync_health();
  }

  /// Re-apply tunables from a reloaded config. The profile is untouched;
  /// tick cadences keep their startup values.
  pub fn apply_config(&mut self, config: &AppConfig) -> Vec<SessionEvent> {
    self.session.reconfigure(SessionSettings::from_config(config));
    self.desk.reconfigure(DeskSettings::from_config(config));
    if EngineTiming::from_config(config) != self.timing {
      warn!("Tick interval changes take effect after restart");
    }
    vec![SessionEvent::ConfigReloaded]
  }
}
