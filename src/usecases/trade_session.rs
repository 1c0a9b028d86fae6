//! Trade Session - Practice Trading State Machine
//!
//! Owns the profile, the pending trade, the trade history and the alert
//! book, and drives them through:
//!
//! `Idle --select_direction--> Selected --execute | cancel--> Idle`
//!
//! Every successful mutation persists the whole session blob. Persistence
//! is fire-and-forget: failures are logged and reflected in
//! `store_healthy()`, never returned to the caller.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::achievements::check_achievements;
use crate::domain::alert::{self, Alert, AlertCondition, AlertTrigger};
use crate::domain::mentor::{self, Topic};
use crate::domain::{
  AchievementId, DojoError, Direction, LevelCurve, LevelUpEvent, PayoutModel, PendingTrade,
  PersistedState, Profile, RestoreOutcome, TradeRecord, XpPolicy,
};
use crate::ports::random::pick;
use crate::ports::{ProfileStore, RandomSource};

/// Tunables a session runs with. Swappable at runtime via `reconfigure`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
  pub asset: String,
  pub payout: PayoutModel,
  pub xp_policy: XpPolicy,
  pub curve: LevelCurve,
  /// XP for the first completion of a lesson.
  pub lesson_xp: u64,
  /// How long a triggered alert stays listed.
  pub purge_delay: Duration,
}

impl SessionSettings {
  pub fn from_config(config: &AppConfig) -> Self {
    Self {
      asset: config.session.asset.clone(),
      payout: config.session.payout(),
      xp_policy: config.xp.policy(),
      curve: config.xp.curve(),
      lesson_xp: config.xp.lesson_xp,
      purge_delay: i64::try_from(config.alerts.purge_delay_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX),
    }
  }
}

impl Default for SessionSettings {
  fn default() -> Self {
    Self::from_config(&AppConfig::default())
  }
}

/// Everything a settled trade produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeResult {
  pub record: TradeRecord,
  pub balance: Decimal,
  pub win_rate: u32,
  pub xp_awarded: u64,
  pub level_ups: Vec<LevelUpEvent>,
  pub achievements: Vec<AchievementId>,
  /// Mentor feedback on the outcome.
  pub mentor: &'static str,
}

/// Outcome of `complete_lesson`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LessonResult {
  /// False when the lesson had already been completed.
  pub newly_completed: bool,
  pub xp_awarded: u64,
  pub level_ups: Vec<LevelUpEvent>,
  pub achievements: Vec<AchievementId>,
}

/// Stats panel read-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
  pub balance: Decimal,
  pub level: u32,
  pub xp: u64,
  pub xp_needed: u64,
  pub total_trades: u64,
  pub wins: u64,
  pub losses: u64,
  pub win_rate: u32,
  pub win_streak: u32,
  pub best_streak: u32,
  pub profit: Decimal,
  pub signals_unlocked: u32,
  pub lessons_completed: usize,
  pub achievements: usize,
  pub training_minutes: u64,
  pub active_alerts: usize,
  pub position_size: Decimal,
  pub risk_percent: Decimal,
}

/// Practice trading session over a blob store and a random source.
pub struct TradeSession<S: ProfileStore, R: RandomSource> {
  state: PersistedState,
  pending: Option<PendingTrade>,
  settings: SessionSettings,
  store: S,
  rng: R,
  store_healthy: bool,
}

impl<S: ProfileStore, R: RandomSource> TradeSession<S, R> {
  /// Start from `template` without reading the store.
  pub fn new(store: S, rng: R, settings: SessionSettings, template: PersistedState) -> Self {
    Self {
      state: template,
      pending: None,
      settings,
      store,
      rng,
      store_healthy: true,
    }
  }

  /// Load the saved blob and merge it over `template`.
  ///
  /// Unreadable or malformed state falls back to the template.
  #[instrument(skip_all)]
  pub fn restore(store: S, rng: R, settings: SessionSettings, template: PersistedState) -> Self {
    let blob = match store.load_blob() {
      Ok(blob) => blob,
      Err(e) => {
        warn!(error = %e, "Failed to read saved session, starting fresh");
        None
      }
    };

    let (state, outcome) = PersistedState::restore(blob.as_deref(), &template);
    match outcome {
      RestoreOutcome::Fresh => info!("No saved session, starting fresh"),
      RestoreOutcome::Merged => info!(
        level = state.user.level,
        trades = state.user.total_trades,
        alerts = state.alerts.len(),
        "Session restored"
      ),
      RestoreOutcome::Fallback(reason) => {
        warn!(reason = %reason, "Saved session is malformed, starting fresh");
      }
    }

    Self::new(store, rng, settings, state)
  }

  /// Template for a fresh session built from config.
  pub fn template(config: &AppConfig) -> PersistedState {
    PersistedState::new(
      Profile::new(config.session.initial_balance, config.xp.initial_xp_needed),
      config.session.position_size,
      config.session.risk_percent,
    )
  }

  pub fn profile(&self) -> &Profile {
    &self.state.user
  }

  pub fn pending(&self) -> Option<&PendingTrade> {
    self.pending.as_ref()
  }

  /// Full history, most recent first.
  pub fn history(&self) -> impl Iterator<Item = &TradeRecord> {
    self.state.trade_history.iter()
  }

  /// The `n` most recent trades.
  pub fn recent_trades(&self, n: usize) -> impl Iterator<Item = &TradeRecord> {
    self.state.trade_history.iter().take(n)
  }

  pub fn alerts(&self) -> &[Alert] {
    &self.state.alerts
  }

  pub fn position_size(&self) -> Decimal {
    self.state.position_size
  }

  pub fn risk_percent(&self) -> Decimal {
    self.state.risk_percent
  }

  pub fn settings(&self) -> &SessionSettings {
    &self.settings
  }

  pub fn state(&self) -> &PersistedState {
    &self.state
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// Whether the last persist succeeded and the store reports healthy.
  pub fn store_healthy(&self) -> bool {
    self.store_healthy && self.store.is_healthy()
  }

  /// Swap tunables. The profile, history and selected asset are untouched.
  pub fn reconfigure(&mut self, settings: SessionSettings) {
    info!(
      win_probability = settings.payout.win_probability,
      growth = settings.curve.growth(),
      "Session settings updated"
    );
    let asset = std::mem::take(&mut self.settings.asset);
    self.settings = SessionSettings { asset, ..settings };
  }

  /// Trade and set alerts on `symbol` from now on. A pending trade on the
  /// previous asset is discarded and returned.
  pub fn set_asset(&mut self, symbol: &str) -> Option<PendingTrade> {
    if self.settings.asset == symbol {
      return None;
    }
    debug!(from = %self.settings.asset, to = symbol, "Asset switched");
    self.settings.asset = symbol.to_string();
    self.pending.take()
  }

  pub fn asset(&self) -> &str {
    &self.settings.asset
  }

  fn ensure_affordable(&self, size: Decimal) -> Result<(), DojoError> {
    if size > self.state.user.balance {
      return Err(DojoError::InsufficientBalance {
        requested: size,
        available: self.state.user.balance,
      });
    }
    Ok(())
  }

  /// Select a direction at the current size. Replaces any pending trade.
  pub fn select_direction(&mut self, direction: Direction, now: DateTime<Utc>) -> Result<PendingTrade, DojoError> {
    self.ensure_affordable(self.state.position_size)?;

    let pending = PendingTrade {
      direction,
      asset: self.settings.asset.clone(),
      position_size: self.state.position_size,
      risk_percent: self.state.risk_percent,
      created_at: now,
    };
    debug!(%direction, size = %pending.position_size, "Direction selected");
    self.pending = Some(pending.clone());
    Ok(pending)
  }

  /// Discard the pending trade, if any.
  pub fn cancel(&mut self) -> Option<PendingTrade> {
    self.pending.take()
  }

  /// Settle the pending trade with the configured payout.
  pub fn execute(&mut self, entry_price: Decimal, now: DateTime<Utc>) -> Result<TradeResult, DojoError> {
    let payout = self.settings.payout;
    self.execute_with(entry_price, payout, now)
  }

  /// Settle the pending trade with an explicit payout model.
  ///
  /// On error nothing is mutated and the pending trade is kept.
  #[instrument(skip(self), fields(entry = %entry_price))]
  pub fn execute_with(
    &mut self,
    entry_price: Decimal,
    payout: PayoutModel,
    now: DateTime<Utc>,
  ) -> Result<TradeResult, DojoError> {
    let size = self.pending.as_ref().ok_or(DojoError::NoPendingTrade)?.position_size;
    self.ensure_affordable(size)?;
    let pending = self.pending.take().ok_or(DojoError::NoPendingTrade)?;

    let is_win = payout.is_win(self.rng.next_f64());
    let profit = payout.profit(pending.position_size, is_win);

    self.state.user.record_outcome(is_win, profit);
    let xp_awarded = self.settings.xp_policy.trade_award(is_win);
    let level_ups = self.award_xp(xp_awarded);

    let record = TradeRecord::settle(&pending, entry_price, profit, is_win, now);
    self.state.trade_history.push_front(record.clone());

    let achievements = self.check_achievements();
    let mentor = pick(&mut self.rng, mentor::feedback_lines(is_win)).copied().unwrap_or_default();

    info!(
      direction = %pending.direction,
      is_win,
      profit = %profit,
      balance = %self.state.user.balance,
      win_rate = self.state.user.win_rate,
      "Trade settled"
    );

    self.persist();

    Ok(TradeResult {
      record,
      balance: self.state.user.balance,
      win_rate: self.state.user.win_rate,
      xp_awarded,
      level_ups,
      achievements,
      mentor,
    })
  }

  /// Add XP, rolling overflow into level-ups.
  pub fn award_xp(&mut self, amount: u64) -> Vec<LevelUpEvent> {
    let events = self.settings.curve.award(&mut self.state.user, amount);
    for e in &events {
      info!(level = e.level, xp_needed = e.xp_needed, "Level up");
    }
    events
  }

  /// Record and return newly unlocked achievements.
  pub fn check_achievements(&mut self) -> Vec<AchievementId> {
    let unlocked = check_achievements(&mut self.state.user);
    for id in &unlocked {
      info!(achievement = %id, "Achievement unlocked");
    }
    unlocked
  }

  /// Mark a lesson completed. XP is only granted the first time.
  pub fn complete_lesson(&mut self, lesson_id: &str) -> LessonResult {
    let lesson_id = lesson_id.trim();
    if lesson_id.is_empty() || !self.state.user.lessons_completed.insert(lesson_id.to_string()) {
      return LessonResult::default();
    }

    let xp_awarded = self.settings.lesson_xp;
    let level_ups = self.award_xp(xp_awarded);
    let achievements = self.check_achievements();
    info!(lesson = lesson_id, "Lesson completed");
    self.persist();

    LessonResult {
      newly_completed: true,
      xp_awarded,
      level_ups,
      achievements,
    }
  }

  /// Change the size used by the next selection.
  pub fn set_position_size(&mut self, size: Decimal) -> Result<(), DojoError> {
    if size <= Decimal::ZERO {
      return Err(DojoError::InvalidPositionSize(size));
    }
    self.state.position_size = size;
    self.persist();
    Ok(())
  }

  pub fn set_risk_percent(&mut self, percent: Decimal) -> Result<(), DojoError> {
    if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
      return Err(DojoError::InvalidRiskPercent(percent));
    }
    self.state.risk_percent = percent;
    self.persist();
    Ok(())
  }

  /// Add an alert. Without a condition, it watches for a move from
  /// `current_price` towards the target.
  pub fn add_alert(
    &mut self,
    target_price: Decimal,
    condition: Option<AlertCondition>,
    current_price: Decimal,
    now: DateTime<Utc>,
  ) -> Result<Alert, DojoError> {
    if target_price <= Decimal::ZERO {
      return Err(DojoError::InvalidAlertPrice(target_price.to_string()));
    }
    let alert = Alert {
      id: Uuid::new_v4(),
      asset: self.settings.asset.clone(),
      target_price,
      condition: condition.unwrap_or_else(|| AlertCondition::towards(current_price, target_price)),
      active: true,
      created_at: now,
      triggered_at: None,
    };
    info!(id = %alert.id, target = %target_price, "Alert added");
    self.state.alerts.push(alert.clone());
    self.persist();
    Ok(alert)
  }

  pub fn remove_alert(&mut self, id: Uuid) -> Result<Alert, DojoError> {
    let idx = self
      .state
      .alerts
      .iter()
      .position(|a| a.id == id)
      .ok_or(DojoError::UnknownAlert(id))?;
    let removed = self.state.alerts.remove(idx);
    self.persist();
    Ok(removed)
  }

  /// Fire every active alert on the current asset crossed by `price`.
  pub fn scan_alerts(&mut self, price: Decimal, now: DateTime<Utc>) -> Vec<AlertTrigger> {
    let fired = alert::scan(&mut self.state.alerts, &self.settings.asset, price, now);
    if !fired.is_empty() {
      info!(count = fired.len(), price = %price, "Alerts triggered");
      self.persist();
    }
    fired
  }

  /// Drop triggered alerts past the purge delay.
  pub fn purge_alerts(&mut self, now: DateTime<Utc>) -> usize {
    let removed = alert::purge(&mut self.state.alerts, now, self.settings.purge_delay);
    if removed > 0 {
      debug!(removed, "Triggered alerts purged");
      self.persist();
    }
    removed
  }

  pub fn record_training_minute(&mut self) {
    self.state.user.training_minutes += 1;
    self.persist();
  }

  pub fn stats(&self) -> SessionStats {
    let p = &self.state.user;
    SessionStats {
      balance: p.balance,
      level: p.level,
      xp: p.xp,
      xp_needed: p.xp_needed,
      total_trades: p.total_trades,
      wins: p.wins,
      losses: p.losses,
      win_rate: p.win_rate,
      win_streak: p.win_streak,
      best_streak: p.best_streak,
      profit: p.profit,
      signals_unlocked: p.signals_unlocked,
      lessons_completed: p.lessons_completed.len(),
      achievements: p.achievements.len(),
      training_minutes: p.training_minutes,
      active_alerts: self.state.alerts.iter().filter(|a| a.active).count(),
      position_size: self.state.position_size,
      risk_percent: self.state.risk_percent,
    }
  }

  /// "Analysis for BUY: ..." line for a fresh selection.
  pub fn direction_analysis(&mut self, direction: Direction) -> String {
    let line = pick(&mut self.rng, mentor::direction_lines(direction)).copied().unwrap_or_default();
    mentor::direction_analysis(direction, line)
  }

  /// Keyword-routed mentor reply.
  pub fn ask_mentor(&mut self, question: &str) -> &'static str {
    let topic = Topic::categorize(question);
    pick(&mut self.rng, topic.lines()).copied().unwrap_or_default()
  }

  /// Save the whole blob. Returns whether the write succeeded.
  pub fn persist(&mut self) -> bool {
    let result = self
      .state
      .to_blob()
      .map_err(anyhow::Error::from)
      .and_then(|blob| self.store.save_blob(&blob));
    self.store_healthy = match result {
      Ok(()) => true,
      Err(e) => {
        warn!(error = %e, "Failed to persist session");
        false
      }
    };
    self.store_healthy
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::persistence::MemoryProfileStore;
  use rust_decimal_macros::dec;
  use std::sync::Arc;

  /// Always returns the same sample.
  struct Fixed(f64);

  impl RandomSource for Fixed {
    fn next_f64(&mut self) -> f64 {
      self.0
    }
  }

  fn session(balance: Decimal, sample: f64) -> TradeSession<Arc<MemoryProfileStore>, Fixed> {
    let template = PersistedState::new(Profile::new(balance, 100), dec!(100), dec!(2));
    TradeSession::new(Arc::new(MemoryProfileStore::new()), Fixed(sample), SessionSettings::default(), template)
  }

  fn certain_win() -> PayoutModel {
    PayoutModel {
      win_probability: 1.0,
      win_multiplier: 0.1,
      loss_multiplier: -0.05,
    }
  }

  #[test]
  fn test_buy_win_updates_profile() {
    let mut s = session(dec!(1000), 0.5);
    s.set_position_size(dec!(1000)).unwrap();
    s.select_direction(Direction::Buy, Utc::now()).unwrap();

    let result = s.execute_with(dec!(45000), certain_win(), Utc::now()).unwrap();

    assert_eq!(result.balance, dec!(1100));
    assert!(result.record.is_win);
    assert_eq!(s.profile().wins, 1);
    assert_eq!(s.profile().win_streak, 1);
    assert_eq!(s.profile().xp, 25);
    assert!(s.pending().is_none());
    assert_eq!(result.achievements, vec![AchievementId::FirstTrade]);
  }

  #[test]
  fn test_execute_without_selection_changes_nothing() {
    let mut s = session(dec!(1000), 0.0);
    let before = s.profile().clone();
    assert_eq!(s.execute(dec!(45000), Utc::now()), Err(DojoError::NoPendingTrade));
    assert_eq!(s.profile(), &before);
    assert!(s.store().snapshot().is_none());
  }

  #[test]
  fn test_oversized_selection_is_rejected() {
    let mut s = session(dec!(1000), 0.0);
    s.set_position_size(dec!(2000)).unwrap();
    let err = s.select_direction(Direction::Sell, Utc::now()).unwrap_err();
    assert_eq!(
      err,
      DojoError::InsufficientBalance {
        requested: dec!(2000),
        available: dec!(1000)
      }
    );
    assert!(s.pending().is_none());
  }

  #[test]
  fn test_loss_resets_streak_and_keeps_profit_total() {
    let mut s = session(dec!(1000), 0.99);
    s.select_direction(Direction::Buy, Utc::now()).unwrap();
    s.execute(dec!(100), Utc::now()).unwrap();
    s.select_direction(Direction::Sell, Utc::now()).unwrap();
    let result = s.execute(dec!(100), Utc::now()).unwrap();

    assert!(!result.record.is_win);
    assert_eq!(s.profile().balance, dec!(990));
    assert_eq!(s.profile().losses, 2);
    assert_eq!(s.profile().win_streak, 0);
    assert_eq!(s.profile().profit, Decimal::ZERO);
    assert_eq!(s.profile().xp, 20);
  }

  #[test]
  fn test_history_is_most_recent_first() {
    let mut s = session(dec!(1000), 0.1);
    for price in [dec!(1), dec!(2), dec!(3)] {
      s.select_direction(Direction::Buy, Utc::now()).unwrap();
      s.execute(price, Utc::now()).unwrap();
    }
    let entries: Vec<Decimal> = s.recent_trades(2).map(|r| r.entry_price).collect();
    assert_eq!(entries, vec![dec!(3), dec!(2)]);
    assert_eq!(s.history().count(), 3);
  }

  #[test]
  fn test_cancel_returns_to_idle() {
    let mut s = session(dec!(1000), 0.1);
    s.select_direction(Direction::Buy, Utc::now()).unwrap();
    assert!(s.cancel().is_some());
    assert!(s.cancel().is_none());
    assert_eq!(s.execute(dec!(1), Utc::now()), Err(DojoError::NoPendingTrade));
  }

  #[test]
  fn test_lesson_xp_granted_once() {
    let mut s = session(dec!(1000), 0.1);
    let first = s.complete_lesson("candlesticks");
    assert!(first.newly_completed);
    assert_eq!(first.achievements, vec![AchievementId::FirstLesson]);
    let again = s.complete_lesson("candlesticks");
    assert!(!again.newly_completed);
    assert_eq!(s.profile().xp, 50);
  }

  #[test]
  fn test_alert_defaults_towards_target_and_fires_once() {
    let mut s = session(dec!(1000), 0.1);
    let now = Utc::now();
    let alert = s.add_alert(dec!(46000), None, dec!(45000), now).unwrap();
    assert_eq!(alert.condition, AlertCondition::Above);

    assert!(s.scan_alerts(dec!(45500), now).is_empty());
    assert_eq!(s.scan_alerts(dec!(46001), now).len(), 1);
    assert!(s.scan_alerts(dec!(47000), now).is_empty());
    assert_eq!(s.purge_alerts(now + Duration::seconds(10)), 1);
    assert!(s.alerts().is_empty());
  }

  #[test]
  fn test_asset_switch_drops_pending_and_scopes_alerts() {
    let mut s = session(dec!(1000), 0.1);
    let now = Utc::now();
    s.add_alert(dec!(46000), None, dec!(45000), now).unwrap();
    s.select_direction(Direction::Buy, now).unwrap();

    let dropped = s.set_asset("ETH/USD").unwrap();
    assert_eq!(dropped.asset, "BTC/USD");
    assert!(s.pending().is_none());
    assert!(s.scan_alerts(dec!(50000), now).is_empty());

    s.reconfigure(SessionSettings::default());
    assert_eq!(s.asset(), "ETH/USD");
    assert!(s.set_asset("ETH/USD").is_none());

    s.set_asset("BTC/USD");
    assert_eq!(s.scan_alerts(dec!(46001), now).len(), 1);
  }

  #[test]
  fn test_alert_validation_and_removal() {
    let mut s = session(dec!(1000), 0.1);
    assert!(matches!(
      s.add_alert(dec!(0), None, dec!(45000), Utc::now()),
      Err(DojoError::InvalidAlertPrice(_))
    ));
    let id = Uuid::new_v4();
    assert_eq!(s.remove_alert(id), Err(DojoError::UnknownAlert(id)));
  }

  #[test]
  fn test_persist_then_restore() {
    let store = Arc::new(MemoryProfileStore::new());
    let template = PersistedState::new(Profile::new(dec!(1000), 100), dec!(100), dec!(2));
    let mut s = TradeSession::new(Arc::clone(&store), Fixed(0.1), SessionSettings::default(), template.clone());
    s.select_direction(Direction::Buy, Utc::now()).unwrap();
    s.execute(dec!(45000), Utc::now()).unwrap();

    let restored = TradeSession::restore(store, Fixed(0.1), SessionSettings::default(), template);
    assert_eq!(restored.profile(), s.profile());
    assert_eq!(restored.history().count(), 1);
  }

  #[test]
  fn test_invalid_settings_rejected() {
    let mut s = session(dec!(1000), 0.1);
    assert_eq!(s.set_position_size(dec!(0)), Err(DojoError::InvalidPositionSize(dec!(0))));
    assert_eq!(s.set_risk_percent(dec!(150)), Err(DojoError::InvalidRiskPercent(dec!(150))));
    assert_eq!(s.position_size(), dec!(100));
  }
}
