//! Market Desk - Mock Chart and Trend-Line Setups
//!
//! Stands in for a live chart: a random-walk candle window around the
//! selected asset's price whose last close jitters every tick, a new
//! candle per live interval, and a set of trend lines checked for touches
//! as price moves. Switching asset or timeframe regenerates the chart.
//! Provides the "current price" the session settles trades and scans
//! alerts against.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::domain::assets;
use crate::domain::trendline::Anchor;
use crate::domain::{
  AssetInfo, CandleSeries, DojoError, SetupAnalysis, StructureBreak, Timeframe, TouchEvent, TradingWindow,
  TrendLine,
};
use crate::ports::RandomSource;

/// Chart parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskSettings {
  pub catalog: Vec<AssetInfo>,
  /// Asset charted on a fresh desk.
  pub asset: AssetInfo,
  /// Candle width of a fresh desk.
  pub timeframe: Timeframe,
  pub candle_count: usize,
  /// Age after which the live feed opens a new candle.
  pub live_interval: Duration,
  pub volatility: f64,
  pub jitter: f64,
  pub tolerance: f64,
  pub window: TradingWindow,
}

impl DeskSettings {
  pub fn from_config(config: &AppConfig) -> Self {
    let market = &config.market;
    let live_interval = i64::try_from(market.live_candle_seconds)
      .ok()
      .and_then(Duration::try_seconds)
      .unwrap_or(Duration::MAX);
    Self {
      asset: assets::resolve(&market.assets, &config.session.asset),
      catalog: market.assets.clone(),
      timeframe: market.timeframe,
      candle_count: market.candle_count,
      live_interval,
      volatility: market.volatility,
      jitter: market.jitter,
      tolerance: market.touch_tolerance,
      window: market.window(),
    }
  }
}

impl Default for DeskSettings {
  fn default() -> Self {
    Self::from_config(&AppConfig::default())
  }
}

pub struct MarketDesk<R: RandomSource> {
  series: CandleSeries,
  lines: Vec<TrendLine>,
  settings: DeskSettings,
  asset: AssetInfo,
  timeframe: Timeframe,
  rng: R,
  next_line_id: u32,
}

impl<R: RandomSource> MarketDesk<R> {
  /// Generate the history window ending at `now` and seed two sample lines.
  pub fn new(rng: R, settings: DeskSettings, now: DateTime<Utc>) -> Self {
    let mut desk = Self::with_series(rng, settings, CandleSeries::default());
    desk.regenerate(now);
    desk
  }

  /// Desk over an existing series, with no trend lines.
  pub fn with_series(rng: R, settings: DeskSettings, series: CandleSeries) -> Self {
    Self {
      series,
      lines: Vec::new(),
      asset: settings.asset.clone(),
      timeframe: settings.timeframe,
      settings,
      rng,
      next_line_id: 1,
    }
  }

  /// Fresh chart for the current asset and timeframe ending at `now`.
  /// Drawn lines are replaced by the sample lines.
  pub fn regenerate(&mut self, now: DateTime<Utc>) {
    let rng = &mut self.rng;
    self.series = CandleSeries::generate(
      self.asset.price,
      self.settings.candle_count,
      self.timeframe.interval(),
      now,
      self.settings.volatility,
      || rng.next_f64(),
    );
    self.next_line_id = 1;
    self.lines.clear();
    self.seed_sample_lines();
    info!(
      asset = %self.asset.symbol,
      timeframe = self.timeframe.as_str(),
      candles = self.series.len(),
      "Chart generated"
    );
  }

  /// Switch to a catalog asset by symbol or base ("eth") and regenerate.
  pub fn change_asset(&mut self, query: &str, now: DateTime<Utc>) -> Result<&AssetInfo, DojoError> {
    let asset = assets::find(&self.settings.catalog, query)
      .cloned()
      .ok_or_else(|| DojoError::UnknownAsset(query.trim().to_string()))?;
    self.asset = asset;
    self.regenerate(now);
    Ok(&self.asset)
  }

  pub fn change_timeframe(&mut self, timeframe: Timeframe, now: DateTime<Utc>) {
    self.timeframe = timeframe;
    self.regenerate(now);
  }

  /// Catalog entries whose symbol or name contains `term`.
  pub fn filter_assets(&self, term: &str) -> Vec<AssetInfo> {
    assets::filter(&self.settings.catalog, term).into_iter().cloned().collect()
  }

  pub fn asset(&self) -> &AssetInfo {
    &self.asset
  }

  pub fn timeframe(&self) -> Timeframe {
    self.timeframe
  }

  /// One rising line already touched twice and one falling line touched
  /// once, so a fresh chart has a setup to study.
  fn seed_sample_lines(&mut self) {
    let n = self.series.len();
    if n < 10 {
      return;
    }
    let band = self.asset.price * self.settings.volatility;
    let (Some(a), Some(b), Some(c), Some(d)) = (
      self.series.get(n / 5).copied(),
      self.series.get(n * 4 / 5).copied(),
      self.series.get(n / 10).copied(),
      self.series.get(n * 7 / 10).copied(),
    ) else {
      return;
    };

    #[allow(clippy::cast_precision_loss)]
    let idx = |i: usize| i as f64;
    let mut up = TrendLine::new(
      self.line_id(),
      Anchor { index: idx(n / 5), price: a.low - band },
      Anchor { index: idx(n * 4 / 5), price: b.high + band },
    );
    up.touches = vec![n / 4, n / 2];
    let mut down = TrendLine::new(
      self.line_id(),
      Anchor { index: idx(n / 10), price: c.high + band * 0.8 },
      Anchor { index: idx(n * 7 / 10), price: d.low - band * 0.8 },
    );
    down.touches = vec![n * 3 / 10];
    self.lines = vec![up, down];
  }

  fn line_id(&mut self) -> String {
    let id = format!("trend_{}", self.next_line_id);
    self.next_line_id += 1;
    id
  }

  pub fn series(&self) -> &CandleSeries {
    &self.series
  }

  pub fn settings(&self) -> &DeskSettings {
    &self.settings
  }

  /// Swap chart parameters. The series, lines, asset and timeframe are
  /// kept; the asset's catalog entry is refreshed if it is still listed.
  pub fn reconfigure(&mut self, settings: DeskSettings) {
    if let Some(asset) = assets::find(&settings.catalog, &self.asset.symbol) {
      self.asset = asset.clone();
    }
    self.settings = settings;
  }

  pub fn trend_lines(&self) -> &[TrendLine] {
    &self.lines
  }

  pub fn last_price(&self) -> f64 {
    self.series.last_price().unwrap_or(self.asset.price)
  }

  /// Last close rounded to cents.
  pub fn current_price(&self) -> Decimal {
    Decimal::from_f64(self.last_price()).map_or(Decimal::ZERO, |p| p.round_dp(2))
  }

  /// Advance the feed: jitter the last close, open a new candle once the
  /// live interval has passed, then check every line for a fresh touch.
  pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<TouchEvent> {
    let jitter = self.settings.jitter;
    let change = self.rng.centered() * 2.0 * jitter;
    self.series.jitter_last(change);

    let due = self
      .series
      .last()
      .is_some_and(|c| now - c.time > self.settings.live_interval);
    if due {
      let up = self.rng.next_f64() * jitter * 4.0;
      let down = self.rng.next_f64() * jitter * 4.0;
      let drift = self.rng.centered() * 2.0 * jitter;
      let evicted = self.series.open_next(now, up, down, drift);
      if evicted > 0 {
        for line in &mut self.lines {
          line.shift_back(evicted);
        }
      }
      debug!(price = self.last_price(), "New candle opened");
    }

    let tolerance = self.settings.tolerance;
    let events: Vec<TouchEvent> = self
      .lines
      .iter_mut()
      .filter_map(|line| line.check_latest(&self.series, tolerance))
      .collect();
    for e in &events {
      info!(line = %e.line_id, touches = e.touches, entry_ready = e.entry_ready, "Trend line touched");
    }
    events
  }

  /// Draw a line between two anchors and count its touches.
  pub fn add_trend_line(&mut self, start: Anchor, end: Anchor) -> TrendLine {
    let mut line = TrendLine::new(self.line_id(), start, end);
    line.count_touches(&self.series, self.settings.tolerance);
    info!(line = %line.id, kind = %line.kind, touches = line.touches.len(), "Trend line added");
    self.lines.push(line.clone());
    line
  }

  pub fn clear_trend_lines(&mut self) {
    self.lines.clear();
  }

  /// First line with enough touches to count as a setup.
  pub fn auto_detect(&self) -> Option<&TrendLine> {
    self.lines.iter().find(|l| l.is_setup())
  }

  pub fn break_of_structure(&self) -> StructureBreak {
    self.series.break_of_structure()
  }

  /// Analysis of the detected setup, if there is one.
  pub fn analyze_setup(&self, now: DateTime<Utc>) -> Option<SetupAnalysis> {
    let line = self.auto_detect()?;
    Some(line.analyze(self.break_of_structure(), self.settings.window.is_active(now)))
  }

  pub fn window(&self) -> TradingWindow {
    self.settings.window
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Candle;

  struct Fixed(f64);

  impl RandomSource for Fixed {
    fn next_f64(&mut self) -> f64 {
      self.0
    }
  }

  fn flat_series(len: i64, start: DateTime<Utc>) -> CandleSeries {
    CandleSeries::from_candles((0..len).map(|i| Candle {
      time: start + Duration::minutes(i),
      open: 100.0,
      high: 101.0,
      low: 99.0,
      close: 100.0,
    }))
  }

  #[test]
  fn test_new_desk_has_window_and_sample_setup() {
    let desk = MarketDesk::new(Fixed(0.5), DeskSettings::default(), Utc::now());
    assert_eq!(desk.series().len(), 100);
    assert_eq!(desk.trend_lines().len(), 2);
    let setup = desk.auto_detect().unwrap();
    assert_eq!(setup.id, "trend_1");
    assert_eq!(setup.touches.len(), 2);
  }

  #[test]
  fn test_centered_jitter_of_half_is_neutral() {
    let now = Utc::now();
    let mut desk = MarketDesk::with_series(Fixed(0.5), DeskSettings::default(), flat_series(10, now));
    desk.tick(now);
    assert_eq!(desk.current_price(), Decimal::new(100, 0));
    assert_eq!(desk.series().len(), 10);
  }

  #[test]
  fn test_stale_candle_opens_new_one() {
    let start = Utc::now();
    let mut desk = MarketDesk::with_series(Fixed(0.5), DeskSettings::default(), flat_series(3, start));
    desk.tick(start + Duration::minutes(10));
    assert_eq!(desk.series().len(), 4);
  }

  #[test]
  fn test_drawn_line_touch_and_setup_analysis() {
    let now = Utc::now();
    let mut desk = MarketDesk::with_series(Fixed(0.5), DeskSettings::default(), flat_series(10, now));
    let line = desk.add_trend_line(Anchor { index: 0.0, price: 99.0 }, Anchor { index: 9.0, price: 99.0 });
    assert_eq!(line.touches.len(), 10);

    let analysis = desk.analyze_setup(now).unwrap();
    assert_eq!(analysis.touches_left, 0);
    assert_eq!(analysis.recommendation, "Ready for entry");
  }

  #[test]
  fn test_change_asset_regenerates_around_its_price() {
    let now = Utc::now();
    let mut desk = MarketDesk::new(Fixed(0.5), DeskSettings::default(), now);
    desk.clear_trend_lines();

    let asset = desk.change_asset("eth", now).unwrap();
    assert_eq!(asset.symbol, "ETH/USD");
    assert_eq!(desk.current_price(), Decimal::new(245_075, 2));
    assert_eq!(desk.series().len(), 100);
    assert_eq!(desk.trend_lines().len(), 2);
    assert_eq!(desk.trend_lines()[0].id, "trend_1");
  }

  #[test]
  fn test_unknown_asset_keeps_chart() {
    let now = Utc::now();
    let mut desk = MarketDesk::new(Fixed(0.5), DeskSettings::default(), now);
    let err = desk.change_asset("PEPE", now).unwrap_err();
    assert_eq!(err, DojoError::UnknownAsset("PEPE".to_string()));
    assert_eq!(desk.asset().symbol, "BTC/USD");
    assert_eq!(desk.current_price(), Decimal::new(4_532_050, 2));
  }

  #[test]
  fn test_change_timeframe_respaces_history() {
    let now = Utc::now();
    let mut desk = MarketDesk::new(Fixed(0.5), DeskSettings::default(), now);
    desk.change_timeframe(Timeframe::M15, now);
    assert_eq!(desk.timeframe(), Timeframe::M15);
    let first = desk.series().get(0).unwrap().time;
    assert_eq!(now - first, Duration::minutes(15 * 99));
  }

  #[test]
  fn test_reconfigure_keeps_selected_asset() {
    let now = Utc::now();
    let mut desk = MarketDesk::new(Fixed(0.5), DeskSettings::default(), now);
    desk.change_asset("SOL/USD", now).unwrap();
    desk.change_timeframe(Timeframe::H4, now);
    desk.reconfigure(DeskSettings::default());
    assert_eq!(desk.asset().symbol, "SOL/USD");
    assert_eq!(desk.timeframe(), Timeframe::H4);
  }

  #[test]
  fn test_filter_assets_by_name() {
    let desk = MarketDesk::new(Fixed(0.5), DeskSettings::default(), Utc::now());
    let hits = desk.filter_assets("PO");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].symbol, "DOT/USD");
    assert_eq!(hits[1].symbol, "MATIC/USD");
  }

  #[test]
  fn test_no_setup_without_lines() {
    let now = Utc::now();
    let desk = MarketDesk::with_series(Fixed(0.5), DeskSettings::default(), flat_series(10, now));
    assert!(desk.analyze_setup(now).is_none());
  }
}
