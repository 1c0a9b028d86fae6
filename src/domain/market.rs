//! Mock candle series.
//!
//! Synthetic OHLC data standing in for a chart feed. Random draws are
//! passed in as a `FnMut() -> f64` returning uniform samples in `[0, 1)`,
//! so this module stays free of any RNG dependency.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Candles kept in the rolling window.
pub const MAX_CANDLES: usize = 100;

/// Candles inspected for a break of structure.
const BOS_LOOKBACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Result of the break-of-structure check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureBreak {
    Bullish,
    Bearish,
    None,
}

impl std::fmt::Display for StructureBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish BOS"),
            Self::Bearish => write!(f, "Bearish BOS"),
            Self::None => write!(f, "Not Detected"),
        }
    }
}

/// Rolling window of candles, oldest first.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: VecDeque<Candle>,
}

impl CandleSeries {
    pub fn from_candles(candles: impl IntoIterator<Item = Candle>) -> Self {
        let mut series = Self::default();
        for c in candles {
            series.push(c);
        }
        series
    }

    /// Random-walk series of `count` candles ending at `end`.
    ///
    /// Each candle opens within `volatility` of `base_price` and closes
    /// within another `volatility` of its open; wicks extend up to half
    /// the volatility band. At most `MAX_CANDLES` are generated, and
    /// candles whose timestamp would fall outside chrono's range are
    /// skipped.
    pub fn generate(
        base_price: f64,
        count: usize,
        interval: Duration,
        end: DateTime<Utc>,
        volatility: f64,
        mut draw: impl FnMut() -> f64,
    ) -> Self {
        let band = base_price * volatility;
        let mut series = Self::default();
        for i in (0..count.min(MAX_CANDLES)).rev() {
            let Some(time) = i32::try_from(i)
                .ok()
                .and_then(|n| interval.checked_mul(n))
                .and_then(|offset| end.checked_sub_signed(offset))
            else {
                continue;
            };
            let open = (draw() - 0.5).mul_add(band, base_price);
            let close = (draw() - 0.5).mul_add(band, open);
            let high = open.max(close) + draw() * band * 0.5;
            let low = open.min(close) - draw() * band * 0.5;
            series.push(Candle {
                time,
                open,
                high,
                low,
                close,
            });
        }
        series
    }

    /// Append a candle, evicting the oldest past `MAX_CANDLES`.
    /// Returns how many candles were evicted.
    pub fn push(&mut self, candle: Candle) -> usize {
        self.candles.push_back(candle);
        let mut evicted = 0;
        while self.candles.len() > MAX_CANDLES {
            self.candles.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// Close of the newest candle.
    pub fn last_price(&self) -> Option<f64> {
        self.last().map(|c| c.close)
    }

    /// Nudge the newest close by `change` (a fraction, e.g. 0.0004),
    /// stretching the wicks when the close leaves them.
    pub fn jitter_last(&mut self, change: f64) {
        if let Some(last) = self.candles.back_mut() {
            last.close *= 1.0 + change;
            last.high = last.high.max(last.close);
            last.low = last.low.min(last.close);
        }
    }

    /// Open a new candle at the previous close. `up`, `down` and `drift`
    /// are fractions applied to that close for high, low and close.
    /// Returns how many candles were evicted.
    pub fn open_next(&mut self, time: DateTime<Utc>, up: f64, down: f64, drift: f64) -> usize {
        let Some(prev) = self.last().map(|c| c.close) else {
            return 0;
        };
        let close = prev * (1.0 + drift);
        self.push(Candle {
            time,
            open: prev,
            high: (prev * (1.0 + up)).max(close),
            low: (prev * (1.0 - down)).min(close),
            close,
        })
    }

    /// Strictly rising highs over the last five candles is a bullish
    /// break; strictly falling lows a bearish one.
    pub fn break_of_structure(&self) -> StructureBreak {
        if self.candles.len() < BOS_LOOKBACK {
            return StructureBreak::None;
        }
        let recent: Vec<&Candle> = self.candles.iter().skip(self.candles.len() - BOS_LOOKBACK).collect();

        if recent.windows(2).all(|w| w[1].high > w[0].high) {
            StructureBreak::Bullish
        } else if recent.windows(2).all(|w| w[1].low < w[0].low) {
            StructureBreak::Bearish
        } else {
            StructureBreak::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(minute: i64, high: f64, low: f64) -> Candle {
        Candle {
            time: DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::minutes(minute),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
        }
    }

    #[test]
    fn test_generate_respects_count_and_order() {
        let end = Utc::now();
        let series = CandleSeries::generate(45_000.0, 50, Duration::hours(1), end, 0.02, || 0.5);
        assert_eq!(series.len(), 50);
        assert_eq!(series.last().unwrap().time, end);
        assert!(series.get(0).unwrap().time < end);
    }

    #[test]
    fn test_window_is_capped() {
        let series = CandleSeries::generate(100.0, 150, Duration::minutes(1), Utc::now(), 0.02, || 0.3);
        assert_eq!(series.len(), MAX_CANDLES);
    }

    #[test]
    fn test_generate_skips_unrepresentable_times() {
        let end = Utc::now();
        let interval = Duration::seconds(i64::MAX / 1_000);
        let series = CandleSeries::generate(100.0, usize::MAX, interval, end, 0.02, || 0.5);
        assert_eq!(series.last().unwrap().time, end);
        assert!(series.len() < MAX_CANDLES);
    }

    #[test]
    fn test_generated_wicks_bound_body() {
        let mut seq = [0.1, 0.9, 0.7, 0.2].into_iter().cycle();
        let series = CandleSeries::generate(45_000.0, 20, Duration::hours(1), Utc::now(), 0.02, || {
            seq.next().unwrap_or(0.5)
        });
        for c in series.iter() {
            assert!(c.high >= c.open.max(c.close));
            assert!(c.low <= c.open.min(c.close));
        }
    }

    #[test]
    fn test_jitter_extends_wicks() {
        let mut series = CandleSeries::from_candles([candle(0, 101.0, 99.0)]);
        series.jitter_last(0.05);
        let last = series.last().unwrap();
        assert!((last.close - 105.0).abs() < 1e-9);
        assert!((last.high - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_next_reports_eviction() {
        let mut series = CandleSeries::from_candles((0..100_i32).map(|i| candle(i64::from(i), 101.0, 99.0)));
        let evicted = series.open_next(Utc::now(), 0.001, 0.001, 0.0);
        assert_eq!(evicted, 1);
        assert_eq!(series.len(), MAX_CANDLES);
        assert!((series.last().unwrap().open - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_bullish_break() {
        let series = CandleSeries::from_candles((0..5_i32).map(|i| {
            let base = 100.0 + f64::from(i);
            candle(i64::from(i), base + 1.0, base - 1.0)
        }));
        assert_eq!(series.break_of_structure(), StructureBreak::Bullish);
    }

    #[test]
    fn test_bearish_break() {
        let series = CandleSeries::from_candles((0..5_i32).map(|i| {
            let base = 100.0 - f64::from(i);
            candle(i64::from(i), base + 5.0, base - 1.0)
        }));
        // Highs fall too, so only the bearish rule matches.
        assert_eq!(series.break_of_structure(), StructureBreak::Bearish);
    }

    #[test]
    fn test_short_series_has_no_break() {
        let series = CandleSeries::from_candles([candle(0, 101.0, 99.0)]);
        assert_eq!(series.break_of_structure(), StructureBreak::None);
    }
}
