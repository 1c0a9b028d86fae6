//! Trend-line touch counting.
//!
//! A trend line is a segment between two (candle index, price) anchors.
//! A candle touches it when its high or low sits within a fractional
//! tolerance of the line's price at that index. Three touches make a
//! setup ready for entry.

use serde::{Deserialize, Serialize};

use super::market::{CandleSeries, StructureBreak};

/// Default touch tolerance: 0.5% of the line price.
pub const DEFAULT_TOLERANCE: f64 = 0.005;

/// Touches required before a setup is ready for entry.
pub const ENTRY_TOUCHES: usize = 3;

/// Touches required before a line counts as a candidate setup.
pub const SETUP_TOUCHES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendKind {
    Upward,
    Downward,
}

impl std::fmt::Display for TrendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upward => write!(f, "upward"),
            Self::Downward => write!(f, "downward"),
        }
    }
}

/// Anchor point in chart coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub index: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub id: String,
    pub kind: TrendKind,
    pub start: Anchor,
    pub end: Anchor,
    /// Candle indices that touched the line.
    pub touches: Vec<usize>,
}

/// Emitted when the newest candle adds a touch to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchEvent {
    pub line_id: String,
    pub kind: TrendKind,
    pub touches: usize,
    /// True on the touch that makes the setup ready for entry.
    pub entry_ready: bool,
}

/// Read-out of a candidate setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupAnalysis {
    pub line_id: String,
    pub kind: TrendKind,
    pub touches: usize,
    pub touches_left: usize,
    pub recommendation: String,
    pub entry_condition: &'static str,
    pub stop_loss: &'static str,
    pub take_profit: &'static str,
    pub structure: StructureBreak,
    pub session_active: bool,
}

impl TrendLine {
    /// Line between two anchors; the kind follows the slope.
    pub fn new(id: impl Into<String>, start: Anchor, end: Anchor) -> Self {
        let kind = if end.price >= start.price {
            TrendKind::Upward
        } else {
            TrendKind::Downward
        };
        Self {
            id: id.into(),
            kind,
            start,
            end,
            touches: Vec::new(),
        }
    }

    /// Price of the line at `index`, or `None` outside the segment.
    pub fn price_at(&self, index: f64) -> Option<f64> {
        let (x1, y1, x2, y2) = (self.start.index, self.start.price, self.end.index, self.end.price);
        if index < x1.min(x2) || index > x1.max(x2) {
            return None;
        }
        if (x2 - x1).abs() < f64::EPSILON {
            return Some(y1);
        }
        let slope = (y2 - y1) / (x2 - x1);
        Some(slope.mul_add(index - x1, y1))
    }

    fn touched_at(&self, series: &CandleSeries, index: usize, tolerance: f64) -> bool {
        let Some(candle) = series.get(index) else {
            return false;
        };
        #[allow(clippy::cast_precision_loss)]
        let Some(line) = self.price_at(index as f64) else {
            return false;
        };
        let band = line * tolerance;
        (candle.low - line).abs() < band || (candle.high - line).abs() < band
    }

    /// Recount every touch across the series.
    pub fn count_touches(&mut self, series: &CandleSeries, tolerance: f64) -> usize {
        self.touches = (0..series.len())
            .filter(|&i| self.touched_at(series, i, tolerance))
            .collect();
        self.touches.len()
    }

    /// Register a touch by the newest candle, once per candle.
    pub fn check_latest(&mut self, series: &CandleSeries, tolerance: f64) -> Option<TouchEvent> {
        let index = series.len().checked_sub(1)?;
        if self.touches.contains(&index) || !self.touched_at(series, index, tolerance) {
            return None;
        }
        self.touches.push(index);
        Some(TouchEvent {
            line_id: self.id.clone(),
            kind: self.kind,
            touches: self.touches.len(),
            entry_ready: self.touches.len() == ENTRY_TOUCHES,
        })
    }

    /// Re-anchor after `by` candles were evicted from the front of the
    /// window. Touches on evicted candles are dropped.
    pub fn shift_back(&mut self, by: usize) {
        #[allow(clippy::cast_precision_loss)]
        let delta = by as f64;
        self.start.index -= delta;
        self.end.index -= delta;
        self.touches.retain(|&i| i >= by);
        for i in &mut self.touches {
            *i -= by;
        }
    }

    pub fn is_setup(&self) -> bool {
        self.touches.len() >= SETUP_TOUCHES
    }

    /// Summarize this line as a trade setup.
    pub fn analyze(&self, structure: StructureBreak, session_active: bool) -> SetupAnalysis {
        let touches_left = ENTRY_TOUCHES.saturating_sub(self.touches.len());
        let recommendation = match touches_left {
            0 => "Ready for entry".to_string(),
            1 => "Wait for 1 more touch".to_string(),
            n => format!("Wait for {n} more touches"),
        };
        let bullish = self.kind == TrendKind::Upward;
        SetupAnalysis {
            line_id: self.id.clone(),
            kind: self.kind,
            touches: self.touches.len(),
            touches_left,
            recommendation,
            entry_condition: if bullish {
                "Bullish Break of Structure confirmed"
            } else {
                "Bearish Break of Structure confirmed"
            },
            stop_loss: if bullish { "Below trend line" } else { "Above trend line" },
            take_profit: "1:3 Risk/Reward ratio",
            structure,
            session_active,
        }
    }
}
