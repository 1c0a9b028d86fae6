//! Mentor - Canned Coaching Lines
//!
//! Static line tables plus keyword routing for free-text questions.
//! Callers choose the line index, so any random source can drive it.

use super::assets::Timeframe;
use super::trade::Direction;

/// Category a free-text question is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Greeting,
    Trend,
    Risk,
    Psychology,
    Patterns,
    General,
}

/// Chart tools the mentor can explain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    TrendLine,
    Horizontal,
    Fibonacci,
    Patterns,
    Indicators,
    Clear,
}

const GREETING: &[&str] = &[
    "Welcome back! Ready to conquer the markets today?",
    "Hello trader! I've been analyzing market patterns for you.",
    "Great to see you! Let's make today profitable.",
];

const TREND: &[&str] = &[
    "Always trade with the trend. The trend is your friend until it ends.",
    "Check multiple timeframes to confirm trend direction.",
    "Trend lines should connect at least two swing points.",
];

const RISK: &[&str] = &[
    "Never risk more than 2% of your capital on a single trade.",
    "Risk management is more important than profit potential.",
    "Your stop loss should be based on technical levels, not arbitrary amounts.",
];

const PSYCHOLOGY: &[&str] = &[
    "Trading is 80% psychology, 20% strategy.",
    "Emotions are your worst enemy in trading.",
    "Develop a trading plan and stick to it religiously.",
];

const PATTERNS: &[&str] = &[
    "Chart patterns repeat because human psychology doesn't change.",
    "Look for patterns at key support/resistance levels for higher probability.",
    "Volume confirmation is crucial for pattern validity.",
];

const GENERAL: &[&str] = &[
    "That's an interesting point! Could you elaborate?",
    "Based on current market conditions, I'd recommend caution.",
    "Have you considered the higher timeframe context?",
    "Let me analyze that and get back to you with specific insights.",
];

const BUY_ANALYSIS: &[&str] = &[
    "Bullish momentum detected on higher timeframe",
    "Strong support holding, expecting bounce",
    "RSI oversold, potential reversal incoming",
    "Volume increasing on up moves",
];

const SELL_ANALYSIS: &[&str] = &[
    "Resistance holding strong, expecting pullback",
    "Bearish divergence forming on RSI",
    "Volume decreasing on up moves",
    "Lower highs pattern developing",
];

const WIN_FEEDBACK: &[&str] = &[
    "Excellent trade execution! You read the market correctly.",
    "Perfect timing on that entry! Your analysis was spot on.",
    "Great risk management on that winning trade!",
];

const LOSS_FEEDBACK: &[&str] = &[
    "Every loss is a lesson. What can we learn from this?",
    "The market gave us feedback. Let's analyze what happened.",
    "Risk was controlled well. Now let's refine our entry criteria.",
];

pub const WELCOME: &str = "Welcome to Trader's Dojo! I'm Sensei Kuro, your trading mentor.";

pub const NEW_CHART: &str = "New market data loaded. Look for emerging patterns.";

impl Topic {
    /// Route a question by keyword, first match wins.
    pub fn categorize(message: &str) -> Self {
        let m = message.to_lowercase();
        let words: Vec<&str> = m.split(|c: char| !c.is_alphanumeric()).collect();
        let has_word = |w: &str| words.contains(&w);
        let has = |s: &str| m.contains(s);

        if has("hello") || has_word("hi") || has("hey") {
            Self::Greeting
        } else if has("trend") || has("direction") {
            Self::Trend
        } else if has("risk") || has("stop loss") || has("position") {
            Self::Risk
        } else if has("emotion") || has("psychology") || has("mind") {
            Self::Psychology
        } else if has("pattern") || has("chart") || has("candle") {
            Self::Patterns
        } else {
            Self::General
        }
    }

    pub fn lines(self) -> &'static [&'static str] {
        match self {
            Self::Greeting => GREETING,
            Self::Trend => TREND,
            Self::Risk => RISK,
            Self::Psychology => PSYCHOLOGY,
            Self::Patterns => PATTERNS,
            Self::General => GENERAL,
        }
    }
}

impl Tool {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "trendline" | "trend" => Some(Self::TrendLine),
            "horizontal" | "level" => Some(Self::Horizontal),
            "fibonacci" | "fib" => Some(Self::Fibonacci),
            "patterns" => Some(Self::Patterns),
            "indicators" => Some(Self::Indicators),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }

    pub const fn tip(self) -> &'static str {
        match self {
            Self::TrendLine => {
                "Draw trendlines by connecting swing highs/lows. Valid trendlines have at least two touches."
            }
            Self::Horizontal => "Support/resistance levels are areas where price has reversed multiple times.",
            Self::Fibonacci => "Fibonacci retracement: Draw from swing high to low. Key levels: 0.382, 0.5, 0.618.",
            Self::Patterns => "Common patterns: Head & Shoulders, Double Top/Bottom, Triangles, Flags.",
            Self::Indicators => "Combine indicators: RSI for overbought/oversold, MACD for trend changes.",
            Self::Clear => "Analysis tools cleared. Ready for fresh perspective.",
        }
    }
}

/// Analysis lines offered when a direction is selected.
pub fn direction_lines(direction: Direction) -> &'static [&'static str] {
    match direction {
        Direction::Buy => BUY_ANALYSIS,
        Direction::Sell => SELL_ANALYSIS,
    }
}

/// Feedback lines after a settled trade.
pub fn feedback_lines(is_win: bool) -> &'static [&'static str] {
    if is_win { WIN_FEEDBACK } else { LOSS_FEEDBACK }
}

/// Full analysis message for a selection.
pub fn direction_analysis(direction: Direction, line: &str) -> String {
    format!("Analysis for {direction}: {line}")
}

pub fn timeframe_switched(timeframe: Timeframe) -> String {
    format!("Switched to {} timeframe. Analyzing market structure...", timeframe.as_str())
}
