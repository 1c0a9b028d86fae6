//! Tradable asset catalog and chart timeframes.
//!
//! The mock chart is generated around the selected asset's reference
//! price; switching asset or timeframe regenerates it.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::error::DojoError;

/// One entry of the asset picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub symbol: String,
    pub name: String,
    /// Reference price the chart is generated around.
    pub price: f64,
    /// 24h change in percent, display only.
    #[serde(default)]
    pub change: f64,
}

impl AssetInfo {
    pub fn new(symbol: &str, name: &str, price: f64, change: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
            change,
        }
    }

    /// Case-insensitive match on the full symbol or its base ("eth" for "ETH/USD").
    pub fn matches_symbol(&self, query: &str) -> bool {
        let query = query.trim();
        self.symbol.eq_ignore_ascii_case(query)
            || self
                .symbol
                .split_once('/')
                .is_some_and(|(base, _)| base.eq_ignore_ascii_case(query))
    }
}

/// Default starting asset.
pub fn bitcoin() -> AssetInfo {
    AssetInfo::new("BTC/USD", "Bitcoin", 45_320.50, 1.2)
}

/// Built-in catalog.
pub fn default_catalog() -> Vec<AssetInfo> {
    vec![
        bitcoin(),
        AssetInfo::new("ETH/USD", "Ethereum", 2_450.75, 2.1),
        AssetInfo::new("XRP/USD", "Ripple", 0.5245, -0.5),
        AssetInfo::new("SOL/USD", "Solana", 102.30, 3.2),
        AssetInfo::new("ADA/USD", "Cardano", 0.4523, 1.8),
        AssetInfo::new("DOT/USD", "Polkadot", 7.89, -1.2),
        AssetInfo::new("DOGE/USD", "Dogecoin", 0.0856, 4.5),
        AssetInfo::new("AVAX/USD", "Avalanche", 36.78, 2.7),
        AssetInfo::new("LINK/USD", "Chainlink", 14.56, -0.8),
        AssetInfo::new("MATIC/USD", "Polygon", 0.8923, 1.5),
        AssetInfo::new("BNB/USD", "Binance Coin", 312.45, 0.9),
        AssetInfo::new("UNI/USD", "Uniswap", 6.34, -2.1),
    ]
}

pub fn find<'a>(catalog: &'a [AssetInfo], query: &str) -> Option<&'a AssetInfo> {
    catalog.iter().find(|a| a.matches_symbol(query))
}

/// `symbol` from the catalog, else the first catalog entry, else Bitcoin.
pub fn resolve(catalog: &[AssetInfo], symbol: &str) -> AssetInfo {
    find(catalog, symbol)
        .or_else(|| catalog.first())
        .cloned()
        .unwrap_or_else(bitcoin)
}

/// Assets whose symbol or name contains `term`, ignoring case.
/// An empty term returns the whole catalog.
pub fn filter<'a>(catalog: &'a [AssetInfo], term: &str) -> Vec<&'a AssetInfo> {
    let term = term.trim().to_lowercase();
    catalog
        .iter()
        .filter(|a| a.symbol.to_lowercase().contains(&term) || a.name.to_lowercase().contains(&term))
        .collect()
}

/// Candle width of the generated chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[default]
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Self; 6] = [Self::M1, Self::M5, Self::M15, Self::H1, Self::H4, Self::D1];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    pub fn interval(self) -> Duration {
        let minutes = match self {
            Self::M1 => 1,
            Self::M5 => 5,
            Self::M15 => 15,
            Self::H1 => 60,
            Self::H4 => 240,
            Self::D1 => 1_440,
        };
        Duration::minutes(minutes)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for Timeframe {
    type Err = DojoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DojoError::UnknownTimeframe(s.to_string()))
    }
}
