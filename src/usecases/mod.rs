//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the dojo's workflows.
//!
//! Use cases:
//! - `TradeSession`: Practice trade lifecycle, XP, achievements, alerts
//! - `MarketDesk`: Mock chart price feed and trend-line setups
//! - `DojoEngine`: Event loop serializing commands and timer ticks

pub mod dojo_engine;
pub mod market_desk;
pub mod trade_session;

pub use dojo_engine::{Command, DojoEngine, EngineTiming, SessionEvent};
pub use market_desk::{DeskSettings, MarketDesk};
pub use trade_session::{SessionSettings, TradeResult, TradeSession};
