//! Watchlist records.
//!
//! A watchlist item marks a symbol as eligible for automated selling and
//! carries its per-strategy configuration. Items with `max_positions == 0`
//! or the relevant side disabled take no part in planning.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Default target delta applied to new watchlist entries.
pub const DEFAULT_TARGET_DELTA: Decimal = dec!(0.3);

/// Per-side (put/call) strategy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideConfig {
    /// Whether this side participates in automated selling
    pub enabled: bool,
    /// Delta the chain selector aims for
    pub target_delta: Decimal,
}

impl Default for SideConfig {
    fn default() -> Self {
        Self { enabled: false, target_delta: DEFAULT_TARGET_DELTA }
    }
}

/// A symbol eligible for automated selling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    /// Equity ticker
    pub symbol: String,
    /// Cap on concurrent option-equivalent units
    pub max_positions: u32,
    /// Cash-buffer sizing factor; falls back to the configured default
    pub volatility: Option<Decimal>,
    /// Put-side configuration
    pub put: SideConfig,
    /// Call-side configuration
    pub call: SideConfig,
}

impl WatchlistItem {
    /// A fresh entry with default strategy config, as created when the
    /// watchlist updater introduces a new symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            max_positions: 0,
            volatility: None,
            put: SideConfig::default(),
            call: SideConfig::default(),
        }
    }

    /// Whether the item participates in put-sell planning.
    pub fn sells_puts(&self) -> bool {
        self.put.enabled && self.max_positions > 0
    }

    /// Volatility factor with the configured default applied.
    pub fn volatility_or(&self, default: Decimal) -> Decimal {
        self.volatility.unwrap_or(default)
    }
}
