//! Strategy settings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Global strategy configuration, persisted in the settings store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch for the put-selling strategy
    pub puts_enabled: bool,
    /// Master switch for the call-selling strategy
    pub calls_enabled: bool,
    /// Per-symbol collateral ceiling in dollars
    pub max_allocation: Decimal,
    /// Per-symbol cap on existing option-equivalent units
    pub max_positions: u32,
    /// Cash never touched by the planner
    pub reserve: Decimal,
    /// Per-share premium at which short options are bought back
    pub buy_to_close_amount: Decimal,
    /// Volatility factor for watchlist items that set none
    pub default_volatility: Decimal,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            puts_enabled: false,
            calls_enabled: false,
            max_allocation: dec!(30000),
            max_positions: 5,
            reserve: dec!(0),
            buy_to_close_amount: dec!(0.05),
            default_volatility: dec!(0.2),
        }
    }
}
