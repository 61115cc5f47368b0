//! Account entities.
//!
//! Value snapshots of broker state (positions, orders) plus the records
//! the decision engine consumes (purchase goals, option candidates).
//! Nothing here is mutated in place; every decision cycle works from a
//! fresh snapshot and derives new structures.

use crate::symbol::{self, OptionType};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker-assigned order identifier.
pub type OrderId = u64;

/// Shares per round lot: the stock backing one option contract.
pub const ROUND_LOT: u32 = 100;

// =============================================================================
// Position
// =============================================================================

/// A held security or derivative contract.
///
/// For options, the quantity sign carries the exposure direction:
/// negative is short, positive is long. Stock positions are long only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Raw exchange identifier; encodes the full contract for options
    pub symbol: String,
    /// Signed quantity (contracts for options, shares for stock)
    pub quantity: Decimal,
    /// Aggregate cost basis for the whole position, not per unit
    pub cost_basis: Decimal,
    /// When the position was opened
    pub date_acquired: DateTime<Utc>,
}

impl Position {
    /// Whether this position is a derivative contract.
    pub fn is_option(&self) -> bool {
        symbol::is_option(&self.symbol)
    }

    /// Decoded contract type, `None` for stock.
    pub fn option_type(&self) -> Option<OptionType> {
        symbol::option_type(&self.symbol)
    }

    /// Underlying equity ticker (the symbol itself for stock).
    pub fn underlying(&self) -> &str {
        symbol::underlying(&self.symbol)
    }

    /// Decoded strike, `None` for stock.
    pub fn strike(&self) -> Option<Decimal> {
        symbol::strike(&self.symbol)
    }

    /// Whole round lots this stock position can cover.
    pub fn round_lots(&self) -> u32 {
        if self.quantity <= Decimal::ZERO {
            return 0;
        }
        (self.quantity / Decimal::from(ROUND_LOT))
            .floor()
            .to_u32()
            .unwrap_or(0)
    }

    /// Cost basis per share, `None` when quantity or basis is zero.
    ///
    /// A zero basis means the broker did not report one and it must be
    /// recovered from trade history instead.
    pub fn cost_basis_per_share(&self) -> Option<Decimal> {
        if self.quantity == Decimal::ZERO || self.cost_basis == Decimal::ZERO {
            return None;
        }
        Some(self.cost_basis / self.quantity)
    }
}

// =============================================================================
// Order
// =============================================================================

/// Order side as the brokerage reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    /// Buy stock
    Buy,
    /// Sell stock
    Sell,
    /// Open a long option position
    BuyToOpen,
    /// Open a short option position
    SellToOpen,
    /// Close a short option position
    BuyToClose,
    /// Close a long option position
    SellToClose,
}

impl OrderSide {
    /// True for the side that opens new short option exposure.
    pub fn is_opening_sell(&self) -> bool {
        matches!(self, OrderSide::SellToOpen)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
            OrderSide::BuyToOpen => "buy_to_open",
            OrderSide::SellToOpen => "sell_to_open",
            OrderSide::BuyToClose => "buy_to_close",
            OrderSide::SellToClose => "sell_to_close",
        };
        write!(f, "{}", s)
    }
}

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Resting on the book
    Open,
    /// Accepted, not yet working
    Pending,
    /// Some quantity executed
    PartiallyFilled,
    /// Completely executed
    Filled,
    /// Rejected by the brokerage
    Rejected,
    /// Canceled
    Canceled,
    /// Expired without filling
    Expired,
}

impl OrderStatus {
    /// Terminal statuses no longer count toward exposure and end the
    /// poll loop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Canceled | OrderStatus::Expired
        )
    }
}

/// A submitted or resting brokerage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Broker-assigned identifier
    pub id: OrderId,
    /// Underlying symbol for option orders, ticker for stock orders
    pub symbol: String,
    /// Option contract identifier when this is an option order
    pub option_symbol: Option<String>,
    /// Side
    pub side: OrderSide,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Order quantity (contracts or shares)
    pub quantity: Decimal,
}

impl Order {
    /// The identifier that carries the contract encoding: the option
    /// symbol when present, otherwise the order symbol itself.
    pub fn contract_symbol(&self) -> &str {
        self.option_symbol.as_deref().unwrap_or(&self.symbol)
    }

    /// Decoded contract type of the order's instrument.
    pub fn option_type(&self) -> Option<OptionType> {
        symbol::option_type(self.contract_symbol())
    }

    /// Underlying ticker of the order's instrument.
    pub fn underlying(&self) -> &str {
        symbol::underlying(self.contract_symbol())
    }

    /// Decoded strike of the order's instrument.
    pub fn strike(&self) -> Option<Decimal> {
        symbol::strike(self.contract_symbol())
    }
}

// =============================================================================
// PurchaseGoal
// =============================================================================

/// A persistent target for accumulating stock in a symbol.
///
/// `fulfilled` only ever grows, and never past `goal`; the execution
/// controller increments it after confirmed fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseGoal {
    /// Store-assigned identifier
    pub id: String,
    /// Equity ticker to accumulate
    pub symbol: String,
    /// Higher priority goals are served first
    pub priority: i32,
    /// Target share count
    pub goal: u32,
    /// Shares bought so far
    pub fulfilled: u32,
    /// Disabled goals are skipped entirely
    pub enabled: bool,
}

impl PurchaseGoal {
    /// Shares still to buy.
    pub fn remaining(&self) -> u32 {
        self.goal.saturating_sub(self.fulfilled)
    }

    /// Whether the goal has been met.
    pub fn is_done(&self) -> bool {
        self.fulfilled >= self.goal
    }
}

// =============================================================================
// OptionCandidate
// =============================================================================

/// The best contract found for an underlying at a target delta.
///
/// `premium` and `weekly_rate` are whole-contract dollar figures
/// (already scaled by the 100-share multiplier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCandidate {
    /// Option contract identifier
    pub symbol: String,
    /// Strike price in dollars
    pub strike: Decimal,
    /// Per-contract dollar premium
    pub premium: Decimal,
    /// Contract delta as reported by the chain
    pub delta: Decimal,
    /// Premium normalized by weeks to expiration
    pub weekly_rate: Decimal,
}

impl OptionCandidate {
    /// Cash collateral to secure one contract: strike × 100.
    pub fn collateral(&self) -> Decimal {
        self.strike * Decimal::from(ROUND_LOT)
    }

    /// Underlying equity ticker.
    pub fn underlying(&self) -> &str {
        symbol::underlying(&self.symbol)
    }

    /// Weekly return on collateral; zero-strike contracts rank last.
    pub fn percent_return(&self) -> Decimal {
        let collateral = self.collateral();
        if collateral == Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.weekly_rate / collateral
    }
}

// =============================================================================
// IdealPosition
// =============================================================================

/// How many option-equivalent units a symbol should carry.
///
/// Derived per cycle from existing exposure plus planned sells, consumed
/// immediately by the allocation planner; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdealPosition {
    /// Underlying equity ticker
    pub symbol: String,
    /// Cash-buffer sizing factor for the symbol
    pub volatility: Decimal,
    /// Option-equivalent unit count
    pub positions: u32,
}

// =============================================================================
// Tests
// =============================================================================
