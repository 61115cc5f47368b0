//! Engine output types.
//!
//! These are the derived structures a decision cycle hands to the
//! execution controller. All of them are ephemeral: recomputed from a
//! fresh snapshot every cycle, never persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vigil_domain::OptionCandidate;

/// A contract sale the current cycle intends to make.
///
/// Fed back into ideal-position math so the cash buffer covers
/// prospective exposure, not just what is already on the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSell {
    /// Option contract identifier
    pub option_symbol: String,
    /// Contracts to sell
    pub contracts: u32,
}

/// A selected short-put sale: one contract of the given candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellPick {
    /// The winning contract for its underlying
    pub candidate: OptionCandidate,
    /// Contracts to sell this cycle
    pub contracts: u32,
}

impl SellPick {
    /// Collateral committed by this pick.
    pub fn collateral(&self) -> Decimal {
        self.candidate.collateral() * Decimal::from(self.contracts)
    }
}

/// Outcome of candidate selection.
///
/// Callers switch exhaustively on this instead of string-matching
/// sentinel values; only `Picks` leads to order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    /// Ranked picks that fit the budget and caps, at most two symbols
    Picks(Vec<SellPick>),
    /// No underlying resolved a candidate contract at all
    NoCandidates,
    /// Every affordable candidate is already at its allocation or
    /// position cap
    MaxedOut,
    /// Nothing fits the available option buying power
    InsufficientFunds,
}

/// An ordered stock-purchase instruction emitted by goal fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPurchase {
    /// Goal this purchase serves
    pub goal_id: String,
    /// Equity ticker
    pub symbol: String,
    /// Shares to buy; always positive
    pub quantity: u32,
}
