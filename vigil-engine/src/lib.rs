//! Vigil Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Transforms account snapshots (positions, orders, balances, watchlist,
//! prices, option chains) into a target allocation of capital and a
//! prioritized list of option contracts to sell.

#![warn(clippy::all)]

pub mod aggregate;
pub mod allocation;
pub mod exposure;
pub mod selection;
pub mod types;

pub use allocation::{buffer, ideal_positions, positions_to_buy, unutilized_cash};
pub use exposure::estimated_units;
pub use selection::select_puts_to_sell;
pub use types::{PlannedSell, Selection, SellPick, StockPurchase};
