//! Vigil Domain Layer
//!
//! Pure data model with zero I/O dependencies.
//! Contains account entities, watchlist/goal records, and the
//! option-symbol classifier.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod settings;
pub mod symbol;
pub mod watchlist;

// Re-export commonly used types
pub use entities::{
    IdealPosition, OptionCandidate, Order, OrderId, OrderSide, OrderStatus, Position,
    PurchaseGoal,
};
pub use settings::Settings;
pub use symbol::{is_option, option_type, strike, underlying, OptionSymbol, OptionType, SymbolError};
pub use watchlist::{SideConfig, WatchlistItem};
