//! Vigil Store Layer
//!
//! Persistence for strategy settings, the watchlist, and purchase
//! goals. The decision cycle reads these as snapshots; the only write
//! paths are goal-fulfillment increments, settings updates, and
//! wholesale watchlist replacement. Last write wins — this system
//! assumes no concurrent writers.

#![warn(clippy::all)]

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use repository::{GoalStore, SettingsStore, Store, WatchlistStore};
