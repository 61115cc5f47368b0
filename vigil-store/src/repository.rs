//! Store trait definitions (Ports)
//!
//! These traits define the persistence interface for the strategy.
//! Implementations can be PostgreSQL or in-memory for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use vigil_domain::{PurchaseGoal, Settings, WatchlistItem};

/// Store for the global strategy settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the full settings record.
    async fn settings(&self) -> Result<Settings, StoreError>;

    /// Replace the settings record.
    async fn update_settings(&self, settings: &Settings) -> Result<(), StoreError>;

    /// Read a single setting by field name.
    async fn setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let value = serde_json::to_value(self.settings().await?)?;
        Ok(value.get(key).cloned())
    }
}

/// Store for the watchlist.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// Load every watchlist item.
    async fn watchlist(&self) -> Result<Vec<WatchlistItem>, StoreError>;

    /// Load just the symbols, in watchlist order.
    async fn watchlist_symbols(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.watchlist().await?.into_iter().map(|i| i.symbol).collect())
    }

    /// Replace the watchlist with the given symbols.
    ///
    /// Symbols already on the list keep their strategy config; new
    /// symbols get inert defaults; absent symbols are dropped.
    async fn replace_watchlist(&self, symbols: &[String]) -> Result<(), StoreError>;
}

/// Store for stock purchase goals.
#[async_trait]
pub trait GoalStore: Send + Sync {
    /// Load every purchase goal.
    async fn goals(&self) -> Result<Vec<PurchaseGoal>, StoreError>;

    /// Record confirmed fills against a goal.
    ///
    /// `fulfilled` never moves past `goal`.
    async fn increment_fulfilled(&self, id: &str, shares: u32) -> Result<(), StoreError>;
}

/// Combined store interface.
pub trait Store: Send + Sync {
    /// Get the settings store
    fn settings_store(&self) -> &dyn SettingsStore;

    /// Get the watchlist store
    fn watchlist_store(&self) -> &dyn WatchlistStore;

    /// Get the goal store
    fn goal_store(&self) -> &dyn GoalStore;
}
