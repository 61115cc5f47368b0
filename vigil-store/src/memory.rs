//! In-memory store implementation
//!
//! Used for testing and development without a database.
//! Thread-safe using RwLock for concurrent access.

use crate::error::StoreError;
use crate::repository::{GoalStore, SettingsStore, Store, WatchlistStore};
use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;
use vigil_domain::{PurchaseGoal, Settings, WatchlistItem};

/// In-memory store for testing and development.
pub struct MemoryStore {
    settings: RwLock<Settings>,
    watchlist: RwLock<Vec<WatchlistItem>>,
    goals: RwLock<Vec<PurchaseGoal>>,
}

impl MemoryStore {
    /// Create a store with default (disabled) settings and empty lists.
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(Settings::default()),
            watchlist: RwLock::new(Vec::new()),
            goals: RwLock::new(Vec::new()),
        }
    }

    /// Seed the settings record.
    pub fn seed_settings(&self, settings: Settings) {
        *self.settings.write().unwrap() = settings;
    }

    /// Append a fully-configured watchlist item.
    pub fn seed_watchlist_item(&self, item: WatchlistItem) {
        self.watchlist.write().unwrap().push(item);
    }

    /// Create a purchase goal, returning its generated id.
    pub fn seed_goal(&self, symbol: &str, priority: i32, goal: u32) -> String {
        let id = Uuid::now_v7().to_string();
        self.goals.write().unwrap().push(PurchaseGoal {
            id: id.clone(),
            symbol: symbol.to_string(),
            priority,
            goal,
            fulfilled: 0,
            enabled: true,
        });
        id
    }

    /// Number of watchlist items.
    pub fn watchlist_count(&self) -> usize {
        self.watchlist.read().unwrap().len()
    }

    /// Number of goals.
    pub fn goal_count(&self) -> usize {
        self.goals.read().unwrap().len()
    }

    /// Clear everything (useful for test setup).
    pub fn clear(&self) {
        *self.settings.write().unwrap() = Settings::default();
        self.watchlist.write().unwrap().clear();
        self.goals.write().unwrap().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Settings Store Implementation
// =============================================================================

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.settings.read().unwrap().clone())
    }

    async fn update_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        *self.settings.write().unwrap() = settings.clone();
        Ok(())
    }
}

// =============================================================================
// Watchlist Store Implementation
// =============================================================================

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn watchlist(&self) -> Result<Vec<WatchlistItem>, StoreError> {
        Ok(self.watchlist.read().unwrap().clone())
    }

    async fn replace_watchlist(&self, symbols: &[String]) -> Result<(), StoreError> {
        let mut watchlist = self.watchlist.write().unwrap();
        let replaced = symbols
            .iter()
            .map(|symbol| {
                watchlist
                    .iter()
                    .find(|item| &item.symbol == symbol)
                    .cloned()
                    .unwrap_or_else(|| WatchlistItem::new(symbol.clone()))
            })
            .collect();
        *watchlist = replaced;
        Ok(())
    }
}

// =============================================================================
// Goal Store Implementation
// =============================================================================

#[async_trait]
impl GoalStore for MemoryStore {
    async fn goals(&self) -> Result<Vec<PurchaseGoal>, StoreError> {
        Ok(self.goals.read().unwrap().clone())
    }

    async fn increment_fulfilled(&self, id: &str, shares: u32) -> Result<(), StoreError> {
        let mut goals = self.goals.write().unwrap();
        let goal = goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| StoreError::not_found("purchase goal", id))?;
        goal.fulfilled = goal.goal.min(goal.fulfilled + shares);
        Ok(())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

impl Store for MemoryStore {
    fn settings_store(&self) -> &dyn SettingsStore {
        self
    }

    fn watchlist_store(&self) -> &dyn WatchlistStore {
        self
    }

    fn goal_store(&self) -> &dyn GoalStore {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_settings_round_trip() {
        let store = MemoryStore::new();

        let mut settings = Settings::default();
        settings.puts_enabled = true;
        settings.reserve = dec!(5000);
        store.update_settings(&settings).await.unwrap();

        let loaded = store.settings().await.unwrap();
        assert!(loaded.puts_enabled);
        assert_eq!(loaded.reserve, dec!(5000));
    }

    #[tokio::test]
    async fn test_setting_by_key() {
        let store = MemoryStore::new();

        let value = store.setting("buy_to_close_amount").await.unwrap();
        assert_eq!(value, Some(serde_json::json!("0.05")));

        let missing = store.setting("no_such_key").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_replace_watchlist_preserves_config() {
        let store = MemoryStore::new();

        let mut item = WatchlistItem::new("MSFT");
        item.max_positions = 5;
        item.put.enabled = true;
        store.seed_watchlist_item(item);
        store.seed_watchlist_item(WatchlistItem::new("AAPL"));

        store
            .replace_watchlist(&["GOOG".to_string(), "MSFT".to_string()])
            .await
            .unwrap();

        let symbols = store.watchlist_symbols().await.unwrap();
        assert_eq!(symbols, vec!["GOOG", "MSFT"]);

        let watchlist = store.watchlist().await.unwrap();
        let msft = watchlist.iter().find(|i| i.symbol == "MSFT").unwrap();
        assert_eq!(msft.max_positions, 5); // survived the replacement
        assert!(msft.put.enabled);

        let goog = watchlist.iter().find(|i| i.symbol == "GOOG").unwrap();
        assert_eq!(goog.max_positions, 0); // fresh entry, inert defaults
    }

    #[tokio::test]
    async fn test_increment_fulfilled() {
        let store = MemoryStore::new();
        let id = store.seed_goal("AAPL", 60, 50);

        store.increment_fulfilled(&id, 37).await.unwrap();
        let goals = store.goals().await.unwrap();
        assert_eq!(goals[0].fulfilled, 37);

        // Never past the target
        store.increment_fulfilled(&id, 99).await.unwrap();
        let goals = store.goals().await.unwrap();
        assert_eq!(goals[0].fulfilled, 50);
    }

    #[tokio::test]
    async fn test_increment_unknown_goal_errors() {
        let store = MemoryStore::new();
        let result = store.increment_fulfilled("missing", 1).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
