//! PostgreSQL store implementation
//!
//! Settings and watchlist config are stored as JSONB documents; goals
//! are a plain table. All writes are last-write-wins upserts — this
//! system assumes a single writer (the daemon).

use crate::error::StoreError;
use crate::repository::{GoalStore, SettingsStore, Store, WatchlistStore};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;
use vigil_domain::{PurchaseGoal, Settings, WatchlistItem};

/// PostgreSQL-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(url).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables if they are missing.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vigil_settings (
                id BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (id),
                doc JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vigil_watchlist (
                symbol TEXT PRIMARY KEY,
                ordinal INT NOT NULL,
                doc JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vigil_purchase_goals (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                priority INT NOT NULL,
                goal INT NOT NULL,
                fulfilled INT NOT NULL DEFAULT 0,
                enabled BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Create a purchase goal, returning its generated id.
    pub async fn create_goal(
        &self,
        symbol: &str,
        priority: i32,
        goal: u32,
    ) -> Result<String, StoreError> {
        let id = Uuid::now_v7().to_string();
        sqlx::query(
            r#"
            INSERT INTO vigil_purchase_goals (id, symbol, priority, goal)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&id)
        .bind(symbol)
        .bind(priority)
        .bind(goal as i32)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }
}

// =============================================================================
// Settings Store Implementation
// =============================================================================

#[async_trait]
impl SettingsStore for PgStore {
    async fn settings(&self) -> Result<Settings, StoreError> {
        let row = sqlx::query("SELECT doc FROM vigil_settings WHERE id")
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let doc: serde_json::Value = row.try_get("doc")?;
                Ok(serde_json::from_value(doc)?)
            }
            None => Ok(Settings::default()),
        }
    }

    async fn update_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let doc = serde_json::to_value(settings)?;
        sqlx::query(
            r#"
            INSERT INTO vigil_settings (id, doc) VALUES (TRUE, $1)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// Watchlist Store Implementation
// =============================================================================

#[async_trait]
impl WatchlistStore for PgStore {
    async fn watchlist(&self) -> Result<Vec<WatchlistItem>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM vigil_watchlist ORDER BY ordinal")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let doc: serde_json::Value = row.try_get("doc")?;
                Ok(serde_json::from_value(doc)?)
            })
            .collect()
    }

    async fn replace_watchlist(&self, symbols: &[String]) -> Result<(), StoreError> {
        let existing = self.watchlist().await?;

        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        sqlx::query("DELETE FROM vigil_watchlist")
            .execute(&mut *tx)
            .await?;

        for (ordinal, symbol) in symbols.iter().enumerate() {
            let item = existing
                .iter()
                .find(|i| &i.symbol == symbol)
                .cloned()
                .unwrap_or_else(|| WatchlistItem::new(symbol.clone()));
            sqlx::query(
                r#"
                INSERT INTO vigil_watchlist (symbol, ordinal, doc)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(symbol)
            .bind(ordinal as i32)
            .bind(serde_json::to_value(&item)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }
}

// =============================================================================
// Goal Store Implementation
// =============================================================================

#[async_trait]
impl GoalStore for PgStore {
    async fn goals(&self) -> Result<Vec<PurchaseGoal>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, symbol, priority, goal, fulfilled, enabled
            FROM vigil_purchase_goals
            ORDER BY priority DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PurchaseGoal {
                    id: row.try_get("id")?,
                    symbol: row.try_get("symbol")?,
                    priority: row.try_get("priority")?,
                    goal: row.try_get::<i32, _>("goal")? as u32,
                    fulfilled: row.try_get::<i32, _>("fulfilled")? as u32,
                    enabled: row.try_get("enabled")?,
                })
            })
            .collect()
    }

    async fn increment_fulfilled(&self, id: &str, shares: u32) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE vigil_purchase_goals
            SET fulfilled = LEAST(goal, fulfilled + $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(shares as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("purchase goal", id));
        }
        Ok(())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

impl Store for PgStore {
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
