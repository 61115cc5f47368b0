//! Daemon: wires configuration, broker, stores and scheduler.
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Build the broker adapter (stub or live, by environment)
//! 3. Seed the stores with configured settings and watchlist
//! 4. Tick the scheduler until SIGINT

use std::sync::Arc;

use rust_decimal_macros::dec;
use tracing::info;

use vigil_connectors::{TradierBroker, TradierRestClient};
use vigil_exec::{BrokerPort, CycleRunner, MarketCalendar, StubBroker, StubCalendar};
use vigil_store::{MemoryStore, Store};

use crate::config::{Config, Environment};
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Scheduler;

// =============================================================================
// Daemon
// =============================================================================

/// The vigil daemon.
pub struct Daemon<B: BrokerPort + 'static, C: MarketCalendar + 'static, S: Store + 'static> {
    config: Config,
    scheduler: Scheduler<B, C, S>,
    store: Arc<S>,
}

impl Daemon<StubBroker, StubCalendar, MemoryStore> {
    /// Create a daemon with stub components (for testing/development).
    pub fn new_stub(config: Config) -> Self {
        let broker = Arc::new(StubBroker::new(dec!(100000)));
        let calendar = Arc::new(StubCalendar::new(true));
        let store = Arc::new(MemoryStore::new());
        let runner = Arc::new(CycleRunner::new(broker, calendar, store.clone()));
        let scheduler = Scheduler::new(runner, config.cycle_interval);

        Self { config, scheduler, store }
    }
}

impl Daemon<TradierBroker, TradierBroker, MemoryStore> {
    /// Create a daemon against the live brokerage.
    ///
    /// The same adapter serves as broker and market calendar.
    pub fn new_live(config: Config) -> DaemonResult<Self> {
        let token = config
            .broker
            .token
            .clone()
            .ok_or_else(|| DaemonError::Config("VIGIL_TRADIER_TOKEN is required".to_string()))?;
        let account_id = config
            .broker
            .account_id
            .clone()
            .ok_or_else(|| DaemonError::Config("VIGIL_TRADIER_ACCOUNT is required".to_string()))?;

        let client = if config.broker.sandbox {
            TradierRestClient::sandbox(token, account_id)
        } else {
            TradierRestClient::new(token, account_id)
        };
        let broker = Arc::new(TradierBroker::new(client));
        let calendar = broker.clone();
        let store = Arc::new(MemoryStore::new());
        let runner = Arc::new(CycleRunner::new(broker, calendar, store.clone()));
        let scheduler = Scheduler::new(runner, config.cycle_interval);

        Ok(Self { config, scheduler, store })
    }
}

impl<B: BrokerPort + 'static, C: MarketCalendar + 'static, S: Store + 'static> Daemon<B, C, S> {
    /// Create a daemon from externally-wired components.
    pub fn new(config: Config, scheduler: Scheduler<B, C, S>, store: Arc<S>) -> Self {
        Self { config, scheduler, store }
    }

    /// Seed the stores from configuration.
    ///
    /// The store is authoritative afterwards; configuration only
    /// provides the starting state.
    pub async fn seed_store(&self) -> DaemonResult<()> {
        self.store
            .settings_store()
            .update_settings(&self.config.trading)
            .await?;
        if !self.config.watchlist.is_empty() {
            self.store
                .watchlist_store()
                .replace_watchlist(&self.config.watchlist)
                .await?;
            info!(symbols = self.config.watchlist.len(), "watchlist seeded");
        }
        Ok(())
    }

    /// Run the daemon until shutdown is requested.
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            interval_secs = self.config.cycle_interval.as_secs(),
            "Starting vigil daemon"
        );

        self.seed_store().await?;
        self.scheduler.run_until_shutdown().await?;

        info!("Shutdown complete");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
