//! Tick-driven cycle scheduling.
//!
//! One tick runs the trading cycles to completion, strictly in
//! sequence. Cycles for the same account never overlap because the
//! scheduler awaits each tick before taking the next — there is no
//! explicit lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::info;

use vigil_exec::{BrokerPort, CycleRunner, MarketCalendar};
use vigil_store::Store;

use crate::error::DaemonResult;

/// Drives the cycle runner on a fixed interval.
pub struct Scheduler<B: BrokerPort, C: MarketCalendar, S: Store> {
    runner: Arc<CycleRunner<B, C, S>>,
    interval: Duration,
}

impl<B: BrokerPort, C: MarketCalendar, S: Store> Scheduler<B, C, S> {
    /// Create a scheduler over a cycle runner.
    pub fn new(runner: Arc<CycleRunner<B, C, S>>, interval: Duration) -> Self {
        Self { runner, interval }
    }

    /// Run one full tick: put sales until exhausted, then goal
    /// purchases, then close orders for decayed shorts.
    ///
    /// Each cycle gates itself on strategy flags and the market
    /// calendar, so an off-hours tick is a cheap no-op.
    pub async fn run_tick(&self) {
        let sell_outcome = self.runner.run_put_sales().await;
        let allocation_outcome = self.runner.run_allocation_cycle().await;
        let close_outcome = self.runner.run_close_cycle().await;
        info!(
            %sell_outcome,
            %allocation_outcome,
            %close_outcome,
            "tick complete"
        );
    }

    /// Tick until SIGINT.
    pub async fn run_until_shutdown(&self) -> DaemonResult<()> {
        let mut ticker = tokio::time::interval(self.interval);
        // A long tick delays the next one instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_tick().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vigil_exec::{StubBroker, StubCalendar};
    use vigil_store::MemoryStore;

    #[tokio::test]
    async fn test_idle_tick_is_a_no_op() {
        let broker = Arc::new(StubBroker::new(dec!(100000)));
        let runner = Arc::new(CycleRunner::new(
            broker.clone(),
            Arc::new(StubCalendar::new(true)),
            Arc::new(MemoryStore::new()),
        ));
        let scheduler = Scheduler::new(runner, Duration::from_millis(10));

        // Disabled settings, no goals, no positions: nothing submitted.
        scheduler.run_tick().await;
        assert!(broker.submissions().is_empty());
    }
}
