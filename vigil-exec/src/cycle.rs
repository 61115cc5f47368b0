//! Cycle controller: orchestrates engine decisions into broker orders.
//!
//! Every public entry point runs one bounded pass: snapshot the
//! account, let the pure engine decide, submit orders strictly one
//! symbol at a time, and report a typed outcome. Nothing here is fatal
//! to the process — a failed cycle logs and returns control to the
//! scheduler for the next tick.
//!
//! # Flow
//!
//! ```text
//! Broker snapshot → Engine (plan / select) → serial legs → CycleOutcome
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use vigil_domain::{IdealPosition, OptionType, Order, OrderId, OrderStatus, Position};
use vigil_engine::{
    ideal_positions, positions_to_buy, select_puts_to_sell, unutilized_cash, PlannedSell,
    Selection,
};
use vigil_store::Store;

use crate::error::ExecResult;
use crate::ports::{BrokerPort, MarketCalendar};

// =============================================================================
// Policy and outcomes
// =============================================================================

/// Bounds for the order submission state machine.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Submission attempts per leg
    pub max_attempts: u32,
    /// Status checks per submitted order
    pub max_status_checks: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 10, max_status_checks: 20 }
    }
}

/// Outcome of one cycle invocation.
///
/// Callers switch exhaustively; only `Success` invites another round
/// against the now-smaller buying-power pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// At least one order filled; worth running again
    Success,
    /// Nothing to do: strategy disabled, market closed, or no work
    Skipped,
    /// Funds do not cover any candidate
    InsufficientFunds,
    /// No underlying resolved a sellable contract
    NoCandidates,
    /// Every candidate is at its allocation or position cap
    MaxedOut,
    /// A collaborator failed or a leg aborted without filling
    Failed,
}

impl CycleOutcome {
    /// Whether the outer loop should run another round.
    pub fn should_continue(&self) -> bool {
        matches!(self, CycleOutcome::Success)
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleOutcome::Success => "success",
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::InsufficientFunds => "insufficient_funds",
            CycleOutcome::NoCandidates => "no_candidates",
            CycleOutcome::MaxedOut => "maxed_out",
            CycleOutcome::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A confirmed fill for one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegFill {
    /// Broker order id that filled
    pub order_id: OrderId,
    /// Quantity the fill was recorded at
    pub quantity: u32,
}

enum Leg {
    BuyStock { symbol: String, quantity: u32 },
    SellToOpen { symbol: String, option_symbol: String, quantity: u32 },
}

impl Leg {
    fn quantity(&self) -> u32 {
        match self {
            Leg::BuyStock { quantity, .. } => *quantity,
            Leg::SellToOpen { quantity, .. } => *quantity,
        }
    }

    fn describe(&self) -> String {
        match self {
            Leg::BuyStock { symbol, .. } => format!("buy {}", symbol),
            Leg::SellToOpen { option_symbol, .. } => format!("sell_to_open {}", option_symbol),
        }
    }
}

// =============================================================================
// Cycle Runner
// =============================================================================

/// Drives trading cycles against a broker, calendar and store.
pub struct CycleRunner<B: BrokerPort, C: MarketCalendar, S: Store> {
    broker: Arc<B>,
    calendar: Arc<C>,
    store: Arc<S>,
    policy: RetryPolicy,
}

impl<B: BrokerPort, C: MarketCalendar, S: Store> CycleRunner<B, C, S> {
    /// Create a runner with the default retry policy.
    pub fn new(broker: Arc<B>, calendar: Arc<C>, store: Arc<S>) -> Self {
        Self::with_policy(broker, calendar, store, RetryPolicy::default())
    }

    /// Create a runner with an explicit retry policy.
    pub fn with_policy(
        broker: Arc<B>,
        calendar: Arc<C>,
        store: Arc<S>,
        policy: RetryPolicy,
    ) -> Self {
        Self { broker, calendar, store, policy }
    }

    /// Get the broker (for inspection in tests and wiring).
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Get the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// One put-selling pass: select, buffer-check, execute.
    pub async fn run_option_sell_cycle(&self) -> CycleOutcome {
        match self.try_option_sell_cycle().await {
            Ok(outcome) => {
                info!(%outcome, "option sell cycle finished");
                outcome
            }
            Err(e) => {
                error!(error = %e, "option sell cycle failed");
                CycleOutcome::Failed
            }
        }
    }

    /// Repeat put-selling passes while they keep succeeding.
    ///
    /// Each successful round consumes buying power and opens exposure,
    /// so re-evaluation against fresh broker state eventually reports a
    /// non-success outcome and the loop ends. Returns the outcome that
    /// stopped it.
    pub async fn run_put_sales(&self) -> CycleOutcome {
        let mut rounds = 0u32;
        loop {
            let outcome = self.run_option_sell_cycle().await;
            rounds += 1;
            if !outcome.should_continue() {
                info!(rounds, %outcome, "put sales finished");
                return outcome;
            }
        }
    }

    /// One stock-accumulation pass over the purchase goals.
    pub async fn run_allocation_cycle(&self) -> CycleOutcome {
        match self.try_allocation_cycle().await {
            Ok(outcome) => {
                info!(%outcome, "allocation cycle finished");
                outcome
            }
            Err(e) => {
                error!(error = %e, "allocation cycle failed");
                CycleOutcome::Failed
            }
        }
    }

    /// Buy back short options whose premium has decayed to the
    /// configured close amount.
    pub async fn run_close_cycle(&self) -> CycleOutcome {
        match self.try_close_cycle().await {
            Ok(outcome) => {
                info!(%outcome, "close cycle finished");
                outcome
            }
            Err(e) => {
                error!(error = %e, "close cycle failed");
                CycleOutcome::Failed
            }
        }
    }

    // =========================================================================
    // Option selling
    // =========================================================================

    async fn try_option_sell_cycle(&self) -> ExecResult<CycleOutcome> {
        let settings = self.store.settings_store().settings().await?;
        if !settings.puts_enabled {
            info!("put selling disabled");
            return Ok(CycleOutcome::Skipped);
        }
        if !self.calendar.is_market_open().await? {
            info!("market closed");
            return Ok(CycleOutcome::Skipped);
        }

        let watchlist = self.store.watchlist_store().watchlist().await?;
        let sellers: Vec<_> = watchlist.iter().filter(|item| item.sells_puts()).collect();
        if sellers.is_empty() {
            info!("no put-enabled watchlist items");
            return Ok(CycleOutcome::Skipped);
        }

        let balances = self.broker.balances().await?;
        let positions = self.broker.positions().await?;
        let orders = self.broker.orders().await?;

        // One chain lookup per eligible symbol, sequential on purpose:
        // the brokerage rate limit binds before latency does.
        let mut candidates = Vec::with_capacity(sellers.len());
        for item in &sellers {
            let candidate = self
                .broker
                .best_option(
                    &item.symbol,
                    OptionType::Put,
                    None,
                    Some(item.put.target_delta),
                )
                .await?;
            candidates.push(candidate);
        }

        let picks = match select_puts_to_sell(
            candidates,
            balances.option_buying_power,
            &settings,
            &positions,
            &orders,
        ) {
            Selection::Picks(picks) => picks,
            Selection::NoCandidates => return Ok(CycleOutcome::NoCandidates),
            Selection::MaxedOut => return Ok(CycleOutcome::MaxedOut),
            Selection::InsufficientFunds => return Ok(CycleOutcome::InsufficientFunds),
        };

        // Reserve the worst case for what we are about to sell before
        // committing to it.
        let planned: Vec<PlannedSell> = picks
            .iter()
            .map(|pick| PlannedSell {
                option_symbol: pick.candidate.symbol.clone(),
                contracts: pick.contracts,
            })
            .collect();
        let ideals = ideal_positions(
            &watchlist,
            &positions,
            &orders,
            &planned,
            settings.default_volatility,
        );

        let cash = match self
            .cash_after_buffer(
                &ideals,
                &positions,
                &orders,
                balances.option_buying_power,
                settings.reserve,
            )
            .await?
        {
            Some(cash) => cash,
            None => return Ok(CycleOutcome::Failed),
        };
        if cash < Decimal::ZERO {
            info!(%cash, "buffer leaves no room for new positions");
            return Ok(CycleOutcome::InsufficientFunds);
        }

        let mut filled = 0u32;
        for pick in picks {
            let leg = Leg::SellToOpen {
                symbol: pick.candidate.underlying().to_string(),
                option_symbol: pick.candidate.symbol.clone(),
                quantity: pick.contracts,
            };
            match self.submit_with_retry(leg).await? {
                Some(fill) => {
                    info!(
                        option_symbol = %pick.candidate.symbol,
                        order_id = fill.order_id,
                        quantity = fill.quantity,
                        "short put opened"
                    );
                    filled += 1;
                }
                None => {
                    warn!(
                        option_symbol = %pick.candidate.symbol,
                        "leg aborted; skipping remaining legs this cycle"
                    );
                    break;
                }
            }
        }

        Ok(if filled > 0 { CycleOutcome::Success } else { CycleOutcome::Failed })
    }

    // =========================================================================
    // Goal-driven stock accumulation
    // =========================================================================

    async fn try_allocation_cycle(&self) -> ExecResult<CycleOutcome> {
        let settings = self.store.settings_store().settings().await?;
        if !self.calendar.is_market_open().await? {
            info!("market closed");
            return Ok(CycleOutcome::Skipped);
        }

        let goals = self.store.goal_store().goals().await?;
        let active: Vec<_> = goals.iter().filter(|g| g.enabled && !g.is_done()).collect();
        if active.is_empty() {
            info!("no active purchase goals");
            return Ok(CycleOutcome::Skipped);
        }

        let balances = self.broker.balances().await?;
        let positions = self.broker.positions().await?;
        let orders = self.broker.orders().await?;
        let watchlist = self.store.watchlist_store().watchlist().await?;

        let ideals = ideal_positions(&watchlist, &positions, &orders, &[], settings.default_volatility);

        // One batched quote call covers buffer symbols and goal symbols.
        let mut symbols: Vec<String> = ideals.iter().map(|i| i.symbol.clone()).collect();
        for goal in &active {
            if !symbols.contains(&goal.symbol) {
                symbols.push(goal.symbol.clone());
            }
        }
        let prices = self.price_table(&symbols).await?;

        let basis = self.basis_table(&ideals, &positions).await?;
        let buffer = match vigil_engine::buffer(&ideals, &positions, &orders, &prices, &basis) {
            Some(buffer) => buffer,
            None => {
                error!("buffer computation failed; aborting allocation cycle");
                return Ok(CycleOutcome::Failed);
            }
        };

        let cash = unutilized_cash(balances.option_buying_power, settings.reserve, buffer);
        debug!(%cash, %buffer, "cash available for goal purchases");

        let purchases = positions_to_buy(cash, &goals, &prices);
        if purchases.is_empty() {
            info!("no affordable goal purchases");
            return Ok(CycleOutcome::Skipped);
        }

        for purchase in purchases {
            let leg = Leg::BuyStock {
                symbol: purchase.symbol.clone(),
                quantity: purchase.quantity,
            };
            match self.submit_with_retry(leg).await? {
                Some(fill) => {
                    self.store
                        .goal_store()
                        .increment_fulfilled(&purchase.goal_id, fill.quantity)
                        .await?;
                    info!(
                        symbol = %purchase.symbol,
                        goal_id = %purchase.goal_id,
                        quantity = fill.quantity,
                        "goal purchase filled"
                    );
                }
                None => {
                    warn!(
                        symbol = %purchase.symbol,
                        "leg aborted; skipping remaining goal purchases this cycle"
                    );
                    return Ok(CycleOutcome::Failed);
                }
            }
        }

        Ok(CycleOutcome::Success)
    }

    // =========================================================================
    // Closing decayed short options
    // =========================================================================

    async fn try_close_cycle(&self) -> ExecResult<CycleOutcome> {
        let settings = self.store.settings_store().settings().await?;
        if !self.calendar.is_market_open().await? {
            info!("market closed");
            return Ok(CycleOutcome::Skipped);
        }

        let positions = self.broker.positions().await?;
        let orders = self.broker.orders().await?;

        let shorts: Vec<&Position> = positions
            .iter()
            .filter(|p| p.is_option() && p.quantity < Decimal::ZERO)
            .collect();
        if shorts.is_empty() {
            info!("no short option positions");
            return Ok(CycleOutcome::Skipped);
        }

        let mut submitted = 0u32;
        for short in shorts {
            let already_closing = orders.iter().any(|order| {
                !order.status.is_terminal()
                    && order.side == vigil_domain::OrderSide::BuyToClose
                    && order.contract_symbol() == short.symbol
            });
            if already_closing {
                debug!(option_symbol = %short.symbol, "close order already resting");
                continue;
            }

            let quantity = short.quantity.abs().floor().to_u32().unwrap_or(0);
            if quantity == 0 {
                continue;
            }

            let ack = self
                .broker
                .buy_to_close(
                    short.underlying(),
                    &short.symbol,
                    quantity,
                    settings.buy_to_close_amount,
                )
                .await?;
            if ack.accepted {
                info!(
                    option_symbol = %short.symbol,
                    quantity,
                    limit = %settings.buy_to_close_amount,
                    "buy-to-close submitted"
                );
                submitted += 1;
            } else {
                warn!(option_symbol = %short.symbol, "buy-to-close rejected");
            }
        }

        Ok(if submitted > 0 { CycleOutcome::Success } else { CycleOutcome::Skipped })
    }

    // =========================================================================
    // Shared plumbing
    // =========================================================================

    /// Quotes for a symbol set as a lookup table.
    async fn price_table(&self, symbols: &[String]) -> ExecResult<HashMap<String, Decimal>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let quotes = self.broker.prices(symbols).await?;
        Ok(quotes.into_iter().map(|q| (q.symbol, q.price)).collect())
    }

    /// History-derived cost basis for ideal symbols whose stock
    /// position reports none. At most one lookup per symbol.
    async fn basis_table(
        &self,
        ideals: &[IdealPosition],
        positions: &[Position],
    ) -> ExecResult<HashMap<String, Decimal>> {
        let mut table = HashMap::new();
        for ideal in ideals {
            let reported = positions
                .iter()
                .find(|p| !p.is_option() && p.symbol == ideal.symbol && p.quantity > Decimal::ZERO)
                .and_then(|p| p.cost_basis_per_share());
            if reported.is_some() {
                continue;
            }
            if let Some(basis) = self.broker.cost_basis_per_share(&ideal.symbol).await? {
                table.insert(ideal.symbol.clone(), basis);
            }
        }
        Ok(table)
    }

    /// Buffer the ideal positions and return the spendable remainder,
    /// or `None` when the buffer could not be sized.
    async fn cash_after_buffer(
        &self,
        ideals: &[IdealPosition],
        positions: &[Position],
        orders: &[Order],
        option_buying_power: Decimal,
        reserve: Decimal,
    ) -> ExecResult<Option<Decimal>> {
        let symbols: Vec<String> = ideals.iter().map(|i| i.symbol.clone()).collect();
        let prices = self.price_table(&symbols).await?;
        let basis = self.basis_table(ideals, positions).await?;

        match vigil_engine::buffer(ideals, positions, orders, &prices, &basis) {
            Some(buffer) => {
                debug!(%buffer, "buffer sized");
                Ok(Some(unutilized_cash(option_buying_power, reserve, buffer)))
            }
            None => {
                error!("buffer computation failed; aborting without trading");
                Ok(None)
            }
        }
    }

    /// The per-leg submission state machine.
    ///
    /// Submission failures retry at the same quantity; terminal
    /// non-fill statuses retry with one fewer contract/share; both
    /// paths draw from the same attempts budget. A poll budget that
    /// runs out with the order still in flight abandons the leg.
    /// Returns `None` when the leg produced no fill.
    async fn submit_with_retry(&self, leg: Leg) -> ExecResult<Option<LegFill>> {
        let mut attempts = self.policy.max_attempts;
        let mut quantity = leg.quantity();

        while attempts > 0 && quantity > 0 {
            let ack = match &leg {
                Leg::BuyStock { symbol, .. } => self.broker.buy(symbol, quantity).await?,
                Leg::SellToOpen { symbol, option_symbol, .. } => {
                    self.broker.sell_to_open(symbol, option_symbol, quantity).await?
                }
            };

            let id = match ack.id.filter(|_| ack.accepted) {
                Some(id) => id,
                None => {
                    attempts -= 1;
                    warn!(
                        leg = %leg.describe(),
                        quantity,
                        attempts_left = attempts,
                        "submission not acknowledged; retrying at same quantity"
                    );
                    continue;
                }
            };

            match self.poll_order(id).await? {
                Some(OrderStatus::Filled) => {
                    return Ok(Some(LegFill { order_id: id, quantity }));
                }
                Some(status) => {
                    attempts -= 1;
                    quantity -= 1;
                    warn!(
                        leg = %leg.describe(),
                        order_id = id,
                        ?status,
                        attempts_left = attempts,
                        next_quantity = quantity,
                        "order ended without filling; retrying smaller"
                    );
                }
                None => {
                    warn!(
                        leg = %leg.describe(),
                        order_id = id,
                        "status checks exhausted; abandoning leg"
                    );
                    return Ok(None);
                }
            }
        }

        Ok(None)
    }

    /// Poll an order until it reaches a terminal status or the check
    /// budget runs out. A missing status consumes budget without
    /// advancing.
    async fn poll_order(&self, id: OrderId) -> ExecResult<Option<OrderStatus>> {
        let mut checks = self.policy.max_status_checks;
        while checks > 0 {
            match self.broker.order(id).await? {
                Some(order) if order.status.is_terminal() => return Ok(Some(order.status)),
                Some(_) => checks -= 1,
                None => checks -= 1,
            }
        }
        Ok(None)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::OrderAck;
    use crate::stub::{StubBroker, StubCalendar};
    use rust_decimal_macros::dec;
    use vigil_domain::{OptionCandidate, Settings, SideConfig, WatchlistItem};
    use vigil_store::MemoryStore;

    fn runner(
        broker: StubBroker,
        open: bool,
        store: MemoryStore,
    ) -> CycleRunner<StubBroker, StubCalendar, MemoryStore> {
        CycleRunner::new(
            Arc::new(broker),
            Arc::new(StubCalendar::new(open)),
            Arc::new(store),
        )
    }

    fn put_seller(symbol: &str, max_positions: u32) -> WatchlistItem {
        WatchlistItem {
            symbol: symbol.to_string(),
            max_positions,
            volatility: None,
            put: SideConfig { enabled: true, target_delta: dec!(0.3) },
            call: SideConfig::default(),
        }
    }

    fn candidate(underlying: &str, strike: Decimal, weekly_rate: Decimal) -> OptionCandidate {
        use rust_decimal::prelude::ToPrimitive;
        let millis = (strike * dec!(1000)).to_i64().unwrap();
        OptionCandidate {
            symbol: format!("{}250117P{:08}", underlying, millis),
            strike,
            premium: weekly_rate * dec!(2),
            delta: dec!(-0.3),
            weekly_rate,
        }
    }

    fn enabled_settings() -> Settings {
        Settings {
            puts_enabled: true,
            max_allocation: dec!(1000000),
            max_positions: 10,
            ..Settings::default()
        }
    }

    // --- submit_with_retry ---------------------------------------------------

    #[tokio::test]
    async fn test_leg_fills_after_failed_submission_at_same_quantity() {
        let broker = StubBroker::new(dec!(100000));
        broker.script_acks([OrderAck::rejected()]);
        broker.script_polls([None, None, None, None, None, Some(OrderStatus::Filled)]);
        let r = runner(broker, true, MemoryStore::new());

        let fill = r
            .submit_with_retry(Leg::BuyStock { symbol: "AAPL".to_string(), quantity: 37 })
            .await
            .unwrap()
            .unwrap();

        // Quantity survives a submission retry unchanged, and the five
        // missing statuses each consumed poll budget.
        assert_eq!(fill.quantity, 37);
        let broker = &r.broker;
        assert_eq!(broker.submissions().len(), 2);
        assert_eq!(broker.submissions()[1].quantity, 37);
        assert_eq!(broker.poll_count(), 6);
    }

    #[tokio::test]
    async fn test_leg_gives_up_after_max_attempts() {
        let broker = StubBroker::new(dec!(100000));
        broker.script_acks(std::iter::repeat(OrderAck::rejected()).take(12));
        let r = runner(broker, true, MemoryStore::new());

        let fill = r
            .submit_with_retry(Leg::BuyStock { symbol: "AAPL".to_string(), quantity: 5 })
            .await
            .unwrap();

        assert!(fill.is_none());
        // Exactly max_attempts submissions, never more.
        assert_eq!(r.broker.submissions().len(), 10);
    }

    #[tokio::test]
    async fn test_rejection_path_shrinks_quantity() {
        let broker = StubBroker::new(dec!(100000));
        broker.script_polls([Some(OrderStatus::Rejected), Some(OrderStatus::Filled)]);
        let r = runner(broker, true, MemoryStore::new());

        let fill = r
            .submit_with_retry(Leg::BuyStock { symbol: "AAPL".to_string(), quantity: 5 })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fill.quantity, 4);
        let submissions = r.broker.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].quantity, 5);
        assert_eq!(submissions[1].quantity, 4);
    }

    #[tokio::test]
    async fn test_quantity_never_goes_negative() {
        let broker = StubBroker::new(dec!(100000));
        broker.script_polls(
            std::iter::repeat(Some(OrderStatus::Rejected)).take(5),
        );
        let r = runner(broker, true, MemoryStore::new());

        let fill = r
            .submit_with_retry(Leg::BuyStock { symbol: "AAPL".to_string(), quantity: 2 })
            .await
            .unwrap();

        // Quantity hits zero after two rejections and the leg stops.
        assert!(fill.is_none());
        assert_eq!(r.broker.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_abandons_leg() {
        let broker = StubBroker::new(dec!(100000));
        broker.script_polls(std::iter::repeat(Some(OrderStatus::Open)).take(25));
        let r = runner(broker, true, MemoryStore::new());

        let fill = r
            .submit_with_retry(Leg::BuyStock { symbol: "AAPL".to_string(), quantity: 1 })
            .await
            .unwrap();

        assert!(fill.is_none());
        assert_eq!(r.broker.poll_count(), 20);
        assert_eq!(r.broker.submissions().len(), 1);
    }

    // --- option sell cycle ---------------------------------------------------

    #[tokio::test]
    async fn test_sell_cycle_skips_when_disabled() {
        let store = MemoryStore::new();
        let r = runner(StubBroker::new(dec!(100000)), true, store);
        assert_eq!(r.run_option_sell_cycle().await, CycleOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_sell_cycle_skips_when_market_closed() {
        let store = MemoryStore::new();
        store.seed_settings(enabled_settings());
        store.seed_watchlist_item(put_seller("MSFT", 5));
        let r = runner(StubBroker::new(dec!(100000)), false, store);
        assert_eq!(r.run_option_sell_cycle().await, CycleOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_sell_cycle_reports_no_candidates() {
        let store = MemoryStore::new();
        store.seed_settings(enabled_settings());
        store.seed_watchlist_item(put_seller("MSFT", 5));
        // No candidate seeded on the broker.
        let r = runner(StubBroker::new(dec!(100000)), true, store);
        assert_eq!(r.run_option_sell_cycle().await, CycleOutcome::NoCandidates);
    }

    #[tokio::test]
    async fn test_sell_cycle_sells_and_stops_when_funds_run_out() {
        let store = MemoryStore::new();
        store.seed_settings(enabled_settings());
        store.seed_watchlist_item(put_seller("MSFT", 5));

        let broker = StubBroker::new(dec!(30000));
        broker.set_candidate("MSFT", candidate("MSFT", dec!(250), dec!(150)));
        broker.set_price("MSFT", dec!(260));

        let r = runner(broker, true, store);
        let outcome = r.run_put_sales().await;

        // First round sells one contract (25 000 collateral), second
        // round finds 5 000 buying power and nothing affordable.
        assert_eq!(outcome, CycleOutcome::InsufficientFunds);
        let sells: Vec<_> = r
            .broker
            .submissions()
            .into_iter()
            .filter(|s| s.side == vigil_domain::OrderSide::SellToOpen)
            .collect();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0].quantity, 1);
        assert_eq!(r.broker.buying_power(), dec!(5000));
    }

    #[tokio::test]
    async fn test_sell_cycle_fails_when_buffer_cannot_resolve() {
        let store = MemoryStore::new();
        store.seed_settings(enabled_settings());
        store.seed_watchlist_item(put_seller("MSFT", 5));

        let broker = StubBroker::new(dec!(100000));
        broker.set_candidate("MSFT", candidate("MSFT", dec!(250), dec!(150)));
        // No price, basis or strike resolves a worst case for MSFT, so
        // the buffer fails before anything is submitted.

        let r = runner(broker, true, store);
        assert_eq!(r.run_option_sell_cycle().await, CycleOutcome::Failed);
        // Nothing was submitted.
        assert!(r.broker.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_sell_cycle_respects_position_caps() {
        let store = MemoryStore::new();
        let mut settings = enabled_settings();
        settings.max_positions = 2;
        store.seed_settings(settings);
        store.seed_watchlist_item(put_seller("MSFT", 5));

        let broker = StubBroker::new(dec!(100000));
        broker.set_candidate("MSFT", candidate("MSFT", dec!(250), dec!(150)));
        broker.set_position(Position {
            symbol: "MSFT250117P00240000".to_string(),
            quantity: dec!(-2),
            cost_basis: dec!(-600),
            date_acquired: chrono::Utc::now(),
        });

        let r = runner(broker, true, store);
        assert_eq!(r.run_option_sell_cycle().await, CycleOutcome::MaxedOut);
    }

    // --- allocation cycle ----------------------------------------------------

    #[tokio::test]
    async fn test_allocation_cycle_buys_goals_and_updates_store() {
        let store = MemoryStore::new();
        store.seed_settings(Settings::default());
        let goal_id = store.seed_goal("AAPL", 60, 50);

        let broker = StubBroker::new(dec!(1500));
        broker.set_price("AAPL", dec!(40));

        let r = runner(broker, true, store);
        assert_eq!(r.run_allocation_cycle().await, CycleOutcome::Success);

        let submissions = r.broker.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].symbol, "AAPL");
        assert_eq!(submissions[0].quantity, 37); // floor(1500 / 40)

        let goals = r.store.goal_store().goals().await.unwrap();
        assert_eq!(goals.iter().find(|g| g.id == goal_id).unwrap().fulfilled, 37);
    }

    #[tokio::test]
    async fn test_allocation_cycle_reserves_buffer_before_buying() {
        let store = MemoryStore::new();
        store.seed_settings(enabled_settings());
        store.seed_watchlist_item(put_seller("MSFT", 5));
        store.seed_goal("AAPL", 60, 100);

        let broker = StubBroker::new(dec!(10000));
        // One short put held: buffer = 250 × 100 × 1 × 0.2 = 5 000
        broker.set_position(Position {
            symbol: "MSFT250117P00250000".to_string(),
            quantity: dec!(-1),
            cost_basis: dec!(-300),
            date_acquired: chrono::Utc::now(),
        });
        broker.set_price("MSFT", dec!(250));
        broker.set_price("AAPL", dec!(100));

        let r = runner(broker, true, store);
        assert_eq!(r.run_allocation_cycle().await, CycleOutcome::Success);

        // 10 000 − 5 000 buffer = 5 000 → 50 shares at 100
        let submissions = r.broker.submissions();
        assert_eq!(submissions[0].quantity, 50);
    }

    #[tokio::test]
    async fn test_allocation_cycle_halts_on_unresolvable_buffer() {
        let store = MemoryStore::new();
        store.seed_settings(enabled_settings());
        store.seed_watchlist_item(put_seller("MSFT", 5));
        store.seed_goal("AAPL", 60, 100);

        let broker = StubBroker::new(dec!(10000));
        // A round lot with zero reported basis, no quote, and no
        // history basis: MSFT's worst case cannot be sized.
        broker.set_position(Position {
            symbol: "MSFT".to_string(),
            quantity: dec!(100),
            cost_basis: dec!(0),
            date_acquired: chrono::Utc::now(),
        });
        broker.set_price("AAPL", dec!(100));

        let r = runner(broker, true, store);
        assert_eq!(r.run_allocation_cycle().await, CycleOutcome::Failed);
        assert!(r.broker.submissions().is_empty());
    }

    // --- close cycle ---------------------------------------------------------

    #[tokio::test]
    async fn test_close_cycle_submits_limit_closes() {
        let store = MemoryStore::new();
        store.seed_settings(Settings::default());

        let broker = StubBroker::new(dec!(100000));
        broker.set_position(Position {
            symbol: "MSFT250117P00250000".to_string(),
            quantity: dec!(-2),
            cost_basis: dec!(-600),
            date_acquired: chrono::Utc::now(),
        });

        let r = runner(broker, true, store);
        assert_eq!(r.run_close_cycle().await, CycleOutcome::Success);

        let submissions = r.broker.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].side, vigil_domain::OrderSide::BuyToClose);
        assert_eq!(submissions[0].quantity, 2);
        assert_eq!(submissions[0].limit_price, Some(dec!(0.05)));
    }

    #[tokio::test]
    async fn test_close_cycle_skips_positions_with_resting_close() {
        let store = MemoryStore::new();
        store.seed_settings(Settings::default());

        let broker = StubBroker::new(dec!(100000));
        broker.set_position(Position {
            symbol: "MSFT250117P00250000".to_string(),
            quantity: dec!(-1),
            cost_basis: dec!(-300),
            date_acquired: chrono::Utc::now(),
        });
        broker.set_order(Order {
            id: 99,
            symbol: "MSFT".to_string(),
            option_symbol: Some("MSFT250117P00250000".to_string()),
            side: vigil_domain::OrderSide::BuyToClose,
            status: OrderStatus::Open,
            quantity: dec!(1),
        });

        let r = runner(broker, true, store);
        assert_eq!(r.run_close_cycle().await, CycleOutcome::Skipped);
        assert!(r.broker.submissions().is_empty());
    }
}
