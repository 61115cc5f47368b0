//! Execution layer port definitions.
//!
//! Ports define the interfaces for external services (brokerage,
//! market calendar). Adapters implement these ports for specific
//! services (Tradier, stub, etc.). The brokerage is assumed to handle
//! network-level retry and throttling itself; these ports surface only
//! application-level results.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vigil_domain::{OptionCandidate, OptionType, Order, OrderId, Position};

use crate::error::ExecResult;

// =============================================================================
// Broker Port
// =============================================================================

/// Port for brokerage account and order operations.
///
/// Implementations:
/// - `StubBroker` — scripted responses for tests
/// - `TradierBroker` — live REST brokerage (vigil-connectors)
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Current positions snapshot.
    async fn positions(&self) -> ExecResult<Vec<Position>>;

    /// All orders visible on the account.
    async fn orders(&self) -> ExecResult<Vec<Order>>;

    /// A single order by id; `None` when the brokerage has no status
    /// for it yet.
    async fn order(&self, id: OrderId) -> ExecResult<Option<Order>>;

    /// Last-trade prices for a symbol set.
    ///
    /// An empty input yields an empty result without touching the wire.
    async fn prices(&self, symbols: &[String]) -> ExecResult<Vec<Quote>>;

    /// Account balances.
    async fn balances(&self) -> ExecResult<Balances>;

    /// The best contract for an underlying at the target delta, or
    /// `None` when nothing on the chain qualifies.
    async fn best_option(
        &self,
        symbol: &str,
        option_type: OptionType,
        min_strike: Option<Decimal>,
        target_delta: Option<Decimal>,
    ) -> ExecResult<Option<OptionCandidate>>;

    /// Per-share cost basis recovered from trade history, for stock
    /// positions whose reported basis is missing.
    async fn cost_basis_per_share(&self, symbol: &str) -> ExecResult<Option<Decimal>>;

    /// Submit an opening short option order (market, day).
    async fn sell_to_open(
        &self,
        symbol: &str,
        option_symbol: &str,
        quantity: u32,
    ) -> ExecResult<OrderAck>;

    /// Submit a closing buy for a short option (limit, GTC).
    async fn buy_to_close(
        &self,
        symbol: &str,
        option_symbol: &str,
        quantity: u32,
        limit_price: Decimal,
    ) -> ExecResult<OrderAck>;

    /// Submit a stock buy (market, day).
    async fn buy(&self, symbol: &str, quantity: u32) -> ExecResult<OrderAck>;
}

/// Account balances relevant to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    /// Buying power available for option collateral
    pub option_buying_power: Decimal,
}

/// A last-trade price for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Equity ticker
    pub symbol: String,
    /// Last trade price
    pub price: Decimal,
}

/// Acknowledgement returned by order submission.
///
/// `accepted` reflects the application-level answer only; transport
/// failures surface as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Whether the brokerage accepted the order
    pub accepted: bool,
    /// Broker-assigned order id, present on acceptance
    pub id: Option<OrderId>,
}

impl OrderAck {
    /// An accepted acknowledgement carrying the assigned id.
    pub fn accepted(id: OrderId) -> Self {
        Self { accepted: true, id: Some(id) }
    }

    /// A rejected acknowledgement.
    pub fn rejected() -> Self {
        Self { accepted: false, id: None }
    }
}

// =============================================================================
// Market Calendar Port
// =============================================================================

/// Port for the exchange calendar.
#[async_trait]
pub trait MarketCalendar: Send + Sync {
    /// Whether the equity market is currently open for trading.
    async fn is_market_open(&self) -> ExecResult<bool>;
}

// =============================================================================
// Tests
// =============================================================================
