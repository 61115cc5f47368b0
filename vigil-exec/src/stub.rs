//! Stub implementations for testing.
//!
//! The stub broker simulates account state and order flow without real
//! API calls. Acknowledgements and poll responses can be scripted so
//! retry and poll behavior is deterministic under test.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use vigil_domain::{
    symbol, OptionCandidate, OptionType, Order, OrderId, OrderSide, OrderStatus, Position,
};

use crate::error::{ExecError, ExecResult};
use crate::ports::{Balances, BrokerPort, MarketCalendar, OrderAck, Quote};

// =============================================================================
// Stub Broker
// =============================================================================

/// A recorded order submission, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Side of the submission
    pub side: OrderSide,
    /// Underlying / equity symbol
    pub symbol: String,
    /// Option contract, when applicable
    pub option_symbol: Option<String>,
    /// Requested quantity
    pub quantity: u32,
    /// Limit price, when applicable
    pub limit_price: Option<Decimal>,
}

/// Stub broker with scripted acknowledgements and poll responses.
///
/// Defaults are permissive: submissions are accepted with generated
/// ids, and polls report the order filled. Accepted sell-to-open
/// submissions deduct their collateral from option buying power so
/// repeated cycles see a shrinking pool, the way a real account would.
pub struct StubBroker {
    positions: RwLock<Vec<Position>>,
    orders: RwLock<Vec<Order>>,
    prices: RwLock<HashMap<String, Decimal>>,
    candidates: RwLock<HashMap<String, OptionCandidate>>,
    cost_basis: RwLock<HashMap<String, Decimal>>,
    option_buying_power: RwLock<Decimal>,
    /// Scripted acks, consumed in order; empty means accept
    ack_script: Mutex<VecDeque<OrderAck>>,
    /// Scripted poll responses, consumed in order; empty means filled
    poll_script: Mutex<VecDeque<Option<OrderStatus>>>,
    placed: RwLock<HashMap<OrderId, Order>>,
    submissions: Mutex<Vec<Submission>>,
    next_order_id: AtomicU64,
    poll_count: AtomicU32,
}

impl StubBroker {
    /// Create a stub with the given option buying power.
    pub fn new(option_buying_power: Decimal) -> Self {
        Self {
            positions: RwLock::new(Vec::new()),
            orders: RwLock::new(Vec::new()),
            prices: RwLock::new(HashMap::new()),
            candidates: RwLock::new(HashMap::new()),
            cost_basis: RwLock::new(HashMap::new()),
            option_buying_power: RwLock::new(option_buying_power),
            ack_script: Mutex::new(VecDeque::new()),
            poll_script: Mutex::new(VecDeque::new()),
            placed: RwLock::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            next_order_id: AtomicU64::new(0),
            poll_count: AtomicU32::new(0),
        }
    }

    /// Seed a position.
    pub fn set_position(&self, position: Position) {
        self.positions.write().unwrap().push(position);
    }

    /// Seed a resting order.
    pub fn set_order(&self, order: Order) {
        self.orders.write().unwrap().push(order);
    }

    /// Set the last-trade price for a symbol.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.write().unwrap().insert(symbol.to_string(), price);
    }

    /// Set the chain-selection result for an underlying.
    pub fn set_candidate(&self, underlying: &str, candidate: OptionCandidate) {
        self.candidates.write().unwrap().insert(underlying.to_string(), candidate);
    }

    /// Set the history-derived cost basis for a symbol.
    pub fn set_cost_basis(&self, symbol: &str, basis: Decimal) {
        self.cost_basis.write().unwrap().insert(symbol.to_string(), basis);
    }

    /// Current option buying power.
    pub fn buying_power(&self) -> Decimal {
        *self.option_buying_power.read().unwrap()
    }

    /// Queue acknowledgements for upcoming submissions.
    pub fn script_acks(&self, acks: impl IntoIterator<Item = OrderAck>) {
        self.ack_script.lock().unwrap().extend(acks);
    }

    /// Queue poll responses; `None` simulates a missing status.
    pub fn script_polls(&self, polls: impl IntoIterator<Item = Option<OrderStatus>>) {
        self.poll_script.lock().unwrap().extend(polls);
    }

    /// Every submission recorded so far.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    /// Total `order()` polls served.
    pub fn poll_count(&self) -> u32 {
        self.poll_count.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> OrderId {
        self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(&self, submission: Submission) {
        self.submissions.lock().unwrap().push(submission);
    }

    fn take_ack(&self) -> Option<OrderAck> {
        self.ack_script.lock().unwrap().pop_front()
    }

    fn place(
        &self,
        symbol: &str,
        option_symbol: Option<&str>,
        side: OrderSide,
        quantity: u32,
    ) -> OrderAck {
        match self.take_ack() {
            Some(ack) => ack,
            None => {
                let id = self.next_id();
                self.placed.write().unwrap().insert(
                    id,
                    Order {
                        id,
                        symbol: symbol.to_string(),
                        option_symbol: option_symbol.map(str::to_string),
                        side,
                        status: OrderStatus::Pending,
                        quantity: Decimal::from(quantity),
                    },
                );
                OrderAck::accepted(id)
            }
        }
    }
}

#[async_trait]
impl BrokerPort for StubBroker {
    async fn positions(&self) -> ExecResult<Vec<Position>> {
        Ok(self.positions.read().unwrap().clone())
    }

    async fn orders(&self) -> ExecResult<Vec<Order>> {
        Ok(self.orders.read().unwrap().clone())
    }

    async fn order(&self, id: OrderId) -> ExecResult<Option<Order>> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);

        let scripted = self.poll_script.lock().unwrap().pop_front();
        let status = match scripted {
            Some(None) => return Ok(None),
            Some(Some(status)) => status,
            None => OrderStatus::Filled,
        };

        let placed = self.placed.read().unwrap();
        let order = placed.get(&id).cloned().map(|mut order| {
            order.status = status;
            order
        });
        Ok(order)
    }

    async fn prices(&self, symbols: &[String]) -> ExecResult<Vec<Quote>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let prices = self.prices.read().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                prices
                    .get(symbol)
                    .map(|price| Quote { symbol: symbol.clone(), price: *price })
            })
            .collect())
    }

    async fn balances(&self) -> ExecResult<Balances> {
        Ok(Balances { option_buying_power: self.buying_power() })
    }

    async fn best_option(
        &self,
        symbol: &str,
        option_type: OptionType,
        min_strike: Option<Decimal>,
        _target_delta: Option<Decimal>,
    ) -> ExecResult<Option<OptionCandidate>> {
        let candidates = self.candidates.read().unwrap();
        let candidate = candidates.get(symbol).cloned();
        Ok(candidate.filter(|c| {
            vigil_domain::option_type(&c.symbol) == Some(option_type)
                && min_strike.map_or(true, |min| c.strike >= min)
        }))
    }

    async fn cost_basis_per_share(&self, symbol: &str) -> ExecResult<Option<Decimal>> {
        Ok(self.cost_basis.read().unwrap().get(symbol).copied())
    }

    async fn sell_to_open(
        &self,
        symbol: &str,
        option_symbol: &str,
        quantity: u32,
    ) -> ExecResult<OrderAck> {
        self.record(Submission {
            side: OrderSide::SellToOpen,
            symbol: symbol.to_string(),
            option_symbol: Some(option_symbol.to_string()),
            quantity,
            limit_price: None,
        });

        let ack = self.place(symbol, Some(option_symbol), OrderSide::SellToOpen, quantity);
        if ack.accepted {
            // Collateral leaves the buying-power pool as soon as the
            // order is accepted, like a real margin account.
            if let Some(strike) = symbol::strike(option_symbol) {
                let mut power = self.option_buying_power.write().unwrap();
                *power -= strike * Decimal::from(100u32) * Decimal::from(quantity);
            }
        }
        Ok(ack)
    }

    async fn buy_to_close(
        &self,
        symbol: &str,
        option_symbol: &str,
        quantity: u32,
        limit_price: Decimal,
    ) -> ExecResult<OrderAck> {
        self.record(Submission {
            side: OrderSide::BuyToClose,
            symbol: symbol.to_string(),
            option_symbol: Some(option_symbol.to_string()),
            quantity,
            limit_price: Some(limit_price),
        });
        Ok(self.place(symbol, Some(option_symbol), OrderSide::BuyToClose, quantity))
    }

    async fn buy(&self, symbol: &str, quantity: u32) -> ExecResult<OrderAck> {
        self.record(Submission {
            side: OrderSide::Buy,
            symbol: symbol.to_string(),
            option_symbol: None,
            quantity,
            limit_price: None,
        });
        Ok(self.place(symbol, None, OrderSide::Buy, quantity))
    }
}

// =============================================================================
// Stub Calendar
// =============================================================================

/// Stub market calendar with a settable state.
pub struct StubCalendar {
    open: RwLock<bool>,
    fail_next: RwLock<bool>,
}

impl StubCalendar {
    /// A calendar reporting the given state.
    pub fn new(open: bool) -> Self {
        Self { open: RwLock::new(open), fail_next: RwLock::new(false) }
    }

    /// Change the reported state.
    pub fn set_open(&self, open: bool) {
        *self.open.write().unwrap() = open;
    }

    /// Make the next check fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }
}

#[async_trait]
impl MarketCalendar for StubCalendar {
    async fn is_market_open(&self) -> ExecResult<bool> {
        let mut fail = self.fail_next.write().unwrap();
        if *fail {
            *fail = false;
            return Err(ExecError::Broker("Simulated calendar failure".to_string()));
        }
        Ok(*self.open.read().unwrap())
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
    async fn test_default_ack_and_fill() {
        let broker = StubBroker::new(dec!(100000));

        let ack = broker.buy("AAPL", 10).await.unwrap();
        assert!(ack.accepted);
        let id = ack.id.unwrap();

        let order = broker.order(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.quantity, dec!(10));
    }

    #[tokio::test]
    async fn test_scripted_acks_are_consumed_in_order() {
        let broker = StubBroker::new(dec!(100000));
        broker.script_acks([OrderAck::rejected()]);

        let first = broker.buy("AAPL", 10).await.unwrap();
        assert!(!first.accepted);

        let second = broker.buy("AAPL", 10).await.unwrap();
        assert!(second.accepted);
        assert_eq!(broker.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_polls_and_missing_status() {
        let broker = StubBroker::new(dec!(100000));
        broker.script_polls([None, Some(OrderStatus::Open), Some(OrderStatus::Filled)]);

        let ack = broker.buy("AAPL", 1).await.unwrap();
        let id = ack.id.unwrap();

        assert!(broker.order(id).await.unwrap().is_none());
        assert_eq!(broker.order(id).await.unwrap().unwrap().status, OrderStatus::Open);
        assert_eq!(broker.order(id).await.unwrap().unwrap().status, OrderStatus::Filled);
        assert_eq!(broker.poll_count(), 3);
    }

    #[tokio::test]
    async fn test_sell_to_open_consumes_buying_power() {
        let broker = StubBroker::new(dec!(60000));

        broker.sell_to_open("MSFT", "MSFT250117P00250000", 1).await.unwrap();
        assert_eq!(broker.buying_power(), dec!(35000)); // minus 250 × 100
    }

    #[tokio::test]
    async fn test_best_option_respects_type_and_min_strike() {
        let broker = StubBroker::new(dec!(100000));
        broker.set_candidate(
            "MSFT",
            OptionCandidate {
                symbol: "MSFT250117P00250000".to_string(),
                strike: dec!(250),
                premium: dec!(300),
                delta: dec!(-0.3),
                weekly_rate: dec!(150),
            },
        );

        let hit = broker.best_option("MSFT", OptionType::Put, None, None).await.unwrap();
        assert!(hit.is_some());

        let wrong_type = broker.best_option("MSFT", OptionType::Call, None, None).await.unwrap();
        assert!(wrong_type.is_none());

        let below_min = broker
            .best_option("MSFT", OptionType::Put, Some(dec!(300)), None)
            .await
            .unwrap();
        assert!(below_min.is_none());
    }

    #[tokio::test]
    async fn test_prices_empty_input_short_circuits() {
        let broker = StubBroker::new(dec!(100000));
        let quotes = broker.prices(&[]).await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn test_calendar() {
        let calendar = StubCalendar::new(true);
        assert!(calendar.is_market_open().await.unwrap());

        calendar.set_open(false);
        assert!(!calendar.is_market_open().await.unwrap());

        calendar.set_fail_next(true);
        assert!(calendar.is_market_open().await.is_err());
        assert!(!calendar.is_market_open().await.unwrap());
    }
}
