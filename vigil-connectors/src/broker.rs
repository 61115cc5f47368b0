//! Tradier adapter for the execution-layer ports.
//!
//! Maps Tradier wire types onto the domain model and implements the
//! chain-selection policy: nearest expiration at least a week out,
//! contract closest to the target delta, premium taken at the mid.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use vigil_domain::watchlist::DEFAULT_TARGET_DELTA;
use vigil_domain::{
    OptionCandidate, OptionType, Order, OrderId, OrderSide, OrderStatus, Position,
};
use vigil_exec::{Balances, BrokerPort, ExecError, ExecResult, MarketCalendar, OrderAck, Quote};

use crate::tradier_rest::{
    TradierOptionQuote, TradierOrder, TradierPosition, TradierRestClient, TradierRestError,
    TradierTrade,
};

/// Expirations closer than this are skipped when picking a chain.
const MIN_DAYS_TO_EXPIRATION: i64 = 7;

/// `BrokerPort` / `MarketCalendar` adapter over the Tradier REST client.
pub struct TradierBroker {
    client: TradierRestClient,
}

impl TradierBroker {
    /// Wrap a configured REST client.
    pub fn new(client: TradierRestClient) -> Self {
        Self { client }
    }
}

fn broker_err(e: TradierRestError) -> ExecError {
    ExecError::Broker(e.to_string())
}

// =============================================================================
// Wire-to-domain mapping
// =============================================================================

fn map_status(status: &str) -> OrderStatus {
    match status {
        "open" => OrderStatus::Open,
        "partially_filled" => OrderStatus::PartiallyFilled,
        "filled" => OrderStatus::Filled,
        "rejected" | "error" => OrderStatus::Rejected,
        "canceled" => OrderStatus::Canceled,
        "expired" => OrderStatus::Expired,
        "pending" | "submitted" | "accepted" | "held" | "calculated" => OrderStatus::Pending,
        other => {
            warn!(status = other, "unknown order status; treating as pending");
            OrderStatus::Pending
        }
    }
}

fn map_side(side: &str) -> Option<OrderSide> {
    match side {
        "buy" => Some(OrderSide::Buy),
        "sell" => Some(OrderSide::Sell),
        "buy_to_open" => Some(OrderSide::BuyToOpen),
        "sell_to_open" => Some(OrderSide::SellToOpen),
        "buy_to_close" => Some(OrderSide::BuyToClose),
        "sell_to_close" => Some(OrderSide::SellToClose),
        _ => None,
    }
}

fn map_order(order: TradierOrder) -> Option<Order> {
    let side = match map_side(&order.side) {
        Some(side) => side,
        None => {
            warn!(id = order.id, side = %order.side, "dropping order with unknown side");
            return None;
        }
    };
    Some(Order {
        id: order.id,
        symbol: order.symbol,
        option_symbol: order.option_symbol,
        side,
        status: map_status(&order.status),
        quantity: order.quantity,
    })
}

fn map_position(position: TradierPosition) -> Position {
    let date_acquired = position
        .date_acquired
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    Position {
        symbol: position.symbol,
        quantity: position.quantity,
        cost_basis: position.cost_basis,
        date_acquired,
    }
}

// =============================================================================
// Chain selection
// =============================================================================

/// The expiration to sell against: nearest at least a week out, or the
/// furthest listed when everything expires sooner.
fn pick_expiration(expirations: &[NaiveDate], today: NaiveDate) -> Option<NaiveDate> {
    let earliest = today + chrono::Duration::days(MIN_DAYS_TO_EXPIRATION);
    expirations
        .iter()
        .copied()
        .filter(|d| *d >= earliest)
        .min()
        .or_else(|| expirations.iter().copied().max())
}

/// Whole weeks to expiration, minimum one.
fn weeks_until(today: NaiveDate, expiration: NaiveDate) -> Decimal {
    let days = (expiration - today).num_days().max(0);
    Decimal::from(((days + 6) / 7).max(1))
}

/// The chain row closest to the target delta that has a live bid.
///
/// Premium is the bid/ask mid scaled to a whole contract; the weekly
/// rate divides it by the weeks to expiration.
fn best_from_chain(
    chain: Vec<TradierOptionQuote>,
    option_type: OptionType,
    min_strike: Option<Decimal>,
    target_delta: Decimal,
    weeks: Decimal,
) -> Option<OptionCandidate> {
    let wanted = match option_type {
        OptionType::Call => "call",
        OptionType::Put => "put",
    };

    let mut best: Option<(Decimal, OptionCandidate)> = None;
    for quote in chain {
        if quote.option_type != wanted {
            continue;
        }
        if let Some(min) = min_strike {
            if quote.strike < min {
                continue;
            }
        }
        let delta = match &quote.greeks {
            Some(greeks) => greeks.delta,
            None => continue,
        };
        let bid = match quote.bid {
            Some(bid) if bid > Decimal::ZERO => bid,
            _ => continue,
        };
        let mid = match quote.ask {
            Some(ask) if ask > Decimal::ZERO => (bid + ask) / Decimal::from(2),
            _ => bid,
        };

        let premium = mid * Decimal::from(100);
        let distance = (delta.abs() - target_delta).abs();
        let candidate = OptionCandidate {
            symbol: quote.symbol,
            strike: quote.strike,
            premium,
            delta,
            weekly_rate: premium / weeks,
        };

        let closer = match &best {
            Some((best_distance, _)) => distance < *best_distance,
            None => true,
        };
        if closer {
            best = Some((distance, candidate));
        }
    }

    best.map(|(_, candidate)| candidate)
}

/// Weighted-average buy price from trade history.
fn average_buy_price(trades: &[TradierTrade], symbol: &str) -> Option<Decimal> {
    let mut shares = Decimal::ZERO;
    let mut cost = Decimal::ZERO;
    for trade in trades {
        if trade.symbol != symbol || trade.quantity <= Decimal::ZERO {
            continue;
        }
        shares += trade.quantity;
        cost += trade.quantity * trade.price;
    }
    if shares == Decimal::ZERO {
        return None;
    }
    Some(cost / shares)
}

// =============================================================================
// Port implementations
// =============================================================================

#[async_trait]
impl BrokerPort for TradierBroker {
    async fn positions(&self) -> ExecResult<Vec<Position>> {
        let positions = self.client.get_positions().await.map_err(broker_err)?;
        Ok(positions.into_iter().map(map_position).collect())
    }

    async fn orders(&self) -> ExecResult<Vec<Order>> {
        let orders = self.client.get_orders().await.map_err(broker_err)?;
        Ok(orders.into_iter().filter_map(map_order).collect())
    }

    async fn order(&self, id: OrderId) -> ExecResult<Option<Order>> {
        let order = self.client.get_order(id).await.map_err(broker_err)?;
        Ok(order.and_then(map_order))
    }

    async fn prices(&self, symbols: &[String]) -> ExecResult<Vec<Quote>> {
        let quotes = self.client.get_quotes(symbols).await.map_err(broker_err)?;
        Ok(quotes
            .into_iter()
            .filter_map(|q| q.last.map(|last| Quote { symbol: q.symbol, price: last }))
            .collect())
    }

    async fn balances(&self) -> ExecResult<Balances> {
        let balances = self.client.get_balances().await.map_err(broker_err)?;
        Ok(Balances { option_buying_power: balances.option_buying_power() })
    }

    async fn best_option(
        &self,
        symbol: &str,
        option_type: OptionType,
        min_strike: Option<Decimal>,
        target_delta: Option<Decimal>,
    ) -> ExecResult<Option<OptionCandidate>> {
        let expirations = self.client.get_expirations(symbol).await.map_err(broker_err)?;
        let today = Utc::now().date_naive();

        let expiration = match pick_expiration(&expirations, today) {
            Some(expiration) => expiration,
            None => {
                debug!(symbol, "no expirations listed");
                return Ok(None);
            }
        };

        let chain = self
            .client
            .get_option_chain(symbol, expiration)
            .await
            .map_err(broker_err)?;
        let weeks = weeks_until(today, expiration);
        let target = target_delta.unwrap_or(DEFAULT_TARGET_DELTA);

        Ok(best_from_chain(chain, option_type, min_strike, target, weeks))
    }

    async fn cost_basis_per_share(&self, symbol: &str) -> ExecResult<Option<Decimal>> {
        let trades = self.client.get_trade_history(symbol).await.map_err(broker_err)?;
        Ok(average_buy_price(&trades, symbol))
    }

    async fn sell_to_open(
        &self,
        symbol: &str,
        option_symbol: &str,
        quantity: u32,
    ) -> ExecResult<OrderAck> {
        let ack = self
            .client
            .place_option_order(symbol, option_symbol, "sell_to_open", quantity, None)
            .await
            .map_err(broker_err)?;
        Ok(OrderAck { accepted: ack.status == "ok", id: ack.id })
    }

    async fn buy_to_close(
        &self,
        symbol: &str,
        option_symbol: &str,
        quantity: u32,
        limit_price: Decimal,
    ) -> ExecResult<OrderAck> {
        let ack = self
            .client
            .place_option_order(symbol, option_symbol, "buy_to_close", quantity, Some(limit_price))
            .await
            .map_err(broker_err)?;
        Ok(OrderAck { accepted: ack.status == "ok", id: ack.id })
    }

    async fn buy(&self, symbol: &str, quantity: u32) -> ExecResult<OrderAck> {
        let ack = self
            .client
            .place_equity_order(symbol, "buy", quantity)
            .await
            .map_err(broker_err)?;
        Ok(OrderAck { accepted: ack.status == "ok", id: ack.id })
    }
}

#[async_trait]
impl MarketCalendar for TradierBroker {
    async fn is_market_open(&self) -> ExecResult<bool> {
        let clock = self.client.get_clock().await.map_err(broker_err)?;
        Ok(clock.state == "open")
    }
}

// =============================================================================
// Tests
// =============================================================================
