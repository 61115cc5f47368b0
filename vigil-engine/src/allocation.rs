//! Allocation planning.
//!
//! Computes the ideal option-equivalent unit count per watchlist symbol,
//! the cash buffer that must stay reserved against worst-case assignment
//! on those units, and the greedy purchase schedule that spends whatever
//! cash remains on stock-accumulation goals.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, error};
use vigil_domain::entities::ROUND_LOT;
use vigil_domain::{underlying, IdealPosition, Order, Position, PurchaseGoal, WatchlistItem};

use crate::aggregate;
use crate::exposure::estimated_units;
use crate::types::{PlannedSell, StockPurchase};

/// Ideal option-equivalent unit counts per watchlist symbol.
///
/// For every put-enabled item with a positive position cap:
/// `ideal = min(max_positions, committed units + planned sells)`.
/// Symbols with nothing committed and nothing planned are dropped.
/// Output follows watchlist order; volatility falls back to
/// `default_volatility` when the item sets none.
pub fn ideal_positions(
    watchlist: &[WatchlistItem],
    positions: &[Position],
    orders: &[Order],
    planned_sells: &[PlannedSell],
    default_volatility: Decimal,
) -> Vec<IdealPosition> {
    watchlist
        .iter()
        .filter(|item| item.sells_puts())
        .filter_map(|item| {
            let planned: u32 = planned_sells
                .iter()
                .filter(|sell| underlying(&sell.option_symbol) == item.symbol)
                .map(|sell| sell.contracts)
                .sum();
            let units = estimated_units(&item.symbol, positions, orders) + planned;
            let ideal = units.min(item.max_positions);
            if ideal == 0 {
                return None;
            }
            Some(IdealPosition {
                symbol: item.symbol.clone(),
                volatility: item.volatility_or(default_volatility),
                positions: ideal,
            })
        })
        .collect()
}

/// Cash reserved against worst-case assignment on the ideal positions.
///
/// Each symbol contributes `worst_case_per_share × 100 × units ×
/// volatility`. The worst case is the highest of the current price, the
/// long-stock cost basis per share, and the highest strike among open
/// put positions and pending opening put orders.
///
/// Returns `None` if any symbol resolves a worst case of zero: an
/// unknown liability cannot be netted against buying power, so the whole
/// computation fails rather than under-reserving.
pub fn buffer(
    ideals: &[IdealPosition],
    positions: &[Position],
    orders: &[Order],
    prices: &HashMap<String, Decimal>,
    cost_basis: &HashMap<String, Decimal>,
) -> Option<Decimal> {
    let mut total = Decimal::ZERO;

    for ideal in ideals {
        let worst = worst_case_per_share(&ideal.symbol, positions, orders, prices, cost_basis);
        if worst <= Decimal::ZERO {
            error!(
                symbol = %ideal.symbol,
                "no price, cost basis or strike resolvable; cannot size buffer"
            );
            return None;
        }

        let contribution = worst
            * Decimal::from(ROUND_LOT)
            * Decimal::from(ideal.positions)
            * ideal.volatility;
        debug!(symbol = %ideal.symbol, %worst, %contribution, "buffer contribution");
        total += contribution;
    }

    Some(total)
}

fn worst_case_per_share(
    symbol: &str,
    positions: &[Position],
    orders: &[Order],
    prices: &HashMap<String, Decimal>,
    cost_basis: &HashMap<String, Decimal>,
) -> Decimal {
    let price = prices.get(symbol).copied().unwrap_or_default();

    let basis = positions
        .iter()
        .find(|p| !p.is_option() && p.symbol == symbol && p.quantity > Decimal::ZERO)
        .and_then(|p| p.cost_basis_per_share())
        .or_else(|| cost_basis.get(symbol).copied())
        .unwrap_or_default();

    let held_strike = aggregate::put_positions(positions)
        .iter()
        .filter(|p| p.underlying() == symbol)
        .filter_map(|p| p.strike())
        .max()
        .unwrap_or_default();

    let pending_strike = aggregate::cash_secured_put_orders(orders)
        .iter()
        .filter(|o| o.underlying() == symbol)
        .filter_map(|o| o.strike())
        .max()
        .unwrap_or_default();

    price.max(basis).max(held_strike).max(pending_strike)
}

/// Cash the planner may actually spend.
pub fn unutilized_cash(option_buying_power: Decimal, reserve: Decimal, buffer: Decimal) -> Decimal {
    option_buying_power - reserve - buffer
}

/// Greedy goal fulfillment.
///
/// Goals run in priority order (descending, stable for ties); each buys
/// `min(floor(cash / price), remaining)` shares and shrinks the cash
/// pool. A goal whose price is missing logs an error and halts all
/// remaining goals, returning whatever was already scheduled.
///
/// The loop advances to the next goal only while the current goal is
/// still partially unmet; a goal bought to exactly its target ends the
/// run. That halt condition is inherited behavior, kept as observed.
pub fn positions_to_buy(
    cash: Decimal,
    goals: &[PurchaseGoal],
    prices: &HashMap<String, Decimal>,
) -> Vec<StockPurchase> {
    let mut queue: Vec<&PurchaseGoal> = goals
        .iter()
        .filter(|g| g.enabled && !g.is_done())
        .collect();
    queue.sort_by_key(|g| std::cmp::Reverse(g.priority));

    let mut remaining_cash = cash;
    let mut purchases = Vec::new();

    for goal in queue {
        let price = match prices.get(&goal.symbol).copied() {
            Some(p) if p > Decimal::ZERO => p,
            _ => {
                error!(symbol = %goal.symbol, goal_id = %goal.id, "no price for goal symbol; halting goal processing");
                break;
            }
        };

        let affordable = (remaining_cash / price)
            .floor()
            .to_u32()
            .unwrap_or(0);
        let quantity = affordable.min(goal.remaining());

        if quantity > 0 {
            remaining_cash -= price * Decimal::from(quantity);
            debug!(
                symbol = %goal.symbol,
                goal_id = %goal.id,
                quantity,
                cash_left = %remaining_cash,
                "scheduling goal purchase"
            );
            purchases.push(StockPurchase {
                goal_id: goal.id.clone(),
                symbol: goal.symbol.clone(),
                quantity,
            });
        }

        if goal.remaining() == quantity {
            break;
        }
    }

    purchases
}

// =============================================================================
// Tests
// =============================================================================
