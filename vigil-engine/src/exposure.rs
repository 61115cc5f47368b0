//! Exposure estimation.
//!
//! One "unit" is one option-contract-equivalent: a round lot of stock
//! that could back a covered call, a held option contract, or a pending
//! opening order. The planner and the selector both measure commitment
//! in these units.

use rust_decimal::prelude::ToPrimitive;
use vigil_domain::{Order, Position};

use crate::aggregate;

/// Option-equivalent units already committed for an underlying.
///
/// Counts round lots of optionable stock, held option contracts of any
/// type or direction, and contracts on qualifying pending opening
/// orders, all matched on the underlying ticker.
pub fn estimated_units(symbol: &str, positions: &[Position], orders: &[Order]) -> u32 {
    let stock_lots: u32 = aggregate::optionable_stock(positions)
        .iter()
        .filter(|p| p.underlying() == symbol)
        .map(|p| p.round_lots())
        .sum();

    let held_contracts: u32 = positions
        .iter()
        .filter(|p| p.is_option() && p.underlying() == symbol)
        .map(|p| p.quantity.abs().floor().to_u32().unwrap_or(0))
        .sum();

    let pending_contracts: u32 = aggregate::cash_secured_put_orders(orders)
        .iter()
        .filter(|o| o.underlying() == symbol)
        .map(|o| o.quantity.abs().floor().to_u32().unwrap_or(0))
        .sum();

    stock_lots + held_contracts + pending_contracts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use vigil_domain::{OrderSide, OrderStatus};

    fn position(symbol: &str, quantity: Decimal) -> Position {
        Position {
            symbol: symbol.to_string(),
            quantity,
            cost_basis: Decimal::ZERO,
            date_acquired: Utc::now(),
        }
    }

    fn put_order(option_symbol: &str, quantity: Decimal, status: OrderStatus) -> Order {
        Order {
            id: 7,
            symbol: vigil_domain::underlying(option_symbol).to_string(),
            option_symbol: Some(option_symbol.to_string()),
            side: OrderSide::SellToOpen,
            status,
            quantity,
        }
    }

    #[test]
    fn test_stock_counts_in_round_lots() {
        let positions = vec![position("MSFT", dec!(127))];
        assert_eq!(estimated_units("MSFT", &positions, &[]), 1);

        let positions = vec![position("MSFT", dec!(350))];
        assert_eq!(estimated_units("MSFT", &positions, &[]), 3);

        // Below one round lot the stock contributes nothing
        let positions = vec![position("MSFT", dec!(99))];
        assert_eq!(estimated_units("MSFT", &positions, &[]), 0);
    }

    #[test]
    fn test_short_contracts_count_absolute() {
        let positions = vec![position("MSFT250117P00250000", dec!(-2))];
        assert_eq!(estimated_units("MSFT", &positions, &[]), 2);
    }

    #[test]
    fn test_pending_orders_count() {
        let orders = vec![
            put_order("MSFT250117P00250000", dec!(1), OrderStatus::Open),
            put_order("MSFT250117P00240000", dec!(2), OrderStatus::Pending),
            put_order("MSFT250117P00230000", dec!(1), OrderStatus::Canceled),
        ];
        assert_eq!(estimated_units("MSFT", &[], &orders), 3);
    }

    #[test]
    fn test_sources_combine_per_underlying() {
        let positions = vec![
            position("MSFT", dec!(250)),
            position("MSFT250117P00250000", dec!(-1)),
            position("AAPL", dec!(400)),
        ];
        let orders = vec![put_order("MSFT250117P00240000", dec!(1), OrderStatus::Open)];

        assert_eq!(estimated_units("MSFT", &positions, &orders), 4);
        assert_eq!(estimated_units("AAPL", &positions, &orders), 4);
        assert_eq!(estimated_units("GOOG", &positions, &orders), 0);
    }
}
