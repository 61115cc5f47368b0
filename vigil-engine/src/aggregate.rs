//! Position/order bucketing.
//!
//! Single-pass, order-preserving filters that sort a raw account
//! snapshot into the roles the planner cares about. No side effects.

use rust_decimal::Decimal;
use vigil_domain::entities::ROUND_LOT;
use vigil_domain::{OptionType, Order, Position};

/// Stock positions large enough to back at least one contract.
pub fn optionable_stock(positions: &[Position]) -> Vec<&Position> {
    positions
        .iter()
        .filter(|p| !p.is_option() && p.quantity >= Decimal::from(ROUND_LOT))
        .collect()
}

/// Short put positions (negative quantity).
pub fn short_puts(positions: &[Position]) -> Vec<&Position> {
    positions
        .iter()
        .filter(|p| p.option_type() == Some(OptionType::Put) && p.quantity < Decimal::ZERO)
        .collect()
}

/// Short call positions (negative quantity).
pub fn short_calls(positions: &[Position]) -> Vec<&Position> {
    positions
        .iter()
        .filter(|p| p.option_type() == Some(OptionType::Call) && p.quantity < Decimal::ZERO)
        .collect()
}

/// All put positions, long or short.
pub fn put_positions(positions: &[Position]) -> Vec<&Position> {
    positions
        .iter()
        .filter(|p| p.option_type() == Some(OptionType::Put))
        .collect()
}

/// Long put positions (positive quantity).
pub fn long_put_positions(positions: &[Position]) -> Vec<&Position> {
    positions
        .iter()
        .filter(|p| p.option_type() == Some(OptionType::Put) && p.quantity > Decimal::ZERO)
        .collect()
}

/// Resting orders that open new cash-secured put exposure.
///
/// Only non-terminal orders count toward exposure.
pub fn cash_secured_put_orders(orders: &[Order]) -> Vec<&Order> {
    orders
        .iter()
        .filter(|o| {
            o.option_type() == Some(OptionType::Put)
                && o.side.is_opening_sell()
                && !o.status.is_terminal()
        })
        .collect()
}
