//! Fixture builders for account snapshots.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vigil_domain::{
    OptionCandidate, Order, OrderSide, OrderStatus, Position, SideConfig, WatchlistItem,
};

/// A long stock position.
pub fn long_stock(symbol: &str, shares: Decimal, cost_basis: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        quantity: shares,
        cost_basis,
        date_acquired: Utc::now(),
    }
}

/// A short put position on the given contract.
pub fn short_put(option_symbol: &str, contracts: u32, premium_collected: Decimal) -> Position {
    Position {
        symbol: option_symbol.to_string(),
        quantity: -Decimal::from(contracts),
        cost_basis: -premium_collected,
        date_acquired: Utc::now(),
    }
}

/// A resting opening put-sale order.
pub fn pending_put_sale(id: u64, option_symbol: &str, contracts: u32) -> Order {
    Order {
        id,
        symbol: vigil_domain::underlying(option_symbol).to_string(),
        option_symbol: Some(option_symbol.to_string()),
        side: OrderSide::SellToOpen,
        status: OrderStatus::Open,
        quantity: Decimal::from(contracts),
    }
}

/// A watchlist item configured to sell puts.
pub fn put_seller(symbol: &str, max_positions: u32) -> WatchlistItem {
    WatchlistItem {
        symbol: symbol.to_string(),
        max_positions,
        volatility: None,
        put: SideConfig { enabled: true, target_delta: dec!(0.3) },
        call: SideConfig::default(),
    }
}

/// A put candidate with an OCC-encoded symbol derived from its strike.
pub fn put_candidate(underlying: &str, strike: Decimal, weekly_rate: Decimal) -> OptionCandidate {
    let millis = (strike * dec!(1000)).to_i64().unwrap_or(0);
    OptionCandidate {
        symbol: format!("{}250117P{:08}", underlying, millis),
        strike,
        premium: weekly_rate * dec!(2),
        delta: dec!(-0.30),
        weekly_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_candidate_symbol_round_trips() {
        let candidate = put_candidate("MSFT", dec!(250), dec!(150));
        assert_eq!(candidate.symbol, "MSFT250117P00250000");
        assert_eq!(vigil_domain::strike(&candidate.symbol), Some(dec!(250)));
        assert_eq!(candidate.underlying(), "MSFT");
    }

    #[test]
    fn test_short_put_is_negative() {
        let position = short_put("MSFT250117P00250000", 2, dec!(600));
        assert_eq!(position.quantity, dec!(-2));
        assert!(position.is_option());
    }
}
