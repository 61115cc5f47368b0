//! Vigil Connectors
//!
//! Adapters between the execution-layer ports and real brokerage APIs.
//! Currently: a Tradier-style REST client and its `BrokerPort` /
//! `MarketCalendar` adapter.

#![warn(clippy::all)]

pub mod broker;
pub mod tradier_rest;

pub use broker::TradierBroker;
pub use tradier_rest::{TradierRestClient, TradierRestError};
