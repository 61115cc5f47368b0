//! Vigil Execution Layer
//!
//! The bridge between the pure engine (decisions) and the impure
//! brokerage (I/O). Defines the broker ports, a scripted stub broker
//! for tests, and the cycle controller that turns engine output into
//! orders under bounded-retry policies.

#![warn(clippy::all)]

pub mod cycle;
pub mod error;
pub mod ports;
pub mod stub;

pub use cycle::{CycleOutcome, CycleRunner, LegFill, RetryPolicy};
pub use error::{ExecError, ExecResult};
pub use ports::{Balances, BrokerPort, MarketCalendar, OrderAck, Quote};
pub use stub::{StubBroker, StubCalendar};
