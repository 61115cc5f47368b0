//! Test fixtures shared by integration tests.
//!
//! Builders for account snapshots so tests read as scenarios instead of
//! struct literals.

#![warn(clippy::all)]

pub mod fixtures;

pub use fixtures::{long_stock, pending_put_sale, put_candidate, put_seller, short_put};
