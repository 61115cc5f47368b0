//! Vigil Daemon
//!
//! Scheduled options-income trading bot.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p vigild
//!
//! # Start against the live brokerage
//! VIGIL_ENV=production VIGIL_TRADIER_TOKEN=... VIGIL_TRADIER_ACCOUNT=... cargo run -p vigild
//! ```
//!
//! # Environment Variables
//!
//! - `VIGIL_ENV`: Environment (test, development, production)
//! - `VIGIL_TRADIER_TOKEN`: Brokerage API token (required outside test)
//! - `VIGIL_TRADIER_ACCOUNT`: Brokerage account id (required outside test)
//! - `VIGIL_TRADIER_SANDBOX`: Use the sandbox endpoint (default: true outside production)
//! - `VIGIL_CYCLE_INTERVAL_SECS`: Seconds between ticks (default: 300)
//! - `VIGIL_PUTS_ENABLED`: Enable the put-selling strategy (default: false)
//! - `VIGIL_MAX_ALLOCATION`, `VIGIL_MAX_POSITIONS`, `VIGIL_RESERVE`,
//!   `VIGIL_BUY_TO_CLOSE_AMOUNT`, `VIGIL_DEFAULT_VOLATILITY`: strategy knobs
//! - `VIGIL_WATCHLIST`: Comma-separated symbols to seed the watchlist

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vigild::{Config, Daemon, Environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("vigild=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "vigil daemon"
    );

    // Create and run the daemon
    match config.environment {
        Environment::Production => Daemon::new_live(config)?.run().await?,
        _ => Daemon::new_stub(config).run().await?,
    }

    Ok(())
}
