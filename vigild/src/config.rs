//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible
//! defaults. The trading settings loaded here seed the settings store
//! at startup; from then on the store is authoritative.

use crate::error::{DaemonError, DaemonResult};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use vigil_domain::Settings;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (test, development, production)
    pub environment: Environment,

    /// Brokerage credentials and endpoint selection
    pub broker: BrokerConfig,

    /// Time between scheduler ticks
    pub cycle_interval: Duration,

    /// Trading settings seeded into the settings store
    pub trading: Settings,

    /// Watchlist symbols seeded into the watchlist store
    pub watchlist: Vec<String>,
}

/// Brokerage connection configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// API bearer token
    pub token: Option<String>,
    /// Account identifier
    pub account_id: Option<String>,
    /// Use the sandbox endpoint
    pub sandbox: bool,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let broker = BrokerConfig {
            token: env::var("VIGIL_TRADIER_TOKEN").ok(),
            account_id: env::var("VIGIL_TRADIER_ACCOUNT").ok(),
            sandbox: Self::load_bool_env(
                "VIGIL_TRADIER_SANDBOX",
                environment != Environment::Production,
            )?,
        };

        let interval_secs = Self::load_u64_env("VIGIL_CYCLE_INTERVAL_SECS", 300)?;

        let defaults = Settings::default();
        let trading = Settings {
            puts_enabled: Self::load_bool_env("VIGIL_PUTS_ENABLED", defaults.puts_enabled)?,
            calls_enabled: Self::load_bool_env("VIGIL_CALLS_ENABLED", defaults.calls_enabled)?,
            max_allocation: Self::load_decimal_env("VIGIL_MAX_ALLOCATION", defaults.max_allocation)?,
            max_positions: Self::load_u64_env("VIGIL_MAX_POSITIONS", defaults.max_positions as u64)?
                as u32,
            reserve: Self::load_decimal_env("VIGIL_RESERVE", defaults.reserve)?,
            buy_to_close_amount: Self::load_decimal_env(
                "VIGIL_BUY_TO_CLOSE_AMOUNT",
                defaults.buy_to_close_amount,
            )?,
            default_volatility: Self::load_decimal_env(
                "VIGIL_DEFAULT_VOLATILITY",
                defaults.default_volatility,
            )?,
        };

        let watchlist = env::var("VIGIL_WATCHLIST")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            environment,
            broker,
            cycle_interval: Duration::from_secs(interval_secs),
            trading,
            watchlist,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            environment: Environment::Test,
            broker: BrokerConfig { token: None, account_id: None, sandbox: true },
            cycle_interval: Duration::from_millis(10),
            trading: Settings::default(),
            watchlist: Vec::new(),
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("VIGIL_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid VIGIL_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
        match env::var(key) {
            Ok(val) => Decimal::from_str(&val)
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_bool_env(key: &str, default: bool) -> DaemonResult<bool> {
        match env::var(key) {
            Ok(val) => match val.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                other => Err(DaemonError::Config(format!("Invalid {} value: {}", key, other))),
            },
            Err(_) => Ok(default),
        }
    }

    fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
        match env::var(key) {
            Ok(val) => val
                .parse::<u64>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            broker: BrokerConfig { token: None, account_id: None, sandbox: true },
            cycle_interval: Duration::from_secs(300),
            trading: Settings::default(),
            watchlist: Vec::new(),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.cycle_interval, Duration::from_secs(300));
        assert!(config.broker.sandbox);
        assert!(!config.trading.puts_enabled);
        assert!(config.watchlist.is_empty());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.environment, Environment::Test);
        assert!(config.broker.token.is_none());
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
