//! Tradier REST API client.
//!
//! Provides REST integration for:
//! - Account snapshots (positions, orders, balances)
//! - Market data (quotes, option expirations and chains, the clock)
//! - Order placement (equity and option orders)
//!
//! # Authentication
//!
//! Tradier uses a plain Bearer token; every request carries
//! `Authorization: Bearer <token>` and `Accept: application/json`.
//!
//! # Response shapes
//!
//! List endpoints wrap their payload twice (`{"positions": {"position":
//! [...]}}`) and collapse a single-element list to a bare object — or to
//! the string `"null"` when empty. [`one_or_many`] normalizes all three
//! shapes so callers always see a `Vec`.

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

// =============================================================================
// Constants
// =============================================================================

/// Tradier production API base URL
const TRADIER_API_URL: &str = "https://api.tradier.com";

/// Tradier sandbox API base URL
const TRADIER_SANDBOX_URL: &str = "https://sandbox.tradier.com";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the Tradier REST client.
#[derive(Debug, Clone, Error)]
pub enum TradierRestError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// API returned a non-success status
    #[error("Tradier API error: HTTP {status}: {body}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

// =============================================================================
// Tradier REST Client
// =============================================================================

/// Tradier REST API client.
pub struct TradierRestClient {
    /// HTTP client
    client: Client,
    /// Bearer token
    token: String,
    /// Account identifier for account-scoped endpoints
    account_id: String,
    /// Use the sandbox environment
    sandbox: bool,
}

impl TradierRestClient {
    /// Create a production client.
    pub fn new(token: String, account_id: String) -> Self {
        Self { client: Client::new(), token, account_id, sandbox: false }
    }

    /// Create a sandbox client (for testing).
    pub fn sandbox(token: String, account_id: String) -> Self {
        Self { client: Client::new(), token, account_id, sandbox: true }
    }

    /// Get the base URL for API requests.
    fn base_url(&self) -> &str {
        if self.sandbox {
            TRADIER_SANDBOX_URL
        } else {
            TRADIER_API_URL
        }
    }

    /// Send a GET request and return the raw body.
    async fn get(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> Result<String, TradierRestError> {
        let url = format!("{}{}", self.base_url(), endpoint);

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client
                .get(&url)
                .query(&params)
                .bearer_auth(&self.token)
                .header("Accept", "application/json")
                .send(),
        )
        .await
        .map_err(|_| TradierRestError::Timeout)?
        .map_err(|e| TradierRestError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TradierRestError::ParseError(e.to_string()))?;

        if !status.is_success() {
            return Err(TradierRestError::ApiError { status: status.as_u16(), body });
        }

        Ok(body)
    }

    /// Send a form-encoded POST request and return the raw body.
    async fn post(
        &self,
        endpoint: &str,
        form: Vec<(&str, String)>,
    ) -> Result<String, TradierRestError> {
        let url = format!("{}{}", self.base_url(), endpoint);

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client
                .post(&url)
                .form(&form)
                .bearer_auth(&self.token)
                .header("Accept", "application/json")
                .send(),
        )
        .await
        .map_err(|_| TradierRestError::Timeout)?
        .map_err(|e| TradierRestError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TradierRestError::ParseError(e.to_string()))?;

        if !status.is_success() {
            return Err(TradierRestError::ApiError { status: status.as_u16(), body });
        }

        Ok(body)
    }

    // =========================================================================
    // Market data
    // =========================================================================

    /// Last-trade quotes for a symbol set.
    ///
    /// An empty input returns an empty list without touching the wire.
    pub async fn get_quotes(
        &self,
        symbols: &[String],
    ) -> Result<Vec<TradierQuote>, TradierRestError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let body = self
            .get(
                "/v1/markets/quotes",
                vec![("symbols", symbols.join(","))],
            )
            .await?;

        parse_list(&body, "quotes", "quote")
    }

    /// Option expiration dates for an underlying, soonest first.
    pub async fn get_expirations(
        &self,
        symbol: &str,
    ) -> Result<Vec<NaiveDate>, TradierRestError> {
        let body = self
            .get(
                "/v1/markets/options/expirations",
                vec![("symbol", symbol.to_string())],
            )
            .await?;

        let dates: Vec<String> = parse_list(&body, "expirations", "date")?;
        dates
            .iter()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|e| TradierRestError::ParseError(format!("bad expiration {}: {}", d, e)))
            })
            .collect()
    }

    /// The full option chain for one expiration, greeks included.
    pub async fn get_option_chain(
        &self,
        symbol: &str,
        expiration: NaiveDate,
    ) -> Result<Vec<TradierOptionQuote>, TradierRestError> {
        let body = self
            .get(
                "/v1/markets/options/chains",
                vec![
                    ("symbol", symbol.to_string()),
                    ("expiration", expiration.format("%Y-%m-%d").to_string()),
                    ("greeks", "true".to_string()),
                ],
            )
            .await?;

        parse_list(&body, "options", "option")
    }

    /// Exchange clock state.
    pub async fn get_clock(&self) -> Result<TradierClock, TradierRestError> {
        let body = self.get("/v1/markets/clock", vec![]).await?;

        #[derive(Deserialize)]
        struct Envelope {
            clock: TradierClock,
        }
        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| TradierRestError::ParseError(e.to_string()))?;
        Ok(envelope.clock)
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Current account positions.
    pub async fn get_positions(&self) -> Result<Vec<TradierPosition>, TradierRestError> {
        let endpoint = format!("/v1/accounts/{}/positions", self.account_id);
        let body = self.get(&endpoint, vec![]).await?;
        parse_list(&body, "positions", "position")
    }

    /// All orders visible on the account.
    pub async fn get_orders(&self) -> Result<Vec<TradierOrder>, TradierRestError> {
        let endpoint = format!("/v1/accounts/{}/orders", self.account_id);
        let body = self.get(&endpoint, vec![]).await?;
        parse_list(&body, "orders", "order")
    }

    /// A single order by id; `None` when the API has nothing for it.
    pub async fn get_order(&self, id: u64) -> Result<Option<TradierOrder>, TradierRestError> {
        let endpoint = format!("/v1/accounts/{}/orders/{}", self.account_id, id);
        let body = self.get(&endpoint, vec![]).await?;

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TradierRestError::ParseError(e.to_string()))?;
        let node = &value["order"];
        if node.is_null() || *node == serde_json::json!("null") {
            return Ok(None);
        }
        serde_json::from_value(node.clone())
            .map(Some)
            .map_err(|e| TradierRestError::ParseError(e.to_string()))
    }

    /// Account balances.
    pub async fn get_balances(&self) -> Result<TradierBalances, TradierRestError> {
        let endpoint = format!("/v1/accounts/{}/balances", self.account_id);
        let body = self.get(&endpoint, vec![]).await?;

        #[derive(Deserialize)]
        struct Envelope {
            balances: TradierBalances,
        }
        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| TradierRestError::ParseError(e.to_string()))?;
        Ok(envelope.balances)
    }

    /// Trade events from account history for one symbol.
    pub async fn get_trade_history(
        &self,
        symbol: &str,
    ) -> Result<Vec<TradierTrade>, TradierRestError> {
        let endpoint = format!("/v1/accounts/{}/history", self.account_id);
        let body = self
            .get(
                &endpoint,
                vec![
                    ("type", "trade".to_string()),
                    ("symbol", symbol.to_string()),
                    ("limit", "100".to_string()),
                ],
            )
            .await?;

        let events: Vec<TradierHistoryEvent> = parse_list(&body, "history", "event")?;
        Ok(events.into_iter().filter_map(|e| e.trade).collect())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an equity market order (day).
    pub async fn place_equity_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: u32,
    ) -> Result<TradierOrderAck, TradierRestError> {
        let form = vec![
            ("class", "equity".to_string()),
            ("symbol", symbol.to_string()),
            ("side", side.to_string()),
            ("quantity", quantity.to_string()),
            ("type", "market".to_string()),
            ("duration", "day".to_string()),
        ];
        self.place_order(form).await
    }

    /// Place an option order. A limit price makes it a GTC limit order,
    /// otherwise it goes out as a market day order.
    pub async fn place_option_order(
        &self,
        symbol: &str,
        option_symbol: &str,
        side: &str,
        quantity: u32,
        limit_price: Option<Decimal>,
    ) -> Result<TradierOrderAck, TradierRestError> {
        let mut form = vec![
            ("class", "option".to_string()),
            ("symbol", symbol.to_string()),
            ("option_symbol", option_symbol.to_string()),
            ("side", side.to_string()),
            ("quantity", quantity.to_string()),
        ];
        match limit_price {
            Some(price) => {
                form.push(("type", "limit".to_string()));
                form.push(("duration", "gtc".to_string()));
                form.push(("price", price.to_string()));
            }
            None => {
                form.push(("type", "market".to_string()));
                form.push(("duration", "day".to_string()));
            }
        }
        self.place_order(form).await
    }

    async fn place_order(
        &self,
        form: Vec<(&str, String)>,
    ) -> Result<TradierOrderAck, TradierRestError> {
        let endpoint = format!("/v1/accounts/{}/orders", self.account_id);
        let body = self.post(&endpoint, form).await?;

        #[derive(Deserialize)]
        struct Envelope {
            order: TradierOrderAck,
        }
        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| TradierRestError::ParseError(e.to_string()))?;
        Ok(envelope.order)
    }
}

// =============================================================================
// Shape normalization
// =============================================================================

/// Extract `body[outer][inner]` as a list.
///
/// Accepts an array, a bare object standing in for a single-element
/// array, or a null/`"null"` marker for an empty list.
fn parse_list<T: DeserializeOwned>(
    body: &str,
    outer: &str,
    inner: &str,
) -> Result<Vec<T>, TradierRestError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| TradierRestError::ParseError(e.to_string()))?;
    one_or_many(&value[outer], inner)
}

/// Normalize Tradier's collapsed list shapes into a `Vec`.
fn one_or_many<T: DeserializeOwned>(
    node: &serde_json::Value,
    inner: &str,
) -> Result<Vec<T>, TradierRestError> {
    use serde_json::Value;

    if node.is_null() || *node == Value::String("null".to_string()) {
        return Ok(Vec::new());
    }

    let items = &node[inner];
    match items {
        Value::Null => Ok(Vec::new()),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| {
                serde_json::from_value(entry.clone())
                    .map_err(|e| TradierRestError::ParseError(e.to_string()))
            })
            .collect(),
        single => serde_json::from_value(single.clone())
            .map(|item| vec![item])
            .map_err(|e| TradierRestError::ParseError(e.to_string())),
    }
}

// =============================================================================
// Tradier Types (from API responses)
// =============================================================================

/// A quote row from `/v1/markets/quotes`.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierQuote {
    /// Symbol the quote is for
    pub symbol: String,
    /// Last trade price
    pub last: Option<Decimal>,
}

/// A position row from the positions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierPosition {
    /// Instrument identifier (OCC symbol for options)
    pub symbol: String,
    /// Signed quantity
    pub quantity: Decimal,
    /// Aggregate cost basis
    pub cost_basis: Decimal,
    /// Acquisition timestamp
    pub date_acquired: Option<String>,
}

/// An order row from the orders endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierOrder {
    /// Broker-assigned id
    pub id: u64,
    /// Underlying or equity symbol
    pub symbol: String,
    /// Option contract for single-leg option orders
    pub option_symbol: Option<String>,
    /// Side string (`buy`, `sell_to_open`, ...)
    pub side: String,
    /// Status string (`open`, `filled`, ...)
    pub status: String,
    /// Order quantity
    pub quantity: Decimal,
}

/// Order-placement acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierOrderAck {
    /// Broker-assigned id, present on acceptance
    pub id: Option<u64>,
    /// `ok` on acceptance
    pub status: String,
}

/// Account balances. The option buying power lives on the margin leaf
/// for margin accounts and on the cash leaf otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierBalances {
    /// Margin-account figures
    pub margin: Option<TradierMarginBalances>,
    /// Cash-account figures
    pub cash: Option<TradierCashBalances>,
}

/// Margin leaf of the balances response.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierMarginBalances {
    /// Buying power available for option collateral
    pub option_buying_power: Decimal,
}

/// Cash leaf of the balances response.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierCashBalances {
    /// Settled cash available for trading
    pub cash_available: Decimal,
}

impl TradierBalances {
    /// Buying power usable as option collateral.
    pub fn option_buying_power(&self) -> Decimal {
        if let Some(margin) = &self.margin {
            return margin.option_buying_power;
        }
        self.cash
            .as_ref()
            .map(|c| c.cash_available)
            .unwrap_or_default()
    }
}

/// One chain row from the options endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierOptionQuote {
    /// OCC contract identifier
    pub symbol: String,
    /// Strike price
    pub strike: Decimal,
    /// Best bid
    pub bid: Option<Decimal>,
    /// Best ask
    pub ask: Option<Decimal>,
    /// `put` or `call`
    pub option_type: String,
    /// Greeks, present when requested
    pub greeks: Option<TradierGreeks>,
}

/// Greeks attached to a chain row.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierGreeks {
    /// Contract delta
    pub delta: Decimal,
}

/// Exchange clock.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierClock {
    /// Market state (`open`, `closed`, `premarket`, ...)
    pub state: String,
}

/// A history event; only trade events carry a payload we use.
#[derive(Debug, Clone, Deserialize)]
struct TradierHistoryEvent {
    trade: Option<TradierTrade>,
}

/// A trade event from account history.
#[derive(Debug, Clone, Deserialize)]
pub struct TradierTrade {
    /// Instrument traded
    pub symbol: String,
    /// Signed share/contract quantity
    pub quantity: Decimal,
    /// Execution price per share
    pub price: Decimal,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_one_or_many_with_array() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{"position": [
                {"symbol": "MSFT", "quantity": 100, "cost_basis": 25000.0, "date_acquired": null},
                {"symbol": "AAPL", "quantity": 50, "cost_basis": 7000.0, "date_acquired": null}
            ]}"#,
        )
        .unwrap();
        let positions: Vec<TradierPosition> = one_or_many(&value, "position").unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].symbol, "MSFT");
        assert_eq!(positions[0].quantity, dec!(100));
    }

    #[test]
    fn test_one_or_many_with_bare_object() {
        // A single result comes back as an object, not a one-element array
        let value: serde_json::Value = serde_json::from_str(
            r#"{"position": {"symbol": "MSFT", "quantity": 100, "cost_basis": 25000.0, "date_acquired": null}}"#,
        )
        .unwrap();
        let positions: Vec<TradierPosition> = one_or_many(&value, "position").unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol, "MSFT");
    }

    #[test]
    fn test_one_or_many_with_null_marker() {
        let value: serde_json::Value = serde_json::from_str(r#""null""#).unwrap();
        let positions: Vec<TradierPosition> = one_or_many(&value, "position").unwrap();
        assert!(positions.is_empty());

        let value = serde_json::Value::Null;
        let positions: Vec<TradierPosition> = one_or_many(&value, "position").unwrap();
        assert!(positions.is_empty());
    }

    #[test]
    fn test_parse_positions_envelope() {
        let body = r#"{"positions": "null"}"#;
        let positions: Vec<TradierPosition> = parse_list(body, "positions", "position").unwrap();
        assert!(positions.is_empty());
    }

    #[test]
    fn test_parse_order_row() {
        let body = r#"{"orders": {"order": {
            "id": 257459,
            "symbol": "MSFT",
            "option_symbol": "MSFT250117P00250000",
            "side": "sell_to_open",
            "status": "open",
            "quantity": 1.0
        }}}"#;
        let orders: Vec<TradierOrder> = parse_list(body, "orders", "order").unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, 257459);
        assert_eq!(orders[0].side, "sell_to_open");
    }

    #[test]
    fn test_balances_prefer_margin_leaf() {
        let margin: TradierBalances = serde_json::from_str(
            r#"{"margin": {"option_buying_power": 31250.5}, "cash": null}"#,
        )
        .unwrap();
        assert_eq!(margin.option_buying_power(), dec!(31250.5));

        let cash: TradierBalances =
            serde_json::from_str(r#"{"margin": null, "cash": {"cash_available": 900}}"#).unwrap();
        assert_eq!(cash.option_buying_power(), dec!(900));
    }

    #[test]
    fn test_parse_chain_row_with_greeks() {
        let body = r#"{"options": {"option": [{
            "symbol": "MSFT250117P00250000",
            "strike": 250.0,
            "bid": 2.95,
            "ask": 3.05,
            "option_type": "put",
            "greeks": {"delta": -0.3012}
        }]}}"#;
        let chain: Vec<TradierOptionQuote> = parse_list(body, "options", "option").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].strike, dec!(250));
        assert_eq!(chain[0].greeks.as_ref().unwrap().delta, dec!(-0.3012));
    }

    #[test]
    fn test_sandbox_base_url() {
        let live = TradierRestClient::new("t".to_string(), "a".to_string());
        assert_eq!(live.base_url(), TRADIER_API_URL);

        let sandbox = TradierRestClient::sandbox("t".to_string(), "a".to_string());
        assert_eq!(sandbox.base_url(), TRADIER_SANDBOX_URL);
    }
}
