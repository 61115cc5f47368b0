//! Option-symbol classification.
//!
//! Brokerage identifiers encode derivatives inline: an OCC-style option
//! symbol is the underlying ticker followed by a YYMMDD expiration, a
//! `C`/`P` type marker, and an eight-digit strike in thousandths of a
//! dollar (`MSFT250117P00250000`). Stock tickers are letters only.
//!
//! The free functions here are total: they never panic on malformed
//! input, they just return `None`/empty prefixes. `OptionSymbol` is the
//! strict, validating decode used at the wire boundary.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors from strict option-symbol decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    /// Identifier is not an option symbol at all
    #[error("Not an option symbol: {0}")]
    NotAnOption(String),

    /// Expiration field is missing or not a valid date
    #[error("Invalid expiration in symbol: {0}")]
    InvalidExpiration(String),

    /// Strike field is missing or not numeric
    #[error("Invalid strike in symbol: {0}")]
    InvalidStrike(String),
}

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option
    Call,
    /// Put option
    Put,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// True iff the identifier denotes a derivative contract.
///
/// Stock tickers are letters only, so any digit marks an option symbol.
pub fn is_option(symbol: &str) -> bool {
    symbol.bytes().any(|b| b.is_ascii_digit())
}

/// Decode the contract type from the identifier.
///
/// Looks at the last non-digit character: `C` is a call, `P` a put,
/// anything else (including a plain stock ticker) is `None`.
pub fn option_type(symbol: &str) -> Option<OptionType> {
    if !is_option(symbol) {
        return None;
    }
    let marker = symbol.chars().rev().find(|c| !c.is_ascii_digit())?;
    match marker.to_ascii_uppercase() {
        'C' => Some(OptionType::Call),
        'P' => Some(OptionType::Put),
        _ => None,
    }
}

/// The underlying equity ticker: the leading alphabetic prefix.
///
/// For a stock symbol this is the symbol itself.
pub fn underlying(symbol: &str) -> &str {
    let end = symbol
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(symbol.len());
    &symbol[..end]
}

/// Parse the strike from the trailing numeric field.
///
/// The field is in thousandths of a dollar per OCC convention
/// (`00250000` → 250). Returns `None` when there is no trailing digit
/// run or it does not fit.
pub fn strike(symbol: &str) -> Option<Decimal> {
    let start = symbol
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + c_len(symbol, i))
        .unwrap_or(0);
    let digits = &symbol[start..];
    if digits.is_empty() {
        return None;
    }
    let millis: i64 = digits.parse().ok()?;
    Some(Decimal::new(millis, 3).normalize())
}

// Byte length of the char starting at `i`; symbols are ASCII in practice
// but slicing must stay on a char boundary.
fn c_len(s: &str, i: usize) -> usize {
    s[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(0)
}

// =============================================================================
// OptionSymbol
// =============================================================================

/// A fully decoded OCC option identifier.
///
/// Used at the wire boundary where the full contract identity matters;
/// the decision engine mostly gets by with the classifier functions
/// above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSymbol {
    /// Underlying equity ticker
    pub underlying: String,
    /// Contract expiration date
    pub expiration: NaiveDate,
    /// Call or put
    pub option_type: OptionType,
    /// Strike price in dollars
    pub strike: Decimal,
}

impl OptionSymbol {
    /// Strictly decode an OCC-style identifier.
    ///
    /// # Errors
    ///
    /// Returns `SymbolError` when any of the underlying / expiration /
    /// type / strike fields is missing or malformed.
    pub fn parse(symbol: &str) -> Result<Self, SymbolError> {
        if !is_option(symbol) {
            return Err(SymbolError::NotAnOption(symbol.to_string()));
        }

        let root = underlying(symbol);
        if root.is_empty() {
            return Err(SymbolError::NotAnOption(symbol.to_string()));
        }

        let rest = &symbol[root.len()..];
        // YYMMDD + C/P + 8-digit strike
        if rest.len() != 6 + 1 + 8 {
            return Err(SymbolError::InvalidExpiration(symbol.to_string()));
        }

        let date_field = rest
            .get(..6)
            .ok_or_else(|| SymbolError::InvalidExpiration(symbol.to_string()))?;
        let expiration = NaiveDate::parse_from_str(date_field, "%y%m%d")
            .map_err(|_| SymbolError::InvalidExpiration(symbol.to_string()))?;

        let option_type = match rest.as_bytes()[6].to_ascii_uppercase() {
            b'C' => OptionType::Call,
            b'P' => OptionType::Put,
            _ => return Err(SymbolError::NotAnOption(symbol.to_string())),
        };

        let millis: i64 = rest
            .get(7..)
            .ok_or_else(|| SymbolError::InvalidStrike(symbol.to_string()))?
            .parse()
            .map_err(|_| SymbolError::InvalidStrike(symbol.to_string()))?;

        Ok(Self {
            underlying: root.to_string(),
            expiration,
            option_type,
            strike: Decimal::new(millis, 3).normalize(),
        })
    }

    /// Encode back to the OCC identifier. Inverse of [`parse`](Self::parse).
    pub fn encode(&self) -> String {
        let marker = match self.option_type {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        };
        let millis = (self.strike * Decimal::from(1000)).trunc();
        format!(
            "{}{}{}{:08}",
            self.underlying,
            self.expiration.format("%y%m%d"),
            marker,
            millis
        )
    }
}

impl fmt::Display for OptionSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_is_option() {
        assert!(is_option("MSFT250117P00250000"));
        assert!(is_option("F260116C00012500"));
        assert!(!is_option("MSFT"));
        assert!(!is_option("BRK.B"));
        assert!(!is_option(""));
    }

    #[test]
    fn test_option_type() {
        assert_eq!(option_type("MSFT250117P00250000"), Some(OptionType::Put));
        assert_eq!(option_type("AAPL250117C00150000"), Some(OptionType::Call));
        assert_eq!(option_type("AAPL"), None);
    }

    #[test]
    fn test_underlying() {
        assert_eq!(underlying("MSFT250117P00250000"), "MSFT");
        assert_eq!(underlying("F260116C00012500"), "F");
        assert_eq!(underlying("AAPL"), "AAPL");
    }

    #[test]
    fn test_strike() {
        assert_eq!(strike("MSFT250117P00250000"), Some(dec!(250)));
        assert_eq!(strike("F260116C00012500"), Some(dec!(12.5)));
        assert_eq!(strike("AAPL"), None);
    }

    #[test]
    fn test_classifier_total_on_garbage() {
        // Must not panic, whatever comes in.
        assert_eq!(option_type("123"), None);
        assert_eq!(underlying("123"), "");
        assert_eq!(strike("P"), None);
        assert!(strike("99999999999999999999999999").is_none());
    }

    #[test]
    fn test_parse_round_trip() {
        let parsed = OptionSymbol::parse("MSFT250117P00250000").unwrap();
        assert_eq!(parsed.underlying, "MSFT");
        assert_eq!(parsed.option_type, OptionType::Put);
        assert_eq!(parsed.strike, dec!(250));
        assert_eq!(
            parsed.expiration,
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()
        );
        assert_eq!(parsed.encode(), "MSFT250117P00250000");
    }

    #[test]
    fn test_parse_round_trip_fractional_strike() {
        let parsed = OptionSymbol::parse("F260116C00012500").unwrap();
        assert_eq!(parsed.strike, dec!(12.5));
        assert_eq!(parsed.encode(), "F260116C00012500");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(OptionSymbol::parse("MSFT").is_err());
        assert!(OptionSymbol::parse("MSFT250117X00250000").is_err());
        assert!(OptionSymbol::parse("MSFT259917P00250000").is_err());
        assert!(OptionSymbol::parse("MSFT250117P0025").is_err());
    }

    #[test]
    fn test_classifier_agrees_with_parse() {
        // The loose classifier and the strict decode must agree on
        // well-formed identifiers.
        let sym = "AMD250620C00110000";
        let parsed = OptionSymbol::parse(sym).unwrap();
        assert_eq!(underlying(sym), parsed.underlying);
        assert_eq!(option_type(sym), Some(parsed.option_type));
        assert_eq!(strike(sym), Some(parsed.strike));
    }
}
