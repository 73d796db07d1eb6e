//! Subscription request sent to the pricing feed.
//!
//! A `SubscriptionRequest` is built fresh from the raw input values on every
//! connect attempt and sent exactly once, as a single JSON text frame, right
//! after the transport opens. Field order on the wire follows declaration order:
//! `symbol`, `strike`, `expiry`, `spot_range`, `vix_range`.
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ChainError;
use crate::result::Result;

/// Date format accepted for the expiry input and used on the wire.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// Request payload describing which option chain to price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionRequest {
    /// Instrument identifier, e.g. `NIFTY`.
    pub symbol: String,
    /// Strike price.
    pub strike: f64,
    /// Expiry date, serialized as `YYYY-MM-DD`.
    pub expiry: NaiveDate,
    /// Spot prices to evaluate, in the order given.
    pub spot_range: Vec<f64>,
    /// VIX levels to evaluate. Always sent empty for now.
    pub vix_range: Vec<f64>,
}

impl SubscriptionRequest {
    /// Creates a request from already validated values.
    pub fn new(symbol: &str, strike: f64, expiry: NaiveDate, spot_range: Vec<f64>) -> Self {
        SubscriptionRequest {
            symbol: String::from(symbol),
            strike,
            expiry,
            spot_range,
            vix_range: Vec::new(),
        }
    }

    /// Builds a request from raw input values.
    ///
    /// - symbol: trimmed, must not be empty.
    /// - strike: must parse to a finite number.
    /// - expiry: must be a `YYYY-MM-DD` calendar date.
    /// - spot_range: comma separated numbers, see [`parse_spot_range`].
    pub fn from_inputs(symbol: &str, strike: &str, expiry: &str, spot_range: &str) -> Result<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ChainError::InvalidInput(String::from("symbol is empty")));
        }
        let strike = parse_finite(strike)
            .ok_or_else(|| ChainError::InvalidInput(format!("strike {:?} is not a finite number", strike.trim())))?;
        let expiry = NaiveDate::parse_from_str(expiry.trim(), EXPIRY_FORMAT)
            .map_err(|e| ChainError::InvalidInput(format!("expiry {:?}: {}", expiry.trim(), e)))?;
        let spot_range = parse_spot_range(spot_range)?;

        Ok(Self::new(symbol, strike, expiry, spot_range))
    }

    /// Encode the request as one JSON text frame.
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(json)
    }
}

/// Parses a comma separated list of spot prices.
///
/// Tokens are trimmed and empty tokens are skipped, so `""` yields an empty
/// range and `"1, 2,"` yields `[1.0, 2.0]`. Any other token that is not a
/// finite number rejects the whole list; no `NaN` ever reaches the wire.
pub fn parse_spot_range(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            parse_finite(token)
                .ok_or_else(|| ChainError::InvalidInput(format!("spot range entry {:?} is not a finite number", token)))
        })
        .collect()
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn builds_reference_request() {
        let request = SubscriptionRequest::from_inputs(
            "NIFTY",
            "25400",
            "2026-01-27",
            "25700,25750,25800,25850,25900",
        )
        .unwrap();

        assert_eq!(request.symbol, "NIFTY");
        assert_eq!(request.strike, 25400.0);
        assert_eq!(request.expiry, NaiveDate::from_ymd_opt(2026, 1, 27).unwrap());
        assert_eq!(request.spot_range, vec![25700.0, 25750.0, 25800.0, 25850.0, 25900.0]);
        assert!(request.vix_range.is_empty());
    }

    #[test]
    fn wire_format_keeps_field_names_and_order() {
        let request = SubscriptionRequest::from_inputs("NIFTY", "25400", "2026-01-27", "25700,25750").unwrap();
        let json = request.to_json().unwrap();

        assert_eq!(
            json,
            r#"{"symbol":"NIFTY","strike":25400.0,"expiry":"2026-01-27","spot_range":[25700.0,25750.0],"vix_range":[]}"#
        );
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["expiry"], "2026-01-27");
    }

    #[test]
    fn spot_range_keeps_order_and_duplicates() {
        assert_eq!(parse_spot_range("3, 1,3 ,2").unwrap(), vec![3.0, 1.0, 3.0, 2.0]);
    }

    #[test]
    fn empty_spot_range_is_legal() {
        assert!(parse_spot_range("").unwrap().is_empty());
        assert_eq!(parse_spot_range("100,,200,").unwrap(), vec![100.0, 200.0]);
    }

    #[test]
    fn malformed_spot_token_rejects_whole_request() {
        let err = SubscriptionRequest::from_inputs("NIFTY", "25400", "2026-01-27", "25700,abc,25800").unwrap_err();
        match err {
            ChainError::InvalidInput(msg) => assert!(msg.contains("abc")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(parse_spot_range("NaN").is_err());
        assert!(parse_spot_range("inf").is_err());
    }

    #[test]
    fn strike_must_be_finite() {
        assert!(SubscriptionRequest::from_inputs("NIFTY", "", "2026-01-27", "").is_err());
        assert!(SubscriptionRequest::from_inputs("NIFTY", "NaN", "2026-01-27", "").is_err());
        assert!(SubscriptionRequest::from_inputs("NIFTY", " 25400.5 ", "2026-01-27", "").is_ok());
    }

    #[test]
    fn rejects_blank_symbol_and_bad_expiry() {
        assert!(SubscriptionRequest::from_inputs("  ", "25400", "2026-01-27", "").is_err());
        assert!(SubscriptionRequest::from_inputs("NIFTY", "25400", "27/01/2026", "").is_err());
        assert!(SubscriptionRequest::from_inputs("NIFTY", "25400", "2026-02-30", "").is_err());
    }
}
