//! Priced option chain received from the feed.
//!
//! Every inbound frame is a self-contained JSON document describing the whole
//! chain. A decoded `Snapshot` replaces the previous one wholesale; rows keep
//! the order the feed delivered them in.
use serde::Deserialize;

use crate::result::Result;

/// Prices and deltas for one spot level.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceRow {
    /// Spot price the row was evaluated at.
    pub spot: f64,
    /// Call premium.
    pub call: f64,
    /// Put premium.
    pub put: f64,
    /// Call delta.
    pub delta_call: f64,
    /// Put delta.
    pub delta_put: f64,
}

/// Latest priced chain for the subscribed instrument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snapshot {
    /// Instrument identifier echoed by the feed.
    pub symbol: String,
    /// Strike echoed by the feed.
    pub strike: f64,
    /// Expiry echoed by the feed.
    pub expiry: String,
    /// Calendar days left until expiry.
    pub days_to_expiry: i64,
    /// VIX level used for pricing.
    pub vix: f64,
    /// One row per requested spot, in feed order.
    #[serde(rename = "prices")]
    pub rows: Vec<PriceRow>,
}

impl Snapshot {
    /// Decode a snapshot from a text frame.
    pub fn decode(text: &str) -> Result<Snapshot> {
        let snapshot = serde_json::from_str(text)?;
        Ok(snapshot)
    }

    /// Decode a snapshot from a binary frame carrying the same JSON document.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Snapshot> {
        let snapshot = serde_json::from_slice(bytes)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;

    const FRAME: &str = r#"{
        "symbol": "NIFTY", "strike": 25400, "expiry": "2026-01-27",
        "days_to_expiry": 103, "vix": 14.2,
        "prices": [
            {"spot": 25800, "call": 612.4, "put": 190.1, "delta_call": 0.61, "delta_put": -0.39},
            {"spot": 25700, "call": 548.0, "put": 226.3, "delta_call": 0.57, "delta_put": -0.43}
        ]
    }"#;

    #[test]
    fn decodes_feed_frame_in_feed_order() {
        let snapshot = Snapshot::decode(FRAME).unwrap();

        assert_eq!(snapshot.symbol, "NIFTY");
        assert_eq!(snapshot.strike, 25400.0);
        assert_eq!(snapshot.days_to_expiry, 103);
        assert_eq!(snapshot.vix, 14.2);
        let spots: Vec<f64> = snapshot.rows.iter().map(|row| row.spot).collect();
        assert_eq!(spots, vec![25800.0, 25700.0]);
        assert_eq!(snapshot.rows[1].delta_put, -0.43);
    }

    #[test]
    fn binary_frame_decodes_like_text() {
        assert_eq!(
            Snapshot::decode_bytes(FRAME.as_bytes()).unwrap(),
            Snapshot::decode(FRAME).unwrap()
        );
    }

    #[test]
    fn empty_price_list_is_an_empty_table() {
        let frame = r#"{"symbol":"NIFTY","strike":1,"expiry":"2026-01-27","days_to_expiry":0,"vix":10,"prices":[]}"#;
        assert!(Snapshot::decode(frame).unwrap().rows.is_empty());
    }

    #[test]
    fn malformed_frames_fail_to_decode() {
        assert!(matches!(Snapshot::decode("not json"), Err(ChainError::SerdeJson(_))));
        assert!(Snapshot::decode(r#"{"symbol":"NIFTY"}"#).is_err());
        assert!(Snapshot::decode(r#"{"symbol":"NIFTY","strike":1,"expiry":"x","days_to_expiry":1.5,"vix":1,"prices":[]}"#).is_err());
    }
}
