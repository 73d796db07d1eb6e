//! Plain-text rendering of the session state for the terminal.
//!
//! Produces a status line, the meta block (symbol, strike, expiry, DTE, VIX)
//! and the price table in the order the feed delivered the rows.
use crate::session::SessionUpdate;
use chain_common::Snapshot;

/// Render a full screen for `update`.
pub fn render(update: &SessionUpdate) -> String {
    let badge = if update.status.is_connected() { " LIVE" } else { "" };
    let mut out = format!(
        "== Option Chain [{}]{} ({}: `reconnect`)\n",
        update.status,
        badge,
        update.status.action_label()
    );
    if let Some(error) = &update.error {
        out.push_str(&format!("   last error: {}\n", error));
    }
    if let Some(snapshot) = &update.snapshot {
        out.push_str(&render_snapshot(snapshot));
    }
    out
}

/// Render the meta block and price table of one snapshot.
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = format!(
        "Symbol {} | Strike {} | Expiry {} | DTE {} | VIX {}\n{:>12} {:>12} {:>12} {:>10} {:>10}\n",
        snapshot.symbol,
        snapshot.strike,
        snapshot.expiry,
        snapshot.days_to_expiry,
        snapshot.vix,
        "Spot",
        "Call",
        "Put",
        "Δ Call",
        "Δ Put"
    );
    for row in &snapshot.rows {
        out.push_str(&format!(
            "{:>12.2} {:>12.2} {:>12.2} {:>10.4} {:>10.4}\n",
            row.spot, row.call, row.put, row.delta_call, row.delta_put
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionError;
    use chain_common::{ConnectionStatus, PriceRow};
    use std::sync::Arc;

    fn snapshot() -> Snapshot {
        let row = |spot: f64| PriceRow {
            spot,
            call: 10.0,
            put: 5.0,
            delta_call: 0.55,
            delta_put: -0.45,
        };
        Snapshot {
            symbol: String::from("NIFTY"),
            strike: 25400.0,
            expiry: String::from("2026-01-27"),
            days_to_expiry: 103,
            vix: 14.2,
            rows: vec![row(25800.0), row(25700.0)],
        }
    }

    #[test]
    fn table_follows_feed_order() {
        let text = render_snapshot(&snapshot());
        let first = text.find("25800.00").unwrap();
        let second = text.find("25700.00").unwrap();
        assert!(first < second);
        assert!(text.contains("DTE 103"));
        assert!(text.contains("VIX 14.2"));
    }

    #[test]
    fn status_line_and_error_without_snapshot() {
        let update = SessionUpdate {
            status: ConnectionStatus::Disconnected,
            snapshot: None,
            error: Some(SessionError::RemoteClosed),
        };
        let text = render(&update);
        assert!(text.starts_with("== Option Chain [disconnected] (Connect Live Feed"));
        assert!(text.contains("Feed closed by the remote side"));
        assert!(!text.contains("Symbol"));
    }

    #[test]
    fn stale_snapshot_stays_visible() {
        let update = SessionUpdate {
            status: ConnectionStatus::Error,
            snapshot: Some(Arc::new(snapshot())),
            error: None,
        };
        let text = render(&update);
        assert!(text.contains("[error]"));
        assert!(!text.contains("LIVE"));
        assert!(text.contains("Symbol NIFTY"));
    }

    #[test]
    fn connected_feed_is_marked_live() {
        let update = SessionUpdate {
            status: ConnectionStatus::Connected,
            snapshot: Some(Arc::new(snapshot())),
            error: None,
        };
        let text = render(&update);
        assert!(text.starts_with("== Option Chain [connected] LIVE (Reconnect Feed: `reconnect`)\n"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].trim_start().starts_with("Spot"));
        assert!(lines[3].trim_start().starts_with("25800.00"));
    }
}
