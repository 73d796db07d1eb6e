//! Connection status exposed by the session to the display layer.

use strum::Display;

/// Observable state of the feed connection. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, Default, Display, Hash, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    /// No transport, or the remote side closed it.
    #[default]
    Disconnected,
    /// A transport has been requested and is not open yet.
    Connecting,
    /// The transport is open and the subscription request has been sent.
    Connected,
    /// The transport failed to open or failed mid-session.
    Error,
}

impl ConnectionStatus {
    /// Returns `true` once the transport is open.
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }

    /// Label of the user action that (re)establishes the feed from this state.
    pub fn action_label(self) -> &'static str {
        if self.is_connected() { "Reconnect Feed" } else { "Connect Live Feed" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn renders_lowercase() {
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::Error.to_string(), "error");
    }

    #[test]
    fn only_connected_offers_reconnect() {
        assert_eq!(ConnectionStatus::Connected.action_label(), "Reconnect Feed");
        assert_eq!(ConnectionStatus::Connecting.action_label(), "Connect Live Feed");
        assert!(!ConnectionStatus::Error.is_connected());
    }
}
