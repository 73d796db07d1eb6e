//! Feed endpoint shared by the client and its tests.

/// Streaming endpoint of the live VIX-driven option pricing service.
pub const FEED_URL: &str = "wss://option-chain-en8e.onrender.com/ws/option-chain/live-vix";
