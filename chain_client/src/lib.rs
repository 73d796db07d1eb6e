//!
//! Live subscription session for the option chain pricing feed.
//!
//! This crate aggregates:
//! - `session` — the session manager: connect/disconnect, event handling and
//!   latest-wins snapshot state with change notification.
//! - `transport` — the `Connector`/`Transport` seam and the WebSocket implementation.
//! - `render` — plain-text rendering of the session state for the terminal.
#![warn(missing_docs)]
pub mod render;
pub mod session;
pub mod transport;

pub use session::{ConnectParams, Session, SessionError, SessionUpdate};
