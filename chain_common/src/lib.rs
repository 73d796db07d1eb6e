//!
//! Common types and utilities shared by the option chain client.
//!
//! This crate aggregates:
//! - `error` — unified error type `ChainError` used across the workspace.
//! - `result` — handy `Result<T, ChainError>` alias.
//! - `request` — the subscription request sent to the pricing feed.
//! - `snapshot` — the priced option chain received from the feed.
//! - `status` — connection status exposed to the display layer.
//! - `net` — the feed endpoint.
#![warn(missing_docs)]
pub mod error;
pub mod net;
pub mod request;
pub mod result;
pub mod snapshot;
pub mod status;

pub use error::ChainError;
pub use request::SubscriptionRequest;
pub use result::Result;
pub use snapshot::{PriceRow, Snapshot};
pub use status::ConnectionStatus;
