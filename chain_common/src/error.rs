//! Error types shared across the workspace.
//!
//! The `ChainError` enum unifies common failure cases for I/O, JSON framing,
//! the WebSocket transport, channel communication, lock poisoning and input validation, so
//! every crate can propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by the workspace.
#[derive(Error, Debug)]
pub enum ChainError {
    /// I/O error originating from the standard library or sockets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A raw input value could not be turned into a subscription request.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// WebSocket handshake or framing failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Crossbeam/channel receive failed (e.g., sender closed); contains a short context string.
    #[error("Channel receive failed: {0}")]
    ChannelRecv(String),

    /// A lock was poisoned by a panicking thread.
    #[error("Mutex lock error: {0}")]
    MutexLock(String),
}

impl<T> From<PoisonError<T>> for ChainError {
    fn from(err: PoisonError<T>) -> Self {
        ChainError::MutexLock(err.to_string())
    }
}

