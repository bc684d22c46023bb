//! Error types for the queue server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use std::time::Duration;

use thiserror::Error;

use crate::types::RoomCode;

/// Application-level errors
///
/// Covers both connection-fatal errors and per-request failures.
/// None of them stop the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal for the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure talking to the search provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel send error (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Room not found with the given code
    #[error("Room not found: {0}")]
    RoomNotFound(RoomCode),

    /// No free room code found within the attempt limit
    #[error("No free room code after {attempts} attempts")]
    CapacityExceeded { attempts: usize },

    /// Search provider answered with a non-success status
    #[error("Search provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Search provider did not answer in time
    #[error("Search provider timed out after {0:?}")]
    ProviderTimeout(Duration),
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The receiver is not keeping up
    #[error("Channel full")]
    Full,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AppError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AppError::ChannelSend
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for AppError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        AppError::ChannelSend
    }
}
