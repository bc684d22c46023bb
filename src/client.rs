//! Client struct definition
//!
//! Represents a live real-time connection and its outbound channels.

use tokio::sync::{mpsc, watch};

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client information
///
/// Room state (`update_queue`, `room_closed`) goes through a latest-wins
/// slot: a slow reader may skip intermediate queues but always ends up with
/// the newest one. Other messages share the bounded outbound channel.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Server → Client message channel
    sender: mpsc::Sender<ServerMessage>,
    /// Newest room state not yet forwarded
    state: watch::Sender<Option<ServerMessage>>,
}

impl Client {
    /// Create a new client with the given ID and sender channel.
    ///
    /// Spawns the task that forwards room state into `sender`; it ends when
    /// the client is dropped or the channel closes. Must be called from
    /// within a tokio runtime.
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        let (state, mut state_rx) = watch::channel(None);
        let forward = sender.clone();

        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let msg = state_rx.borrow_and_update().clone();
                if let Some(msg) = msg {
                    if forward.send(msg).await.is_err() {
                        break;
                    }
                }
            }
        });

        Self { id, sender, state }
    }

    /// Queue a message for this client without waiting.
    ///
    /// A full buffer counts as a failed delivery, same as a closed channel.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Replace the pending room state with `msg`. Never blocks.
    pub fn update(&self, msg: ServerMessage) -> Result<(), SendError> {
        if self.sender.is_closed() {
            return Err(SendError::ChannelClosed);
        }
        self.state
            .send(Some(msg))
            .map_err(|_| SendError::ChannelClosed)
    }
}
