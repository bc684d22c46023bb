//! Queue sync channel
//!
//! Room-scoped publish/subscribe over live connections. Each connection is
//! attached to at most one room; the channel also decides which room, if any,
//! must be torn down when a connection goes away.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::message::ServerMessage;
use crate::types::{ClientId, RoomCode};

/// When a room's lifetime ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    /// The connection that most recently issued `create_room` for a code owns
    /// the room; the room is removed when that connection drops.
    #[default]
    Owner,
    /// The room is removed once nobody is subscribed to it any more.
    LastSubscriber,
}

impl FromStr for TeardownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "last_subscriber" | "last-subscriber" => Ok(Self::LastSubscriber),
            other => Err(format!("unknown teardown policy '{}'", other)),
        }
    }
}

/// How a connection left its room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Departure {
    Disconnected,
    Moved,
}

/// Connection registry and per-room topics
#[derive(Debug, Default)]
pub struct QueueSyncChannel {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// Connection to room association: ClientId -> RoomCode
    client_rooms: HashMap<ClientId, RoomCode>,
    /// Subscribers per room: RoomCode -> {ClientId}
    topics: HashMap<RoomCode, HashSet<ClientId>>,
    /// Lifecycle owner per room (Owner policy only)
    owners: HashMap<RoomCode, ClientId>,
    policy: TeardownPolicy,
}

impl QueueSyncChannel {
    pub fn new(policy: TeardownPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> TeardownPolicy {
        self.policy
    }

    /// Register a new live connection
    pub fn connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        self.clients.insert(client_id, Client::new(client_id, sender));
        debug!("Total connections: {}", self.clients.len());
    }

    pub fn is_connected(&self, client_id: ClientId) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Attach a connection to `code`, replacing any previous association.
    ///
    /// Unknown connections are ignored. Moving away from a room gives up its
    /// ownership without ending it; under `LastSubscriber` the old room's code
    /// is returned when nobody is left in it, so the caller can remove it.
    pub fn subscribe(&mut self, client_id: ClientId, code: RoomCode) -> Option<RoomCode> {
        if !self.is_connected(client_id) {
            warn!("Ignoring subscribe to {} from unknown client {}", code, client_id);
            return None;
        }

        let orphaned = match self.client_rooms.get(&client_id) {
            Some(previous) if *previous == code => None,
            Some(_) => self.detach(client_id, Departure::Moved),
            None => None,
        };

        self.client_rooms.insert(client_id, code.clone());
        self.topics.entry(code.clone()).or_default().insert(client_id);
        if self.policy == TeardownPolicy::Owner {
            self.owners.insert(code.clone(), client_id);
        }

        info!("Client {} subscribed to room {}", client_id, code);
        orphaned
    }

    /// Deliver `msg` to every connection subscribed to `code`.
    ///
    /// Returns how many connections the message was queued for.
    pub fn publish(&self, code: &RoomCode, msg: &ServerMessage) -> usize {
        let Some(subscribers) = self.topics.get(code) else {
            return 0;
        };

        let mut delivered = 0;
        for client_id in subscribers {
            let Some(client) = self.clients.get(client_id) else {
                continue;
            };
            match client.update(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Dropped update for client {}: {}", client_id, e),
            }
        }

        debug!("Published to {}/{} subscribers of {}", delivered, subscribers.len(), code);
        delivered
    }

    /// Send a message to a single connection, if it is still known
    pub fn send_to(&self, client_id: ClientId, msg: ServerMessage) {
        if let Some(client) = self.clients.get(&client_id) {
            if let Err(e) = client.send(msg) {
                debug!("Could not reach client {}: {}", client_id, e);
            }
        }
    }

    /// Replace the room state pending for a single connection
    pub fn update_to(&self, client_id: ClientId, msg: ServerMessage) {
        if let Some(client) = self.clients.get(&client_id) {
            if let Err(e) = client.update(msg) {
                debug!("Could not reach client {}: {}", client_id, e);
            }
        }
    }

    /// Forget a dropped connection.
    ///
    /// Returns the room whose lifetime ended with this connection.
    pub fn disconnect(&mut self, client_id: ClientId) -> Option<RoomCode> {
        self.clients.remove(&client_id);
        let teardown = self.detach(client_id, Departure::Disconnected);
        debug!("Total connections: {}", self.clients.len());
        teardown
    }

    /// Detach every subscriber of a removed room and tell them it is gone
    pub fn close_room(&mut self, code: &RoomCode) {
        self.owners.remove(code);
        let Some(subscribers) = self.topics.remove(code) else {
            return;
        };

        for client_id in subscribers {
            self.client_rooms.remove(&client_id);
            self.update_to(
                client_id,
                ServerMessage::RoomClosed {
                    room_code: code.to_string(),
                },
            );
        }
    }

    /// Room a connection is currently attached to
    pub fn room_of(&self, client_id: ClientId) -> Option<&RoomCode> {
        self.client_rooms.get(&client_id)
    }

    pub fn subscriber_count(&self, code: &RoomCode) -> usize {
        self.topics.get(code).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    /// Drop the connection's current association and apply the teardown policy
    fn detach(&mut self, client_id: ClientId, departure: Departure) -> Option<RoomCode> {
        let code = self.client_rooms.remove(&client_id)?;

        let now_empty = match self.topics.get_mut(&code) {
            Some(subscribers) => {
                subscribers.remove(&client_id);
                subscribers.is_empty()
            }
            None => true,
        };
        if now_empty {
            self.topics.remove(&code);
        }

        match self.policy {
            TeardownPolicy::Owner => {
                if self.owners.get(&code) != Some(&client_id) {
                    return None;
                }
                self.owners.remove(&code);
                (departure == Departure::Disconnected).then_some(code)
            }
            TeardownPolicy::LastSubscriber => now_empty.then_some(code),
        }
    }
}
