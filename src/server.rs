//! RoomServer Actor implementation
//!
//! The central actor that owns the room registry and the queue sync channel.
//! Every registry access goes through this actor's command loop, so
//! check-then-insert on room codes and read-modify-write on queues never
//! interleave. `RoomHandle` is the request/response front end used by the
//! HTTP surface and the search gateway.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::message::ServerMessage;
use crate::registry::RoomRegistry;
use crate::sync::QueueSyncChannel;
use crate::types::{ClientId, RoomCode, Song};

/// Channel buffer size for server commands
pub const CHANNEL_BUFFER_SIZE: usize = 256;

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to the RoomServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New real-time connection
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Real-time connection dropped
    Disconnect { client_id: ClientId },
    /// Attach a connection to a room's queue updates
    Subscribe {
        client_id: ClientId,
        room_code: String,
    },
    /// Allocate a new room
    CreateRoom {
        credential: String,
        reply: Reply<Result<RoomCode, AppError>>,
    },
    /// Check whether a room is live
    Exists { room_code: RoomCode, reply: Reply<bool> },
    /// Read a room's queue
    GetQueue {
        room_code: RoomCode,
        reply: Reply<Result<Vec<Song>, AppError>>,
    },
    /// Overwrite a room's queue and push it to subscribers
    ReplaceQueue {
        room_code: RoomCode,
        queue: Vec<Song>,
        reply: Reply<Result<(), AppError>>,
    },
    /// Append a song and push the new queue to subscribers
    AppendSong {
        room_code: RoomCode,
        song: Song,
        reply: Reply<Result<Vec<Song>, AppError>>,
    },
    /// Look up a room's search credential
    Credential {
        room_code: RoomCode,
        reply: Reply<Result<String, AppError>>,
    },
    /// Remove a room and detach its subscribers
    RemoveRoom { room_code: RoomCode, reply: Reply<bool> },
    /// Current counts, for the service descriptor
    Stats { reply: Reply<ServerStats> },
}

/// Snapshot of the actor's state sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStats {
    pub rooms: usize,
    pub connections: usize,
}

/// The main RoomServer actor
pub struct RoomServer {
    registry: RoomRegistry,
    sync: QueueSyncChannel,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl RoomServer {
    /// Create a new RoomServer with the given command receiver
    pub fn new(
        receiver: mpsc::Receiver<ServerCommand>,
        registry: RoomRegistry,
        sync: QueueSyncChannel,
    ) -> Self {
        Self {
            registry,
            sync,
            receiver,
        }
    }

    /// Run the RoomServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!(
            "RoomServer started (teardown policy: {:?})",
            self.sync.policy()
        );

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("RoomServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                info!("Client {} connected", client_id);
                self.sync.connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Subscribe {
                client_id,
                room_code,
            } => {
                self.handle_subscribe(client_id, room_code);
            }
            ServerCommand::CreateRoom { credential, reply } => {
                let _ = reply.send(self.registry.create_room(credential));
            }
            ServerCommand::Exists { room_code, reply } => {
                let _ = reply.send(self.registry.exists(&room_code));
            }
            ServerCommand::GetQueue { room_code, reply } => {
                let _ = reply.send(self.registry.get_queue(&room_code));
            }
            ServerCommand::ReplaceQueue {
                room_code,
                queue,
                reply,
            } => {
                let result = self
                    .registry
                    .replace_queue(&room_code, queue.clone())
                    .map(|()| {
                        self.sync
                            .publish(&room_code, &ServerMessage::UpdateQueue { queue });
                    });
                let _ = reply.send(result);
            }
            ServerCommand::AppendSong {
                room_code,
                song,
                reply,
            } => {
                let result = self.registry.append_song(&room_code, song).inspect(|queue| {
                    self.sync.publish(
                        &room_code,
                        &ServerMessage::UpdateQueue {
                            queue: queue.clone(),
                        },
                    );
                });
                let _ = reply.send(result);
            }
            ServerCommand::Credential { room_code, reply } => {
                let _ = reply.send(self.registry.credential(&room_code));
            }
            ServerCommand::RemoveRoom { room_code, reply } => {
                let _ = reply.send(self.teardown(&room_code));
            }
            ServerCommand::Stats { reply } => {
                let _ = reply.send(ServerStats {
                    rooms: self.registry.len(),
                    connections: self.sync.connection_count(),
                });
            }
        }
    }

    /// Handle a dropped connection, ending its room's lifetime if it owned it
    fn handle_disconnect(&mut self, client_id: ClientId) {
        info!("Client {} disconnected", client_id);

        if let Some(room_code) = self.sync.disconnect(client_id) {
            self.teardown(&room_code);
        }

        debug!(
            "Total connections: {}, Total rooms: {}",
            self.sync.connection_count(),
            self.registry.len()
        );
    }

    /// Handle a `create_room` event from a connection
    fn handle_subscribe(&mut self, client_id: ClientId, room_code: String) {
        let room_code = RoomCode::parse(room_code);

        if !self.sync.is_connected(client_id) {
            debug!("Dropping join of {} from closed client {}", room_code, client_id);
            return;
        }

        // Only live rooms can be joined
        let queue = match self.registry.get_queue(&room_code) {
            Ok(queue) => queue,
            Err(e) => {
                warn!("Client {} tried to join {}: {}", client_id, room_code, e);
                self.sync.send_to(client_id, e.into());
                return;
            }
        };

        if let Some(orphaned) = self.sync.subscribe(client_id, room_code.clone()) {
            self.teardown(&orphaned);
        }

        self.sync
            .update_to(client_id, ServerMessage::UpdateQueue { queue });
    }

    /// Remove a room from the registry and detach everyone listening to it
    fn teardown(&mut self, room_code: &RoomCode) -> bool {
        let removed = self.registry.remove(room_code);
        self.sync.close_room(room_code);
        removed
    }
}

/// Cloneable request/response front end for the RoomServer actor
#[derive(Debug, Clone)]
pub struct RoomHandle {
    cmd_tx: mpsc::Sender<ServerCommand>,
}

impl RoomHandle {
    /// Wrap an existing command sender
    pub fn new(cmd_tx: mpsc::Sender<ServerCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Start a RoomServer actor on the current runtime and return its handle
    pub fn spawn(registry: RoomRegistry, sync: QueueSyncChannel) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        tokio::spawn(RoomServer::new(cmd_rx, registry, sync).run());
        Self::new(cmd_tx)
    }

    pub async fn create_room(&self, credential: String) -> Result<RoomCode, AppError> {
        self.request(|reply| ServerCommand::CreateRoom { credential, reply })
            .await?
    }

    pub async fn exists(&self, room_code: RoomCode) -> Result<bool, AppError> {
        self.request(|reply| ServerCommand::Exists { room_code, reply })
            .await
    }

    pub async fn get_queue(&self, room_code: RoomCode) -> Result<Vec<Song>, AppError> {
        self.request(|reply| ServerCommand::GetQueue { room_code, reply })
            .await?
    }

    /// Replace the queue; subscribers receive the new queue
    pub async fn replace_queue(&self, room_code: RoomCode, queue: Vec<Song>) -> Result<(), AppError> {
        self.request(|reply| ServerCommand::ReplaceQueue {
            room_code,
            queue,
            reply,
        })
        .await?
    }

    /// Append a song; subscribers receive the resulting queue
    pub async fn append_song(&self, room_code: RoomCode, song: Song) -> Result<Vec<Song>, AppError> {
        self.request(|reply| ServerCommand::AppendSong {
            room_code,
            song,
            reply,
        })
        .await?
    }

    pub async fn credential(&self, room_code: RoomCode) -> Result<String, AppError> {
        self.request(|reply| ServerCommand::Credential { room_code, reply })
            .await?
    }

    /// Remove a room. Returns whether it existed.
    pub async fn remove(&self, room_code: RoomCode) -> Result<bool, AppError> {
        self.request(|reply| ServerCommand::RemoveRoom { room_code, reply })
            .await
    }

    pub async fn stats(&self) -> Result<ServerStats, AppError> {
        self.request(|reply| ServerCommand::Stats { reply }).await
    }

    pub async fn connect(
        &self,
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), AppError> {
        Ok(self
            .cmd_tx
            .send(ServerCommand::Connect { client_id, sender })
            .await?)
    }

    pub async fn subscribe(&self, client_id: ClientId, room_code: String) -> Result<(), AppError> {
        Ok(self
            .cmd_tx
            .send(ServerCommand::Subscribe {
                client_id,
                room_code,
            })
            .await?)
    }

    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), AppError> {
        Ok(self
            .cmd_tx
            .send(ServerCommand::Disconnect { client_id })
            .await?)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> ServerCommand,
    ) -> Result<T, AppError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx.send(make(reply)).await?;
        Ok(rx.await?)
    }
}
