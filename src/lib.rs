//! Collaborative Song Queue Rooms
//!
//! A room-coded song queue service: a host creates a room with a Spotify
//! token, guests add songs over HTTP, and every queue change is pushed to the
//! room's WebSocket subscribers.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RoomServer` is the single owner of the `RoomRegistry` and the
//!   `QueueSyncChannel`; all room state changes happen on its task
//! - `RoomHandle` gives the HTTP API request/response access to the actor
//! - Each WebSocket connection has a `handler` task talking to the actor
//! - Track search resolves the room's token through the actor, then calls
//!   the provider without holding up the actor
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use queue_rooms::{api, handler, QueueSyncChannel, RoomHandle, RoomRegistry,
//!     SearchGateway, SpotifyProvider, TeardownPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rooms = RoomHandle::spawn(
//!         RoomRegistry::default(),
//!         QueueSyncChannel::new(TeardownPolicy::Owner),
//!     );
//!     let search = SearchGateway::new(rooms.clone(), Arc::new(SpotifyProvider::default()));
//!
//!     let ws = TcpListener::bind("127.0.0.1:8080").await?;
//!     tokio::spawn(handler::serve_websockets(ws, rooms.clone()));
//!
//!     let http = TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(http, api::create_router(api::AppState { rooms, search })).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod code;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod search;
pub mod server;
pub mod sync;
pub mod types;

// Re-export main types for convenience
pub use api::{create_router, AppState};
pub use client::Client;
pub use code::{CodeGenerator, RandomCodeGenerator};
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::{handle_connection, serve_websockets};
pub use message::{ClientMessage, ErrorCode, ServerMessage};
pub use registry::{RegistryConfig, RoomRegistry};
pub use room::Room;
pub use search::{SearchGateway, SearchProvider, SpotifyProvider};
pub use server::{RoomHandle, RoomServer, ServerCommand, ServerStats};
pub use sync::{QueueSyncChannel, TeardownPolicy};
pub use types::{ClientId, RoomCode, Song};
