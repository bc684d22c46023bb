//! Song Queue Rooms - Entry Point
//!
//! Starts the RoomServer actor, the WebSocket listener and the HTTP API.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use queue_rooms::{
    create_router, serve_websockets, AppState, Config, QueueSyncChannel, RandomCodeGenerator,
    RoomHandle, RoomRegistry, SearchGateway, SpotifyProvider,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=queue_rooms=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("queue_rooms=info")),
        )
        .init();

    let mut config = Config::from_env();

    // HTTP bind address from command line overrides the environment
    if let Some(addr) = env::args().nth(1) {
        config.http_addr = addr;
    }

    // Create RoomServer actor and start
    let rooms = RoomHandle::spawn(
        RoomRegistry::new(Box::new(RandomCodeGenerator), config.registry),
        QueueSyncChannel::new(config.teardown),
    );
    info!("RoomServer actor started");

    let provider = SpotifyProvider::new(config.spotify_url.clone(), config.search_timeout);
    let search = SearchGateway::new(rooms.clone(), Arc::new(provider));

    // Start WebSocket listener
    let ws_listener = TcpListener::bind(&config.ws_addr).await?;
    info!("WebSocket queue updates on {}", config.ws_addr);
    tokio::spawn(serve_websockets(ws_listener, rooms.clone()));

    // Start HTTP API
    let http_listener = TcpListener::bind(&config.http_addr).await?;
    info!("HTTP API listening on {}", config.http_addr);
    axum::serve(http_listener, create_router(AppState { rooms, search })).await?;

    Ok(())
}
