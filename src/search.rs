//! Track search through an external provider
//!
//! The gateway resolves a room's credential through the `RoomServer` actor,
//! then calls the provider outside the actor so a slow search never holds up
//! queue traffic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::server::RoomHandle;
use crate::types::RoomCode;

/// Default Spotify Web API base URL
pub const DEFAULT_SPOTIFY_URL: &str = "https://api.spotify.com";

/// Default timeout for a provider search (10 seconds)
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;

/// External track search
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search tracks matching `query`, authorized with `credential`.
    ///
    /// Returns the provider's response body untouched.
    async fn search_tracks(&self, query: &str, credential: &str) -> Result<String, AppError>;
}

/// Spotify Web API search client
#[derive(Debug, Clone)]
pub struct SpotifyProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl SpotifyProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(Client::new(), base_url, timeout)
    }

    /// Create a provider with a custom reqwest::Client
    pub fn with_client(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for SpotifyProvider {
    fn default() -> Self {
        Self::new(
            DEFAULT_SPOTIFY_URL,
            Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
        )
    }
}

#[async_trait]
impl SearchProvider for SpotifyProvider {
    async fn search_tracks(&self, query: &str, credential: &str) -> Result<String, AppError> {
        let url = format!("{}/v1/search", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("q", query), ("type", "track")])
            .header(ACCEPT, "application/json")
            .bearer_auth(credential);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, AppError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| AppError::ProviderTimeout(self.timeout))??;

        if status != StatusCode::OK {
            warn!("Search for '{}' failed with {}", query, status);
            return Err(AppError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Search for '{}' returned {} bytes", query, body.len());
        Ok(body)
    }
}

/// Room-scoped search front end
#[derive(Clone)]
pub struct SearchGateway {
    rooms: RoomHandle,
    provider: Arc<dyn SearchProvider>,
}

impl SearchGateway {
    pub fn new(rooms: RoomHandle, provider: Arc<dyn SearchProvider>) -> Self {
        Self { rooms, provider }
    }

    /// Search tracks using the credential of room `code`.
    ///
    /// Unknown rooms fail with `RoomNotFound` before the provider is contacted.
    pub async fn search(&self, code: RoomCode, query: &str) -> Result<String, AppError> {
        let credential = self.rooms.credential(code).await?;
        self.provider.search_tracks(query, &credential).await
    }
}
