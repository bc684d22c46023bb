//! Runtime configuration
//!
//! Read once at startup from `QUEUE_ROOMS_*` environment variables. Missing
//! values use the defaults below; unparseable values are logged and ignored.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::registry::RegistryConfig;
use crate::search::{DEFAULT_SEARCH_TIMEOUT_SECS, DEFAULT_SPOTIFY_URL};
use crate::sync::TeardownPolicy;

/// Default HTTP API address
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";

/// Default WebSocket address
pub const DEFAULT_WS_ADDR: &str = "127.0.0.1:8080";

/// Longest room code accepted from the environment
pub const MAX_CODE_LENGTH: usize = 16;

const ENV_PREFIX: &str = "QUEUE_ROOMS_";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,
    pub ws_addr: String,
    pub spotify_url: String,
    pub search_timeout: Duration,
    pub registry: RegistryConfig,
    pub teardown: TeardownPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            ws_addr: DEFAULT_WS_ADDR.to_string(),
            spotify_url: DEFAULT_SPOTIFY_URL.to_string(),
            search_timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
            registry: RegistryConfig::default(),
            teardown: TeardownPolicy::default(),
        }
    }
}

impl Config {
    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any lookup of full variable names
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Self::default();

        if let Some(addr) = get("HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(addr) = get("WS_ADDR") {
            config.ws_addr = addr;
        }
        if let Some(url) = get("SPOTIFY_URL") {
            config.spotify_url = url;
        }
        if let Some(secs) = parsed::<u64>("SEARCH_TIMEOUT_SECS", get("SEARCH_TIMEOUT_SECS")) {
            config.search_timeout = Duration::from_secs(secs);
        }
        match parsed::<usize>("CODE_LENGTH", get("CODE_LENGTH")) {
            Some(0) => warn!("Ignoring {}CODE_LENGTH=0", ENV_PREFIX),
            Some(length) if length > MAX_CODE_LENGTH => {
                warn!(
                    "Clamping {}CODE_LENGTH={} to {}",
                    ENV_PREFIX, length, MAX_CODE_LENGTH
                );
                config.registry.code_length = MAX_CODE_LENGTH;
            }
            Some(length) => config.registry.code_length = length,
            None => {}
        }
        if let Some(policy) = parsed::<TeardownPolicy>("TEARDOWN", get("TEARDOWN")) {
            config.teardown = policy;
        }

        config
    }
}

fn parsed<T>(name: &str, raw: Option<String>) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}{}={:?}: {}", ENV_PREFIX, name, raw, e);
            None
        }
    }
}
