//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.
use std::time::Duration;

// Fetch pipeline defaults
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RELAYS: &[&str] = &[
    "https://api.allorigins.win/get?url={url}",
    "https://corsproxy.io/?{url}",
    "https://api.codetabs.com/v1/proxy?quest={url}",
];
pub const DEFAULT_USER_AGENT: &str = "channel-catalog/0.1";

// Manifest resolution defaults
pub const DEFAULT_RESOLUTION_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RESOLUTION_CONCURRENCY: usize = 5;
pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(8);

// Liveness defaults
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LIVENESS_CONCURRENCY: usize = 10;

pub fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

pub fn default_relays() -> Vec<String> {
    DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect()
}

pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

pub fn default_resolution_cache_ttl() -> Duration {
    DEFAULT_RESOLUTION_CACHE_TTL
}

pub fn default_resolution_concurrency() -> usize {
    DEFAULT_RESOLUTION_CONCURRENCY
}

pub fn default_manifest_timeout() -> Duration {
    DEFAULT_MANIFEST_TIMEOUT
}

pub fn default_liveness_timeout() -> Duration {
    DEFAULT_LIVENESS_TIMEOUT
}

pub fn default_liveness_concurrency() -> usize {
    DEFAULT_LIVENESS_CONCURRENCY
}
