//! Fetch-with-fallback HTTP pipeline
//!
//! Every network read in the crate goes through [`TextFetcher`]. The default
//! implementation, [`FetchPipeline`], tries the target URL directly and then
//! each configured relay endpoint in order, stopping at the first success.
//! Each attempt carries its own hard timeout; the relay chain is the only retry.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::errors::{NetworkError, NetworkResult};
use crate::utils::url::UrlUtils;

/// Placeholder substituted with the encoded target URL in relay templates
pub const RELAY_URL_PLACEHOLDER: &str = "{url}";

/// Source of remote text, injected into everything that reads the network
#[async_trait]
pub trait TextFetcher: Send + Sync {
    /// Fetch `url` as text, failing only when every tier is exhausted
    async fn fetch_text(&self, url: &str, timeout: Duration) -> NetworkResult<String>;
}

/// Direct fetch followed by an ordered relay fallback chain
pub struct FetchPipeline {
    client: Client,
    relays: Vec<String>,
}

impl FetchPipeline {
    pub fn new(relays: Vec<String>) -> Self {
        let client = Client::builder()
            .user_agent(crate::config::defaults::DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, relays)
    }

    pub fn with_client(client: Client, relays: Vec<String>) -> Self {
        Self { client, relays }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, config.relays.clone())
    }

    /// Direct-only pipeline, used where relays would be pointless (tests, local files)
    pub fn direct_only() -> Self {
        Self::new(Vec::new())
    }

    /// Build the relay request URL for a target
    pub fn relay_url(template: &str, target: &str) -> String {
        template.replace(RELAY_URL_PLACEHOLDER, &urlencoding::encode(target))
    }

    /// Single GET under a hard timeout covering both headers and body
    async fn attempt(&self, url: &str, timeout: Duration) -> NetworkResult<String> {
        let request = async {
            let response = self.client.get(url).send().await.map_err(|e| {
                NetworkError::Transport {
                    url: UrlUtils::obfuscate_credentials(url),
                    message: UrlUtils::obfuscate_credentials(&e.to_string()),
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(NetworkError::Http {
                    url: UrlUtils::obfuscate_credentials(url),
                    status: status.as_u16(),
                });
            }

            response.text().await.map_err(|e| NetworkError::Body {
                url: UrlUtils::obfuscate_credentials(url),
                message: e.to_string(),
            })
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout {
                url: UrlUtils::obfuscate_credentials(url),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// Unwrap relay envelopes of the form `{"contents": "..."}`; anything else is
/// returned untouched.
pub fn unwrap_relay_envelope(body: String) -> String {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return body;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => match map.get("contents") {
            Some(serde_json::Value::String(contents)) => contents.clone(),
            _ => body,
        },
        _ => body,
    }
}

#[async_trait]
impl TextFetcher for FetchPipeline {
    async fn fetch_text(&self, url: &str, timeout: Duration) -> NetworkResult<String> {
        let safe_url = UrlUtils::obfuscate_credentials(url);
        debug!("Fetching text content from: {}", safe_url);

        let mut last_error = match self.attempt(url, timeout).await {
            Ok(text) => {
                debug!("Direct fetch succeeded ({} bytes)", text.len());
                return Ok(text);
            }
            Err(e) => {
                debug!("Direct fetch failed for {}: {}", safe_url, e);
                e
            }
        };

        for (index, template) in self.relays.iter().enumerate() {
            let relay_url = Self::relay_url(template, url);
            match self.attempt(&relay_url, timeout).await {
                Ok(body) => {
                    debug!("Relay #{} succeeded for {}", index + 1, safe_url);
                    return Ok(unwrap_relay_envelope(body));
                }
                Err(e) => {
                    debug!("Relay #{} failed for {}: {}", index + 1, safe_url, e);
                    last_error = e;
                }
            }
        }

        let attempts = self.relays.len() + 1;
        warn!("All {} fetch attempts failed for {}", attempts, safe_url);
        Err(NetworkError::Exhausted {
            url: safe_url,
            attempts,
            last_error: Box::new(last_error),
        })
    }
}
