use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub liveness: LivenessConfig,
}

/// Network fetch pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Hard timeout applied to every individual attempt
    #[serde(default = "default_fetch_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
    /// Relay URL templates tried in order after the direct fetch fails.
    /// `{url}` is replaced with the percent-encoded target URL.
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Manifest resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(
        default = "default_resolution_cache_ttl",
        with = "duration_serde::duration"
    )]
    pub cache_ttl: Duration,
    #[serde(default = "default_resolution_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_manifest_timeout", with = "duration_serde::duration")]
    pub manifest_timeout: Duration,
}

/// Liveness probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    #[serde(default = "default_liveness_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
    #[serde(default = "default_liveness_concurrency")]
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            relays: default_relays(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: default_resolution_cache_ttl(),
            concurrency: default_resolution_concurrency(),
            manifest_timeout: default_manifest_timeout(),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout: default_liveness_timeout(),
            concurrency: default_liveness_concurrency(),
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }

    /// Reject settings that would stall batch processing or never time out
    pub fn validate(&self) -> AppResult<()> {
        if self.resolution.concurrency == 0 {
            return Err(AppError::configuration(
                "resolution.concurrency must be at least 1",
            ));
        }
        if self.liveness.concurrency == 0 {
            return Err(AppError::configuration(
                "liveness.concurrency must be at least 1",
            ));
        }
        for (name, value) in [
            ("fetch.timeout", self.fetch.timeout),
            ("resolution.manifest_timeout", self.resolution.manifest_timeout),
            ("liveness.timeout", self.liveness.timeout),
        ] {
            if value.is_zero() {
                return Err(AppError::configuration(format!("{name} must be non-zero")));
            }
        }
        for relay in &self.fetch.relays {
            if !relay.contains("{url}") {
                return Err(AppError::configuration(format!(
                    "relay template '{relay}' is missing the {{url}} placeholder"
                )));
            }
        }
        Ok(())
    }
}
