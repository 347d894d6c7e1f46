//! Per-channel reachability probing
//!
//! A probe is a single `HEAD` request carrying the channel's transport
//! headers, bounded by a hard timeout. Only the timeout counts as dead. Any
//! response, whatever its status, and any transport error are reported alive:
//! plenty of playable origins refuse `HEAD` or diagnostic clients outright.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::batch::{BatchOutcome, BatchRunner};
use crate::config::LivenessConfig;
use crate::config::defaults::{
    DEFAULT_LIVENESS_CONCURRENCY, DEFAULT_LIVENESS_TIMEOUT, DEFAULT_USER_AGENT,
};
use crate::models::{ChannelRecord, LivenessStatus};
use crate::utils::UrlUtils;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResult {
    pub channel_id: Uuid,
    pub alive: bool,
    pub response_time_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl LivenessResult {
    pub fn status(&self) -> LivenessStatus {
        if self.alive {
            LivenessStatus::Alive
        } else {
            LivenessStatus::Dead
        }
    }

    /// Write the verdict back onto its record
    pub fn apply_to(&self, record: &mut ChannelRecord) {
        record.status = self.status();
        record.last_checked_at = Some(self.checked_at);
        record.response_time_ms = Some(self.response_time_ms);
    }
}

pub struct LivenessProber {
    client: Client,
    timeout: Duration,
    concurrency: usize,
}

impl Default for LivenessProber {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_TIMEOUT, DEFAULT_LIVENESS_CONCURRENCY)
    }
}

impl LivenessProber {
    pub fn new(timeout: Duration, concurrency: usize) -> Self {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            timeout,
            concurrency,
        }
    }

    pub fn from_config(config: &LivenessConfig) -> Self {
        Self::new(config.timeout, config.concurrency)
    }

    pub async fn check_stream(&self, channel: &ChannelRecord) -> LivenessResult {
        let started = Instant::now();

        let mut request = self.client.head(&channel.stream_url);
        for (name, value) in channel.headers.to_pairs() {
            request = request.header(name, value);
        }

        let alive = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => {
                debug!(
                    "Probe {} answered {}",
                    UrlUtils::obfuscate_credentials(&channel.stream_url),
                    response.status()
                );
                true
            }
            Ok(Err(e)) => {
                debug!(
                    "Probe {} failed without timing out, treating as alive: {}",
                    UrlUtils::obfuscate_credentials(&channel.stream_url),
                    e
                );
                true
            }
            Err(_) => {
                debug!(
                    "Probe {} timed out after {:?}",
                    UrlUtils::obfuscate_credentials(&channel.stream_url),
                    self.timeout
                );
                false
            }
        };

        LivenessResult {
            channel_id: channel.id,
            alive,
            response_time_ms: started.elapsed().as_millis() as u64,
            checked_at: Utc::now(),
        }
    }

    /// Probe every enabled record, `concurrency` at a time
    pub async fn check_channels<P>(
        &self,
        channels: &[ChannelRecord],
        cancel: &CancellationToken,
        progress: P,
    ) -> BatchOutcome<LivenessResult>
    where
        P: FnMut(usize, &LivenessResult),
    {
        let targets: Vec<&ChannelRecord> = channels.iter().filter(|c| c.enabled).collect();
        let outcome = BatchRunner::new(self.concurrency)
            .run(targets, cancel, |channel| self.check_stream(channel), progress)
            .await;

        let dead = outcome.results.iter().filter(|r| !r.alive).count();
        info!(
            "Liveness check finished: {}/{} probed, {} dead{}",
            outcome.processed,
            outcome.total,
            dead,
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        outcome
    }
}
