//! In-memory channel catalog
//!
//! Owns the sources and their channel records and applies every lifecycle
//! operation to them: import, refresh, enable/disable, delete, liveness
//! write-back and export. Imports are all-or-nothing: a payload that fails to
//! parse leaves the catalog untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::FetchConfig;
use crate::config::defaults::DEFAULT_FETCH_TIMEOUT;
use crate::errors::{AppError, AppResult};
use crate::matching::{ChannelGroup, ChannelPattern, group_channels};
use crate::models::{
    ChannelRecord, DEFAULT_CHANNEL_NAME, LivenessStatus, SourceDescriptor, SourceOrigin,
};
use crate::proxy::generate_m3u;
use crate::sources::{SourceFormat, parse_source};
use crate::streaming::LivenessResult;
use crate::utils::{TextFetcher, UrlUtils};

const MANUAL_SOURCE_NAME: &str = "Manual Channels";

/// Result of a successful import or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub source: SourceDescriptor,
    pub channel_count: usize,
}

#[derive(Debug, Default)]
struct CatalogState {
    sources: Vec<SourceDescriptor>,
    channels: Vec<ChannelRecord>,
}

impl CatalogState {
    fn source_mut(&mut self, id: Uuid) -> AppResult<&mut SourceDescriptor> {
        self.sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::not_found("source", id))
    }

    fn channel_mut(&mut self, id: Uuid) -> AppResult<&mut ChannelRecord> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::not_found("channel", id))
    }

    fn active(&self) -> Vec<ChannelRecord> {
        self.channels
            .iter()
            .filter(|c| c.enabled)
            .filter(|c| {
                self.sources
                    .iter()
                    .any(|s| s.id == c.source_id && s.enabled)
            })
            .cloned()
            .collect()
    }
}

pub struct CatalogService {
    state: RwLock<CatalogState>,
    fetcher: Arc<dyn TextFetcher>,
    fetch_timeout: Duration,
}

impl CatalogService {
    pub fn new(fetcher: Arc<dyn TextFetcher>) -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            fetcher,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn from_config(fetcher: Arc<dyn TextFetcher>, config: &FetchConfig) -> Self {
        Self {
            fetch_timeout: config.timeout,
            ..Self::new(fetcher)
        }
    }

    pub async fn import_playlist(
        &self,
        name: &str,
        origin: SourceOrigin,
        content: &str,
    ) -> AppResult<ImportSummary> {
        self.import_text(name, origin, content, SourceFormat::Playlist)
            .await
    }

    pub async fn import_feed(
        &self,
        name: &str,
        origin: SourceOrigin,
        content: &str,
    ) -> AppResult<ImportSummary> {
        self.import_text(name, origin, content, SourceFormat::Feed)
            .await
    }

    /// Fetch `url` and import it, sniffing the format from the payload
    pub async fn import_remote(&self, name: &str, url: &str) -> AppResult<ImportSummary> {
        let content = self.fetcher.fetch_text(url, self.fetch_timeout).await?;
        let format = SourceFormat::detect(&content);
        self.import_text(
            name,
            SourceOrigin::RemoteUrl {
                url: url.to_string(),
            },
            &content,
            format,
        )
        .await
    }

    async fn import_text(
        &self,
        name: &str,
        origin: SourceOrigin,
        content: &str,
        format: SourceFormat,
    ) -> AppResult<ImportSummary> {
        let mut source = SourceDescriptor::new(name, origin);
        let channels = parse_source(content, format, source.id).inspect_err(|e| {
            warn!("Import of source '{}' rejected: {}", name, e);
        })?;
        source.mark_ok();

        let summary = ImportSummary {
            source: source.clone(),
            channel_count: channels.len(),
        };

        let mut state = self.state.write().await;
        state.sources.push(source);
        state.channels.extend(channels);

        info!(
            "Imported source '{}' ({:?}) with {} channels",
            name, format, summary.channel_count
        );
        Ok(summary)
    }

    /// Add a single channel under the manual source, created on first use
    pub async fn add_manual_channel(&self, name: &str, url: &str) -> AppResult<ChannelRecord> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::validation("Manual channel requires a stream URL"));
        }
        let name = match name.trim() {
            "" => DEFAULT_CHANNEL_NAME,
            trimmed => trimmed,
        };

        let mut state = self.state.write().await;
        let existing = state
            .sources
            .iter()
            .find(|s| s.origin == SourceOrigin::Manual)
            .map(|s| s.id);
        let source_id = match existing {
            Some(id) => id,
            None => {
                let mut source = SourceDescriptor::new(MANUAL_SOURCE_NAME, SourceOrigin::Manual);
                source.mark_ok();
                let id = source.id;
                state.sources.push(source);
                id
            }
        };

        let mut channel = ChannelRecord::new(source_id, name, url);
        channel.sort_order = state
            .channels
            .iter()
            .filter(|c| c.source_id == source_id)
            .count() as i64
            + 1;
        state.channels.push(channel.clone());
        Ok(channel)
    }

    /// Re-fetch a remote source and replace its records in place. On failure
    /// the source is marked failed and its current records are kept.
    pub async fn refresh_source(&self, id: Uuid) -> AppResult<ImportSummary> {
        let url = {
            let state = self.state.read().await;
            let source = state
                .sources
                .iter()
                .find(|s| s.id == id)
                .ok_or_else(|| AppError::not_found("source", id))?;
            source
                .remote_url()
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::validation(format!("Source '{}' has no remote URL", source.name))
                })?
        };

        let fetched = match self.fetcher.fetch_text(&url, self.fetch_timeout).await {
            Ok(content) => parse_source(&content, SourceFormat::detect(&content), id),
            Err(e) => Err(AppError::from(e)),
        };

        let mut state = self.state.write().await;
        // Deleted while the fetch was in flight: leave the channel list alone
        if !state.sources.iter().any(|s| s.id == id) {
            debug!("Source {} was deleted during refresh, discarding result", id);
            return Err(AppError::not_found("source", id));
        }
        let channels = match fetched {
            Ok(channels) => channels,
            Err(e) => {
                warn!(
                    "Refresh of {} failed, keeping previous channels: {}",
                    UrlUtils::obfuscate_credentials(&url),
                    e
                );
                state.source_mut(id)?.mark_failed(e.to_string());
                return Err(e);
            }
        };

        let position = state
            .channels
            .iter()
            .position(|c| c.source_id == id)
            .unwrap_or(state.channels.len());
        state.channels.retain(|c| c.source_id != id);
        let channel_count = channels.len();
        let tail = state.channels.split_off(position);
        state.channels.extend(channels);
        state.channels.extend(tail);

        let source = state.source_mut(id)?;
        source.mark_ok();
        info!("Refreshed source '{}': {} channels", source.name, channel_count);

        Ok(ImportSummary {
            source: source.clone(),
            channel_count,
        })
    }

    pub async fn set_source_enabled(&self, id: Uuid, enabled: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.source_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Delete a source and every record it owns; returns the number of records removed
    pub async fn delete_source(&self, id: Uuid) -> AppResult<usize> {
        let mut state = self.state.write().await;
        let before = state.sources.len();
        state.sources.retain(|s| s.id != id);
        if state.sources.len() == before {
            return Err(AppError::not_found("source", id));
        }
        let channels_before = state.channels.len();
        state.channels.retain(|c| c.source_id != id);
        let removed = channels_before - state.channels.len();
        info!("Deleted source {} and {} channels", id, removed);
        Ok(removed)
    }

    pub async fn set_channel_enabled(&self, id: Uuid, enabled: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.channel_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub async fn set_sort_order(&self, id: Uuid, sort_order: i64) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.channel_mut(id)?.sort_order = sort_order;
        Ok(())
    }

    pub async fn sources(&self) -> Vec<SourceDescriptor> {
        self.state.read().await.sources.clone()
    }

    pub async fn source(&self, id: Uuid) -> AppResult<SourceDescriptor> {
        self.state
            .read()
            .await
            .sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("source", id))
    }

    /// Every record, disabled ones included, in catalog order
    pub async fn channels(&self) -> Vec<ChannelRecord> {
        self.state.read().await.channels.clone()
    }

    /// Enabled records of enabled sources, in catalog order
    pub async fn active_channels(&self) -> Vec<ChannelRecord> {
        self.state.read().await.active()
    }

    /// Write liveness verdicts back onto their records; unknown ids are skipped
    pub async fn apply_liveness(&self, results: &[LivenessResult]) -> usize {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for result in results {
            if let Some(channel) = state.channels.iter_mut().find(|c| c.id == result.channel_id) {
                result.apply_to(channel);
                updated += 1;
            }
        }
        updated
    }

    /// Remove every record last probed dead; returns how many were removed
    pub async fn remove_dead_channels(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.channels.len();
        state.channels.retain(|c| c.status != LivenessStatus::Dead);
        let removed = before - state.channels.len();
        if removed > 0 {
            info!("Removed {} dead channels", removed);
        }
        removed
    }

    /// Active records whose name matches `pattern`
    pub async fn filter(&self, pattern: &str) -> Vec<ChannelRecord> {
        let pattern = ChannelPattern::new(pattern);
        self.active_channels()
            .await
            .into_iter()
            .filter(|c| pattern.matches(&c.channel_name))
            .collect()
    }

    /// Group active records that appear in at least `min_sources` sources
    pub async fn combine(&self, min_sources: usize) -> Vec<ChannelGroup> {
        group_channels(&self.active_channels().await, min_sources)
    }

    pub async fn export_m3u(&self) -> String {
        generate_m3u(&self.active_channels().await)
    }
}
