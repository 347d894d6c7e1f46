/*!
 * Manifest Resolution Module
 * ==========================
 *
 * Purpose:
 *   Turn an adaptive-streaming URL into a concrete playable location before it
 *   is handed to a player. A master manifest is reduced to one of its
 *   variants, a media manifest to its first segment.
 *
 * Policy:
 *   - Only HLS shapes (`.m3u8` / `.m3u` path) are fetched. Anything else,
 *     DASH included, passes through untouched.
 *   - Variant choice is the middle entry after a stable sort by bandwidth
 *     descending, so neither the most expensive nor the starved rendition
 *     is picked.
 *   - Resolution never fails outward. Every error collapses to the original
 *     URL with a diagnostic.
 *   - Successful resolutions are cached by original URL for the cache TTL.
 */

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::batch::{BatchOutcome, BatchRunner};
use super::resolution_cache::ResolutionCache;
use crate::config::ResolutionConfig;
use crate::config::defaults::{DEFAULT_MANIFEST_TIMEOUT, DEFAULT_RESOLUTION_CONCURRENCY};
use crate::models::ChannelRecord;
use crate::utils::attributes::split_unquoted;
use crate::utils::{TextFetcher, UrlUtils};

const HLS_EXTENSIONS: &[&str] = &[".m3u8", ".m3u"];

/// Segment shapes accepted as the resolved location of a media manifest
const SEGMENT_EXTENSIONS: &[&str] = &[
    ".ts", ".m3u8", ".m3u", ".m4s", ".mp4", ".aac", ".m4a", ".m4v", ".mp3",
];

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF:";
const DIAGNOSTIC_EXCERPT_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    MasterResolved,
    MediaResolved,
    PassThroughDirect,
    FailedFallback,
}

impl ResolutionKind {
    /// Whether the outcome came from a successfully interpreted manifest
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::MasterResolved | Self::MediaResolved)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub original_url: String,
    pub resolved_url: String,
    pub kind: ResolutionKind,
    pub selected_variant_index: Option<usize>,
    pub total_variants: usize,
    pub elapsed_ms: u64,
    pub diagnostic: Option<String>,
    pub cached: bool,
}

impl ResolutionResult {
    fn unchanged(
        url: &str,
        kind: ResolutionKind,
        started: Instant,
        diagnostic: Option<String>,
    ) -> Self {
        Self {
            original_url: url.to_string(),
            resolved_url: url.to_string(),
            kind,
            selected_variant_index: None,
            total_variants: 0,
            elapsed_ms: started.elapsed().as_millis() as u64,
            diagnostic,
            cached: false,
        }
    }
}

/// One `#EXT-X-STREAM-INF` entry of a master manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestVariant {
    pub bandwidth: u64,
    pub resolution: String,
    pub uri: String,
}

/// Parse master-manifest variants in source order.
///
/// Each `#EXT-X-STREAM-INF` directive is paired with the next non-comment
/// line. Attribute lists are split outside quotes since `CODECS` values carry
/// commas. Missing or malformed `BANDWIDTH` reads as 0, missing `RESOLUTION`
/// as `"unknown"`.
pub fn parse_master_variants(text: &str) -> Vec<ManifestVariant> {
    let mut variants = Vec::new();
    let mut pending: Option<(u64, String)> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if let Some(attrs) = line.strip_prefix(STREAM_INF_TAG) {
            let mut bandwidth = 0u64;
            let mut resolution = String::from("unknown");
            for part in split_unquoted(attrs, ',') {
                let Some((key, value)) = part.trim().split_once('=') else {
                    continue;
                };
                let value = value.trim().trim_matches('"');
                match key.trim().to_ascii_uppercase().as_str() {
                    "BANDWIDTH" => bandwidth = value.parse().unwrap_or(0),
                    "RESOLUTION" if !value.is_empty() => resolution = value.to_string(),
                    _ => {}
                }
            }
            pending = Some((bandwidth, resolution));
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((bandwidth, resolution)) = pending.take() {
            variants.push(ManifestVariant {
                bandwidth,
                resolution,
                uri: line.to_string(),
            });
        }
    }
    variants
}

/// Index of the middle variant after a stable sort by bandwidth descending
fn select_variant(variants: &mut [ManifestVariant]) -> Option<usize> {
    if variants.is_empty() {
        return None;
    }
    variants.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
    Some(variants.len() / 2)
}

fn first_segment(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .find(|line| UrlUtils::has_extension(line, SEGMENT_EXTENSIONS))
}

fn excerpt(text: &str) -> String {
    text.trim().chars().take(DIAGNOSTIC_EXCERPT_CHARS).collect()
}

/// Resolution outcome for one catalog record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelResolution {
    pub channel_id: Uuid,
    pub result: ResolutionResult,
}

pub struct ManifestResolver {
    fetcher: Arc<dyn TextFetcher>,
    cache: Arc<ResolutionCache>,
    timeout: Duration,
    concurrency: usize,
}

impl ManifestResolver {
    pub fn new(fetcher: Arc<dyn TextFetcher>, cache: Arc<ResolutionCache>) -> Self {
        Self {
            fetcher,
            cache,
            timeout: DEFAULT_MANIFEST_TIMEOUT,
            concurrency: DEFAULT_RESOLUTION_CONCURRENCY,
        }
    }

    pub fn from_config(
        fetcher: Arc<dyn TextFetcher>,
        cache: Arc<ResolutionCache>,
        config: &ResolutionConfig,
    ) -> Self {
        Self {
            fetcher,
            cache,
            timeout: config.manifest_timeout,
            concurrency: config.concurrency,
        }
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// Resolve `url` to a playable location. Never fails: on any problem the
    /// original URL comes back with a diagnostic.
    pub async fn resolve_stream(&self, url: &str) -> ResolutionResult {
        let started = Instant::now();

        if !UrlUtils::has_extension(url, HLS_EXTENSIONS) {
            return ResolutionResult::unchanged(
                url,
                ResolutionKind::PassThroughDirect,
                started,
                None,
            );
        }

        if let Some(hit) = self.cache.get(url) {
            debug!("Resolution cache hit for {}", UrlUtils::obfuscate_credentials(url));
            return hit;
        }

        let text = match self.fetcher.fetch_text(url, self.timeout).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Manifest fetch failed for {}: {}",
                    UrlUtils::obfuscate_credentials(url),
                    e
                );
                return ResolutionResult::unchanged(
                    url,
                    ResolutionKind::FailedFallback,
                    started,
                    Some(e.to_string()),
                );
            }
        };

        let result = self.interpret(url, &text, started);
        if result.kind.is_resolved() {
            self.cache.insert(url, result.clone());
        }
        debug!(
            "Resolved {} -> {} ({:?}, {}ms)",
            UrlUtils::obfuscate_credentials(url),
            UrlUtils::obfuscate_credentials(&result.resolved_url),
            result.kind,
            result.elapsed_ms
        );
        result
    }

    fn interpret(&self, url: &str, text: &str, started: Instant) -> ResolutionResult {
        if !text.contains("#EXT") {
            return ResolutionResult::unchanged(
                url,
                ResolutionKind::PassThroughDirect,
                started,
                Some(format!("Not a manifest: {}", excerpt(text))),
            );
        }

        if text.contains(STREAM_INF_TAG) {
            let mut variants = parse_master_variants(text);
            let Some(index) = select_variant(&mut variants) else {
                return ResolutionResult::unchanged(
                    url,
                    ResolutionKind::FailedFallback,
                    started,
                    Some("Master manifest lists no variants".to_string()),
                );
            };
            let selected = &variants[index];
            return ResolutionResult {
                original_url: url.to_string(),
                resolved_url: UrlUtils::absolutize(url, &selected.uri),
                kind: ResolutionKind::MasterResolved,
                selected_variant_index: Some(index),
                total_variants: variants.len(),
                elapsed_ms: started.elapsed().as_millis() as u64,
                diagnostic: Some(format!(
                    "Selected {} @ {} bps",
                    selected.resolution, selected.bandwidth
                )),
                cached: false,
            };
        }

        match first_segment(text) {
            Some(segment) => ResolutionResult {
                original_url: url.to_string(),
                resolved_url: UrlUtils::absolutize(url, segment),
                kind: ResolutionKind::MediaResolved,
                selected_variant_index: None,
                total_variants: 0,
                elapsed_ms: started.elapsed().as_millis() as u64,
                diagnostic: None,
                cached: false,
            },
            None => ResolutionResult::unchanged(
                url,
                ResolutionKind::FailedFallback,
                started,
                Some("Media manifest lists no playable segment".to_string()),
            ),
        }
    }

    /// Resolve every enabled record, `concurrency` at a time. Progress is
    /// reported per completion with the cumulative count.
    pub async fn resolve_channels<P>(
        &self,
        channels: &[ChannelRecord],
        cancel: &CancellationToken,
        progress: P,
    ) -> BatchOutcome<ChannelResolution>
    where
        P: FnMut(usize, &ChannelResolution),
    {
        let targets: Vec<&ChannelRecord> = channels.iter().filter(|c| c.enabled).collect();
        info!(
            "Resolving {} channels (concurrency {})",
            targets.len(),
            self.concurrency
        );

        let outcome = BatchRunner::new(self.concurrency)
            .run(
                targets,
                cancel,
                |channel| async move {
                    ChannelResolution {
                        channel_id: channel.id,
                        result: self.resolve_stream(&channel.stream_url).await,
                    }
                },
                progress,
            )
            .await;

        info!(
            "Resolution finished: {}/{} processed{}",
            outcome.processed,
            outcome.total,
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{NetworkError, NetworkResult};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticFetcher(HashMap<String, String>);

    #[async_trait]
    impl TextFetcher for StaticFetcher {
        async fn fetch_text(&self, url: &str, timeout: Duration) -> NetworkResult<String> {
            self.0.get(url).cloned().ok_or_else(|| NetworkError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    fn resolver(pages: &[(&str, &str)]) -> ManifestResolver {
        let pages = pages
            .iter()
            .map(|(u, t)| (u.to_string(), t.to_string()))
            .collect();
        ManifestResolver::new(
            Arc::new(StaticFetcher(pages)),
            Arc::new(ResolutionCache::default()),
        )
    }

    #[test]
    fn test_master_variants_with_quoted_codecs() {
        let text = "#EXTM3U\n\
            #EXT-X-STREAM-INF:BANDWIDTH=800000,CODECS=\"avc1.4d401f,mp4a.40.2\",RESOLUTION=1280x720\n\
            mid/index.m3u8\n\
            #EXT-X-STREAM-INF:BANDWIDTH=200000\n\
            # comment between directive and uri\n\
            low/index.m3u8\n";
        let variants = parse_master_variants(text);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].bandwidth, 800_000);
        assert_eq!(variants[0].resolution, "1280x720");
        assert_eq!(variants[1].resolution, "unknown");
        assert_eq!(variants[1].uri, "low/index.m3u8");
    }

    #[test]
    fn test_malformed_bandwidth_reads_as_zero() {
        let variants = parse_master_variants("#EXT-X-STREAM-INF:BANDWIDTH=lots\nv.m3u8\n");
        assert_eq!(variants[0].bandwidth, 0);
    }

    #[test]
    fn test_select_variant_is_stable_middle() {
        let mut variants: Vec<ManifestVariant> = [(300, "a"), (300, "b"), (100, "c")]
            .iter()
            .map(|(bw, uri)| ManifestVariant {
                bandwidth: *bw,
                resolution: "unknown".into(),
                uri: uri.to_string(),
            })
            .collect();
        let index = select_variant(&mut variants).unwrap();
        assert_eq!(index, 1);
        assert_eq!(variants[index].uri, "b");
        assert_eq!(select_variant(&mut []), None);
    }

    #[tokio::test]
    async fn test_dash_passes_through_without_fetch() {
        let r = resolver(&[]);
        let result = r.resolve_stream("http://cdn/live/manifest.mpd").await;
        assert_eq!(result.kind, ResolutionKind::PassThroughDirect);
        assert_eq!(result.resolved_url, "http://cdn/live/manifest.mpd");
        assert!(result.diagnostic.is_none());
    }

    #[tokio::test]
    async fn test_root_relative_variant_is_joined_to_host() {
        let r = resolver(&[(
            "http://cdn.example/live/master.m3u8?token=1",
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n/abs/only.m3u8\n",
        )]);
        let result = r
            .resolve_stream("http://cdn.example/live/master.m3u8?token=1")
            .await;
        assert_eq!(result.kind, ResolutionKind::MasterResolved);
        assert_eq!(result.resolved_url, "http://cdn.example/abs/only.m3u8");
        assert_eq!(result.total_variants, 1);
    }

    #[tokio::test]
    async fn test_non_manifest_body_passes_through() {
        let r = resolver(&[("http://x/a.m3u8", "<html>blocked</html>")]);
        let result = r.resolve_stream("http://x/a.m3u8").await;
        assert_eq!(result.kind, ResolutionKind::PassThroughDirect);
        assert!(result.diagnostic.unwrap().contains("<html>blocked"));
        assert!(r.cache().is_empty());
    }

    #[tokio::test]
    async fn test_media_without_segments_falls_back() {
        let r = resolver(&[("http://x/a.m3u8", "#EXTM3U\n#EXT-X-ENDLIST\nreadme.txt\n")]);
        let result = r.resolve_stream("http://x/a.m3u8").await;
        assert_eq!(result.kind, ResolutionKind::FailedFallback);
        assert_eq!(result.resolved_url, "http://x/a.m3u8");
        assert!(r.cache().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_channels_skips_disabled() {
        let r = resolver(&[]);
        let source = Uuid::new_v4();
        let mut off = ChannelRecord::new(source, "Off", "http://x/off.mp4");
        off.enabled = false;
        let channels = vec![ChannelRecord::new(source, "On", "http://x/on.mp4"), off];

        let outcome = r
            .resolve_channels(&channels, &CancellationToken::new(), |_, _| {})
            .await;
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.results[0].channel_id, channels[0].id);
        assert_eq!(outcome.results[0].result.kind, ResolutionKind::PassThroughDirect);
    }
}
