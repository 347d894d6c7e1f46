use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::utils::UrlUtils;

pub mod stream_source;

pub use stream_source::{FetchStatus, SourceDescriptor, SourceOrigin};

pub const DEFAULT_CHANNEL_NAME: &str = "Unnamed Channel";
pub const DEFAULT_GROUP_TITLE: &str = "Uncategorized";

/// Canonical channel record produced by every parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: Uuid,
    pub source_id: Uuid,
    pub channel_name: String,
    pub stream_url: String,
    pub tvg_logo: Option<String>,
    pub group_title: String,
    pub tvg_id: Option<String>,
    pub tvg_name: Option<String>,
    pub enabled: bool,
    pub drm: Option<DrmDescriptor>,
    #[serde(default)]
    pub headers: TransportHeaders,
    pub stream_kind: StreamKind,
    pub status: LivenessStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub response_time_ms: Option<u64>,
    pub sort_order: i64,
}

impl ChannelRecord {
    /// Create an enabled record with defaulted metadata
    pub fn new(
        source_id: Uuid,
        channel_name: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        let stream_url = stream_url.into();
        Self {
            id: Uuid::new_v4(),
            source_id,
            channel_name: channel_name.into(),
            stream_kind: StreamKind::from_url(&stream_url),
            stream_url,
            tvg_logo: None,
            group_title: DEFAULT_GROUP_TITLE.to_string(),
            tvg_id: None,
            tvg_name: None,
            enabled: true,
            drm: None,
            headers: TransportHeaders::default(),
            status: LivenessStatus::Unknown,
            last_checked_at: None,
            response_time_ms: None,
            sort_order: 0,
        }
    }
}

/// DRM license information, passed through untouched to playback engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmDescriptor {
    /// Canonical scheme token, see [`normalize_drm_scheme`]
    pub license_type: String,
    pub license_key: Option<String>,
}

/// Per-channel request headers required by some upstreams
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportHeaders {
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub cookie: Option<String>,
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

impl TransportHeaders {
    pub fn is_empty(&self) -> bool {
        self.user_agent.is_none()
            && self.referer.is_none()
            && self.cookie.is_none()
            && self.custom.is_empty()
    }

    /// Route a header into its typed slot, or the custom map.
    /// Later calls overwrite earlier values for the same header.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match name.to_ascii_lowercase().as_str() {
            "user-agent" | "useragent" | "user_agent" => self.user_agent = Some(value),
            "referer" | "referrer" => self.referer = Some(value),
            "cookie" => self.cookie = Some(value),
            _ => {
                self.custom.insert(name.to_string(), value);
            }
        }
    }

    /// Overlay every header present in `other` onto `self`
    pub fn merge(&mut self, other: TransportHeaders) {
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent;
        }
        if other.referer.is_some() {
            self.referer = other.referer;
        }
        if other.cookie.is_some() {
            self.cookie = other.cookie;
        }
        self.custom.extend(other.custom);
    }

    /// Flatten into (name, value) pairs suitable for an HTTP request
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(ua) = &self.user_agent {
            pairs.push(("User-Agent".to_string(), ua.clone()));
        }
        if let Some(referer) = &self.referer {
            pairs.push(("Referer".to_string(), referer.clone()));
        }
        if let Some(cookie) = &self.cookie {
            pairs.push(("Cookie".to_string(), cookie.clone()));
        }
        pairs.extend(self.custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Hls,
    Dash,
    Direct,
}

impl StreamKind {
    /// Classify a playback URL by the extension of its path
    pub fn from_url(url: &str) -> Self {
        if UrlUtils::has_extension(url, &[".mpd"]) {
            StreamKind::Dash
        } else if UrlUtils::has_extension(url, &[".m3u8", ".m3u"]) {
            StreamKind::Hls
        } else {
            StreamKind::Direct
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    #[default]
    Unknown,
    Alive,
    Dead,
}

/// Map DRM scheme aliases onto the token playback engines expect
pub fn normalize_drm_scheme(scheme: &str) -> String {
    let lower = scheme.trim().to_ascii_lowercase();
    match lower.as_str() {
        "clearkey" | "clear-key" | "clear_key" | "ck" | "org.w3.clearkey" => "clearkey".to_string(),
        "widevine" | "wv" | "com.widevine.alpha" => "com.widevine.alpha".to_string(),
        "playready" | "pr" | "com.microsoft.playready" => "com.microsoft.playready".to_string(),
        _ => lower,
    }
}
