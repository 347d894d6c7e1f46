//! M3U playlist parser
//!
//! Parses the line-oriented playlist dialect into [`ChannelRecord`]s. Besides
//! the usual `#EXTINF` metadata, the dialect carries per-channel playback hints
//! on their own lines:
//!
//! ```text
//! #KODIPROP:inputstream.adaptive.license_type=clearkey
//! #KODIPROP:inputstream.adaptive.license_key=0123:4567
//! #EXTVLCOPT:http-user-agent=Mozilla/5.0
//! #EXTHTTP:{"cookie":"session=abc","X-Forwarded-For":"1.2.3.4"}
//! #EXTINF:-1 tvg-id="one" tvg-logo="http://x/a.png?w=1,h=2" group-title="News",Channel One
//! http://example.com/one/index.m3u8
//! ```
//!
//! Metadata lines accumulate into a pending entry which the next URL line
//! closes. The parser is a fold over lines threading an explicit
//! [`ParserState`].

use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    ChannelRecord, DEFAULT_CHANNEL_NAME, DEFAULT_GROUP_TITLE, DrmDescriptor, StreamKind,
    TransportHeaders, normalize_drm_scheme,
};
use crate::utils::UrlUtils;
use crate::utils::attributes::{last_unquoted_comma, parse_attributes};

const EXTINF_PREFIX: &str = "#EXTINF:";
const EXTGRP_PREFIX: &str = "#EXTGRP:";
const KODIPROP_PREFIX: &str = "#KODIPROP:";
const EXTVLCOPT_PREFIX: &str = "#EXTVLCOPT:";
const EXTHTTP_PREFIX: &str = "#EXTHTTP:";

/// One classified playlist line
#[derive(Debug, PartialEq)]
enum PlaylistLine<'a> {
    EntryInfo(&'a str),
    Group(&'a str),
    DrmProperty { key: &'a str, value: &'a str },
    TransportOption { key: &'a str, value: &'a str },
    HeaderBlock(&'a str),
    StreamUrl(&'a str),
    Ignored,
}

fn classify_line(line: &str) -> PlaylistLine<'_> {
    if let Some(rest) = line.strip_prefix(EXTINF_PREFIX) {
        return PlaylistLine::EntryInfo(rest);
    }
    if let Some(rest) = line.strip_prefix(EXTGRP_PREFIX) {
        return PlaylistLine::Group(rest.trim());
    }
    if let Some(rest) = line.strip_prefix(KODIPROP_PREFIX) {
        return match rest.split_once('=') {
            Some((key, value)) => PlaylistLine::DrmProperty {
                key: key.trim(),
                value: value.trim(),
            },
            None => PlaylistLine::Ignored,
        };
    }
    if let Some(rest) = line.strip_prefix(EXTVLCOPT_PREFIX) {
        return match rest.split_once('=') {
            Some((key, value)) => PlaylistLine::TransportOption {
                key: key.trim(),
                value: value.trim(),
            },
            None => PlaylistLine::Ignored,
        };
    }
    if let Some(rest) = line.strip_prefix(EXTHTTP_PREFIX) {
        return PlaylistLine::HeaderBlock(rest.trim());
    }
    if UrlUtils::looks_like_stream_url(line) {
        return PlaylistLine::StreamUrl(line);
    }
    PlaylistLine::Ignored
}

/// Metadata collected for the entry the next URL line will close
#[derive(Debug, Default, Clone, PartialEq)]
struct PendingEntry {
    name: Option<String>,
    group_title: Option<String>,
    tvg_id: Option<String>,
    tvg_name: Option<String>,
    tvg_logo: Option<String>,
    channel_number: Option<i64>,
    license_type: Option<String>,
    license_key: Option<String>,
    headers: TransportHeaders,
}

#[derive(Debug, Default)]
enum ParserState {
    #[default]
    Idle,
    Pending(PendingEntry),
}

impl ParserState {
    /// Take the pending entry, opening an empty one when idle
    fn into_pending(self) -> PendingEntry {
        match self {
            ParserState::Idle => PendingEntry::default(),
            ParserState::Pending(entry) => entry,
        }
    }
}

#[derive(Debug)]
struct ParseAccumulator {
    source_id: Uuid,
    state: ParserState,
    channels: Vec<ChannelRecord>,
}

impl ParseAccumulator {
    fn step(mut self, (line_num, line): (usize, &str)) -> Self {
        let state = std::mem::take(&mut self.state);
        self.state = match classify_line(line) {
            PlaylistLine::EntryInfo(info) => {
                ParserState::Pending(apply_entry_info(state.into_pending(), info))
            }
            PlaylistLine::Group(group) => {
                let mut entry = state.into_pending();
                if !group.is_empty() && entry.group_title.is_none() {
                    entry.group_title = Some(group.to_string());
                }
                ParserState::Pending(entry)
            }
            PlaylistLine::DrmProperty { key, value } => {
                ParserState::Pending(apply_drm_property(state.into_pending(), key, value))
            }
            PlaylistLine::TransportOption { key, value } => {
                ParserState::Pending(apply_transport_option(state.into_pending(), key, value))
            }
            PlaylistLine::HeaderBlock(block) => {
                ParserState::Pending(apply_header_block(state.into_pending(), block, line_num))
            }
            PlaylistLine::StreamUrl(url) => {
                if matches!(state, ParserState::Idle) {
                    debug!("Stream URL without metadata at line {}", line_num);
                }
                let position = self.channels.len() as i64 + 1;
                let record = close_entry(state.into_pending(), url, self.source_id, position);
                self.channels.push(record);
                ParserState::Idle
            }
            PlaylistLine::Ignored => state,
        };
        self
    }
}

/// Parse playlist text into channel records owned by `source_id`.
///
/// Unknown lines are skipped and malformed header blocks are dropped without
/// discarding the rest of the entry, so this never fails; an empty result is
/// left for the caller to judge.
pub fn parse_playlist(content: &str, source_id: Uuid) -> Vec<ChannelRecord> {
    let initial = ParseAccumulator {
        source_id,
        state: ParserState::Idle,
        channels: Vec::new(),
    };

    let finished = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .fold(initial, ParseAccumulator::step);

    if let ParserState::Pending(entry) = &finished.state {
        debug!(
            "Discarding trailing metadata without stream URL: {:?}",
            entry.name
        );
    }

    info!(
        "Parsed {} channels from playlist for source {}",
        finished.channels.len(),
        source_id
    );
    finished.channels
}

/// Extract attributes and the display name from the text after `#EXTINF:`.
///
/// The display name is everything after the last comma that is not inside a
/// quoted attribute value. A naive last-comma split is only used when the
/// quotes are unbalanced.
fn apply_entry_info(mut entry: PendingEntry, info: &str) -> PendingEntry {
    let split_at = last_unquoted_comma(info).or_else(|| info.rfind(','));
    let (attrs_part, name) = match split_at {
        Some(pos) => (&info[..pos], info[pos + 1..].trim()),
        None => (info, ""),
    };

    let attributes = parse_attributes(attrs_part);
    let attr = |key: &str| -> Option<String> {
        attributes
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    entry.name = (!name.is_empty()).then(|| name.to_string());
    entry.tvg_logo = attr("tvg-logo");
    entry.group_title = attr("group-title").or(entry.group_title);
    entry.tvg_id = attr("tvg-id");
    entry.tvg_name = attr("tvg-name");
    entry.channel_number = attr("tvg-chno").and_then(|n| n.parse::<i64>().ok());
    entry
}

fn apply_drm_property(mut entry: PendingEntry, key: &str, value: &str) -> PendingEntry {
    match key.to_ascii_lowercase().as_str() {
        "inputstream.adaptive.license_type" => {
            entry.license_type = Some(normalize_drm_scheme(value));
        }
        "inputstream.adaptive.license_key" => {
            entry.license_key = Some(value.to_string());
        }
        _ => {}
    }
    entry
}

fn apply_transport_option(mut entry: PendingEntry, key: &str, value: &str) -> PendingEntry {
    match key.to_ascii_lowercase().as_str() {
        "http-user-agent" => entry.headers.user_agent = Some(value.to_string()),
        "http-referrer" | "http-referer" => entry.headers.referer = Some(value.to_string()),
        _ => {}
    }
    entry
}

fn apply_header_block(mut entry: PendingEntry, block: &str, line_num: usize) -> PendingEntry {
    match serde_json::from_str::<HashMap<String, serde_json::Value>>(block) {
        Ok(map) => {
            let mut parsed = TransportHeaders::default();
            for (name, value) in map {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                parsed.set(&name, value);
            }
            entry.headers.merge(parsed);
        }
        Err(e) => {
            warn!("Ignoring malformed #EXTHTTP block at line {}: {}", line_num, e);
        }
    }
    entry
}

fn close_entry(entry: PendingEntry, url: &str, source_id: Uuid, position: i64) -> ChannelRecord {
    let drm = match (entry.license_type, entry.license_key) {
        (Some(license_type), license_key) => Some(DrmDescriptor {
            license_type,
            license_key,
        }),
        (None, Some(license_key)) => {
            debug!(
                "License key without license type for {}, assuming clearkey",
                UrlUtils::obfuscate_credentials(url)
            );
            Some(DrmDescriptor {
                license_type: "clearkey".to_string(),
                license_key: Some(license_key),
            })
        }
        (None, None) => None,
    };

    ChannelRecord {
        id: Uuid::new_v4(),
        source_id,
        channel_name: entry.name.unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_string()),
        stream_url: url.to_string(),
        tvg_logo: entry.tvg_logo,
        group_title: entry
            .group_title
            .unwrap_or_else(|| DEFAULT_GROUP_TITLE.to_string()),
        tvg_id: entry.tvg_id,
        tvg_name: entry.tvg_name,
        enabled: true,
        drm,
        headers: entry.headers,
        stream_kind: StreamKind::from_url(url),
        status: Default::default(),
        last_checked_at: None,
        response_time_ms: None,
        sort_order: entry.channel_number.unwrap_or(position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_line() {
        assert_eq!(
            classify_line("#EXTINF:-1,Name"),
            PlaylistLine::EntryInfo("-1,Name")
        );
        assert_eq!(
            classify_line("#KODIPROP:inputstream.adaptive.license_key=a:b"),
            PlaylistLine::DrmProperty {
                key: "inputstream.adaptive.license_key",
                value: "a:b"
            }
        );
        assert_eq!(
            classify_line("#EXTVLCOPT:http-user-agent=VLC/3.0"),
            PlaylistLine::TransportOption {
                key: "http-user-agent",
                value: "VLC/3.0"
            }
        );
        assert_eq!(classify_line("#EXTM3U"), PlaylistLine::Ignored);
        assert_eq!(
            classify_line("http://example.com/a.ts"),
            PlaylistLine::StreamUrl("http://example.com/a.ts")
        );
    }

    #[test]
    fn test_entry_info_name_after_last_unquoted_comma() {
        let entry = apply_entry_info(
            PendingEntry::default(),
            r#"-1 tvg-logo="http://img/logo.png?size=1,2,3" group-title="Sports",Sky Sports 1"#,
        );
        assert_eq!(entry.name.as_deref(), Some("Sky Sports 1"));
        assert_eq!(
            entry.tvg_logo.as_deref(),
            Some("http://img/logo.png?size=1,2,3")
        );
        assert_eq!(entry.group_title.as_deref(), Some("Sports"));
    }

    #[test]
    fn test_entry_info_unbalanced_quotes_falls_back_to_last_comma() {
        let entry = apply_entry_info(
            PendingEntry::default(),
            r#"-1 tvg-name="Broken,Fallback Name"#,
        );
        assert_eq!(entry.name.as_deref(), Some("Fallback Name"));
    }

    #[test]
    fn test_malformed_header_block_keeps_other_metadata() {
        let mut entry = PendingEntry::default();
        entry.headers.user_agent = Some("UA".to_string());
        let entry = apply_header_block(entry, "{not json", 3);
        assert_eq!(entry.headers.user_agent.as_deref(), Some("UA"));
    }

    #[test]
    fn test_license_key_without_type_defaults_to_clearkey() {
        let playlist = "#EXTM3U
#EXTINF:-1,Keyed
#KODIPROP:inputstream.adaptive.license_key=aa:bb
http://x/keyed.mpd
#EXTINF:-1,Plain
http://x/plain.m3u8
";
        let channels = parse_playlist(playlist, Uuid::new_v4());
        let drm = channels[0].drm.as_ref().unwrap();
        assert_eq!(drm.license_type, "clearkey");
        assert_eq!(drm.license_key.as_deref(), Some("aa:bb"));
        assert!(channels[1].drm.is_none());
    }
}
