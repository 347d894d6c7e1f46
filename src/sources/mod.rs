//! Source parsers
//!
//! Both dialects produce the same canonical [`ChannelRecord`] list:
//! - [`m3u`] for line-oriented playlists
//! - [`feed`] for structured JSON feeds

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::ChannelRecord;

pub mod feed;
pub mod feed_fields;
pub mod m3u;

pub use feed::{parse_feed, parse_feed_text};
pub use m3u::parse_playlist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Playlist,
    Feed,
}

impl SourceFormat {
    /// Sniff the format from raw text: JSON documents start with `{` or `[`
    pub fn detect(content: &str) -> Self {
        match content.trim_start().chars().next() {
            Some('{') | Some('[') => SourceFormat::Feed,
            _ => SourceFormat::Playlist,
        }
    }
}

/// Parse `content` in the given format; an import must yield at least one channel
pub fn parse_source(
    content: &str,
    format: SourceFormat,
    source_id: Uuid,
) -> AppResult<Vec<ChannelRecord>> {
    match format {
        SourceFormat::Feed => parse_feed_text(content, source_id),
        SourceFormat::Playlist => {
            let channels = parse_playlist(content, source_id);
            if channels.is_empty() {
                return Err(AppError::validation(
                    "Playlist contained no stream URLs",
                ));
            }
            Ok(channels)
        }
    }
}
