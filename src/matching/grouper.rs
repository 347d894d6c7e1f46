//! Cross-source channel grouping ("combine")
//!
//! Channels are bucketed by their normalized name; only buckets fed by enough
//! distinct sources survive. The result is transient and never stored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use super::normalizer::normalize_channel_name;
use crate::models::ChannelRecord;

/// Channels from several sources that normalize to the same key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub key: String,
    /// Shortest member name observed (first one wins on ties)
    pub representative_name: String,
    pub members: Vec<ChannelRecord>,
    pub source_count: usize,
}

/// Group enabled channels by normalized name, keeping groups that span at
/// least `min_sources` distinct sources. Output is ordered by key.
pub fn group_channels(channels: &[ChannelRecord], min_sources: usize) -> Vec<ChannelGroup> {
    let mut buckets: BTreeMap<String, Vec<&ChannelRecord>> = BTreeMap::new();

    for channel in channels.iter().filter(|c| c.enabled) {
        let key = normalize_channel_name(&channel.channel_name);
        if key.is_empty() {
            continue;
        }
        buckets.entry(key).or_default().push(channel);
    }

    let groups: Vec<ChannelGroup> = buckets
        .into_iter()
        .filter_map(|(key, members)| {
            let source_count = members
                .iter()
                .map(|m| m.source_id)
                .collect::<HashSet<Uuid>>()
                .len();
            if source_count < min_sources {
                return None;
            }

            let representative_name = members
                .iter()
                .map(|m| m.channel_name.as_str())
                .fold(None::<&str>, |shortest, name| match shortest {
                    Some(current) if current.chars().count() <= name.chars().count() => {
                        Some(current)
                    }
                    _ => Some(name),
                })
                .unwrap_or_default()
                .to_string();

            Some(ChannelGroup {
                key,
                representative_name,
                members: members.into_iter().cloned().collect(),
                source_count,
            })
        })
        .collect();

    debug!(
        "Grouped {} channels into {} groups (min_sources={})",
        channels.len(),
        groups.len(),
        min_sources
    );
    groups
}
