//! Channel identity: name normalization, pattern matching and cross-source grouping

pub mod grouper;
pub mod normalizer;

pub use grouper::{ChannelGroup, group_channels};
pub use normalizer::{ChannelPattern, channel_matches, channel_tokens, normalize_channel_name};

use crate::models::ChannelRecord;

/// Enabled channels whose name matches `pattern`
pub fn filter_channels<'a>(channels: &'a [ChannelRecord], pattern: &str) -> Vec<&'a ChannelRecord> {
    let pattern = ChannelPattern::new(pattern);
    channels
        .iter()
        .filter(|c| c.enabled && pattern.matches(&c.channel_name))
        .collect()
}
