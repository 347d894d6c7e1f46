//! Channel name normalization and token matching
//!
//! Names are reduced to their identifying tokens: annotations in brackets,
//! punctuation and quality/delivery/region qualifiers are discarded. Matching
//! then works on whole tokens, so "Zee Tamil" never matches "Zee Marathi" even
//! though the two share a brand word.

use regex::Regex;
use std::sync::LazyLock;

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").expect("valid bracket regex")
});

static QUALITY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3,4}[pi]|\d+fps)$").expect("valid quality regex"));

/// Qualifier tokens that never identify a channel
const STOP_TOKENS: &[&str] = &[
    // quality
    "hd", "sd", "fhd", "uhd", "4k", "8k", "hevc", "h264", "h265", "hq", "lq",
    // delivery
    "vip", "premium", "backup", "alt",
    // region
    "us", "usa", "uk", "ca", "au", "nz", "ie", "in", "de", "fr", "es", "it", "nl", "pt", "br",
    "mx", "pk", "bd", "lk", "ae", "sa",
    // filler
    "live", "official", "stream", "feed", "raw",
];

/// Minimum length of the concatenated pattern for spacing-insensitive matching
const MIN_CONCAT_LEN: usize = 3;

fn is_stop_token(token: &str) -> bool {
    STOP_TOKENS.contains(&token) || QUALITY_TAG.is_match(token)
}

/// Identifying tokens of a channel name, in order
pub fn channel_tokens(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    let stripped = BRACKETED.replace_all(&lower, " ");
    stripped
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !is_stop_token(token))
        .map(str::to_string)
        .collect()
}

/// Canonical form of a channel name: identifying tokens joined by single spaces.
/// Idempotent.
pub fn normalize_channel_name(name: &str) -> String {
    channel_tokens(name).join(" ")
}

/// A pattern tokenized once and matched against many candidates
#[derive(Debug, Clone)]
pub struct ChannelPattern {
    tokens: Vec<String>,
    concatenated: Option<String>,
}

impl ChannelPattern {
    pub fn new(pattern: &str) -> Self {
        let tokens = channel_tokens(pattern);
        let concatenated = (tokens.len() <= 2)
            .then(|| tokens.concat())
            .filter(|joined| joined.chars().count() >= MIN_CONCAT_LEN);
        Self {
            tokens,
            concatenated,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Every pattern token must appear as a whole candidate token. Short
    /// patterns additionally accept a candidate whose tokens, run together,
    /// start with the pattern's tokens run together ("SunTV" for "Sun TV").
    pub fn matches(&self, candidate: &str) -> bool {
        if self.tokens.is_empty() {
            return false;
        }
        let candidate_tokens = channel_tokens(candidate);

        if self
            .tokens
            .iter()
            .all(|token| candidate_tokens.contains(token))
        {
            return true;
        }

        match &self.concatenated {
            Some(pattern_joined) => candidate_tokens.concat().starts_with(pattern_joined.as_str()),
            None => false,
        }
    }
}

/// Whether `candidate` denotes the same channel as the short `pattern`
pub fn channel_matches(candidate: &str, pattern: &str) -> bool {
    ChannelPattern::new(pattern).matches(candidate)
}
