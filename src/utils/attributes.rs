//! Quote-aware scanning for `key="value"` attribute lists
//!
//! Both the playlist dialect (`#EXTINF` lines) and the manifest dialect
//! (`#EXT-X-STREAM-INF` lines) carry attribute lists whose quoted values may
//! contain commas, so none of the splitting here may use a plain `split(',')`.

use std::collections::HashMap;

/// Byte offset of the last `,` that is not inside a double-quoted value.
/// Returns `None` if there is no such comma or the quotes are unbalanced.
pub fn last_unquoted_comma(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut last = None;
    for (idx, ch) in s.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => last = Some(idx),
            _ => {}
        }
    }
    if in_quotes { None } else { last }
}

/// Split on `sep` wherever it occurs outside double quotes
pub fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, ch) in s.char_indices() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == sep && !in_quotes {
            parts.push(&s[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Parse whitespace-separated `key="value"` / `key=value` pairs.
/// Keys are returned as written; values have their quotes removed.
pub fn parse_attributes(attrs_part: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();

    let mut chars = attrs_part.chars().peekable();
    let mut current_key = String::new();
    let mut current_value = String::new();
    let mut in_quotes = false;
    let mut in_value = false;

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' if !in_quotes => {
                if in_value && !current_key.is_empty() && !current_value.is_empty() {
                    attributes.insert(current_key.trim().to_string(), current_value.clone());
                }
                current_key.clear();
                current_value.clear();
                in_value = false;
            }
            '=' if !in_quotes && !in_value => {
                in_value = true;
                if chars.peek() == Some(&'"') {
                    chars.next();
                    in_quotes = true;
                }
            }
            '"' if in_quotes => {
                in_quotes = false;
                if !current_key.is_empty() {
                    attributes.insert(current_key.trim().to_string(), current_value.clone());
                }
                current_key.clear();
                current_value.clear();
                in_value = false;
            }
            _ => {
                if in_value {
                    current_value.push(ch);
                } else {
                    current_key.push(ch);
                }
            }
        }
    }

    if in_value && !current_key.is_empty() && !current_value.is_empty() {
        attributes.insert(current_key.trim().to_string(), current_value);
    }

    attributes
}
