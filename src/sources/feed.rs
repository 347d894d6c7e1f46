//! Structured (JSON) feed parser
//!
//! Feeds come in many shapes: a bare array of entries, or an object wrapping
//! the list under `channels`, `streams`, `items` or `data` (which may itself
//! wrap one of the others). Entries are flattened first, then every entry is
//! mapped field by field through the synonym tables in
//! [`feed_fields`](super::feed_fields).

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::feed_fields::*;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ChannelRecord, DEFAULT_CHANNEL_NAME, DEFAULT_GROUP_TITLE, DrmDescriptor, StreamKind,
    TransportHeaders, normalize_drm_scheme,
};

/// Values nested deeper than this below the payload root are ignored
const MAX_NESTING_DEPTH: usize = 4;

/// Parse feed text, failing only if it is not JSON or yields no playable entry
pub fn parse_feed_text(content: &str, source_id: Uuid) -> AppResult<Vec<ChannelRecord>> {
    let payload: Value = serde_json::from_str(content.trim())
        .map_err(|e| AppError::validation(format!("Feed is not valid JSON: {e}")))?;
    parse_feed(&payload, source_id)
}

/// Parse an already-decoded feed payload into channel records
pub fn parse_feed(payload: &Value, source_id: Uuid) -> AppResult<Vec<ChannelRecord>> {
    if !payload.is_array() && !payload.is_object() {
        return Err(AppError::validation(
            "Feed payload must be a JSON array or object",
        ));
    }

    let mut entries = Vec::new();
    flatten_entries(payload, 0, &mut entries);

    let channels: Vec<ChannelRecord> = entries
        .iter()
        .filter_map(|entry| entry_to_record(entry, source_id))
        .enumerate()
        .map(|(idx, mut record)| {
            record.sort_order = idx as i64 + 1;
            record
        })
        .collect();

    let dropped = entries.len() - channels.len();
    if dropped > 0 {
        debug!("Dropped {} feed entries without a stream URL", dropped);
    }

    if channels.is_empty() {
        return Err(AppError::validation(format!(
            "Feed contained {} entries but none had a resolvable stream URL",
            entries.len()
        )));
    }

    info!(
        "Parsed {} channels from feed for source {}",
        channels.len(),
        source_id
    );
    Ok(channels)
}

/// Collect candidate entry objects from arrays and known wrapper keys
fn flatten_entries<'a>(
    value: &'a Value,
    depth: usize,
    out: &mut Vec<&'a Map<String, Value>>,
) {
    if depth > MAX_NESTING_DEPTH {
        warn!(
            "Feed nesting exceeds {} levels, ignoring deeper entries",
            MAX_NESTING_DEPTH
        );
        return;
    }

    match value {
        Value::Array(items) => {
            for item in items {
                flatten_entries(item, depth + 1, out);
            }
        }
        Value::Object(map) => {
            let nested = NESTING_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|v| v.is_array() || v.is_object());
            match nested {
                Some(inner) => flatten_entries(inner, depth + 1, out),
                None => out.push(map),
            }
        }
        _ => {}
    }
}

fn entry_to_record(entry: &Map<String, Value>, source_id: Uuid) -> Option<ChannelRecord> {
    let stream_url = URL_FIELD.resolve(entry)?;

    Some(ChannelRecord {
        id: Uuid::new_v4(),
        source_id,
        channel_name: NAME_FIELD
            .resolve(entry)
            .unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_string()),
        stream_kind: StreamKind::from_url(&stream_url),
        stream_url,
        tvg_logo: LOGO_FIELD.resolve(entry),
        group_title: resolve_group(entry).unwrap_or_else(|| DEFAULT_GROUP_TITLE.to_string()),
        tvg_id: GUIDE_ID_FIELD.resolve(entry),
        tvg_name: GUIDE_NAME_FIELD.resolve(entry),
        enabled: true,
        drm: extract_drm(entry),
        headers: extract_headers(entry),
        status: Default::default(),
        last_checked_at: None,
        response_time_ms: None,
        sort_order: 0,
    })
}

/// DRM in one of three shapes, tried in order:
/// a scheme + license pair (flat or under `drm`), direct license-type/key
/// fields, or a shorthand field whose name implies the scheme
fn extract_drm(entry: &Map<String, Value>) -> Option<DrmDescriptor> {
    let nested = entry.get("drm");
    let nested_object = nested.and_then(Value::as_object);

    let pair_scheme = DRM_SCHEME_FIELD
        .resolve(entry)
        .or_else(|| nested_object.and_then(|drm| NESTED_DRM_SCHEME_FIELD.resolve(drm)))
        .or_else(|| nested.and_then(scalar_text));
    if let Some(scheme) = pair_scheme {
        let license = DRM_LICENSE_FIELD
            .resolve(entry)
            .or_else(|| nested_object.and_then(|drm| NESTED_DRM_LICENSE_FIELD.resolve(drm)));
        return Some(DrmDescriptor {
            license_type: normalize_drm_scheme(&scheme),
            license_key: license,
        });
    }

    if let Some(license_type) = LICENSE_TYPE_FIELD.resolve(entry) {
        return Some(DrmDescriptor {
            license_type: normalize_drm_scheme(&license_type),
            license_key: LICENSE_KEY_FIELD.resolve(entry),
        });
    }

    DRM_SHORTHANDS.iter().find_map(|(key, scheme)| {
        entry
            .get(*key)
            .and_then(scalar_text)
            .map(|license| DrmDescriptor {
                license_type: normalize_drm_scheme(scheme),
                license_key: Some(license),
            })
    })
}

/// Dedicated cookie/user-agent/referer fields, with any header map merged over
fn extract_headers(entry: &Map<String, Value>) -> TransportHeaders {
    let mut headers = TransportHeaders {
        user_agent: USER_AGENT_FIELD.resolve(entry),
        referer: REFERER_FIELD.resolve(entry),
        cookie: COOKIE_FIELD.resolve(entry),
        ..Default::default()
    };

    if let Some(map) = HEADER_MAP_FIELD.resolve_object(entry) {
        let mut from_map = TransportHeaders::default();
        for (name, value) in map {
            if let Some(value) = scalar_text(value) {
                from_map.set(name, value);
            }
        }
        headers.merge(from_map);
    }

    headers
}
