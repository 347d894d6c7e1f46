//! Synonym tables for structured feed entries
//!
//! Each logical field is resolved by trying an ordered list of keys and taking
//! the first one holding a usable scalar. Keeping the tables as data means the
//! lookup order can be tested on its own and extended without touching the
//! parser.

use serde_json::{Map, Value};

/// Ordered key list for one logical field
#[derive(Debug, Clone, Copy)]
pub struct FieldSynonyms {
    pub field: &'static str,
    pub keys: &'static [&'static str],
}

pub const URL_FIELD: FieldSynonyms = FieldSynonyms {
    field: "url",
    keys: &["link", "url", "stream", "src", "streamUrl", "playbackUrl"],
};

pub const NAME_FIELD: FieldSynonyms = FieldSynonyms {
    field: "name",
    keys: &["name", "title", "channel", "label", "tvg-name"],
};

pub const LOGO_FIELD: FieldSynonyms = FieldSynonyms {
    field: "logo",
    keys: &["logo", "icon", "image", "thumbnail", "poster", "tvg-logo"],
};

pub const GROUP_FIELD: FieldSynonyms = FieldSynonyms {
    field: "group",
    keys: &["group", "category", "genre", "group-title"],
};

pub const GUIDE_ID_FIELD: FieldSynonyms = FieldSynonyms {
    field: "guide_id",
    keys: &["tvg-id", "tvgId", "epgId", "epg_id"],
};

pub const GUIDE_NAME_FIELD: FieldSynonyms = FieldSynonyms {
    field: "guide_name",
    keys: &["tvg-name", "tvgName"],
};

pub const DRM_SCHEME_FIELD: FieldSynonyms = FieldSynonyms {
    field: "drm_scheme",
    keys: &["drmScheme", "drm_scheme"],
};

pub const DRM_LICENSE_FIELD: FieldSynonyms = FieldSynonyms {
    field: "drm_license",
    keys: &["drmLicense", "drm_license"],
};

pub const NESTED_DRM_SCHEME_FIELD: FieldSynonyms = FieldSynonyms {
    field: "drm.scheme",
    keys: &["scheme", "type"],
};

pub const NESTED_DRM_LICENSE_FIELD: FieldSynonyms = FieldSynonyms {
    field: "drm.license",
    keys: &["license", "key"],
};

pub const LICENSE_TYPE_FIELD: FieldSynonyms = FieldSynonyms {
    field: "license_type",
    keys: &["license_type", "licenseType"],
};

pub const LICENSE_KEY_FIELD: FieldSynonyms = FieldSynonyms {
    field: "license_key",
    keys: &["license_key", "licenseKey"],
};

/// Single-purpose shorthand fields: key name implies the scheme
pub const DRM_SHORTHANDS: &[(&str, &str)] = &[
    ("clearkey", "clearkey"),
    ("widevine", "widevine"),
    ("playready", "playready"),
];

pub const COOKIE_FIELD: FieldSynonyms = FieldSynonyms {
    field: "cookie",
    keys: &["cookie", "Cookie"],
};

pub const HEADER_MAP_FIELD: FieldSynonyms = FieldSynonyms {
    field: "headers",
    keys: &["headers", "httpHeaders"],
};

pub const USER_AGENT_FIELD: FieldSynonyms = FieldSynonyms {
    field: "user_agent",
    keys: &["User-Agent", "user-agent", "userAgent", "user_agent"],
};

pub const REFERER_FIELD: FieldSynonyms = FieldSynonyms {
    field: "referer",
    keys: &["Referer", "referer", "Referrer", "referrer"],
};

/// Wrapper keys a feed may nest its entry list under, in probe order
pub const NESTING_KEYS: &[&str] = &["channels", "streams", "items", "data"];

/// Group values that actually describe the stream format, not a category
pub const STREAM_KIND_TOKENS: &[&str] = &[
    "hls", "dash", "mpd", "m3u8", "m3u", "direct", "mp4", "ts",
];

/// Render a scalar as text; arrays, objects, null and blank strings yield `None`
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl FieldSynonyms {
    /// First usable scalar across the synonym keys
    pub fn resolve(&self, entry: &Map<String, Value>) -> Option<String> {
        self.resolve_where(entry, |_| true)
    }

    /// First usable scalar across the synonym keys that also passes `accept`
    pub fn resolve_where<F>(&self, entry: &Map<String, Value>, accept: F) -> Option<String>
    where
        F: Fn(&str) -> bool,
    {
        self.keys
            .iter()
            .filter_map(|key| entry.get(*key))
            .filter_map(scalar_text)
            .find(|value| accept(value))
    }

    /// First synonym key holding an object
    pub fn resolve_object<'a>(
        &self,
        entry: &'a Map<String, Value>,
    ) -> Option<&'a Map<String, Value>> {
        self.keys
            .iter()
            .filter_map(|key| entry.get(*key))
            .find_map(Value::as_object)
    }
}

/// Group resolution rejects values colliding with stream-kind tokens
pub fn resolve_group(entry: &Map<String, Value>) -> Option<String> {
    GROUP_FIELD.resolve_where(entry, |value| {
        !STREAM_KIND_TOKENS
            .iter()
            .any(|token| value.eq_ignore_ascii_case(token))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_first_match_wins_in_table_order() {
        let entry = object(json!({"url": "http://b", "link": "http://a", "src": "http://c"}));
        assert_eq!(URL_FIELD.resolve(&entry).as_deref(), Some("http://a"));
    }

    #[test]
    fn test_non_string_values_are_tolerated() {
        let entry = object(json!({
            "name": {"en": "Nested"},
            "title": 42,
            "link": null,
            "url": ["http://x"],
        }));
        assert_eq!(NAME_FIELD.resolve(&entry).as_deref(), Some("42"));
        assert_eq!(URL_FIELD.resolve(&entry), None);
    }

    #[test]
    fn test_blank_values_fall_through() {
        let entry = object(json!({"logo": "   ", "icon": "http://img/icon.png"}));
        assert_eq!(
            LOGO_FIELD.resolve(&entry).as_deref(),
            Some("http://img/icon.png")
        );
    }

    #[test]
    fn test_group_skips_stream_kind_tokens() {
        let entry = object(json!({"group": "HLS", "category": "Movies"}));
        assert_eq!(resolve_group(&entry).as_deref(), Some("Movies"));

        let only_kind = object(json!({"genre": "dash"}));
        assert_eq!(resolve_group(&only_kind), None);
    }
}
