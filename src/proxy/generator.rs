use serde_json::{Map, Value};
use tracing::debug;

use crate::models::ChannelRecord;

fn quoted(value: &str) -> String {
    value.replace('"', "'")
}

/// The name follows the last unquoted comma on the entry line, so a comma
/// inside it is swapped for the full-width lookalike
fn display_name(name: &str) -> String {
    name.replace(',', "\u{FF0C}")
}

fn push_attribute(extinf: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        extinf.push_str(&format!(" {}=\"{}\"", key, quoted(value)));
    }
}

/// Render channels as an extended M3U playlist that the playlist parser reads
/// back with metadata, DRM properties and transport headers intact. Double
/// quotes in attribute values become single quotes and commas in display
/// names become `U+FF0C`, since neither can be escaped in M3U.
pub fn generate_m3u(channels: &[ChannelRecord]) -> String {
    let mut m3u = String::from("#EXTM3U\n");

    for channel in channels {
        let mut extinf = String::from("#EXTINF:-1");
        push_attribute(&mut extinf, "tvg-id", channel.tvg_id.as_deref());
        push_attribute(&mut extinf, "tvg-name", channel.tvg_name.as_deref());
        push_attribute(&mut extinf, "tvg-logo", channel.tvg_logo.as_deref());
        push_attribute(&mut extinf, "group-title", Some(&channel.group_title));
        extinf.push_str(&format!(" tvg-chno=\"{}\"", channel.sort_order));
        extinf.push_str(&format!(",{}\n", display_name(&channel.channel_name)));
        m3u.push_str(&extinf);

        if let Some(drm) = &channel.drm {
            m3u.push_str(&format!(
                "#KODIPROP:inputstream.adaptive.license_type={}\n",
                drm.license_type
            ));
            if let Some(key) = &drm.license_key {
                m3u.push_str(&format!("#KODIPROP:inputstream.adaptive.license_key={}\n", key));
            }
        }

        let headers = &channel.headers;
        if let Some(ua) = &headers.user_agent {
            m3u.push_str(&format!("#EXTVLCOPT:http-user-agent={}\n", ua));
        }
        if let Some(referer) = &headers.referer {
            m3u.push_str(&format!("#EXTVLCOPT:http-referrer={}\n", referer));
        }

        let mut block = Map::new();
        if let Some(cookie) = &headers.cookie {
            block.insert("cookie".to_string(), Value::String(cookie.clone()));
        }
        for (name, value) in &headers.custom {
            block.insert(name.clone(), Value::String(value.clone()));
        }
        if !block.is_empty() {
            m3u.push_str(&format!("#EXTHTTP:{}\n", Value::Object(block)));
        }

        m3u.push_str(&channel.stream_url);
        m3u.push('\n');
    }

    debug!("Generated playlist with {} channels", channels.len());
    m3u
}
