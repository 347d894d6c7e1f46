use channel_catalog::errors::AppError;
use channel_catalog::models::{LivenessStatus, StreamKind};
use channel_catalog::sources::{SourceFormat, parse_feed_text, parse_playlist, parse_source};
use uuid::Uuid;

const PLAYLIST: &str = r#"#EXTM3U x-tvg-url="http://guide/epg.xml"
#EXTINF:-1 tvg-id="sky1" tvg-logo="http://img/sky.png?w=100,h=100" group-title="Sports, UK",Sky Sports 1
#EXTVLCOPT:http-user-agent=VLC/3.0.18
#EXTVLCOPT:http-referrer=http://portal.example/
http://cdn.example/sky1/index.m3u8

#KODIPROP:inputstream.adaptive.license_type=org.w3.clearkey
#KODIPROP:inputstream.adaptive.license_key=abcd:ef01
#EXTINF:-1 tvg-chno="42",Movies HD
#EXTHTTP:{"cookie":"sid=1","X-Token":"t"}
http://cdn.example/movies/manifest.mpd
# a stray comment
#EXTGRP:Music
#EXTINF:-1,Radio
http://cdn.example/radio.mp3
"#;

#[test]
fn test_playlist_name_after_last_unquoted_comma() {
    let channels = parse_playlist(PLAYLIST, Uuid::new_v4());
    assert_eq!(channels.len(), 3);

    let sky = &channels[0];
    assert_eq!(sky.channel_name, "Sky Sports 1");
    assert_eq!(sky.group_title, "Sports, UK");
    assert_eq!(sky.tvg_logo.as_deref(), Some("http://img/sky.png?w=100,h=100"));
    assert_eq!(sky.tvg_id.as_deref(), Some("sky1"));
    assert_eq!(sky.headers.user_agent.as_deref(), Some("VLC/3.0.18"));
    assert_eq!(sky.headers.referer.as_deref(), Some("http://portal.example/"));
    assert_eq!(sky.stream_kind, StreamKind::Hls);
    assert_eq!(sky.sort_order, 1);
    assert_eq!(sky.status, LivenessStatus::Unknown);
}

#[test]
fn test_playlist_drm_and_header_lines_before_extinf() {
    let channels = parse_playlist(PLAYLIST, Uuid::new_v4());
    let movies = &channels[1];
    assert_eq!(movies.channel_name, "Movies HD");
    let drm = movies.drm.as_ref().unwrap();
    assert_eq!(drm.license_type, "clearkey");
    assert_eq!(drm.license_key.as_deref(), Some("abcd:ef01"));
    assert_eq!(movies.headers.cookie.as_deref(), Some("sid=1"));
    assert_eq!(movies.headers.custom.get("X-Token").map(String::as_str), Some("t"));
    assert_eq!(movies.stream_kind, StreamKind::Dash);
    assert_eq!(movies.sort_order, 42);

    let radio = &channels[2];
    assert_eq!(radio.group_title, "Music");
    assert_eq!(radio.stream_kind, StreamKind::Direct);
    assert!(radio.drm.is_none());
    assert!(radio.headers.is_empty());
}

#[test]
fn test_playlist_bare_urls_get_defaults() {
    let source = Uuid::new_v4();
    let channels = parse_playlist("http://a/1.ts\nrtmp://b/live\nnot a url\n", source);
    assert_eq!(channels.len(), 2);
    assert!(channels.iter().all(|c| c.source_id == source));
    assert_eq!(channels[0].channel_name, "Unnamed Channel");
    assert_eq!(channels[0].group_title, "Uncategorized");
    assert_ne!(channels[0].id, channels[1].id);
}

#[test]
fn test_feed_drops_entries_without_url() {
    let feed = r#"{
        "data": {
            "channels": [
                {"name": "No Link", "logo": "http://img/x.png"},
                {"title": "Zee Tamil", "link": "http://z/zee.m3u8", "category": "Tamil"},
                {"channel": "Sun TV", "streamUrl": "http://s/sun.mpd",
                 "drm": {"scheme": "widevine", "license": "http://lic/wv"},
                 "userAgent": "UA/1", "headers": {"Referer": "http://r/"}}
            ]
        }
    }"#;
    let channels = parse_feed_text(feed, Uuid::new_v4()).unwrap();
    assert_eq!(channels.len(), 2);

    assert_eq!(channels[0].channel_name, "Zee Tamil");
    assert_eq!(channels[0].group_title, "Tamil");
    assert_eq!(channels[0].sort_order, 1);

    let sun = &channels[1];
    assert_eq!(sun.channel_name, "Sun TV");
    assert_eq!(sun.stream_kind, StreamKind::Dash);
    let drm = sun.drm.as_ref().unwrap();
    assert_eq!(drm.license_type, "com.widevine.alpha");
    assert_eq!(drm.license_key.as_deref(), Some("http://lic/wv"));
    assert_eq!(sun.headers.user_agent.as_deref(), Some("UA/1"));
    assert_eq!(sun.headers.referer.as_deref(), Some("http://r/"));
    assert_eq!(sun.sort_order, 2);
}

#[test]
fn test_feed_without_any_url_is_a_validation_error() {
    let err = parse_feed_text(r#"[{"name": "A"}, {"name": "B"}]"#, Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = parse_feed_text("42", Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[test]
fn test_parse_source_sniffed_format() {
    let feed = r#"[{"name": "A", "url": "http://a/a.m3u8"}]"#;
    assert_eq!(SourceFormat::detect(feed), SourceFormat::Feed);
    assert_eq!(SourceFormat::detect(PLAYLIST), SourceFormat::Playlist);
    let channels = parse_source(feed, SourceFormat::detect(feed), Uuid::new_v4()).unwrap();
    assert_eq!(channels[0].channel_name, "A");
}
