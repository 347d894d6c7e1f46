use async_trait::async_trait;
use channel_catalog::errors::{AppError, NetworkError, NetworkResult};
use channel_catalog::models::{FetchStatus, LivenessStatus, SourceOrigin};
use channel_catalog::services::CatalogService;
use channel_catalog::sources::parse_playlist;
use channel_catalog::streaming::LivenessResult;
use channel_catalog::utils::TextFetcher;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

/// Remote payloads that tests can swap between fetches
#[derive(Default)]
struct SwappableFetcher {
    pages: Mutex<HashMap<String, String>>,
}

impl SwappableFetcher {
    fn serve(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    fn take_down(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl TextFetcher for SwappableFetcher {
    async fn fetch_text(&self, url: &str, _timeout: Duration) -> NetworkResult<String> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| NetworkError::Http {
                url: url.to_string(),
                status: 503,
            })
    }
}

/// Answers the first fetch at once; later fetches wait for `release`
#[derive(Default)]
struct GatedFetcher {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl TextFetcher for GatedFetcher {
    async fn fetch_text(&self, _url: &str, _timeout: Duration) -> NetworkResult<String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(PLAYLIST_V2.to_string())
    }
}

const REMOTE: &str = "http://lists.example/tamil.m3u";

const PLAYLIST_V1: &str = "#EXTM3U
#EXTINF:-1 group-title=\"Tamil\",Sun TV HD
http://a/sun.m3u8
#EXTINF:-1 group-title=\"Tamil\",Zee Tamil
http://a/zee.m3u8
";

const PLAYLIST_V2: &str = "#EXTM3U
#EXTINF:-1 group-title=\"Tamil\",Sun TV
http://a/sun-v2.m3u8
#EXTINF:-1,KTV
http://a/ktv.m3u8
#EXTINF:-1,Vijay TV
http://a/vijay.m3u8
";

const FEED: &str = r#"[
    {"name": "Sun TV", "url": "http://b/sun.mpd", "drmScheme": "clearkey", "drmLicense": "11:22"},
    {"name": "Colors", "url": "http://b/colors.m3u8", "headers": {"Referer": "http://b/", "X-Auth": "k"}}
]"#;

fn setup() -> (Arc<SwappableFetcher>, CatalogService) {
    let fetcher = Arc::new(SwappableFetcher::default());
    let catalog = CatalogService::new(fetcher.clone());
    (fetcher, catalog)
}

#[tokio::test]
async fn test_refresh_replaces_records_in_place() {
    let (fetcher, catalog) = setup();
    fetcher.serve(REMOTE, PLAYLIST_V1);

    let manual = catalog.add_manual_channel("Before", "http://m/before.ts").await.unwrap();
    let remote = catalog.import_remote("Tamil", REMOTE).await.unwrap();
    let feed = catalog
        .import_feed("Feed", SourceOrigin::UploadedText, FEED)
        .await
        .unwrap();
    assert_eq!(remote.channel_count, 2);
    assert_eq!(feed.channel_count, 2);

    fetcher.serve(REMOTE, PLAYLIST_V2);
    let refreshed = catalog.refresh_source(remote.source.id).await.unwrap();
    assert_eq!(refreshed.channel_count, 3);
    assert_eq!(refreshed.source.fetch_status, FetchStatus::Ok);

    let names: Vec<String> = catalog
        .channels()
        .await
        .into_iter()
        .map(|c| c.channel_name)
        .collect();
    assert_eq!(names, vec!["Before", "Sun TV", "KTV", "Vijay TV", "Sun TV", "Colors"]);
    assert_eq!(catalog.channels().await[0].id, manual.id);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_records() {
    let (fetcher, catalog) = setup();
    fetcher.serve(REMOTE, PLAYLIST_V1);
    let remote = catalog.import_remote("Tamil", REMOTE).await.unwrap();
    let before = catalog.channels().await;

    fetcher.take_down(REMOTE);
    let err = catalog.refresh_source(remote.source.id).await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)));

    let source = catalog.source(remote.source.id).await.unwrap();
    assert_eq!(source.fetch_status, FetchStatus::Failed);
    assert!(source.error_detail.unwrap().contains("503"));
    assert_eq!(catalog.channels().await, before);
}

#[tokio::test]
async fn test_delete_source_cascades() {
    let (fetcher, catalog) = setup();
    fetcher.serve(REMOTE, PLAYLIST_V1);
    let remote = catalog.import_remote("Tamil", REMOTE).await.unwrap();
    catalog
        .import_feed("Feed", SourceOrigin::UploadedText, FEED)
        .await
        .unwrap();

    assert_eq!(catalog.delete_source(remote.source.id).await.unwrap(), 2);
    let channels = catalog.channels().await;
    assert_eq!(channels.len(), 2);
    assert!(channels.iter().all(|c| c.source_id != remote.source.id));
    assert_eq!(catalog.sources().await.len(), 1);
}

#[tokio::test]
async fn test_combine_across_sources() {
    let (fetcher, catalog) = setup();
    fetcher.serve(REMOTE, PLAYLIST_V1);
    catalog.import_remote("Tamil", REMOTE).await.unwrap();
    catalog
        .import_feed("Feed", SourceOrigin::UploadedText, FEED)
        .await
        .unwrap();

    let groups = catalog.combine(2).await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key, "sun tv");
    assert_eq!(groups[0].representative_name, "Sun TV");
    assert_eq!(groups[0].members.len(), 2);

    let sun = catalog.filter("Sun TV").await;
    assert_eq!(sun.len(), 2);
}

#[tokio::test]
async fn test_liveness_write_back_and_dead_removal() {
    let (_, catalog) = setup();
    catalog
        .import_feed("Feed", SourceOrigin::UploadedText, FEED)
        .await
        .unwrap();
    let channels = catalog.channels().await;

    let results = vec![
        LivenessResult {
            channel_id: channels[0].id,
            alive: true,
            response_time_ms: 40,
            checked_at: Utc::now(),
        },
        LivenessResult {
            channel_id: channels[1].id,
            alive: false,
            response_time_ms: 5000,
            checked_at: Utc::now(),
        },
        LivenessResult {
            channel_id: Uuid::new_v4(),
            alive: false,
            response_time_ms: 1,
            checked_at: Utc::now(),
        },
    ];
    assert_eq!(catalog.apply_liveness(&results).await, 2);

    let updated = catalog.channels().await;
    assert_eq!(updated[0].status, LivenessStatus::Alive);
    assert_eq!(updated[0].response_time_ms, Some(40));
    assert_eq!(updated[1].status, LivenessStatus::Dead);

    assert_eq!(catalog.remove_dead_channels().await, 1);
    assert_eq!(catalog.channels().await.len(), 1);
}

#[tokio::test]
async fn test_export_reparses_to_same_metadata() {
    let (fetcher, catalog) = setup();
    fetcher.serve(REMOTE, PLAYLIST_V1);
    catalog.import_remote("Tamil", REMOTE).await.unwrap();
    catalog
        .import_feed("Feed", SourceOrigin::UploadedText, FEED)
        .await
        .unwrap();
    let zee = catalog
        .channels()
        .await
        .into_iter()
        .find(|c| c.channel_name == "Zee Tamil")
        .unwrap();
    catalog.set_channel_enabled(zee.id, false).await.unwrap();
    catalog.set_sort_order(zee.id, 99).await.unwrap();

    let exported = catalog.export_m3u().await;
    let reparsed = parse_playlist(&exported, Uuid::new_v4());
    let active = catalog.active_channels().await;
    assert_eq!(reparsed.len(), 3);
    assert_eq!(active.len(), 3);

    for (original, parsed) in active.iter().zip(&reparsed) {
        assert_eq!(parsed.channel_name, original.channel_name);
        assert_eq!(parsed.stream_url, original.stream_url);
        assert_eq!(parsed.group_title, original.group_title);
        assert_eq!(parsed.drm, original.drm);
        assert_eq!(parsed.headers, original.headers);
        assert_eq!(parsed.sort_order, original.sort_order);
    }
}

#[tokio::test]
async fn test_refresh_racing_delete_leaves_no_orphans() {
    let fetcher = Arc::new(GatedFetcher::default());
    let catalog = Arc::new(CatalogService::new(fetcher.clone()));
    let remote = catalog.import_remote("Tamil", REMOTE).await.unwrap();
    let id = remote.source.id;

    let refresh = tokio::spawn({
        let catalog = catalog.clone();
        async move { catalog.refresh_source(id).await }
    });

    fetcher.entered.notified().await;
    assert_eq!(catalog.delete_source(id).await.unwrap(), 3);
    fetcher.release.notify_one();

    let result = refresh.await.unwrap();
    assert!(matches!(result, Err(AppError::NotFound { .. })));
    assert!(catalog.sources().await.is_empty());
    assert!(catalog.channels().await.is_empty());
}
