use axum::http::StatusCode;
use http_body_util::BodyExt;
use nextup_core::config::RulesDocument;
use nextup_core::error::Result;
use nextup_core::repository::EpisodeRepository;
use nextup_core::store::{MemoryRulesStore, RulesStore};
use nextup_core::types::{
    Episode, EpisodeId, FileId, QueueEpisode, QueueId, QueueItem, SeriesId, SeriesSummary, Tag,
};
use nextup_server::{build_router, AppState};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// In-memory library
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Monitor(Vec<EpisodeId>, bool),
    Search(Vec<EpisodeId>),
    Delete(FileId),
    Cancel(QueueId),
}

#[derive(Default)]
struct FakeLibrary {
    series: Vec<SeriesSummary>,
    tags: Vec<Tag>,
    episodes: Vec<Episode>,
    queue: Vec<QueueItem>,
    calls: Mutex<Vec<Call>>,
}

impl FakeLibrary {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl EpisodeRepository for FakeLibrary {
    fn series(&self) -> Result<Vec<SeriesSummary>> {
        Ok(self.series.clone())
    }
    fn tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.clone())
    }
    fn episodes(&self, series_id: SeriesId) -> Result<Vec<Episode>> {
        Ok(self
            .episodes
            .iter()
            .filter(|e| e.series_id == series_id)
            .cloned()
            .collect())
    }
    fn set_monitored(&self, ids: &[EpisodeId], monitored: bool) -> Result<()> {
        self.record(Call::Monitor(ids.to_vec(), monitored));
        Ok(())
    }
    fn trigger_search(&self, ids: &[EpisodeId]) -> Result<()> {
        self.record(Call::Search(ids.to_vec()));
        Ok(())
    }
    fn delete_episode_file(&self, file_id: FileId) -> Result<()> {
        self.record(Call::Delete(file_id));
        Ok(())
    }
    fn queue(&self) -> Result<Vec<QueueItem>> {
        Ok(self.queue.clone())
    }
    fn cancel_queue_item(&self, queue_id: QueueId) -> Result<()> {
        self.record(Call::Cancel(queue_id));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn episode(series_id: SeriesId, season: u32, number: u32) -> Episode {
    let id = series_id * 1000 + (season * 100 + number) as i64;
    Episode {
        id,
        series_id,
        season_number: season,
        episode_number: number,
        monitored: true,
        has_file: true,
        file_id: Some(id + 50_000),
    }
}

/// "Severance" (1) has five episodes in season 1; "Slow Horses" (2) carries
/// the opt-out tag.
fn library() -> FakeLibrary {
    FakeLibrary {
        series: vec![
            SeriesSummary {
                id: 1,
                title: "Severance".into(),
                tags: vec![],
            },
            SeriesSummary {
                id: 2,
                title: "Slow Horses".into(),
                tags: vec![3],
            },
        ],
        tags: vec![Tag {
            id: 3,
            label: "episodes".into(),
        }],
        episodes: (1..=5)
            .map(|e| episode(1, 1, e))
            .chain((1..=3).map(|e| episode(2, 1, e)))
            .collect(),
        queue: vec![QueueItem {
            id: 77,
            series_id: Some(1),
            episode: Some(QueueEpisode {
                season_number: 1,
                episode_number: 4,
            }),
        }],
        ..Default::default()
    }
}

struct Harness {
    dir: TempDir,
    store: Arc<MemoryRulesStore>,
    repo: Arc<FakeLibrary>,
}

impl Harness {
    fn new() -> Self {
        Self::with_document(RulesDocument::builtin())
    }

    fn with_document(doc: RulesDocument) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            store: Arc::new(MemoryRulesStore::new(doc)),
            repo: Arc::new(library()),
        }
    }

    fn state(&self) -> AppState {
        AppState::with_store(
            self.dir.path().to_path_buf(),
            self.store.clone(),
            self.repo.clone(),
        )
    }

    fn app(&self) -> axum::Router {
        build_router(self.state())
    }
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tautulli_webhook_applies_default_rule() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/webhook",
        json!({ "server_title": "Severance", "server_season_num": "1", "server_ep_num": "2" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["result"]["rule"], "1n1");
    assert_eq!(
        h.repo.calls(),
        vec![
            Call::Monitor(vec![1102], false),
            Call::Monitor(vec![1103], true),
            Call::Search(vec![1103]),
            Call::Delete(1101 + 50_000),
        ]
    );
}

#[tokio::test]
async fn tautulli_webhook_uses_plex_fields() {
    let h = Harness::new();
    let (status, _) = post_json(
        h.app(),
        "/webhook",
        json!({ "plex_title": "severance", "plex_season_num": 1, "plex_ep_num": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.repo.calls().contains(&Call::Monitor(vec![1105], false)));
}

#[tokio::test]
async fn tautulli_webhook_without_fields_is_bad_request() {
    let h = Harness::new();
    let (status, body) = post_json(h.app(), "/webhook", json!({ "server_title": "Severance" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(h.repo.calls().is_empty());
}

#[tokio::test]
async fn unknown_series_is_404_and_logged_as_missing() {
    let h = Harness::new();
    let (status, _) = post_json(
        h.app(),
        "/webhook",
        json!({ "server_title": "Andor", "server_season_num": 1, "server_ep_num": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(h.app(), "/api/missing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert!(body["entries"][0]
        .as_str()
        .unwrap()
        .contains("series not found: Andor"));
}

#[tokio::test]
async fn unknown_episode_is_404() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/webhook",
        json!({ "server_title": "Severance", "server_season_num": 2, "server_ep_num": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("S02E01"));
}

#[tokio::test]
async fn jellyfin_progress_inside_window_is_processed() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/jellyfin-webhook",
        json!({
            "NotificationType": "PlaybackProgress",
            "SeriesName": "Severance",
            "SeasonNumber": 1,
            "EpisodeNumber": 3,
            "PlaybackPositionTicks": 500,
            "RunTimeTicks": 1000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert!(h.repo.calls().contains(&Call::Monitor(vec![1104], true)));
}

#[tokio::test]
async fn jellyfin_progress_outside_window_is_ignored() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/jellyfin-webhook",
        json!({
            "NotificationType": "PlaybackProgress",
            "SeriesName": "Severance",
            "SeasonNumber": 1,
            "EpisodeNumber": 3,
            "PlaybackPositionTicks": 900,
            "RunTimeTicks": 1000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert!(h.repo.calls().is_empty());
}

#[tokio::test]
async fn jellyfin_other_notifications_are_ignored() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/jellyfin-webhook",
        json!({ "NotificationType": "PlaybackStart", "SeriesName": "Severance" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn sonarr_series_add_gates_to_pilot_and_cancels_queue() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/sonarr-webhook",
        json!({ "eventType": "SeriesAdd", "series": { "id": 1, "title": "Severance" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["result"]["outcome"], "initialized");
    assert_eq!(
        h.repo.calls(),
        vec![
            Call::Monitor(vec![1101], true),
            Call::Monitor(vec![1102, 1103, 1104, 1105], false),
            Call::Cancel(77),
        ]
    );
}

#[tokio::test]
async fn sonarr_series_add_with_tag_opts_out() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/sonarr-webhook",
        json!({ "eventType": "SeriesAdd", "series": { "id": 2 } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["outcome"], "opted_out");
    assert_eq!(body["result"]["rule"], "none");
    assert!(h.repo.calls().is_empty());
    assert_eq!(h.store.load().unwrap().rules_for_series(2), vec!["none"]);
}

#[tokio::test]
async fn series_add_initialization_does_not_wait_for_rules_writers() {
    let h = Harness::new();
    let state = h.state();
    let _writer = state.rules_write.clone().lock_owned().await;

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        post_json(
            build_router(state),
            "/sonarr-webhook",
            json!({ "eventType": "SeriesAdd", "series": { "id": 1 } }),
        ),
    )
    .await
    .expect("series add blocked on the rules write lock");
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["result"]["outcome"], "initialized");
}

#[tokio::test]
async fn sonarr_other_events_are_ignored() {
    let h = Harness::new();
    let (status, body) = post_json(
        h.app(),
        "/sonarr-webhook",
        json!({ "eventType": "Test" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
}

#[tokio::test]
async fn missing_default_rule_is_422() {
    let mut doc = RulesDocument::builtin();
    doc.default_rule = "ghost".into();
    let h = Harness::with_document(doc);
    let (status, _) = post_json(
        h.app(),
        "/webhook",
        json!({ "server_title": "Severance", "server_season_num": 1, "server_ep_num": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(h.repo.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Rules API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rules_lifecycle_over_http() {
    let h = Harness::new();

    let (status, body) = send(
        h.app(),
        "PUT",
        "/api/rules/binge",
        Some(json!({ "get_option": "all", "action_option": "monitor", "keep_watched": "season" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["rule"]["get_option"], "all");

    let (status, body) = post_json(h.app(), "/api/rules/binge/assign", json!({ "series_ids": [1, 4] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["series"], json!([1, 4]));

    let (status, body) = post_json(h.app(), "/api/rules/binge/unassign", json!({ "series_ids": [4] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["series"], json!([1]));

    let (_, body) = get(h.app(), "/api/rules").await;
    assert_eq!(body["default_rule"], "1n1");
    assert_eq!(body["rules"]["binge"]["series"], json!([1]));

    // Watch events now follow the assigned rule.
    let (status, body) = post_json(
        h.app(),
        "/webhook",
        json!({ "server_title": "Severance", "server_season_num": 1, "server_ep_num": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["rule"], "binge");
    assert_eq!(body["result"]["actions"]["monitor"], json!([1104, 1105]));
    assert_eq!(body["result"]["actions"]["search"], json!([]));

    let (status, _) = send(h.app(), "DELETE", "/api/rules/binge", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.store.load().unwrap().rule("binge").is_err());
}

#[tokio::test]
async fn put_rule_keeps_existing_assignments() {
    let mut doc = RulesDocument::builtin();
    doc.assign("1n1", &[9]).unwrap();
    let h = Harness::with_document(doc);
    let (status, body) = send(
        h.app(),
        "PUT",
        "/api/rules/1n1",
        Some(json!({ "get_option": 2, "action_option": "search", "keep_watched": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rule"]["get_option"], 2);
    assert_eq!(body["rule"]["series"], json!([9]));
}

#[tokio::test]
async fn rule_api_errors() {
    let h = Harness::new();

    let (status, _) = send(h.app(), "DELETE", "/api/rules/1n1", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post_json(h.app(), "/api/rules/ghost/assign", json!({ "series_ids": [1] })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        h.app(),
        "PUT",
        "/api/rules/bad%20name",
        Some(json!({ "get_option": 1, "action_option": "search", "keep_watched": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        h.app(),
        "PUT",
        "/api/rules/odd",
        Some(json!({ "get_option": "lots", "action_option": "search", "keep_watched": 1 })),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let (status, body) = get(h.app(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_log_starts_empty() {
    let h = Harness::new();
    let (status, body) = get(h.app(), "/api/missing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}
