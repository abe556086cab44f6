use axum::extract::State;
use axum::Json;
use nextup_core::types::WatchEvent;
use nextup_core::workflow::SeriesAdded;
use serde_json::json;

use crate::error::AppError;
use crate::payload::{JellyfinPayload, MediaEvent, SonarrPayload, TautulliPayload};
use crate::state::AppState;

fn ignored(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ignored", "message": message.into() }))
}

/// Title lookup, then plan and apply under the series lock.
async fn process_media_event(app: &AppState, media: MediaEvent) -> Result<serde_json::Value, AppError> {
    let resolver = app.clone();
    let title = media.title.clone();
    let series_id = tokio::task::spawn_blocking(move || {
        resolver.with_lifecycle(|lc| lc.resolve_series_title(&title))
    })
    .await
    .map_err(AppError::join)??;

    let event = WatchEvent::new(series_id, media.season_number, media.episode_number);
    let _guard = app.locks.acquire(series_id).await;

    let worker = app.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        worker.with_lifecycle(|lc| lc.process_watch(&event))
    })
    .await
    .map_err(AppError::join)??;

    tracing::info!(title = %media.title, %event, clean = outcome.report.is_clean(), "processed watch event");
    Ok(json!({
        "status": "success",
        "message": format!("processed {} S{:02}E{:02}", media.title, media.season_number, media.episode_number),
        "result": outcome,
    }))
}

/// POST /webhook — Tautulli / Plex watch notification.
pub async fn tautulli(
    State(app): State<AppState>,
    Json(payload): Json<TautulliPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let media = payload.normalize().ok_or_else(|| {
        AppError::bad_request("webhook carries no usable title, season and episode")
    })?;
    Ok(Json(process_media_event(&app, media).await?))
}

/// POST /jellyfin-webhook — only `PlaybackProgress` inside the configured
/// progress window counts as a watch.
pub async fn jellyfin(
    State(app): State<AppState>,
    Json(payload): Json<JellyfinPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !payload.is_progress() {
        return Ok(ignored("not a playback progress event"));
    }
    let Some(percent) = payload.progress_percent() else {
        return Ok(ignored("no runtime reported"));
    };

    let store = app.store.clone();
    let window = tokio::task::spawn_blocking(move || store.load().map(|d| d.settings.jellyfin_progress))
        .await
        .map_err(AppError::join)??;
    if !window.contains(percent) {
        tracing::debug!(percent, "progress outside watch window");
        return Ok(ignored(format!("progress {percent:.1}% outside watch window")));
    }

    let media = payload
        .normalize()
        .ok_or_else(|| AppError::bad_request("progress event carries no series, season and episode"))?;
    Ok(Json(process_media_event(&app, media).await?))
}

/// POST /sonarr-webhook — `SeriesAdd` opts the series out or gates it to
/// pilots. Every other event type is acknowledged and ignored.
pub async fn sonarr(
    State(app): State<AppState>,
    Json(payload): Json<SonarrPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(series_id) = payload.added_series() else {
        return Ok(ignored("not a series add event"));
    };

    let _series = app.locks.acquire(series_id).await;

    let worker = app.clone();
    let opted_out = tokio::task::spawn_blocking(move || {
        worker.with_lifecycle(|lc| lc.carries_opt_out_tag(series_id))
    })
    .await
    .map_err(AppError::join)??;

    let added = if opted_out {
        // Only the opt-out path writes the rules document.
        let _rules = app.rules_write.lock().await;
        let worker = app.clone();
        tokio::task::spawn_blocking(move || worker.with_lifecycle(|lc| lc.opt_out(series_id)))
            .await
            .map_err(AppError::join)??
    } else {
        let worker = app.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            worker.with_lifecycle(|lc| lc.initialize_series(series_id, false))
        })
        .await
        .map_err(AppError::join)??;
        SeriesAdded::Initialized(outcome)
    };

    Ok(Json(json!({
        "status": "success",
        "message": "processed new series",
        "result": added,
    })))
}
