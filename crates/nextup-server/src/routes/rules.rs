use axum::extract::{Path, State};
use axum::Json;
use nextup_core::config::{Policy, RulesDocument};
use nextup_core::error::NextupError;
use nextup_core::types::{ActionOption, EpisodeWindow, SeriesId};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RuleBody {
    pub get_option: EpisodeWindow,
    pub action_option: ActionOption,
    pub keep_watched: EpisodeWindow,
    #[serde(default)]
    pub monitor_watched: bool,
}

impl From<RuleBody> for Policy {
    fn from(body: RuleBody) -> Self {
        Policy {
            get_option: body.get_option,
            action_option: body.action_option,
            keep_watched: body.keep_watched,
            monitor_watched: body.monitor_watched,
            series: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SeriesBody {
    pub series_ids: Vec<SeriesId>,
}

/// Apply `edit` to the stored document under the rules write lock.
async fn edit_rules<F>(app: &AppState, mut edit: F) -> Result<RulesDocument, AppError>
where
    F: FnMut(&mut RulesDocument) -> Result<(), NextupError> + Send + 'static,
{
    let _guard = app.rules_write.lock().await;
    let store = app.store.clone();
    let doc = tokio::task::spawn_blocking(move || store.update(&mut edit))
        .await
        .map_err(AppError::join)??;
    Ok(doc)
}

/// GET /api/rules — the whole rules document.
pub async fn list_rules(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let result = tokio::task::spawn_blocking(move || {
        let doc = store.load()?;
        Ok::<_, NextupError>(serde_json::to_value(&doc)?)
    })
    .await
    .map_err(AppError::join)??;

    Ok(Json(result))
}

/// PUT /api/rules/{name} — create or replace a rule's options. Existing
/// assignments are kept.
pub async fn put_rule(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<RuleBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let policy: Policy = body.into();
    let rule_name = name.clone();
    let doc = edit_rules(&app, move |doc| doc.upsert_rule(&rule_name, policy.clone())).await?;
    tracing::info!(rule = %name, "rule saved");
    Ok(Json(serde_json::json!({
        "name": name,
        "rule": doc.rule(&name)?,
    })))
}

/// DELETE /api/rules/{name} — the default rule cannot be deleted.
pub async fn delete_rule(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rule_name = name.clone();
    edit_rules(&app, move |doc| doc.delete_rule(&rule_name).map(|_| ())).await?;
    tracing::info!(rule = %name, "rule deleted");
    Ok(Json(serde_json::json!({ "deleted": name })))
}

/// POST /api/rules/{name}/assign — moves the series here from any other rule.
pub async fn assign_series(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SeriesBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rule_name = name.clone();
    let doc = edit_rules(&app, move |doc| doc.assign(&rule_name, &body.series_ids)).await?;
    Ok(Json(serde_json::json!({
        "name": name,
        "series": doc.rule(&name)?.series,
    })))
}

/// POST /api/rules/{name}/unassign — the series fall back to the default rule.
pub async fn unassign_series(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SeriesBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rule_name = name.clone();
    let doc = edit_rules(&app, move |doc| doc.unassign(&rule_name, &body.series_ids)).await?;
    Ok(Json(serde_json::json!({
        "name": name,
        "series": doc.rule(&name)?.series,
    })))
}
