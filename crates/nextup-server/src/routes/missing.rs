use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/missing — missing-item log, oldest first.
pub async fn list_missing(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let missing = app.missing.clone();
    let entries = tokio::task::spawn_blocking(move || missing.read())
        .await
        .map_err(AppError::join)??;

    Ok(Json(serde_json::json!({
        "count": entries.len(),
        "entries": entries,
    })))
}

/// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
