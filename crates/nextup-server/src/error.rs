use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nextup_core::error::NextupError;

// ---------------------------------------------------------------------------
// Internal sentinel for malformed requests
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 400 through the `anyhow::Error` chain for input
/// problems that never reach `nextup-core`.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    pub(crate) fn join(err: tokio::task::JoinError) -> Self {
        Self(anyhow::anyhow!("task join error: {err}"))
    }
}

fn status_for(err: &NextupError) -> StatusCode {
    match err {
        NextupError::RuleNotFound(_)
        | NextupError::SeriesNotFound(_)
        | NextupError::EpisodeNotFound { .. } => StatusCode::NOT_FOUND,
        NextupError::DefaultRuleProtected(_) => StatusCode::CONFLICT,
        NextupError::InvalidRuleName(_)
        | NextupError::InvalidWindow(_)
        | NextupError::InvalidAction(_) => StatusCode::BAD_REQUEST,
        NextupError::Configuration(_) | NextupError::MissingDefaultRule(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        NextupError::Sonarr { .. } | NextupError::Http(_) => StatusCode::BAD_GATEWAY,
        NextupError::Io(_) | NextupError::Yaml(_) | NextupError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(b) = self.0.downcast_ref::<BadRequestError>() {
            let body = serde_json::json!({ "error": b.0.clone() });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }

        let status = match self.0.downcast_ref::<NextupError>() {
            Some(e) => status_for(e),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
