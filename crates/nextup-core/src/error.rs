use thiserror::Error;

#[derive(Debug, Error)]
pub enum NextupError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("default rule '{0}' is not defined")]
    MissingDefaultRule(String),

    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("rule '{0}' is the default rule and cannot be deleted")]
    DefaultRuleProtected(String),

    #[error("invalid rule name '{0}': use letters, digits, '_', '.' or '-', starting with a letter or digit")]
    InvalidRuleName(String),

    #[error("invalid episode window '{0}': expected a count, 'all' or 'season'")]
    InvalidWindow(String),

    #[error("invalid action option '{0}': expected 'monitor' or 'search'")]
    InvalidAction(String),

    #[error("series not found: {0}")]
    SeriesNotFound(String),

    #[error("episode S{season:02}E{episode:02} not found for series {series_id}")]
    EpisodeNotFound {
        series_id: i64,
        season: u32,
        episode: u32,
    },

    #[error("sonarr returned {status}: {body}")]
    Sonarr { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NextupError {
    /// Errors that abort a single invocation and belong in the missing-item log.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NextupError::SeriesNotFound(_) | NextupError::EpisodeNotFound { .. }
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NextupError::Configuration(_)
                | NextupError::MissingDefaultRule(_)
                | NextupError::InvalidWindow(_)
                | NextupError::InvalidAction(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NextupError>;
