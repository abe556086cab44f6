//! Webhook bodies, reduced to the three fields the lifecycle needs.
//!
//! Media servers are inconsistent about sending numbers as JSON numbers or
//! strings, so every numeric field accepts both.

use serde::Deserialize;
use serde_json::Value;

/// A playback event identified by series title rather than library id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEvent {
    pub title: String,
    pub season_number: u32,
    pub episode_number: u32,
}

fn as_u32(value: &Option<Value>) -> Option<u32> {
    match value.as_ref()? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Option<Value>) -> Option<f64> {
    match value.as_ref()? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tautulli / Plex
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TautulliPayload {
    #[serde(default)]
    pub server_title: Option<String>,
    #[serde(default)]
    pub server_season_num: Option<Value>,
    #[serde(default)]
    pub server_ep_num: Option<Value>,
    #[serde(default)]
    pub plex_title: Option<String>,
    #[serde(default)]
    pub plex_season_num: Option<Value>,
    #[serde(default)]
    pub plex_ep_num: Option<Value>,
}

impl TautulliPayload {
    /// `server_*` fields win when all three are usable, `plex_*` otherwise.
    pub fn normalize(&self) -> Option<MediaEvent> {
        let server = (
            non_empty(&self.server_title),
            as_u32(&self.server_season_num),
            as_u32(&self.server_ep_num),
        );
        let plex = (
            non_empty(&self.plex_title),
            as_u32(&self.plex_season_num),
            as_u32(&self.plex_ep_num),
        );
        match (server, plex) {
            ((Some(title), Some(season_number), Some(episode_number)), _)
            | (_, (Some(title), Some(season_number), Some(episode_number))) => Some(MediaEvent {
                title,
                season_number,
                episode_number,
            }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Jellyfin
// ---------------------------------------------------------------------------

pub const PLAYBACK_PROGRESS: &str = "PlaybackProgress";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JellyfinPayload {
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub series_name: Option<String>,
    #[serde(default)]
    pub season_number: Option<Value>,
    #[serde(default)]
    pub episode_number: Option<Value>,
    #[serde(default)]
    pub playback_position_ticks: Option<Value>,
    #[serde(default)]
    pub run_time_ticks: Option<Value>,
}

impl JellyfinPayload {
    pub fn is_progress(&self) -> bool {
        self.notification_type.as_deref() == Some(PLAYBACK_PROGRESS)
    }

    /// Playback position as a percentage of runtime; `None` without a runtime.
    pub fn progress_percent(&self) -> Option<f64> {
        let position = as_f64(&self.playback_position_ticks).unwrap_or(0.0);
        let total = as_f64(&self.run_time_ticks)?;
        (total > 0.0).then(|| position / total * 100.0)
    }

    pub fn normalize(&self) -> Option<MediaEvent> {
        Some(MediaEvent {
            title: non_empty(&self.series_name)?,
            season_number: as_u32(&self.season_number)?,
            episode_number: as_u32(&self.episode_number)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Sonarr
// ---------------------------------------------------------------------------

pub const SERIES_ADD: &str = "SeriesAdd";

#[derive(Debug, Deserialize)]
pub struct SonarrSeries {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrPayload {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub series: Option<SonarrSeries>,
}

impl SonarrPayload {
    /// Series id of a `SeriesAdd` event, `None` for every other event.
    pub fn added_series(&self) -> Option<i64> {
        if self.event_type.as_deref() != Some(SERIES_ADD) {
            return None;
        }
        self.series.as_ref().map(|s| s.id)
    }
}
