use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub type SeriesId = i64;
pub type EpisodeId = i64;
pub type FileId = i64;
pub type QueueId = i64;

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

/// One catalog entry as reported by the library manager.
///
/// Season 0 holds specials. `file_id` is only present when `has_file` is set;
/// Sonarr reports `episodeFileId: 0` for episodes without a file, which is
/// read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: EpisodeId,
    pub series_id: SeriesId,
    pub season_number: u32,
    pub episode_number: u32,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub has_file: bool,
    #[serde(
        rename = "episodeFileId",
        default,
        deserialize_with = "zero_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_id: Option<FileId>,
}

impl Episode {
    /// Chronological sort key.
    pub fn key(&self) -> (u32, u32) {
        (self.season_number, self.episode_number)
    }

    pub fn label(&self) -> String {
        format!("S{:02}E{:02}", self.season_number, self.episode_number)
    }
}

fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<FileId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<FileId>::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id != 0))
}

// ---------------------------------------------------------------------------
// WatchEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub series_id: SeriesId,
    pub season_number: u32,
    pub episode_number: u32,
}

impl WatchEvent {
    pub fn new(series_id: SeriesId, season_number: u32, episode_number: u32) -> Self {
        Self {
            series_id,
            season_number,
            episode_number,
        }
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "series {} S{:02}E{:02}",
            self.series_id, self.season_number, self.episode_number
        )
    }
}

// ---------------------------------------------------------------------------
// EpisodeWindow
// ---------------------------------------------------------------------------

/// How far a rule reaches: a fixed number of episodes, everything, or the
/// rest of the current season.
///
/// Stored in the rules file as an integer (or numeric string), `"all"` or
/// `"season"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeWindow {
    Count(u32),
    All,
    CurrentSeasonOnly,
}

impl fmt::Display for EpisodeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeWindow::Count(n) => write!(f, "{n}"),
            EpisodeWindow::All => f.write_str("all"),
            EpisodeWindow::CurrentSeasonOnly => f.write_str("season"),
        }
    }
}

impl std::str::FromStr for EpisodeWindow {
    type Err = crate::error::NextupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(EpisodeWindow::All),
            "season" => Ok(EpisodeWindow::CurrentSeasonOnly),
            other => other
                .parse::<u32>()
                .map(EpisodeWindow::Count)
                .map_err(|_| crate::error::NextupError::InvalidWindow(s.to_string())),
        }
    }
}

impl Serialize for EpisodeWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EpisodeWindow::Count(n) => serializer.serialize_u32(*n),
            EpisodeWindow::All => serializer.serialize_str("all"),
            EpisodeWindow::CurrentSeasonOnly => serializer.serialize_str("season"),
        }
    }
}

impl<'de> Deserialize<'de> for EpisodeWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(EpisodeWindow::Count(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionOption
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionOption {
    #[serde(rename = "monitor")]
    MonitorOnly,
    #[serde(rename = "search")]
    MonitorAndSearch,
}

impl ActionOption {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionOption::MonitorOnly => "monitor",
            ActionOption::MonitorAndSearch => "search",
        }
    }
}

impl fmt::Display for ActionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionOption {
    type Err = crate::error::NextupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monitor" => Ok(ActionOption::MonitorOnly),
            "search" => Ok(ActionOption::MonitorAndSearch),
            _ => Err(crate::error::NextupError::InvalidAction(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Library-side records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub id: SeriesId,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEpisode {
    pub season_number: u32,
    pub episode_number: u32,
}

/// An in-flight download in the library manager's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: QueueId,
    #[serde(default)]
    pub series_id: Option<SeriesId>,
    #[serde(default)]
    pub episode: Option<QueueEpisode>,
}

impl QueueItem {
    /// True when this item downloads an episode of `season` past `cutoff`.
    pub fn is_after(&self, series_id: SeriesId, season: u32, cutoff: u32) -> bool {
        self.series_id == Some(series_id)
            && self
                .episode
                .as_ref()
                .is_some_and(|ep| ep.season_number == season && ep.episode_number > cutoff)
    }
}
