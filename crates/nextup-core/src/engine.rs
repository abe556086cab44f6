//! Watch-event decisions.
//!
//! [`plan`] is a pure function of the event, the resolved policy and a fresh
//! episode snapshot. It never talks to the library manager; the
//! [`ActionExecutor`](crate::executor::ActionExecutor) applies the result.

use crate::config::Policy;
use crate::error::{NextupError, Result};
use crate::types::{ActionOption, Episode, EpisodeId, EpisodeWindow, FileId, WatchEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// ActionSet
// ---------------------------------------------------------------------------

/// What a single watch event asks of the library manager.
///
/// `search` is always a subset of `monitor`. All episode lists are in
/// chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSet {
    pub monitor: Vec<EpisodeId>,
    pub unmonitor: Vec<EpisodeId>,
    pub search: Vec<EpisodeId>,
    pub delete_files: Vec<FileId>,
}

impl ActionSet {
    pub fn is_empty(&self) -> bool {
        self.monitor.is_empty()
            && self.unmonitor.is_empty()
            && self.search.is_empty()
            && self.delete_files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

pub fn plan(event: &WatchEvent, policy: &Policy, snapshot: &[Episode]) -> Result<ActionSet> {
    let mut ordered: Vec<&Episode> = snapshot.iter().collect();
    ordered.sort_by_key(|ep| ep.key());

    let watched_at = locate(event, &ordered)?;
    let watched = ordered[watched_at];

    let mut actions = ActionSet::default();

    if !policy.monitor_watched {
        actions.unmonitor.push(watched.id);
    }

    actions.monitor = upcoming(&ordered, watched_at, policy.get_option);
    if policy.action_option == ActionOption::MonitorAndSearch {
        actions.search = actions.monitor.clone();
    }

    actions.delete_files = deletions(&ordered, watched_at, policy.keep_watched, &actions.monitor);

    Ok(actions)
}

/// Index of the watched episode in the chronologically sorted snapshot.
fn locate(event: &WatchEvent, ordered: &[&Episode]) -> Result<usize> {
    let mut hits = ordered.iter().enumerate().filter(|(_, ep)| {
        ep.season_number == event.season_number && ep.episode_number == event.episode_number
    });

    let (index, _) = hits.next().ok_or(NextupError::EpisodeNotFound {
        series_id: event.series_id,
        season: event.season_number,
        episode: event.episode_number,
    })?;

    if hits.next().is_some() {
        tracing::warn!(%event, "snapshot holds more than one record for the watched episode; using the first");
    }
    Ok(index)
}

fn upcoming(ordered: &[&Episode], watched_at: usize, window: EpisodeWindow) -> Vec<EpisodeId> {
    let watched = ordered[watched_at];
    let after = ordered
        .iter()
        .skip(watched_at + 1)
        .filter(|ep| ep.key() > watched.key());

    match window {
        EpisodeWindow::Count(n) => after.take(n as usize).map(|ep| ep.id).collect(),
        EpisodeWindow::All => after.map(|ep| ep.id).collect(),
        EpisodeWindow::CurrentSeasonOnly => after
            .filter(|ep| ep.season_number == watched.season_number)
            .map(|ep| ep.id)
            .collect(),
    }
}

/// File ids to remove under `keep`, judged against the unmodified snapshot.
///
/// A file shared by several episodes (multi-episode releases) is only
/// removed when none of those episodes is kept.
fn deletions(
    ordered: &[&Episode],
    watched_at: usize,
    keep: EpisodeWindow,
    monitor: &[EpisodeId],
) -> Vec<FileId> {
    let watched = ordered[watched_at];

    let doomed: HashSet<EpisodeId> = match keep {
        EpisodeWindow::All => return Vec::new(),
        EpisodeWindow::CurrentSeasonOnly => ordered
            .iter()
            .filter(|ep| ep.has_file && ep.season_number < watched.season_number)
            .map(|ep| ep.id)
            .collect(),
        EpisodeWindow::Count(k) => {
            // Walking the descending order from the watched episode is the
            // same as taking it and its k-1 predecessors in ascending order.
            let start = (watched_at + 1).saturating_sub(k as usize);
            let retained: HashSet<EpisodeId> = ordered[start..watched_at + 1]
                .iter()
                .map(|ep| ep.id)
                .chain(monitor.iter().copied())
                .chain(std::iter::once(watched.id))
                .collect();
            // Only already-watched files are candidates; unwatched episodes
            // past the watch point are never deleted.
            ordered[..watched_at + 1]
                .iter()
                .filter(|ep| ep.has_file && !retained.contains(&ep.id))
                .map(|ep| ep.id)
                .collect()
        }
    };

    let kept_files: HashSet<FileId> = ordered
        .iter()
        .filter(|ep| !doomed.contains(&ep.id))
        .filter_map(|ep| ep.file_id)
        .collect();

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for ep in ordered.iter().filter(|ep| doomed.contains(&ep.id)) {
        let Some(file_id) = ep.file_id else {
            tracing::warn!(
                episode_id = ep.id,
                episode = %ep.label(),
                "episode reports a file but carries no file id; skipping deletion"
            );
            continue;
        };
        if kept_files.contains(&file_id) {
            tracing::debug!(file_id, "file is shared with a kept episode; not deleting");
            continue;
        }
        if seen.insert(file_id) {
            files.push(file_id);
        }
    }
    files
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
