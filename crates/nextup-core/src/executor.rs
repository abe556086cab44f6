//! Applies engine decisions against an [`EpisodeRepository`].
//!
//! Failures are collected, logged and reported; nothing is retried and
//! nothing already applied is rolled back.

use crate::engine::ActionSet;
use crate::error::Result;
use crate::initializer::SeasonDirective;
use crate::repository::EpisodeRepository;
use crate::types::{EpisodeId, FileId, QueueId, SeriesId};
use serde::Serialize;

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Outcome of applying an action set or an initialization plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub monitored: usize,
    pub unmonitored: usize,
    pub searched: usize,
    pub deleted: usize,
    pub cancelled: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_monitor: Vec<EpisodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_unmonitor: Vec<EpisodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_search: Vec<EpisodeId>,
    /// Search ids dropped because their monitor update did not go through.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_search: Vec<EpisodeId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_delete: Vec<FileId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_cancel: Vec<QueueId>,
    /// Seasons whose downloads could not be checked because the queue
    /// request failed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_queue_fetch: Vec<u32>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failed_monitor.is_empty()
            && self.failed_unmonitor.is_empty()
            && self.failed_search.is_empty()
            && self.rejected_search.is_empty()
            && self.failed_delete.is_empty()
            && self.failed_cancel.is_empty()
            && self.failed_queue_fetch.is_empty()
    }

    fn log_failures(&self, series_id: SeriesId) {
        if self.is_clean() {
            return;
        }
        tracing::error!(
            series_id,
            failed_monitor = ?self.failed_monitor,
            failed_unmonitor = ?self.failed_unmonitor,
            failed_search = ?self.failed_search,
            rejected_search = ?self.rejected_search,
            failed_delete = ?self.failed_delete,
            failed_cancel = ?self.failed_cancel,
            failed_queue_fetch = ?self.failed_queue_fetch,
            "some actions failed"
        );
    }
}

// ---------------------------------------------------------------------------
// ActionExecutor
// ---------------------------------------------------------------------------

pub struct ActionExecutor<'a> {
    repo: &'a dyn EpisodeRepository,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(repo: &'a dyn EpisodeRepository) -> Self {
        Self { repo }
    }

    /// Returns the ids that could not be updated. A failed batch request
    /// fails every id in it.
    pub fn set_monitored(&self, episode_ids: &[EpisodeId], monitored: bool) -> Vec<EpisodeId> {
        if episode_ids.is_empty() {
            return Vec::new();
        }
        match self.repo.set_monitored(episode_ids, monitored) {
            Ok(()) => Vec::new(),
            Err(e) => {
                tracing::error!(ids = ?episode_ids, monitored, error = %e, "monitor update failed");
                episode_ids.to_vec()
            }
        }
    }

    /// Fire and forget. Returns false when the search request failed.
    pub fn trigger_search(&self, episode_ids: &[EpisodeId]) -> bool {
        if episode_ids.is_empty() {
            return true;
        }
        match self.repo.trigger_search(episode_ids) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(ids = ?episode_ids, error = %e, "search request failed");
                false
            }
        }
    }

    /// Each file is attempted independently. Returns the ones that failed.
    pub fn delete_episode_files(&self, file_ids: &[FileId]) -> Vec<FileId> {
        let mut failed = Vec::new();
        for &file_id in file_ids {
            match self.repo.delete_episode_file(file_id) {
                Ok(()) => tracing::info!(file_id, "deleted episode file"),
                Err(e) => {
                    tracing::error!(file_id, error = %e, "episode file deletion failed");
                    failed.push(file_id);
                }
            }
        }
        failed
    }

    /// Cancel in-flight downloads of `season` with an episode number above
    /// `cutoff`. The queue is fetched right before use.
    ///
    /// Returns `(cancelled, failed)`, or the error from fetching the queue.
    pub fn cancel_queue_items_after(
        &self,
        series_id: SeriesId,
        season: u32,
        cutoff: u32,
    ) -> Result<(usize, Vec<QueueId>)> {
        let queue = self.repo.queue()?;

        let mut cancelled = 0;
        let mut failed = Vec::new();
        for item in queue.iter().filter(|item| item.is_after(series_id, season, cutoff)) {
            match self.repo.cancel_queue_item(item.id) {
                Ok(()) => {
                    cancelled += 1;
                    tracing::info!(series_id, season, queue_id = item.id, "cancelled download");
                }
                Err(e) => {
                    tracing::error!(queue_id = item.id, error = %e, "download cancellation failed");
                    failed.push(item.id);
                }
            }
        }
        Ok((cancelled, failed))
    }

    /// Unmonitor, monitor, search, then delete. Search only covers ids whose
    /// monitor update succeeded.
    pub fn apply(&self, series_id: SeriesId, actions: &ActionSet) -> ApplyReport {
        let mut report = ApplyReport::default();

        report.failed_unmonitor = self.set_monitored(&actions.unmonitor, false);
        report.unmonitored = actions.unmonitor.len() - report.failed_unmonitor.len();

        report.failed_monitor = self.set_monitored(&actions.monitor, true);
        report.monitored = actions.monitor.len() - report.failed_monitor.len();

        let (search, rejected): (Vec<EpisodeId>, Vec<EpisodeId>) = actions
            .search
            .iter()
            .copied()
            .partition(|id| !report.failed_monitor.contains(id));
        if !rejected.is_empty() {
            tracing::warn!(series_id, ids = ?rejected, "not searching episodes that are not monitored");
        }
        report.rejected_search = rejected;
        if self.trigger_search(&search) {
            report.searched = search.len();
        } else {
            report.failed_search = search;
        }

        report.failed_delete = self.delete_episode_files(&actions.delete_files);
        report.deleted = actions.delete_files.len() - report.failed_delete.len();

        report.log_failures(series_id);
        report
    }

    pub fn apply_initialization(
        &self,
        series_id: SeriesId,
        directives: &[SeasonDirective],
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for directive in directives {
            if let Some(pilot) = directive.monitor_one {
                let failed = self.set_monitored(&[pilot], true);
                report.monitored += 1 - failed.len();
                report.failed_monitor.extend(failed);
            }

            let failed = self.set_monitored(&directive.unmonitor_rest, false);
            report.unmonitored += directive.unmonitor_rest.len() - failed.len();
            report.failed_unmonitor.extend(failed);

            match self.cancel_queue_items_after(
                series_id,
                directive.season_number,
                directive.cancel_after,
            ) {
                Ok((cancelled, failed)) => {
                    report.cancelled += cancelled;
                    report.failed_cancel.extend(failed);
                }
                Err(e) => {
                    tracing::error!(
                        series_id,
                        season = directive.season_number,
                        error = %e,
                        "could not fetch download queue"
                    );
                    report.failed_queue_fetch.push(directive.season_number);
                }
            }

            tracing::info!(
                series_id,
                season = directive.season_number,
                pilot = ?directive.monitor_one,
                unmonitored = directive.unmonitor_rest.len(),
                "season reduced to its pilot"
            );
        }

        report.log_failures(series_id);
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
