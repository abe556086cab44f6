use crate::error::Result;
use crate::types::{Episode, EpisodeId, FileId, QueueId, QueueItem, SeriesId, SeriesSummary, Tag};

/// Access to the library manager's catalog.
///
/// Reads return live snapshots; nothing is cached between calls. Writes are
/// applied one request at a time and are not transactional.
pub trait EpisodeRepository: Send + Sync {
    fn series(&self) -> Result<Vec<SeriesSummary>>;
    fn tags(&self) -> Result<Vec<Tag>>;
    fn episodes(&self, series_id: SeriesId) -> Result<Vec<Episode>>;

    /// Set the monitor flag on a batch of episodes in one request.
    fn set_monitored(&self, episode_ids: &[EpisodeId], monitored: bool) -> Result<()>;
    fn trigger_search(&self, episode_ids: &[EpisodeId]) -> Result<()>;
    fn delete_episode_file(&self, file_id: FileId) -> Result<()>;

    fn queue(&self) -> Result<Vec<QueueItem>>;
    fn cancel_queue_item(&self, queue_id: QueueId) -> Result<()>;
}
