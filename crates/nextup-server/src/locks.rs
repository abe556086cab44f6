use nextup_core::types::SeriesId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

type SeriesLock = Arc<tokio::sync::Mutex<()>>;

/// One async lock per series id, so two events for the same series never
/// interleave between snapshot and apply.
///
/// Idle entries are dropped on the next acquisition.
#[derive(Clone, Default)]
pub struct SeriesLocks {
    inner: Arc<Mutex<HashMap<SeriesId, SeriesLock>>>,
}

impl SeriesLocks {
    pub async fn acquire(&self, series_id: SeriesId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(series_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of series currently held or awaited.
    pub fn len(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.values().filter(|lock| Arc::strong_count(lock) > 1).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
