use crate::locks::SeriesLocks;
use nextup_core::missing::MissingLog;
use nextup_core::repository::EpisodeRepository;
use nextup_core::store::{FileRulesStore, RulesStore};
use nextup_core::workflow::Lifecycle;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub store: Arc<dyn RulesStore>,
    pub repo: Arc<dyn EpisodeRepository>,
    pub missing: MissingLog,
    pub locks: SeriesLocks,
    /// Held around every read-modify-write of the rules document.
    pub rules_write: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    /// Rules are read from and written to `<root>/.nextup/rules.yaml`.
    pub fn new(root: PathBuf, repo: Arc<dyn EpisodeRepository>) -> Self {
        let store = Arc::new(FileRulesStore::new(root.clone()));
        Self::with_store(root, store, repo)
    }

    pub fn with_store(
        root: PathBuf,
        store: Arc<dyn RulesStore>,
        repo: Arc<dyn EpisodeRepository>,
    ) -> Self {
        Self {
            missing: MissingLog::new(&root),
            root,
            store,
            repo,
            locks: SeriesLocks::default(),
            rules_write: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Run `f` against a [`Lifecycle`] built from this state. Blocking; call
    /// from inside `spawn_blocking`.
    pub fn with_lifecycle<T>(&self, f: impl FnOnce(&Lifecycle<'_>) -> T) -> T {
        let lifecycle = Lifecycle::new(self.store.as_ref(), self.repo.as_ref(), &self.missing);
        f(&lifecycle)
    }
}
