use crate::error::Result;
use crate::paths;
use std::path::{Path, PathBuf};

/// Operator-facing record of events that could not be matched to the
/// library: unknown series titles, episodes absent from the catalog.
///
/// Every entry is also emitted on the `missing` tracing target.
#[derive(Debug, Clone)]
pub struct MissingLog {
    path: PathBuf,
}

impl MissingLog {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::missing_log_path(root),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, message: &str) -> Result<()> {
        tracing::warn!(target: "missing", "{message}");
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        crate::io::append_text(&self.path, &format!("{stamp} {message}\n"))
    }

    /// Recorded lines, oldest first.
    pub fn read(&self) -> Result<Vec<String>> {
        let text = crate::io::read_or_empty(&self.path)?;
        Ok(text.lines().map(str::to_string).collect())
    }
}
