//! Whole-document storage for the rules file.
//!
//! Readers load a snapshot; writers replace the entire document. Callers that
//! read-modify-write must serialize among themselves (the server holds a
//! single write lock around every mutation).

use crate::config::RulesDocument;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait RulesStore: Send + Sync {
    fn load(&self) -> Result<RulesDocument>;
    fn replace(&self, document: &RulesDocument) -> Result<()>;

    /// Load, apply `edit`, and write back. Nothing is written if `edit` fails.
    fn update(
        &self,
        edit: &mut dyn FnMut(&mut RulesDocument) -> Result<()>,
    ) -> Result<RulesDocument> {
        let mut document = self.load()?;
        edit(&mut document)?;
        self.replace(&document)?;
        Ok(document)
    }
}

/// YAML file under the data root, written atomically.
pub struct FileRulesStore {
    root: PathBuf,
}

impl FileRulesStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RulesStore for FileRulesStore {
    fn load(&self) -> Result<RulesDocument> {
        RulesDocument::load(&self.root)
    }

    fn replace(&self, document: &RulesDocument) -> Result<()> {
        document.save(&self.root)
    }
}

/// Process-local store, for embedding and tests.
#[derive(Default)]
pub struct MemoryRulesStore {
    document: Mutex<RulesDocument>,
}

impl MemoryRulesStore {
    pub fn new(document: RulesDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl RulesStore for MemoryRulesStore {
    fn load(&self) -> Result<RulesDocument> {
        let guard = self.document.lock().unwrap_or_else(|p| p.into_inner());
        Ok(guard.clone())
    }

    fn replace(&self, document: &RulesDocument) -> Result<()> {
        let mut guard = self.document.lock().unwrap_or_else(|p| p.into_inner());
        *guard = document.clone();
        Ok(())
    }
}
