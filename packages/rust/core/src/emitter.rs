//! Writes rendered documents into a flat output directory.

use std::path::{Path, PathBuf};

use tracing::info;

use tabledown_shared::{RenderedDocument, Result, TabledownError};

/// Sole writer of one run's output directory.
///
/// Same-named documents overwrite each other without warning, and files
/// from earlier runs that no row maps to anymore are left in place.
#[derive(Debug)]
pub struct FileEmitter {
    dir: PathBuf,
}

impl FileEmitter {
    /// Ensure the output directory exists (idempotent).
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| TabledownError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one document as UTF-8 and return its path.
    pub fn emit(&self, document: &RenderedDocument) -> Result<PathBuf> {
        let path = self.dir.join(&document.filename);
        std::fs::write(&path, document.body.as_bytes())
            .map_err(|e| TabledownError::io(&path, e))?;
        info!(path = %path.display(), "saved");
        Ok(path)
    }
}
