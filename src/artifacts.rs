//! Artifact storage: timestamped writes under a run-artifacts directory.
//!
//! Filenames are `<UTC timestamp>-<name>`, so writes are append-only by
//! filename and concurrent runs sharing a directory do not collide.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` to a fresh timestamp-qualified file and return its path.
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create artifact directory: {}", self.dir.display()))?;
        let ts = Utc::now().format("%Y%m%d-%H%M%S");
        let path = self.dir.join(format!("{}-{}", ts, name));
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        Ok(path)
    }
}
