use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::domain::models::ResolvedItem;

/// Owns the pointer files under `root`; nothing else writes there.
#[derive(Debug, Clone)]
pub struct PointerStore {
    root: PathBuf,
    extension: String,
}

impl PointerStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pointer_path(&self, resolved: &ResolvedItem) -> PathBuf {
        self.root
            .join(&resolved.item.season)
            .join(format!("{}.{}", resolved.file_name, self.extension))
    }

    /// Materializes one pointer file. Returns `true` only when a file was
    /// written; existing files are kept unless `overwrite` is set, and I/O
    /// failures are logged and reported as `false`.
    pub fn write(&self, resolved: &ResolvedItem, overwrite: bool) -> bool {
        let target = self.pointer_path(resolved);
        if !overwrite && target.exists() {
            debug!("Pointer already exists, skipping: {target:?}");
            return false;
        }

        match self.replace(&target, &resolved.url) {
            Ok(()) => {
                debug!("Wrote pointer {target:?}");
                true
            }
            Err(e) => {
                error!("Failed to write pointer {target:?}: {e:#}");
                false
            }
        }
    }

    fn replace(&self, target: &Path, content: &str) -> Result<()> {
        let staged = self.stage(target, content)?;
        commit(staged, target)
    }

    /// Writes `content` to a hidden temporary file next to `target`, so the
    /// final rename stays on one filesystem. Dropping the result removes it.
    fn stage(&self, target: &Path, content: &str) -> Result<NamedTempFile> {
        let dir = target
            .parent()
            .with_context(|| format!("Pointer path has no parent: {target:?}"))?;
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {dir:?}"))?;

        let mut staged = tempfile::Builder::new()
            .prefix(".pointer-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create temporary file in {dir:?}"))?;
        staged.write_all(content.as_bytes())?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;
        Ok(staged)
    }
}

fn commit(staged: NamedTempFile, target: &Path) -> Result<()> {
    staged
        .persist(target)
        .map_err(|e| anyhow::anyhow!("Failed to move pointer into place: {}", e.error))?;
    Ok(())
}
