//! File Profile Store - Atomic JSON Session Persistence
//!
//! Saves the session blob to `{data_dir}/{storage_key}.json` using atomic
//! writes (write to tmp file, then rename), so the file is always either
//! the previous or the new blob.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::ports::ProfileStore;

/// Atomic single-file blob store.
pub struct FileProfileStore {
    /// Path to `{storage_key}.json`.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
    /// Cleared when a write fails, set again on the next success.
    last_write_ok: AtomicBool,
}

impl FileProfileStore {
    /// Create a store in `data_dir`, creating the directory if needed.
    pub fn new(data_dir: impl AsRef<Path>, storage_key: &str) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

        Ok(Self {
            path: dir.join(format!("{storage_key}.json")),
            tmp_path: dir.join(format!("{storage_key}.json.tmp")),
            last_write_ok: AtomicBool::new(true),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, blob: &str) -> Result<()> {
        fs::write(&self.tmp_path, blob).context("Failed to write tmp session file")?;
        fs::rename(&self.tmp_path, &self.path).context("Failed to rename session file")?;
        Ok(())
    }
}

impl ProfileStore for FileProfileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load_blob(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            info!("No session file found, starting fresh");
            return Ok(None);
        }
        let blob = fs::read_to_string(&self.path).context("Failed to read session file")?;
        info!(bytes = blob.len(), "Session blob loaded");
        Ok(Some(blob))
    }

    #[instrument(skip(self, blob), fields(path = %self.path.display()))]
    fn save_blob(&self, blob: &str) -> Result<()> {
        match self.write_atomic(blob) {
            Ok(()) => {
                self.last_write_ok.store(true, Ordering::Relaxed);
                debug!(bytes = blob.len(), "Session blob saved");
                Ok(())
            }
            Err(e) => {
                self.last_write_ok.store(false, Ordering::Relaxed);
                warn!(error = %e, "Session blob write failed");
                Err(e)
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.last_write_ok.load(Ordering::Relaxed)
            && self.path.parent().is_some_and(Path::is_dir)
    }
}
