//! In-process blob store for tests and ephemeral runs.

use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::ports::ProfileStore;

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    blob: Mutex<Option<String>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a saved blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    /// Last saved blob, if any.
    pub fn snapshot(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|b| b.clone())
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_blob(&self) -> Result<Option<String>> {
        let guard = self.blob.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save_blob(&self, blob: &str) -> Result<()> {
        let mut guard = self.blob.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        *guard = Some(blob.to_string());
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.blob.is_poisoned()
    }
}
