//! Profile Store Port - Single-Blob Persistence Interface
//!
//! The whole session is saved as one JSON blob under a fixed key. Stores
//! are synchronous: a blob is a few kilobytes and the engine persists it
//! fire-and-forget after every mutation.

use std::sync::Arc;

/// Key-value store holding the serialized session blob.
pub trait ProfileStore: Send + Sync + 'static {
  /// Read the saved blob, or `None` when nothing has been saved yet.
  fn load_blob(&self) -> anyhow::Result<Option<String>>;

  /// Replace the saved blob.
  fn save_blob(&self, blob: &str) -> anyhow::Result<()>;

  /// Whether the store can currently accept writes.
  fn is_healthy(&self) -> bool {
    true
  }
}

impl<T: ProfileStore> ProfileStore for Arc<T> {
  fn load_blob(&self) -> anyhow::Result<Option<String>> {
    (**self).load_blob()
  }

  fn save_blob(&self, blob: &str) -> anyhow::Result<()> {
    (**self).save_blob(blob)
  }

  fn is_healthy(&self) -> bool {
    (**self).is_healthy()
  }
}
