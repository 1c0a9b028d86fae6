//! Config Hot-Reload - Poll config.toml for Changes
//!
//! Periodically re-reads config.toml and hashes its contents. When the
//! hash changes and the new file validates, the config is published on a
//! `tokio::sync::watch` channel. The engine re-applies payout and XP
//! tuning from it without touching the profile.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use super::AppConfig;

/// Polls config.toml and broadcasts validated updates.
///
/// Polling rather than a filesystem watcher keeps behaviour identical
/// across Linux, macOS and container volumes.
pub struct ConfigWatcher {
  config_path: String,
  interval: Duration,
  config_tx: watch::Sender<AppConfig>,
  last_hash: Option<u64>,
}

impl ConfigWatcher {
  /// Returns the watcher and the receiver consumers subscribe to.
  pub fn new(
    config_path: &str,
    initial_config: AppConfig,
    interval: Duration,
  ) -> (Self, watch::Receiver<AppConfig>) {
    let (config_tx, config_rx) = watch::channel(initial_config);

    let watcher = Self {
      config_path: config_path.to_string(),
      interval,
      config_tx,
      last_hash: None,
    };

    (watcher, config_rx)
  }

  /// Poll until shutdown.
  #[instrument(skip(self, shutdown_rx), fields(path = %self.config_path))]
  pub async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    info!(interval_secs = self.interval.as_secs(), "Config watcher started");

    self.last_hash = self.compute_hash().await;

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Config watcher shutting down");
          return Ok(());
        }
        () = tokio::time::sleep(self.interval) => {
          self.check_and_reload().await;
        }
      }
    }
  }

  /// Reload when the file contents changed. Returns true on a publish.
  pub async fn check_and_reload(&mut self) -> bool {
    let new_hash = self.compute_hash().await;

    if new_hash == self.last_hash {
      debug!("Config unchanged");
      return false;
    }

    info!("Config change detected, reloading");

    match super::loader::load_config(&self.config_path) {
      Ok(new_config) => {
        self.last_hash = new_hash;
        if self.config_tx.send(new_config).is_err() {
          warn!("No config subscribers, update dropped");
          false
        } else {
          info!("Config reloaded successfully");
          true
        }
      }
      Err(e) => {
        warn!(error = %e, "Failed to reload config, keeping current");
        false
      }
    }
  }

  async fn compute_hash(&self) -> Option<u64> {
    let content = tokio::fs::read_to_string(&self.config_path).await.ok()?;
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    Some(hasher.finish())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_reload_publishes_changed_file() {
    let path = std::env::temp_dir().join(format!("dojo-config-{}.toml", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, "[session]\nwin_probability = 0.5\n").await.unwrap();
    let path_str = path.to_string_lossy().to_string();

    let initial = crate::config::loader::load_config(&path_str).unwrap();
    let (mut watcher, rx) = ConfigWatcher::new(&path_str, initial, Duration::from_secs(60));
    watcher.last_hash = watcher.compute_hash().await;

    assert!(!watcher.check_and_reload().await);

    tokio::fs::write(&path, "[session]\nwin_probability = 0.9\n").await.unwrap();
    assert!(watcher.check_and_reload().await);
    assert!((rx.borrow().session.win_probability - 0.9).abs() < f64::EPSILON);

    // An invalid edit is ignored.
    tokio::fs::write(&path, "[session]\nwin_probability = 7\n").await.unwrap();
    assert!(!watcher.check_and_reload().await);
    assert!((rx.borrow().session.win_probability - 0.9).abs() < f64::EPSILON);

    tokio::fs::remove_file(&path).await.ok();
  }
}
