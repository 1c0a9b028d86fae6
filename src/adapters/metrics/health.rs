//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7. Readiness requires a
//! writable profile store and a running engine loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Shared health flags, written by the engine and read by probes.
#[derive(Debug, Clone)]
pub struct HealthState {
  /// Whether the last persist succeeded.
  pub store_healthy: Arc<AtomicBool>,
  /// Whether the engine loop is running.
  pub engine_running: Arc<AtomicBool>,
}

impl HealthState {
  /// Store healthy, engine not yet started.
  pub fn new() -> Self {
    Self {
      store_healthy: Arc::new(AtomicBool::new(true)),
      engine_running: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn set_store_healthy(&self, healthy: bool) {
    self.store_healthy.store(healthy, Ordering::Relaxed);
  }

  pub fn set_engine_running(&self, running: bool) {
    self.engine_running.store(running, Ordering::Relaxed);
  }

  pub fn is_ready(&self) -> bool {
    self.store_healthy.load(Ordering::Relaxed) && self.engine_running.load(Ordering::Relaxed)
  }
}

impl Default for HealthState {
  fn default() -> Self {
    Self::new()
  }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
  state: Arc<HealthState>,
  bind_address: String,
}

impl HealthServer {
  pub fn new(state: Arc<HealthState>, bind_address: impl Into<String>) -> Self {
    Self {
      state,
      bind_address: bind_address.into(),
    }
  }

  /// Serve until the shutdown broadcast fires.
  #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
  pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
    let app = Router::new()
      .route("/live", get(Self::liveness))
      .route("/ready", get(Self::readiness))
      .with_state(Arc::clone(&self.state));

    let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
    info!("Health server started");

    axum::serve(listener, app)
      .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
      })
      .await?;

    Ok(())
  }

  async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
  }

  async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.is_ready() {
      (StatusCode::OK, "READY")
    } else {
      (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
  }
}
