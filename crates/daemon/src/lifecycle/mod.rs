// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

mod startup;
pub use startup::{build_state, startup};

use std::fs::File;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::http::{router, AppState};
use crate::supervisor::Supervisor;

/// A started daemon: lock held, engine running, listener bound.
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub state: AppState,
    /// Taken by [`Daemon::run`]
    listener: Option<TcpListener>,
    supervisor: Option<Supervisor>,
    start_time: Instant,
}

impl Daemon {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Serve the API until `signal` resolves, then drain and clean up.
    pub async fn run<F>(mut self, signal: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = match self.listener.take() {
            Some(listener) => {
                let app = router(self.state.clone());
                axum::serve(listener, app).with_graceful_shutdown(signal).await
            }
            None => Ok(()),
        };
        if let Err(e) = &served {
            warn!(error = %e, "HTTP server stopped with error");
        }
        self.shutdown().await;
        served.map_err(LifecycleError::Serve)
    }

    /// Drain jobs, stop background tasks and remove the PID file.
    pub async fn shutdown(self) {
        info!("Shutting down daemon...");

        // 1. Refuse new work and drain running jobs
        let drained = self.state.dispatcher.shutdown(self.config.drain_timeout).await;
        if !drained {
            warn!(
                drain_ms = self.config.drain_timeout.as_millis() as u64,
                "jobs still running at exit"
            );
        }

        // 2. Stop the timeout supervisor
        if let Some(supervisor) = self.supervisor {
            supervisor.stop().await;
        }

        // 3. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Lock file is released automatically when self.lock_file is dropped

        let uptime_secs = self.start_time.elapsed().as_secs();
        info!(uptime_secs, "Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, #[source] std::io::Error),

    #[error("Failed to open log file {0}: {1}")]
    LogFile(PathBuf, #[source] std::io::Error),

    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
