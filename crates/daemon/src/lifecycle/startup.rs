// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use rst_adapters::{
    script_actions, CatalogProvider, DeviceEnumerator, FileCatalog, ScriptRunner,
    ScriptSnapshotProvider, StaticCatalog, SysfsDevices,
};
use rst_core::{NanoIdGen, ResourceId, SystemClock};
use rst_engine::{
    ActionRegistry, Dispatcher, DispatcherConfig, DispatcherDeps, Query, SnapshotManager,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{Daemon, LifecycleError};
use crate::config::Config;
use crate::http::AppState;
use crate::supervisor::{Policy, Supervisor};

/// Start the daemon
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    match startup_inner(config).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock;
            // the PID file belongs to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<Daemon, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    // 3. Build adapters and engine
    if !config.scripts_dir.is_dir() {
        warn!(path = %config.scripts_dir.display(), "scripts directory missing; jobs will fail");
    }
    let state = build_state(config);

    // 4. Timeout and retention supervisor
    let policy = Policy { job_timeout: config.job_timeout, job_retention: config.job_retention };
    let supervisor = (!policy.is_empty()).then(|| {
        Supervisor::spawn(state.dispatcher.clone(), SystemClock, policy, policy.interval())
    });

    // 5. Bind (LAST - only after all validation passes)
    let listener = match TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            state.dispatcher.shutdown(Duration::ZERO).await;
            if let Some(supervisor) = supervisor {
                supervisor.stop().await;
            }
            return Err(LifecycleError::BindFailed(config.listen_addr, e));
        }
    };
    let addr = listener.local_addr()?;
    info!(%addr, workers = config.workers, "daemon listening");

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        state,
        listener: Some(listener),
        supervisor,
        start_time: Instant::now(),
    })
}

/// Wire the script-backed actions, snapshot provider, device enumerator
/// and catalog into a running dispatcher.
pub fn build_state(config: &Config) -> AppState {
    let runner = ScriptRunner::new(config.scripts_dir.clone());
    let system_root = ResourceId::for_device(&config.system_root_device());
    info!(system_root = %system_root, scripts = %config.scripts_dir.display(), "building engine");

    let registry = ActionRegistry::with_actions(script_actions(&runner, &system_root));
    let snapshots = SnapshotManager::new(
        Arc::new(ScriptSnapshotProvider::new(runner)),
        SystemClock,
        config.snapshot_history,
    );
    let devices: Arc<dyn DeviceEnumerator> = Arc::new(SysfsDevices::new());
    let catalog: Arc<dyn CatalogProvider> = match &config.catalog_path {
        Some(path) => Arc::new(FileCatalog::new(path.clone())),
        None => Arc::new(StaticCatalog),
    };

    let dispatcher = Dispatcher::start(
        DispatcherDeps {
            registry,
            snapshots: Arc::new(snapshots),
            devices: Some(Arc::clone(&devices)),
            ids: Arc::new(NanoIdGen),
            clock: SystemClock,
        },
        DispatcherConfig { workers: config.workers, verify_devices: config.verify_devices },
    );
    let query = Query::new(dispatcher.clone(), devices, catalog);
    AppState { dispatcher, query }
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove PID/lock file
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
