// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job admission and the worker pool.
//!
//! `submit` validates, reserves resources and records a `Pending` job, then
//! returns without waiting. A scheduler task hands queued jobs to at most
//! `workers` concurrent executions. Each execution owns its job's
//! [`LockLease`], so resources are released on every exit path.

use crate::error::EngineError;
use crate::locks::{Acquire, LockLease, LockTable};
use crate::registry::ActionRegistry;
use crate::snapshots::SnapshotManager;
use crate::store::{JobStore, StoreError};
use parking_lot::{Mutex, RwLock};
use rst_adapters::{Action, DeviceEnumerator};
use rst_core::{
    ActionError, ActionErrorKind, CancelOutcome, CancelReason, Clock, FailureKind, IdGen, Job,
    JobError, JobId, JobKind, JobParams, JobState, ResourceId, SnapshotRecord, Transition,
    ValidationError,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Tunables for the worker pool.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum concurrently running jobs (at least one)
    pub workers: usize,
    /// Reject device parameters the enumerator does not know
    pub verify_devices: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { workers: 2, verify_devices: true }
    }
}

/// Collaborators the dispatcher drives.
pub struct DispatcherDeps<C: Clock> {
    pub registry: ActionRegistry,
    pub snapshots: Arc<SnapshotManager<C>>,
    pub devices: Option<Arc<dyn DeviceEnumerator>>,
    pub ids: Arc<dyn IdGen>,
    pub clock: C,
}

struct QueuedJob {
    id: JobId,
    action: Arc<dyn Action>,
    lease: LockLease,
}

struct Shared<C: Clock> {
    store: JobStore,
    locks: LockTable,
    registry: ActionRegistry,
    snapshots: Arc<SnapshotManager<C>>,
    devices: Option<Arc<dyn DeviceEnumerator>>,
    ids: Arc<dyn IdGen>,
    clock: C,
    config: DispatcherConfig,
    /// Cancellation signals of jobs a worker has claimed
    running: Mutex<HashMap<JobId, CancellationToken>>,
    /// Cleared at shutdown; submissions hold the read side while enqueueing
    accepting: RwLock<bool>,
    queue: mpsc::UnboundedSender<QueuedJob>,
    stop: CancellationToken,
    tracker: TaskTracker,
}

/// Handle to the orchestration engine. Cheap to clone.
pub struct Dispatcher<C: Clock> {
    shared: Arc<Shared<C>>,
}

impl<C: Clock> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<C: Clock> Dispatcher<C> {
    /// Build the dispatcher and spawn its scheduler on the current runtime.
    pub fn start(deps: DispatcherDeps<C>, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let workers = config.workers.max(1);
        let shared = Arc::new(Shared {
            store: JobStore::new(),
            locks: LockTable::new(),
            registry: deps.registry,
            snapshots: deps.snapshots,
            devices: deps.devices,
            ids: deps.ids,
            clock: deps.clock,
            config: DispatcherConfig { workers, ..config },
            running: Mutex::new(HashMap::new()),
            accepting: RwLock::new(true),
            queue: tx,
            stop: CancellationToken::new(),
            tracker: TaskTracker::new(),
        });
        info!(workers, kinds = ?shared.registry.kinds(), "dispatcher started");
        tokio::spawn(schedule(Arc::clone(&shared), rx, Arc::new(Semaphore::new(workers))));
        Self { shared }
    }

    pub fn store(&self) -> &JobStore {
        &self.shared.store
    }

    pub fn locks(&self) -> &LockTable {
        &self.shared.locks
    }

    pub fn snapshots(&self) -> &SnapshotManager<C> {
        &self.shared.snapshots
    }

    pub fn workers(&self) -> usize {
        self.shared.config.workers
    }

    pub fn is_accepting(&self) -> bool {
        *self.shared.accepting.read()
    }

    /// Validate and enqueue a job from a raw request body.
    ///
    /// Returns as soon as the job is recorded; execution outcomes are only
    /// visible through the store.
    pub fn submit(&self, kind: JobKind, body: &Map<String, Value>) -> Result<JobId, EngineError> {
        let params = JobParams::from_request(kind, body)?;
        self.verify_devices(&params)?;
        self.enqueue(params)
    }

    /// Submit a rollback of the last destructive job.
    pub fn rollback(&self) -> Result<JobId, EngineError> {
        let last = self.shared.snapshots.last_action().ok_or(EngineError::NothingToRollback)?;
        info!(of_job = %last.job_id, "rollback requested");
        self.enqueue(JobParams::Rollback { of_job: last.job_id, snapshots: last.snapshots })
    }

    /// Cancel a job. Pending jobs stop immediately; running ones are asked to.
    pub fn cancel(&self, id: &JobId, reason: CancelReason) -> Result<CancelOutcome, EngineError> {
        let shared = &self.shared;
        let outcome = shared.locks.settle(
            id,
            || shared.store.request_cancel(id, reason, shared.clock.epoch_ms()),
            |outcome| matches!(outcome, Ok(CancelOutcome::Cancelled)),
        )?;
        match outcome {
            CancelOutcome::Cancelled => {
                info!(job_id = %id, %reason, "pending job cancelled");
            }
            CancelOutcome::Requested => {
                if let Some(token) = shared.running.lock().get(id) {
                    token.cancel();
                }
                info!(job_id = %id, %reason, "cancellation requested");
            }
            CancelOutcome::AlreadyRequested => {
                debug!(job_id = %id, "cancellation already requested");
            }
            CancelOutcome::AlreadyFinished => return Err(EngineError::AlreadyFinished(id.clone())),
        }
        Ok(outcome)
    }

    /// Stop accepting work, cancel queued jobs, ask running ones to stop,
    /// and wait up to `drain` for them to finish.
    ///
    /// Returns `true` when every in-flight job finished within `drain`.
    pub async fn shutdown(&self, drain: Duration) -> bool {
        let shared = &self.shared;
        *shared.accepting.write() = false;
        shared.stop.cancel();

        let now = shared.clock.epoch_ms();
        for id in shared.store.pending() {
            let outcome = shared.locks.settle(
                &id,
                || shared.store.request_cancel(&id, CancelReason::Shutdown, now),
                |outcome| matches!(outcome, Ok(CancelOutcome::Cancelled)),
            );
            if let Ok(CancelOutcome::Cancelled) = outcome {
                info!(job_id = %id, "queued job cancelled at shutdown");
            }
        }
        let running: Vec<JobId> = shared.running.lock().keys().cloned().collect();
        for id in running {
            let _ = self.cancel(&id, CancelReason::Shutdown);
        }

        shared.tracker.close();
        let drained = tokio::time::timeout(drain, shared.tracker.wait()).await.is_ok();
        if drained {
            info!("dispatcher drained");
        } else {
            let in_flight = shared.tracker.len();
            warn!(in_flight, "drain timeout elapsed with jobs still running");
        }
        drained
    }

    /// Job currently holding `resource`.
    pub fn holder(&self, resource: &ResourceId) -> Option<JobId> {
        self.shared.locks.holder(resource)
    }

    fn verify_devices(&self, params: &JobParams) -> Result<(), EngineError> {
        if !self.shared.config.verify_devices {
            return Ok(());
        }
        let Some(devices) = self.shared.devices.as_ref() else {
            return Ok(());
        };
        for (field, path) in params.device_fields() {
            let found = devices
                .exists(path)
                .map_err(|e| EngineError::Internal(format!("device enumeration failed: {e}")))?;
            if !found {
                return Err(ValidationError::new(field, "device not found").into());
            }
        }
        Ok(())
    }

    fn enqueue(&self, params: JobParams) -> Result<JobId, EngineError> {
        let shared = &self.shared;
        let accepting = shared.accepting.read();
        if !*accepting {
            return Err(EngineError::ShuttingDown);
        }
        let kind = params.kind();
        let action = shared.registry.resolve(kind)?;
        let targets = action.targets(&params)?;
        let id = self.fresh_id();

        let lease = match shared.locks.try_acquire(&id, &targets) {
            Acquire::Granted(lease) => lease,
            Acquire::Denied { resource, held_by } => {
                info!(%kind, %resource, %held_by, "submission rejected: resource busy");
                return Err(EngineError::Conflict { resource, held_by });
            }
        };

        let job = Job::new(id.clone(), params, targets, shared.clock.epoch_ms());
        let target_list: Vec<String> = job.targets.iter().map(|t| t.to_string()).collect();
        shared.store.insert(job)?;
        if shared.queue.send(QueuedJob { id: id.clone(), action, lease }).is_err() {
            let now = shared.clock.epoch_ms();
            let _ = shared.store.request_cancel(&id, CancelReason::Shutdown, now);
            return Err(EngineError::Internal("scheduler is not running".to_string()));
        }
        drop(accepting);
        info!(job_id = %id, %kind, targets = ?target_list, "job accepted");
        Ok(id)
    }

    /// Draw ids until one is unused.
    fn fresh_id(&self) -> JobId {
        loop {
            let id = JobId::new(self.shared.ids.next_id());
            if !self.shared.store.contains(&id) {
                return id;
            }
            warn!(job_id = %id, "generated job id collided, drawing again");
        }
    }
}

async fn schedule<C: Clock>(
    shared: Arc<Shared<C>>,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    slots: Arc<Semaphore>,
) {
    loop {
        let queued = tokio::select! {
            next = rx.recv() => match next {
                Some(queued) => queued,
                None => break,
            },
            _ = shared.stop.cancelled() => break,
        };
        let permit = tokio::select! {
            permit = Arc::clone(&slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = shared.stop.cancelled() => break,
        };
        let worker = Arc::clone(&shared);
        shared.tracker.spawn(async move {
            run_job(&worker, queued).await;
            drop(permit);
        });
    }
    // Anything still queued was cancelled by shutdown; dropping releases leases
    rx.close();
    while rx.try_recv().is_ok() {}
    debug!("scheduler stopped");
}

async fn run_job<C: Clock>(shared: &Shared<C>, queued: QueuedJob) {
    let QueuedJob { id, action, lease } = queued;
    let token = CancellationToken::new();
    shared.running.lock().insert(id.clone(), token.clone());

    let start = Transition::Start { at_ms: shared.clock.epoch_ms() };
    let job = match shared.store.transition(&id, start) {
        Ok(job) => job,
        Err(e) => {
            debug!(job_id = %id, error = %e, "job no longer pending, skipping");
            shared.running.lock().remove(&id);
            return;
        }
    };
    if job.cancellation.is_some() {
        token.cancel();
    }
    let started = Instant::now();
    info!(job_id = %id, kind = %job.kind, "job started");

    let (transition, invoked) = execute(shared, &job, action, &token).await;
    let at_ms = transition_at(&transition);
    let state = transition.target();
    let snapshots = transition_snapshots(&transition).to_vec();

    // Outcome, undo bookkeeping and lock release are published together
    let recorded = lease.settle(|| {
        let done = shared.store.transition(&id, transition)?;
        if invoked && !snapshots.is_empty() {
            shared.snapshots.record_completed(&id, done.kind, snapshots);
        }
        if let (JobParams::Rollback { of_job, .. }, JobState::Succeeded) = (&done.params, done.state)
        {
            shared.snapshots.consume(of_job);
        }
        Ok::<_, StoreError>(done)
    });
    shared.running.lock().remove(&id);

    match recorded {
        Ok(done) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match done.result.as_ref().and_then(|r| r.error()) {
                None => info!(job_id = %id, kind = %done.kind, elapsed_ms, "job succeeded"),
                Some(err) => warn!(
                    job_id = %id,
                    kind = %done.kind,
                    %state,
                    failure = %err.kind,
                    error = %err.message,
                    elapsed_ms,
                    "job finished unsuccessfully"
                ),
            }
        }
        Err(e) => error!(job_id = %id, at_ms, error = %e, "failed to record job outcome"),
    }
}

/// Snapshot, invoke and classify. The flag reports whether the action ran.
async fn execute<C: Clock>(
    shared: &Shared<C>,
    job: &Job,
    action: Arc<dyn Action>,
    token: &CancellationToken,
) -> (Transition, bool) {
    let mut snapshots = Vec::new();
    if action.is_destructive(&job.params) {
        for target in &job.targets {
            match shared.snapshots.capture(target).await {
                Ok(record) => snapshots.push(record),
                Err(e) => {
                    let error = JobError::new(FailureKind::SnapshotFailure, e.to_string());
                    let at_ms = shared.clock.epoch_ms();
                    return (Transition::Fail { at_ms, error, snapshots }, false);
                }
            }
        }
    }

    if token.is_cancelled() {
        let reason = cancel_reason(shared, &job.id);
        let error = JobError::new(reason.failure_kind(), "cancelled before the action started");
        let at_ms = shared.clock.epoch_ms();
        return (Transition::Cancel { at_ms, error, snapshots }, false);
    }

    let params = job.params.clone();
    let signal = token.clone();
    let handle = tokio::spawn(async move { action.execute(&params, signal).await });
    let result = match handle.await {
        Ok(result) => result,
        Err(join) if join.is_panic() => Err(ActionError::execution("action panicked")),
        Err(_) => Err(ActionError::execution("action task was aborted")),
    };

    let at_ms = shared.clock.epoch_ms();
    let transition = match result {
        Ok(output) => Transition::Succeed { at_ms, output, snapshots },
        Err(e) if e.kind == ActionErrorKind::Cancelled && token.is_cancelled() => {
            let reason = cancel_reason(shared, &job.id);
            let error = JobError::new(reason.failure_kind(), e.message);
            Transition::Cancel { at_ms, error, snapshots }
        }
        Err(e) => Transition::Fail { at_ms, error: e.into(), snapshots },
    };
    (transition, true)
}

fn cancel_reason<C: Clock>(shared: &Shared<C>, id: &JobId) -> CancelReason {
    shared
        .store
        .get(id)
        .ok()
        .and_then(|job| job.cancel_reason())
        .unwrap_or(CancelReason::User)
}

fn transition_at(transition: &Transition) -> u64 {
    match transition {
        Transition::Start { at_ms }
        | Transition::Succeed { at_ms, .. }
        | Transition::Fail { at_ms, .. }
        | Transition::Cancel { at_ms, .. } => *at_ms,
    }
}

fn transition_snapshots(transition: &Transition) -> &[SnapshotRecord] {
    match transition {
        Transition::Start { .. } => &[],
        Transition::Succeed { snapshots, .. }
        | Transition::Fail { snapshots, .. }
        | Transition::Cancel { snapshots, .. } => snapshots,
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
