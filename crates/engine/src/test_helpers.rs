// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::{ActionRegistry, Dispatcher, DispatcherConfig, DispatcherDeps, SnapshotManager};
use rst_adapters::{Action, EventLog, FakeAction, FakeDevices, FakeSnapshotProvider};
use rst_core::{FakeClock, Job, JobId, JobKind, ResourceId, SequentialIdGen};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const SYSTEM_ROOT: &str = "/dev/nvme0n1";

pub(crate) struct Harness {
    pub dispatcher: Dispatcher<FakeClock>,
    pub clock: FakeClock,
    pub snapshots: FakeSnapshotProvider,
    pub devices: FakeDevices,
    pub log: EventLog,
    actions: HashMap<JobKind, FakeAction>,
}

impl Harness {
    /// Every kind backed by an immediately succeeding fake.
    pub fn new() -> Self {
        Self::with(|_| {}, DispatcherConfig::default())
    }

    /// Customise individual fakes before the dispatcher starts.
    pub fn with(
        customise: impl FnOnce(&mut HashMap<JobKind, FakeAction>),
        config: DispatcherConfig,
    ) -> Self {
        let log = EventLog::new();
        let mut actions: HashMap<JobKind, FakeAction> = JobKind::ALL
            .into_iter()
            .map(|kind| (kind, FakeAction::new(kind)))
            .collect();
        customise(&mut actions);
        let actions: HashMap<JobKind, FakeAction> = actions
            .into_iter()
            .map(|(kind, action)| {
                let action = action
                    .with_system_root(ResourceId::for_device(SYSTEM_ROOT))
                    .with_log(log.clone());
                (kind, action)
            })
            .collect();

        let clock = FakeClock::new();
        let snapshots = FakeSnapshotProvider::new().with_log(log.clone());
        let devices =
            FakeDevices::new(["/dev/sda", "/dev/sdb", "/dev/sdc", "/dev/sdd", SYSTEM_ROOT]);
        let registry = ActionRegistry::with_actions(
            actions.values().map(|a| Arc::new(a.clone()) as Arc<dyn Action>),
        );
        let deps = DispatcherDeps {
            registry,
            snapshots: Arc::new(SnapshotManager::new(
                Arc::new(snapshots.clone()),
                clock.clone(),
                4,
            )),
            devices: Some(Arc::new(devices.clone())),
            ids: Arc::new(SequentialIdGen::new()),
            clock: clock.clone(),
        };
        let dispatcher = Dispatcher::start(deps, config);
        Self { dispatcher, clock, snapshots, devices, log, actions }
    }

    pub fn action(&self, kind: JobKind) -> &FakeAction {
        &self.actions[&kind]
    }

    pub fn job(&self, id: &JobId) -> Job {
        self.dispatcher.store().get(id).unwrap()
    }

    /// Poll until the job reaches a terminal state.
    pub async fn wait_terminal(&self, id: &JobId) -> Job {
        for _ in 0..1_000 {
            let job = self.job(id);
            if job.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} did not finish: {:?}", self.job(id));
    }

    /// Poll until the job leaves `Pending`.
    pub async fn wait_running(&self, id: &JobId) -> Job {
        for _ in 0..1_000 {
            let job = self.job(id);
            if job.started_at_ms.is_some() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never started");
    }
}

/// JSON object body from a `json!` literal.
pub(crate) fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// Replace the fake for `kind` with a reconfigured one.
pub(crate) fn tweak(
    actions: &mut HashMap<JobKind, FakeAction>,
    kind: JobKind,
    f: impl FnOnce(FakeAction) -> FakeAction,
) {
    if let Some(action) = actions.remove(&kind) {
        actions.insert(kind, f(action));
    }
}
