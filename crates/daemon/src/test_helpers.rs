// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine wiring over fakes for daemon tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rst_adapters::{Action, FakeAction, FakeDevices, FakeSnapshotProvider, StaticCatalog};
use rst_core::{Clock, Job, JobId, JobKind, ResourceId, SequentialIdGen, SystemClock};
use rst_engine::{
    ActionRegistry, Dispatcher, DispatcherConfig, DispatcherDeps, Query, SnapshotManager,
};

use crate::http::AppState;

pub(crate) const SYSTEM_ROOT: &str = "/dev/nvme0n1";

pub(crate) struct Fakes {
    pub actions: HashMap<JobKind, FakeAction>,
    pub snapshots: FakeSnapshotProvider,
    pub devices: FakeDevices,
}

impl Fakes {
    pub fn action(&self, kind: JobKind) -> &FakeAction {
        &self.actions[&kind]
    }
}

/// Dispatcher over fake actions; `customise` may reconfigure any fake.
pub(crate) fn engine<C: Clock>(
    clock: C,
    customise: impl FnOnce(&mut HashMap<JobKind, FakeAction>),
) -> (Dispatcher<C>, Fakes) {
    let mut actions: HashMap<JobKind, FakeAction> = JobKind::ALL
        .into_iter()
        .map(|kind| {
            (kind, FakeAction::new(kind).with_system_root(ResourceId::for_device(SYSTEM_ROOT)))
        })
        .collect();
    customise(&mut actions);

    let snapshots = FakeSnapshotProvider::new();
    let devices = FakeDevices::new(["/dev/sda", "/dev/sdb", "/dev/sdc", "/dev/sdd", SYSTEM_ROOT]);
    let deps = DispatcherDeps {
        registry: ActionRegistry::with_actions(
            actions.values().map(|a| Arc::new(a.clone()) as Arc<dyn Action>),
        ),
        snapshots: Arc::new(SnapshotManager::new(Arc::new(snapshots.clone()), clock.clone(), 4)),
        devices: Some(Arc::new(devices.clone())),
        ids: Arc::new(SequentialIdGen::new()),
        clock,
    };
    let dispatcher = Dispatcher::start(deps, DispatcherConfig::default());
    (dispatcher, Fakes { actions, snapshots, devices })
}

/// HTTP state over fakes.
pub(crate) fn app_state(
    customise: impl FnOnce(&mut HashMap<JobKind, FakeAction>),
) -> (AppState, Fakes) {
    let (dispatcher, fakes) = engine(SystemClock, customise);
    let query =
        Query::new(dispatcher.clone(), Arc::new(fakes.devices.clone()), Arc::new(StaticCatalog));
    (AppState { dispatcher, query }, fakes)
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

/// Poll until the job reaches a terminal state.
pub(crate) async fn wait_terminal<C: Clock>(dispatcher: &Dispatcher<C>, id: &JobId) -> Job {
    for _ in 0..1_000 {
        let job = dispatcher.store().get(id).unwrap();
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {id} did not finish");
}
