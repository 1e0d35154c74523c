// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory collaborators for tests.

use crate::action::{targets_for, writes_targets, Action};
use crate::devices::{Device, DeviceEnumerator, DeviceError};
use crate::snapshot::{SnapshotError, SnapshotProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use rst_core::{ActionError, ActionOutput, JobKind, JobParams, ResourceId, ValidationError};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Ordered record of what the fakes observed, shared between them.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.inner.lock().push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().clone()
    }
}

struct FakeActionState {
    calls: Vec<JobParams>,
    result: Result<ActionOutput, ActionError>,
    destructive: Option<bool>,
    honors_cancel: bool,
    panics: bool,
}

/// Scriptable action.
///
/// By default it succeeds immediately. A gated action blocks in `execute`
/// until [`FakeAction::release`] is called, which lets tests observe the
/// `Running` state and exercise cancellation.
#[derive(Clone)]
pub struct FakeAction {
    kind: JobKind,
    system_root: Option<ResourceId>,
    gate: Option<Arc<Semaphore>>,
    log: EventLog,
    inner: Arc<Mutex<FakeActionState>>,
}

impl FakeAction {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            system_root: None,
            gate: None,
            log: EventLog::new(),
            inner: Arc::new(Mutex::new(FakeActionState {
                calls: Vec::new(),
                result: Ok(ActionOutput::new(Some(0), json!({ "fake": kind.to_string() }))),
                destructive: None,
                honors_cancel: false,
                panics: false,
            })),
        }
    }

    /// Block `execute` until released.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Stop early with `Cancelled` when cancellation is requested while gated.
    pub fn honoring_cancel(self) -> Self {
        self.inner.lock().honors_cancel = true;
        self
    }

    pub fn failing(self, error: ActionError) -> Self {
        self.inner.lock().result = Err(error);
        self
    }

    pub fn succeeding_with(self, output: ActionOutput) -> Self {
        self.inner.lock().result = Ok(output);
        self
    }

    pub fn destructive(self, destructive: bool) -> Self {
        self.inner.lock().destructive = Some(destructive);
        self
    }

    pub fn panicking(self) -> Self {
        self.inner.lock().panics = true;
        self
    }

    pub fn with_system_root(mut self, root: ResourceId) -> Self {
        self.system_root = Some(root);
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    /// Let one gated `execute` call finish.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<JobParams> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// Poll until `execute` has been entered `n` times.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..2_000 {
            if self.call_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Action for FakeAction {
    fn kind(&self) -> JobKind {
        self.kind
    }

    fn is_destructive(&self, params: &JobParams) -> bool {
        self.inner.lock().destructive.unwrap_or_else(|| writes_targets(params))
    }

    fn targets(&self, params: &JobParams) -> Result<Vec<ResourceId>, ValidationError> {
        let targets = targets_for(params, self.system_root.as_ref());
        if targets.is_empty() {
            return Err(ValidationError::new("targets", "must not be empty"));
        }
        Ok(targets)
    }

    #[allow(clippy::panic)]
    async fn execute(
        &self,
        params: &JobParams,
        cancel: CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        let (result, honors_cancel, panics) = {
            let mut state = self.inner.lock();
            state.calls.push(params.clone());
            (state.result.clone(), state.honors_cancel, state.panics)
        };
        self.log.push(format!("execute:{}", self.kind));
        if let Some(gate) = &self.gate {
            tokio::select! {
                permit = gate.acquire() => {
                    if let Ok(permit) = permit {
                        permit.forget();
                    }
                }
                _ = cancel.cancelled(), if honors_cancel => {
                    return Err(ActionError::cancelled("fake action stopped"));
                }
            }
        }
        if panics {
            panic!("fake action panicked");
        }
        result
    }
}

/// Snapshot provider returning `snap:<resource>:<n>` references.
#[derive(Debug, Clone, Default)]
pub struct FakeSnapshotProvider {
    log: EventLog,
    failing: Arc<Mutex<HashSet<ResourceId>>>,
    captured: Arc<Mutex<Vec<ResourceId>>>,
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl FakeSnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    /// Make captures of `resource` fail.
    pub fn fail_for(&self, resource: &str) {
        self.failing.lock().insert(ResourceId::from_location(resource));
    }

    pub fn captured(&self) -> Vec<ResourceId> {
        self.captured.lock().clone()
    }

    /// Block captures until [`FakeSnapshotProvider::release`] is called.
    pub fn hold(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held capture finish.
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl SnapshotProvider for FakeSnapshotProvider {
    async fn capture(&self, resource: &ResourceId) -> Result<String, SnapshotError> {
        self.log.push(format!("snapshot:{resource}"));
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if self.failing.lock().contains(resource) {
            return Err(SnapshotError::Failed {
                resource: resource.clone(),
                reason: "fake snapshot failure".to_string(),
            });
        }
        let mut captured = self.captured.lock();
        captured.push(resource.clone());
        Ok(format!("snap:{resource}:{}", captured.len()))
    }
}

/// Fixed device list.
#[derive(Debug, Clone, Default)]
pub struct FakeDevices {
    devices: Arc<Mutex<Vec<Device>>>,
    broken: Arc<Mutex<bool>>,
}

impl FakeDevices {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let devices = names
            .into_iter()
            .map(|name| Device {
                name: name.to_string(),
                description: format!("Fake disk {name}"),
                is_removable: false,
            })
            .collect();
        Self { devices: Arc::new(Mutex::new(devices)), broken: Arc::new(Mutex::new(false)) }
    }

    pub fn add(&self, device: Device) {
        self.devices.lock().push(device);
    }

    /// Make every enumeration fail.
    pub fn break_enumeration(&self) {
        *self.broken.lock() = true;
    }
}

impl DeviceEnumerator for FakeDevices {
    fn devices(&self) -> Result<Vec<Device>, DeviceError> {
        if *self.broken.lock() {
            return Err(DeviceError::Io {
                path: "/sys/block".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "fake"),
            });
        }
        Ok(self.devices.lock().clone())
    }
}
