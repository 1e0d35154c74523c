// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rst-adapters: boundaries to the scripts, devices and catalog the engine drives

pub mod action;
pub mod actions;
pub mod catalog;
pub mod devices;
pub mod script;
pub mod snapshot;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use action::{expect_kind, targets_for, writes_targets, Action};
pub use actions::script_actions;
pub use catalog::{
    CatalogError, CatalogProvider, Distro, DistroVersion, FileCatalog, Flavor, StaticCatalog,
};
pub use devices::{
    detect_root_device, system_root_device, Device, DeviceEnumerator, DeviceError, SysfsDevices,
};
pub use script::{ScriptArgs, ScriptError, ScriptOutput, ScriptRunner};
pub use snapshot::{ScriptSnapshotProvider, SnapshotError, SnapshotProvider};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{EventLog, FakeAction, FakeDevices, FakeSnapshotProvider};
