// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rst_adapters::FakeAction;

#[test]
fn resolves_registered_kinds() {
    let registry = ActionRegistry::with_actions([
        Arc::new(FakeAction::new(JobKind::Install)) as Arc<dyn Action>,
        Arc::new(FakeAction::new(JobKind::FilesystemCheck)),
    ]);
    assert_eq!(registry.resolve(JobKind::Install).unwrap().kind(), JobKind::Install);
    assert_eq!(registry.kinds(), vec![JobKind::Install, JobKind::FilesystemCheck]);
}

#[test]
fn unknown_kind_is_unsupported() {
    let registry = ActionRegistry::new();
    let err = registry.resolve(JobKind::Restore).err().unwrap();
    assert!(matches!(err, EngineError::Unsupported(JobKind::Restore)));
}

#[test]
fn registering_twice_replaces() {
    let mut registry = ActionRegistry::new();
    assert!(registry.register(Arc::new(FakeAction::new(JobKind::Install))).is_none());
    assert!(registry.register(Arc::new(FakeAction::new(JobKind::Install))).is_some());
    assert_eq!(registry.kinds(), vec![JobKind::Install]);
}
