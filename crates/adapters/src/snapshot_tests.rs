// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn provider(body: &str) -> (TempDir, ScriptSnapshotProvider) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("snapshot.sh"), body).unwrap();
    let provider = ScriptSnapshotProvider::new(ScriptRunner::new(dir.path()));
    (dir, provider)
}

#[tokio::test]
async fn reference_is_last_stdout_line() {
    let (_dir, provider) = provider("echo 'creating snapshot of' \"$2\"\necho \"snap:$2:1\"\n");
    let reference = provider.capture(&ResourceId::for_device("/dev/sdc")).await.unwrap();
    assert_eq!(reference, "snap:/dev/sdc:1");
}

#[tokio::test]
async fn non_zero_exit_is_a_failure() {
    let (_dir, provider) = provider("echo 'no space left' >&2\nexit 1\n");
    let err = provider.capture(&ResourceId::for_device("/dev/sdc")).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("/dev/sdc"), "{message}");
    assert!(message.contains("no space left"), "{message}");
}

#[tokio::test]
async fn empty_output_is_a_failure() {
    let (_dir, provider) = provider("true\n");
    let err = provider.capture(&ResourceId::for_device("/dev/sdc")).await.unwrap_err();
    assert!(matches!(err, SnapshotError::Failed { .. }));
}

#[tokio::test]
async fn missing_script_is_a_failure() {
    let provider = ScriptSnapshotProvider::new(ScriptRunner::new("/nonexistent"));
    let err = provider.capture(&ResourceId::for_device("/dev/sdc")).await.unwrap_err();
    assert!(matches!(err, SnapshotError::Script(ScriptError::NotFound(_))));
}
