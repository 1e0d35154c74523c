// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pre-action snapshot records.

use crate::resource::ResourceId;
use serde::{Deserialize, Serialize};

/// A recoverable pre-action state of one resource.
///
/// `reference` is opaque to the engine; only the snapshot provider that
/// produced it and the rollback action interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub resource: ResourceId,
    pub captured_at_ms: u64,
    pub reference: String,
}
