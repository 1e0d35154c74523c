// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rst-engine: job orchestration for destructive disk operations

mod dispatcher;
mod error;
mod locks;
mod query;
mod registry;
mod snapshots;
mod store;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherDeps};
pub use error::EngineError;
pub use locks::{Acquire, LockLease, LockTable};
pub use query::Query;
pub use registry::ActionRegistry;
pub use snapshots::{LastAction, SnapshotManager};
pub use store::{JobStore, StoreError};
