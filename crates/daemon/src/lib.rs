// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rst-daemon: configuration, lifecycle and HTTP API of the `rstd` server

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod env;
pub mod http;
pub mod lifecycle;
pub mod logging;
pub mod supervisor;

#[cfg(test)]
mod test_helpers;

pub use config::{Config, ConfigError};
pub use http::{router, ApiError, AppState};
pub use lifecycle::{startup, Daemon, LifecycleError};
