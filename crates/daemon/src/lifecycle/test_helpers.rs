// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::config::{Config, FileConfig};

/// Config rooted in `dir`, listening on an ephemeral loopback port.
pub(crate) fn test_config(dir: &Path) -> Config {
    let file = FileConfig {
        listen_addr: Some("127.0.0.1:0".to_string()),
        scripts_dir: Some(dir.join("scripts")),
        system_root: Some("/dev/sda".to_string()),
        drain_timeout_ms: Some(500),
        ..FileConfig::default()
    };
    Config::resolve(dir.join("state"), file).unwrap()
}
