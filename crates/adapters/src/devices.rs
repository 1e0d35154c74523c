// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block device enumeration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A block device visible to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device node, e.g. `/dev/sdc`
    pub name: String,
    pub description: String,
    pub is_removable: bool,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only view of the host's block devices, queried on demand.
pub trait DeviceEnumerator: Send + Sync + 'static {
    fn devices(&self) -> Result<Vec<Device>, DeviceError>;

    /// Whether `path` names a known device or one of its partitions.
    fn exists(&self, path: &str) -> Result<bool, DeviceError> {
        let devices = self.devices()?;
        Ok(devices.iter().any(|d| path == d.name || is_partition_of(path, &d.name)))
    }
}

fn is_partition_of(path: &str, disk: &str) -> bool {
    path.strip_prefix(disk).is_some_and(|rest| {
        let digits = rest.strip_prefix('p').unwrap_or(rest);
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    })
}

/// Virtual devices that are never install or backup targets.
const SKIPPED_PREFIXES: &[&str] = &["loop", "ram", "zram", "dm-"];

/// Enumerates devices from sysfs.
#[derive(Debug, Clone)]
pub struct SysfsDevices {
    block_dir: PathBuf,
}

impl SysfsDevices {
    pub fn new() -> Self {
        Self::with_root("/sys/block")
    }

    /// Read from an alternate sysfs block directory.
    pub fn with_root(block_dir: impl Into<PathBuf>) -> Self {
        Self { block_dir: block_dir.into() }
    }

    fn describe(dir: &Path) -> String {
        let vendor = read_trimmed(&dir.join("device/vendor"));
        let model = read_trimmed(&dir.join("device/model"));
        let mut parts: Vec<String> =
            [vendor, model].into_iter().flatten().filter(|s| !s.is_empty()).collect();
        if let Some(size) = read_trimmed(&dir.join("size")).and_then(|s| s.parse::<u64>().ok()) {
            // sysfs reports 512-byte sectors regardless of the logical block size
            parts.push(human_size(size.saturating_mul(512)));
        }
        if parts.is_empty() {
            "Unknown device".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl Default for SysfsDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for SysfsDevices {
    fn devices(&self) -> Result<Vec<Device>, DeviceError> {
        let entries = fs::read_dir(&self.block_dir)
            .map_err(|source| DeviceError::Io { path: self.block_dir.clone(), source })?;
        let mut devices = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if SKIPPED_PREFIXES.iter().any(|p| name.starts_with(p)) {
                continue;
            }
            let dir = entry.path();
            let is_removable = read_trimmed(&dir.join("removable")).as_deref() == Some("1");
            devices.push(Device {
                name: format!("/dev/{name}"),
                description: Self::describe(&dir),
                is_removable,
            });
        }
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Device holding `/` according to a `/proc/self/mounts` listing.
pub fn detect_root_device(mounts: &str) -> Option<String> {
    mounts.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let source = fields.next()?;
        let target = fields.next()?;
        (target == "/" && source.starts_with("/dev/")).then(|| source.to_string())
    })
}

/// Root device of the running system, read from `/proc/self/mounts`.
pub fn system_root_device() -> Option<String> {
    fs::read_to_string("/proc/self/mounts").ok().as_deref().and_then(detect_root_device)
}

#[cfg(test)]
#[path = "devices_tests.rs"]
mod tests;
