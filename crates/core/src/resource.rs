// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lockable resource identifiers.
//!
//! Locking is done at whole-device granularity: a job targeting
//! `/dev/sdc1` reserves `/dev/sdc`, so an install on the disk and a
//! filesystem check on one of its partitions can never overlap. Plain
//! filesystem paths (backup images, archive directories) are their own
//! resource after lexical normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of something a job must hold exclusively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

/// Device names whose partitions are written `<disk>p<N>`.
const P_SEPARATED: &[&str] = &["nvme", "mmcblk", "loop", "md", "nbd"];

/// Device names whose partitions are written `<disk><N>`.
const DIGIT_SUFFIXED: &[&str] = &["sd", "hd", "vd", "xvd"];

impl ResourceId {
    /// Resource for a device node or a path, whichever `location` is.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("/dev/") {
            Self::for_device(location)
        } else {
            Self::for_path(location)
        }
    }

    /// Resource for a block device, collapsed to its whole disk.
    pub fn for_device(device: &str) -> Self {
        let Some(name) = device.strip_prefix("/dev/") else {
            return Self(device.to_string());
        };
        if name.contains('/') {
            return Self(device.to_string());
        }
        Self(format!("/dev/{}", whole_disk_name(name)))
    }

    /// Resource for a filesystem path (trailing slashes and `.` segments dropped).
    pub fn for_path(path: &str) -> Self {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty() && *p != ".").collect();
        if parts.is_empty() {
            return Self("/".to_string());
        }
        Self(format!("/{}", parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_device(&self) -> bool {
        self.0.starts_with("/dev/")
    }
}

fn whole_disk_name(name: &str) -> &str {
    if P_SEPARATED.iter().any(|p| name.starts_with(p)) {
        if let Some(idx) = name.rfind('p') {
            let (disk, part) = name.split_at(idx);
            let digits = &part[1..];
            let disk_ends_in_digit = disk.chars().last().is_some_and(|c| c.is_ascii_digit());
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) && disk_ends_in_digit
            {
                return disk;
            }
        }
        return name;
    }
    if DIGIT_SUFFIXED.iter().any(|p| name.starts_with(p)) {
        let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
        if !trimmed.is_empty() {
            return trimmed;
        }
    }
    name
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// De-duplicate while keeping first-seen order.
pub fn dedup_targets(targets: impl IntoIterator<Item = ResourceId>) -> Vec<ResourceId> {
    let mut out: Vec<ResourceId> = Vec::new();
    for t in targets {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
