// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation kinds and their typed, validated parameters.
//!
//! Requests arrive as loose JSON objects. [`JobParams::from_request`] is the
//! only way to turn one into parameters, so every job in the store carries
//! parameters that passed the same checks: required fields present, strings
//! non-empty, device nodes and paths syntactically sane.

use crate::resource::ResourceId;
use crate::snapshot::SnapshotRecord;
use crate::JobId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

/// Kind of operation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Install,
    BackupExternal,
    BackupSelf,
    Restore,
    FilesystemCheck,
    Rollback,
}

crate::simple_display! {
    JobKind {
        Install => "install",
        BackupExternal => "backup_external",
        BackupSelf => "backup_self",
        Restore => "restore",
        FilesystemCheck => "filesystem_check",
        Rollback => "rollback",
    }
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        JobKind::Install,
        JobKind::BackupExternal,
        JobKind::BackupSelf,
        JobKind::Restore,
        JobKind::FilesystemCheck,
        JobKind::Rollback,
    ];
}

impl FromStr for JobKind {
    type Err = ValidationError;

    /// Accepts snake_case or kebab-case names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        JobKind::ALL
            .into_iter()
            .find(|k| k.to_string() == normalized)
            .ok_or_else(|| ValidationError::new("kind", format!("unknown operation kind '{}'", s)))
    }
}

/// A request parameter that is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

/// Kind-specific job parameters, immutable once the job exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobParams {
    Install {
        #[serde(rename = "url", alias = "image_url")]
        image_url: String,
        device: String,
    },
    BackupExternal {
        source: String,
        destination: String,
    },
    /// Source is implicitly the running system's root device.
    BackupSelf {
        destination: String,
    },
    Restore {
        source: String,
        destination: String,
    },
    FilesystemCheck {
        device: String,
        #[serde(default)]
        repair: bool,
    },
    /// Synthesized from the snapshot history, never accepted from callers.
    Rollback {
        of_job: JobId,
        snapshots: Vec<SnapshotRecord>,
    },
}

impl JobParams {
    /// Validate a raw request body for `kind`.
    pub fn from_request(kind: JobKind, body: &Map<String, Value>) -> Result<Self, ValidationError> {
        let params = match kind {
            JobKind::Install => {
                let url_field = aliased(body, "url", "image_url")?;
                let image_url = required_str(body, url_field)?;
                let device = required_str(body, "device")?;
                reject_unknown(body, &["url", "image_url", "device"])?;
                image_source(url_field, image_url)?;
                device_node("device", device)?;
                JobParams::Install { image_url: image_url.to_string(), device: device.to_string() }
            }
            JobKind::BackupExternal => {
                let (source, destination) = source_and_destination(body)?;
                location("source", source)?;
                location("destination", destination)?;
                distinct(source, destination)?;
                JobParams::BackupExternal {
                    source: source.to_string(),
                    destination: destination.to_string(),
                }
            }
            JobKind::BackupSelf => {
                let destination = required_str(body, "destination")?;
                reject_unknown(body, &["destination"])?;
                device_node("destination", destination)?;
                JobParams::BackupSelf { destination: destination.to_string() }
            }
            JobKind::Restore => {
                let (source, destination) = source_and_destination(body)?;
                location("source", source)?;
                device_node("destination", destination)?;
                distinct(source, destination)?;
                JobParams::Restore { source: source.to_string(), destination: destination.to_string() }
            }
            JobKind::FilesystemCheck => {
                let device = required_str(body, "device")?;
                let repair = optional_bool(body, "repair")?.unwrap_or(false);
                reject_unknown(body, &["device", "repair"])?;
                device_node("device", device)?;
                JobParams::FilesystemCheck { device: device.to_string(), repair }
            }
            JobKind::Rollback => {
                return Err(ValidationError::new(
                    "kind",
                    "rollback jobs are created through the rollback endpoint",
                ))
            }
        };
        Ok(params)
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobParams::Install { .. } => JobKind::Install,
            JobParams::BackupExternal { .. } => JobKind::BackupExternal,
            JobParams::BackupSelf { .. } => JobKind::BackupSelf,
            JobParams::Restore { .. } => JobKind::Restore,
            JobParams::FilesystemCheck { .. } => JobKind::FilesystemCheck,
            JobParams::Rollback { .. } => JobKind::Rollback,
        }
    }

    /// Request fields that name a device node, for existence checks.
    pub fn device_fields(&self) -> Vec<(&'static str, &str)> {
        let fields: Vec<(&'static str, &str)> = match self {
            JobParams::Install { device, .. } | JobParams::FilesystemCheck { device, .. } => {
                vec![("device", device.as_str())]
            }
            JobParams::BackupExternal { source, destination }
            | JobParams::Restore { source, destination } => {
                vec![("source", source.as_str()), ("destination", destination.as_str())]
            }
            JobParams::BackupSelf { destination } => vec![("destination", destination.as_str())],
            JobParams::Rollback { .. } => Vec::new(),
        };
        fields.into_iter().filter(|(_, value)| value.starts_with("/dev/")).collect()
    }
}

fn required_str<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a str, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ValidationError::new(field, "is required")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::new(field, "must not be empty"))
        }
        Some(Value::String(s)) => Ok(s.trim()),
        Some(_) => Err(ValidationError::new(field, "must be a string")),
    }
}

/// Which of `field` or its older spelling `alias` the body uses.
fn aliased(
    body: &Map<String, Value>,
    field: &'static str,
    alias: &'static str,
) -> Result<&'static str, ValidationError> {
    match (body.contains_key(field), body.contains_key(alias)) {
        (true, true) => Err(ValidationError::new(alias, format!("conflicts with {field}"))),
        (false, true) => Ok(alias),
        _ => Ok(field),
    }
}

fn optional_bool(body: &Map<String, Value>, field: &str) -> Result<Option<bool>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ValidationError::new(field, "must be a boolean")),
    }
}

fn source_and_destination(body: &Map<String, Value>) -> Result<(&str, &str), ValidationError> {
    let source = required_str(body, "source")?;
    let destination = required_str(body, "destination")?;
    reject_unknown(body, &["source", "destination"])?;
    Ok((source, destination))
}

/// Unknown fields are rejected so a misspelled `disk` never silently
/// falls back to some default target.
fn reject_unknown(body: &Map<String, Value>, allowed: &[&str]) -> Result<(), ValidationError> {
    match body.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(unknown) => Err(ValidationError::new(unknown.as_str(), "unknown field")),
        None => Ok(()),
    }
}

fn distinct(source: &str, destination: &str) -> Result<(), ValidationError> {
    if ResourceId::from_location(source) == ResourceId::from_location(destination) {
        return Err(ValidationError::new("destination", "must not be on the same device as source"));
    }
    Ok(())
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.' | ':' | '+' | '@')
}

/// `/dev/<name>` with a conservative character set.
pub fn device_node(field: &str, value: &str) -> Result<(), ValidationError> {
    let Some(name) = value.strip_prefix("/dev/") else {
        return Err(ValidationError::new(field, "must be a device path under /dev/"));
    };
    if name.is_empty() || name.ends_with('/') {
        return Err(ValidationError::new(field, "must name a device"));
    }
    if !value.chars().all(is_path_char) || value.contains("//") {
        return Err(ValidationError::new(field, "contains unsupported characters"));
    }
    if name.split('/').any(|seg| seg == "..") {
        return Err(ValidationError::new(field, "must not contain '..'"));
    }
    Ok(())
}

/// A device node or an absolute filesystem path other than `/`.
pub fn location(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.starts_with("/dev/") {
        return device_node(field, value);
    }
    if !value.starts_with('/') {
        return Err(ValidationError::new(field, "must be an absolute path or device"));
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::new(field, "contains control characters"));
    }
    if value.split('/').any(|seg| seg == "..") {
        return Err(ValidationError::new(field, "must not contain '..'"));
    }
    if ResourceId::for_path(value).as_str() == "/" {
        return Err(ValidationError::new(field, "must not be the filesystem root"));
    }
    Ok(())
}

/// `scheme://rest` URL or an absolute path to a local image.
pub fn image_source(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.starts_with('/') {
        return location(field, value);
    }
    let Some((scheme, rest)) = value.split_once("://") else {
        return Err(ValidationError::new(field, "must be a URL or an absolute path"));
    };
    let scheme_ok = scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(ValidationError::new(field, "has an invalid URL scheme"));
    }
    if rest.is_empty() || rest.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::new(field, "has an invalid URL"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
