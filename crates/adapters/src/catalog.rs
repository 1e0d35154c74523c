// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog of installable OS images.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroVersion {
    pub version: String,
    pub flavors: Vec<Flavor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distro {
    pub name: String,
    pub versions: Vec<DistroVersion>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only source of the distro/version/flavor tree.
pub trait CatalogProvider: Send + Sync + 'static {
    fn distros(&self) -> Result<Vec<Distro>, CatalogError>;
}

/// Built-in fallback catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog;

impl CatalogProvider for StaticCatalog {
    fn distros(&self) -> Result<Vec<Distro>, CatalogError> {
        Ok(fallback_distros())
    }
}

/// Catalog loaded from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogProvider for FileCatalog {
    fn distros(&self) -> Result<Vec<Distro>, CatalogError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|source| CatalogError::Io { path: self.path.clone(), source })?;
        serde_json::from_str(&raw)
            .map_err(|source| CatalogError::Parse { path: self.path.clone(), source })
    }
}

fn distro(name: &str, versions: &[(&str, &str, &str)]) -> Distro {
    Distro {
        name: name.to_string(),
        versions: versions
            .iter()
            .map(|(version, flavor, url)| DistroVersion {
                version: version.to_string(),
                flavors: vec![Flavor { name: flavor.to_string(), url: url.to_string() }],
            })
            .collect(),
    }
}

pub fn fallback_distros() -> Vec<Distro> {
    vec![
        distro(
            "Ubuntu Server",
            &[
                (
                    "24.04 LTS",
                    "Minimal",
                    "https://releases.ubuntu.com/24.04/ubuntu-24.04-live-server-amd64.iso",
                ),
                (
                    "22.04 LTS",
                    "Minimal",
                    "https://releases.ubuntu.com/22.04/ubuntu-22.04-live-server-amd64.iso",
                ),
            ],
        ),
        distro(
            "Fedora Server",
            &[
                (
                    "40",
                    "Minimal",
                    "https://download.fedoraproject.org/pub/fedora/linux/releases/40/Server/x86_64/iso/Fedora-Server-dvd-x86_64-40-1.14.iso",
                ),
                (
                    "39",
                    "Minimal",
                    "https://download.fedoraproject.org/pub/fedora/linux/releases/39/Server/x86_64/iso/Fedora-Server-dvd-x86_64-39-1.14.iso",
                ),
            ],
        ),
        distro(
            "Arch Linux",
            &[(
                "Latest",
                "Latest ISO",
                "https://mirrors.kernel.org/archlinux/iso/latest/archlinux-x86_64.iso",
            )],
        ),
    ]
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
