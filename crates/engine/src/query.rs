// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only facade for the API layer.

use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::snapshots::LastAction;
use rst_adapters::{CatalogError, CatalogProvider, Device, DeviceEnumerator, DeviceError, Distro};
use rst_core::{Clock, Job, JobId, ResourceId, SnapshotRecord};
use std::sync::Arc;

/// Status and listing queries. Never waits on a running action; devices
/// and catalog are fetched from their providers on every call.
pub struct Query<C: Clock> {
    dispatcher: Dispatcher<C>,
    devices: Arc<dyn DeviceEnumerator>,
    catalog: Arc<dyn CatalogProvider>,
}

impl<C: Clock> Clone for Query<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            devices: Arc::clone(&self.devices),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<C: Clock> Query<C> {
    pub fn new(
        dispatcher: Dispatcher<C>,
        devices: Arc<dyn DeviceEnumerator>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> Self {
        Self { dispatcher, devices, catalog }
    }

    pub fn job(&self, id: &JobId) -> Result<Job, EngineError> {
        Ok(self.dispatcher.store().get(id)?)
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.dispatcher.store().list()
    }

    pub fn devices(&self) -> Result<Vec<Device>, DeviceError> {
        self.devices.devices()
    }

    pub fn catalog(&self) -> Result<Vec<Distro>, CatalogError> {
        self.catalog.distros()
    }

    pub fn locks(&self) -> Vec<(ResourceId, JobId)> {
        self.dispatcher.locks().held()
    }

    pub fn last_action(&self) -> Option<LastAction> {
        self.dispatcher.snapshots().last_action()
    }

    /// Snapshots kept for the resource holding `location`, oldest first.
    pub fn snapshots(&self, location: &str) -> Vec<SnapshotRecord> {
        self.dispatcher.snapshots().history(&ResourceId::from_location(location))
    }

    pub fn latest_snapshot(&self, location: &str) -> Result<SnapshotRecord, EngineError> {
        self.dispatcher.snapshots().most_recent(&ResourceId::from_location(location))
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
