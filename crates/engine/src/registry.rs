// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation kind → action lookup.

use crate::error::EngineError;
use rst_adapters::Action;
use rst_core::JobKind;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<JobKind, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actions(actions: impl IntoIterator<Item = Arc<dyn Action>>) -> Self {
        let mut registry = Self::new();
        for action in actions {
            registry.register(action);
        }
        registry
    }

    /// Register an action under its kind, returning any action it replaced.
    pub fn register(&mut self, action: Arc<dyn Action>) -> Option<Arc<dyn Action>> {
        self.actions.insert(action.kind(), action)
    }

    pub fn resolve(&self, kind: JobKind) -> Result<Arc<dyn Action>, EngineError> {
        self.actions.get(&kind).cloned().ok_or(EngineError::Unsupported(kind))
    }

    /// Registered kinds in canonical order.
    pub fn kinds(&self) -> Vec<JobKind> {
        JobKind::ALL.into_iter().filter(|k| self.actions.contains_key(k)).collect()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry").field("kinds", &self.kinds()).finish()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
