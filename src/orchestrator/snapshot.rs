//! Read-only views handed to display sinks

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{ChainDescriptor, ChainRole};
use crate::registry::Lifecycle;

/// Runtime half of a chain view; absent when the chain is not launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuntimeView {
    pub lifecycle: Lifecycle,
    pub auto_mine: bool,
    pub pid: Option<u32>,
    pub block_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainView {
    pub index: usize,
    pub descriptor: ChainDescriptor,
    pub runtime: Option<RuntimeView>,
}

impl ChainView {
    pub fn is_launched(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn lifecycle(&self) -> Option<Lifecycle> {
        self.runtime.map(|r| r.lifecycle)
    }
}

/// Catalog order paired with runtime state, published on every refresh
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorSnapshot {
    /// Incremented on every published refresh
    pub seq: u64,
    pub taken_at: DateTime<Utc>,
    pub chains: Vec<ChainView>,
}

impl OrchestratorSnapshot {
    pub fn chain(&self, id: &str) -> Option<&ChainView> {
        self.chains.iter().find(|view| view.descriptor.id == id)
    }

    pub fn mainchain(&self) -> Option<&ChainView> {
        self.chains
            .iter()
            .find(|view| view.descriptor.role == ChainRole::Mainchain)
    }

    pub fn running_count(&self) -> usize {
        self.chains
            .iter()
            .filter(|view| view.lifecycle() == Some(Lifecycle::Running))
            .count()
    }
}
