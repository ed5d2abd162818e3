//! Orchestrator context — owns the registry and every collaborator
//!
//! One instance is built at startup and shared behind an `Arc` by the poll
//! loop and the command source. All registry access goes through a single
//! mutex that is never held across an RPC call: callers copy out what they
//! need, release, call, then re-acquire to apply results.

use chrono::Utc;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

use super::snapshot::{ChainView, OrchestratorSnapshot, RuntimeView};
use crate::catalog::{Catalog, ChainDescriptor};
use crate::config::ProtocolConfig;
use crate::error::{Result, SwitchboardError};
use crate::process::{InstallLayout, ProcessControl};
use crate::registry::{ChainStateRegistry, Lifecycle};
use crate::rpc::NodeRpc;

pub struct Orchestrator<P: ProcessControl, R: NodeRpc> {
    pub(super) catalog: Arc<Catalog>,
    pub(super) layout: InstallLayout,
    pub(super) processes: P,
    pub(super) rpc: R,
    pub(super) protocol: ProtocolConfig,
    pub(super) registry: Mutex<ChainStateRegistry<P::Handle>>,
    pub(super) next_launch_seq: AtomicU64,
    snapshot_tx: watch::Sender<OrchestratorSnapshot>,
}

impl<P: ProcessControl, R: NodeRpc> Orchestrator<P, R> {
    pub fn new(
        catalog: Arc<Catalog>,
        layout: InstallLayout,
        processes: P,
        rpc: R,
        protocol: ProtocolConfig,
    ) -> Self {
        let initial = OrchestratorSnapshot {
            seq: 0,
            taken_at: Utc::now(),
            chains: catalog
                .iter()
                .enumerate()
                .map(|(index, descriptor)| ChainView {
                    index,
                    descriptor: descriptor.clone(),
                    runtime: None,
                })
                .collect(),
        };
        let (snapshot_tx, _) = watch::channel(initial);

        Self {
            catalog,
            layout,
            processes,
            rpc,
            protocol,
            registry: Mutex::new(ChainStateRegistry::new()),
            next_launch_seq: AtomicU64::new(1),
            snapshot_tx,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn processes(&self) -> &P {
        &self.processes
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Resolve a catalog index
    pub fn chain(&self, index: usize) -> Result<&ChainDescriptor> {
        self.catalog
            .get(index)
            .ok_or_else(|| SwitchboardError::UnknownChain(format!("#{index}")))
    }

    /// Resolve a chain identity to its catalog index
    pub fn index_of(&self, id: &str) -> Result<usize> {
        self.catalog
            .lookup(id)
            .ok_or_else(|| SwitchboardError::UnknownChain(id.to_string()))
    }

    /// Receiver that changes whenever a display refresh is requested
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Last published snapshot
    pub fn published(&self) -> OrchestratorSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Fresh view of the registry without publishing it
    pub async fn snapshot(&self) -> OrchestratorSnapshot {
        let chains = self.chain_views().await;
        OrchestratorSnapshot {
            seq: self.snapshot_tx.borrow().seq,
            taken_at: Utc::now(),
            chains,
        }
    }

    /// Build a snapshot and publish it to every display sink
    pub async fn request_refresh(&self) {
        let chains = self.chain_views().await;
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.seq += 1;
            snapshot.taken_at = Utc::now();
            snapshot.chains = chains;
        });
    }

    pub async fn lifecycle(&self, id: &str) -> Option<Lifecycle> {
        self.registry.lock().await.get(id).map(|state| state.lifecycle)
    }

    pub async fn auto_mine(&self, id: &str) -> Option<bool> {
        self.registry.lock().await.get(id).map(|state| state.auto_mine)
    }

    pub async fn launched_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    async fn chain_views(&self) -> Vec<ChainView> {
        let registry = self.registry.lock().await;
        self.catalog
            .iter()
            .enumerate()
            .map(|(index, descriptor)| ChainView {
                index,
                descriptor: descriptor.clone(),
                runtime: registry.get(&descriptor.id).map(|state| RuntimeView {
                    lifecycle: state.lifecycle,
                    auto_mine: state.auto_mine,
                    pid: self.processes.pid(&state.process),
                    block_count: state.block_count,
                }),
            })
            .collect()
    }

    /// Kill every recorded node and empty the registry. Returns how many
    /// processes were signalled; ones already gone are tolerated.
    pub async fn shutdown(&self) -> usize {
        let entries = self.registry.lock().await.drain();
        let mut killed = 0;

        for mut state in entries {
            match self.processes.terminate(&mut state.process) {
                Ok(()) => killed += 1,
                Err(e) if e.is_already_gone() => {
                    debug!(chain = %state.id, "node already exited before shutdown")
                }
                Err(e) => error!(chain = %state.id, error = %e, "failed to kill node during shutdown"),
            }
        }

        if killed > 0 {
            info!(killed, "terminated remaining nodes");
        }
        self.request_refresh().await;
        killed
    }
}
