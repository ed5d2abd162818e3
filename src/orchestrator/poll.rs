//! Health/sync poll
//!
//! Each tick reconciles the registry against the OS process table, probes
//! every remaining chain over RPC, advances its lifecycle and fires the
//! protocol side effects (sidechain bootstrap on the mainchain, `refreshbmm`
//! on sidechains).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::Orchestrator;
use crate::catalog::{ChainDescriptor, ChainRole};
use crate::coordination::ShutdownSignal;
use crate::error::{Result, SwitchboardError};
use crate::process::ProcessControl;
use crate::registry::Lifecycle;
use crate::rpc::{methods, NodeRpc};

/// What one tick changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries dropped because their process was gone
    pub removed: Vec<String>,
    /// Entries promoted to running
    pub promoted: Vec<String>,
    /// Entries that stopped answering while running
    pub demoted: Vec<String>,
    /// Sidechain proposals and activation blocks were requested this tick
    pub bootstrap_issued: bool,
    /// Successful `refreshbmm` calls
    pub bmm_refreshed: usize,
}

impl TickReport {
    /// True when nothing worth logging happened
    pub fn is_quiet(&self) -> bool {
        self.removed.is_empty()
            && self.promoted.is_empty()
            && self.demoted.is_empty()
            && !self.bootstrap_issued
    }
}

/// Fields copied out of the registry before probing
#[derive(Debug, Clone)]
struct ProbeTarget {
    id: String,
    index: usize,
    launch_seq: u64,
    auto_mine: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    Unresponsive,
    Responsive { block_count: Option<u64> },
}

enum Transition {
    Promoted,
    Demoted,
}

impl<P: ProcessControl, R: NodeRpc> Orchestrator<P, R> {
    /// Run one poll pass over every launched chain
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let (removed, mut targets) = {
            let mut registry = self.registry.lock().await;
            let removed = registry.remove_where(|state| !self.processes.is_alive(&mut state.process));

            let mut targets = Vec::with_capacity(registry.len());
            registry.for_each(|state| match self.catalog.lookup(&state.id) {
                Some(index) => targets.push(ProbeTarget {
                    id: state.id.clone(),
                    index,
                    launch_seq: state.launch_seq,
                    auto_mine: state.auto_mine,
                }),
                None => warn!(chain = %state.id, "registry entry has no catalog descriptor"),
            });
            (removed, targets)
        };

        if !removed.is_empty() {
            for state in &removed {
                info!(chain = %state.id, "node process is gone, dropping it");
                report.removed.push(state.id.clone());
            }
            self.request_refresh().await;
        }

        // Mainchain first so a bootstrap lands before sidechains are probed
        targets.sort_by_key(|target| target.index);

        for target in targets {
            let Some(chain) = self.catalog.get(target.index) else {
                continue;
            };
            let outcome = self.probe(chain, &target, &mut report).await;

            match self.apply_probe(&target, outcome).await {
                Some(Transition::Promoted) => {
                    info!(chain = %target.id, "node is responding");
                    report.promoted.push(target.id);
                    self.request_refresh().await;
                }
                Some(Transition::Demoted) => {
                    warn!(chain = %target.id, "lost contact with node");
                    report.demoted.push(target.id);
                    self.request_refresh().await;
                }
                None => {}
            }
        }

        report
    }

    async fn probe(
        &self,
        chain: &ChainDescriptor,
        target: &ProbeTarget,
        report: &mut TickReport,
    ) -> ProbeOutcome {
        // Any result counts as an answer, even one that is not a block height
        let result = match self.rpc.call(chain, methods::GET_BLOCK_COUNT, Vec::new()).await {
            Ok(result) => result,
            Err(e) => {
                debug!(chain = %chain.id, error = %e, "probe failed");
                return ProbeOutcome::Unresponsive;
            }
        };
        let block_count = result.as_u64();

        match chain.role {
            ChainRole::Mainchain => match block_count {
                Some(count) if count < self.protocol.bootstrap_threshold => {
                    debug!(chain = %chain.id, count, "mainchain below activation height, bootstrapping sidechains");
                    report.bootstrap_issued = true;
                    if let Err(e) = self.bootstrap_sidechains(chain).await {
                        warn!(error = %e, "sidechain bootstrap incomplete");
                    }
                }
                Some(_) => {}
                None => warn!(chain = %chain.id, %result, "block count is not an integer, skipping bootstrap"),
            },
            ChainRole::Sidechain if target.auto_mine => {
                match self.rpc.refresh_bmm(chain, self.protocol.bmm_fee).await {
                    Ok(_) => report.bmm_refreshed += 1,
                    Err(e) => warn!(chain = %chain.id, error = %e, "refreshbmm failed"),
                }
            }
            _ => {}
        }

        ProbeOutcome::Responsive { block_count }
    }

    /// Propose every sidechain in the catalog to the mainchain, then mine past
    /// the activation height. Proposals that fail do not stop the rest.
    pub async fn bootstrap_sidechains(&self, mainchain: &ChainDescriptor) -> Result<()> {
        let mut failures = Vec::new();

        for sidechain in self.catalog.sidechains() {
            if let Err(e) = self.rpc.create_sidechain_proposal(mainchain, sidechain).await {
                failures.push(format!("propose {}: {e}", sidechain.id));
            }
        }

        match self
            .rpc
            .generate(mainchain, self.protocol.bootstrap_blocks)
            .await
        {
            Ok(Value::Array(hashes)) => debug!(blocks = hashes.len(), "activation blocks generated"),
            Ok(_) => {}
            Err(e) => failures.push(format!("generate {}: {e}", self.protocol.bootstrap_blocks)),
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SwitchboardError::protocol("bootstrap", failures.join("; ")))
        }
    }

    async fn apply_probe(&self, target: &ProbeTarget, outcome: ProbeOutcome) -> Option<Transition> {
        let mut registry = self.registry.lock().await;
        let state = registry.get_mut(&target.id)?;
        if state.launch_seq != target.launch_seq {
            debug!(chain = %target.id, "chain relaunched during probe, discarding result");
            return None;
        }

        let responsive = match outcome {
            ProbeOutcome::Responsive { block_count } => {
                if block_count.is_some() {
                    state.block_count = block_count;
                }
                true
            }
            ProbeOutcome::Unresponsive => false,
        };

        let before = state.lifecycle;
        state.lifecycle = before.after_probe(responsive);
        match (before, state.lifecycle) {
            (Lifecycle::Running, Lifecycle::Running) => None,
            (_, Lifecycle::Running) => Some(Transition::Promoted),
            (Lifecycle::Running, _) => Some(Transition::Demoted),
            _ => None,
        }
    }
}

/// Tick `orchestrator` every `period` until a shutdown signal arrives
pub async fn run_poll_loop<P, R>(
    orchestrator: Arc<Orchestrator<P, R>>,
    period: Duration,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) where
    P: ProcessControl + 'static,
    R: NodeRpc + 'static,
{
    let mut poll_tick = tokio::time::interval(period);
    poll_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(period_ms = period.as_millis() as u64, "poll loop started");

    loop {
        tokio::select! {
            _ = poll_tick.tick() => {
                let report = orchestrator.tick().await;
                if !report.is_quiet() {
                    debug!(?report, "poll tick");
                }
            }
            signal = shutdown.recv() => {
                match signal {
                    Ok(signal) => info!(%signal, "poll loop stopping"),
                    Err(_) => info!("shutdown channel closed, poll loop stopping"),
                }
                break;
            }
        }
    }
}
