//! User intents: launch, stop, deposit, mine, toggle auto-mine

use std::sync::atomic::Ordering;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::Orchestrator;
use crate::catalog::ChainRole;
use crate::error::{Result, SwitchboardError};
use crate::process::ProcessControl;
use crate::registry::ChainRuntimeState;
use crate::rpc::NodeRpc;

/// Outcome of a completed two-step deposit
#[derive(Debug, Clone, Serialize)]
pub struct DepositReceipt {
    pub chain_id: String,
    pub address: String,
    pub amount: f64,
    /// Whatever `createsidechaindeposit` returned, usually a txid
    pub result: Value,
}

impl<P: ProcessControl, R: NodeRpc> Orchestrator<P, R> {
    /// Start the node for catalog entry `index` and register it as waiting.
    ///
    /// The registry lock is held through the spawn so two launches of the
    /// same chain cannot both succeed.
    pub async fn launch_chain(&self, index: usize) -> Result<()> {
        let chain = self.chain(index)?;
        if chain.role == ChainRole::Overview {
            return Err(SwitchboardError::NotLaunchable(chain.id.clone()));
        }

        let mut registry = self.registry.lock().await;
        if registry.contains(&chain.id) {
            return Err(SwitchboardError::AlreadyLaunched(chain.id.clone()));
        }
        if chain.is_sidechain() {
            let mainchain_running = registry
                .get(&self.catalog.mainchain().id)
                .is_some_and(|state| state.lifecycle.is_running());
            if !mainchain_running {
                return Err(SwitchboardError::MainchainNotRunning(chain.id.clone()));
            }
        }

        let data_dir = self.layout.data_dir(chain);
        let process = self.processes.launch(chain, &data_dir).map_err(|e| {
            error!(chain = %chain.id, error = %e, "failed to launch node");
            e
        })?;
        let launch_seq = self.next_launch_seq.fetch_add(1, Ordering::SeqCst);
        registry.set(ChainRuntimeState::launched(chain.id.clone(), process, launch_seq));
        drop(registry);

        info!(chain = %chain.id, launch_seq, data_dir = %data_dir.display(), "chain launched");
        self.request_refresh().await;
        Ok(())
    }

    /// Ask the node to stop, kill it if it does not answer, and drop its
    /// entry. Returns false when the chain was not launched.
    pub async fn stop_chain(&self, index: usize) -> Result<bool> {
        let chain = self.chain(index)?;

        let launch_seq = self
            .registry
            .lock()
            .await
            .get(&chain.id)
            .map(|state| state.launch_seq);
        let Some(launch_seq) = launch_seq else {
            debug!(chain = %chain.id, "stop requested for a chain that is not launched");
            return Ok(false);
        };

        let graceful = match self.rpc.stop(chain).await {
            Ok(_) => true,
            Err(e) => {
                debug!(chain = %chain.id, error = %e, "rpc stop failed, killing the process");
                false
            }
        };

        let removed = {
            let mut registry = self.registry.lock().await;
            match registry.get(&chain.id) {
                Some(state) if state.launch_seq == launch_seq => registry.remove(&chain.id),
                _ => None,
            }
        };

        // The poll loop may already have dropped a process that exited on its own
        if let Some(mut state) = removed {
            if !graceful {
                match self.processes.terminate(&mut state.process) {
                    Ok(()) => {}
                    Err(e) if e.is_already_gone() => {
                        debug!(chain = %chain.id, "node already exited")
                    }
                    Err(e) => warn!(chain = %chain.id, error = %e, "failed to kill node"),
                }
            }
        }

        info!(chain = %chain.id, graceful, "chain stopped");
        self.request_refresh().await;
        Ok(true)
    }

    /// Move `amount` from the mainchain into sidechain `index`: fetch a
    /// deposit address from the sidechain, then create the deposit on the
    /// mainchain. Either step failing aborts the flow.
    pub async fn deposit(&self, index: usize, amount: f64) -> Result<DepositReceipt> {
        let chain = self.chain(index)?;
        if chain.role != ChainRole::Sidechain {
            return Err(SwitchboardError::Validation(format!(
                "{} is not a sidechain",
                chain.id
            )));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(SwitchboardError::Validation(format!(
                "deposit amount must be positive, got {amount}"
            )));
        }

        let address = self.rpc.get_deposit_address(chain).await.map_err(|e| {
            warn!(chain = %chain.id, error = %e, "deposit aborted");
            SwitchboardError::protocol("deposit", format!("getdepositaddress on {}: {e}", chain.id))
        })?;

        let mainchain = self.catalog.mainchain();
        let result = self
            .rpc
            .create_sidechain_deposit(mainchain, chain.slot, &address, amount, self.protocol.deposit_fee)
            .await
            .map_err(|e| {
                warn!(chain = %chain.id, error = %e, "deposit aborted");
                SwitchboardError::protocol(
                    "deposit",
                    format!("createsidechaindeposit on {}: {e}", mainchain.id),
                )
            })?;

        info!(chain = %chain.id, amount, %address, "deposit created");
        Ok(DepositReceipt {
            chain_id: chain.id.clone(),
            address,
            amount,
            result,
        })
    }

    /// Mine one mainchain block on demand
    pub async fn mainchain_mine(&self) -> Result<Value> {
        let mainchain = self.catalog.mainchain();
        let result = self.rpc.generate(mainchain, 1).await.map_err(|e| {
            warn!(chain = %mainchain.id, error = %e, "mine request failed");
            SwitchboardError::protocol("mine", e.to_string())
        })?;
        debug!(chain = %mainchain.id, "mined one block");
        Ok(result)
    }

    /// Flip auto-mine for a launched chain. Takes effect on the next tick.
    pub async fn toggle_auto_mine(&self, id: &str) -> Option<bool> {
        let toggled = self.registry.lock().await.toggle_auto_mine(id);
        if let Some(enabled) = toggled {
            info!(chain = %id, enabled, "auto-mine toggled");
            self.request_refresh().await;
        }
        toggled
    }
}
