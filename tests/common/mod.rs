//! In-memory stand-ins for the node RPC surface and the OS process table.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use switchboard::catalog::{Catalog, ChainDescriptor};
use switchboard::config::ProtocolConfig;
use switchboard::error::{LaunchError, RpcError, TerminateError};
use switchboard::orchestrator::Orchestrator;
use switchboard::process::{InstallLayout, ProcessControl};
use switchboard::rpc::NodeRpc;

pub const DEPOSIT_ADDRESS: &str = "s2_mn5yVe2pGwQ5kP8dnaRpBMN3Yvz2jwnWbz";

/// Overview, a mainchain on port 9000 and sidechain "alpha" in slot 2
pub fn scenario_catalog() -> Catalog {
    catalog_with(&[("alpha", 9001, 2)])
}

/// Overview, mainchain, then one sidechain per `(id, port, slot)`
pub fn catalog_with(sidechains: &[(&str, u16, u32)]) -> Catalog {
    let mut entries = vec![
        json!({
            "id": "overview", "name": "Overview", "regtest": true, "bin": "",
            "port": "0", "rpc_user": "", "rpc_password": "", "slot": 0
        }),
        json!({
            "id": "mainchain", "name": "Mainchain", "regtest": true, "bin": "mainchain-qt",
            "port": "9000", "rpc_user": "user", "rpc_password": "password", "slot": 0
        }),
    ];
    for (id, port, slot) in sidechains {
        entries.push(json!({
            "id": id, "name": id, "regtest": true, "bin": format!("{id}-qt"),
            "port": port, "rpc_user": "user", "rpc_password": "password", "slot": slot
        }));
    }
    Catalog::load(&serde_json::to_vec(&entries).unwrap()).unwrap()
}

pub type TestOrchestrator = Orchestrator<FakeProcesses, FakeRpc>;

pub fn orchestrator(catalog: Catalog) -> TestOrchestrator {
    Orchestrator::new(
        Arc::new(catalog),
        InstallLayout::new(std::env::temp_dir().join("switchboard-fake-home")),
        FakeProcesses::default(),
        FakeRpc::default(),
        ProtocolConfig::default(),
    )
}

/// Launch the mainchain and let one tick promote it
pub async fn running_mainchain(orchestrator: &TestOrchestrator) {
    orchestrator.launch_chain(1).await.unwrap();
    orchestrator.tick().await;
    assert_eq!(
        orchestrator.lifecycle("mainchain").await,
        Some(switchboard::Lifecycle::Running)
    );
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub chain: String,
    pub method: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct FakeRpcState {
    calls: Vec<RecordedCall>,
    block_counts: HashMap<String, Value>,
    unreachable: HashSet<String>,
    failing: HashSet<(String, String)>,
    gates: HashMap<String, Arc<Notify>>,
}

/// Scripted node RPC. Every call is recorded before its outcome is decided.
#[derive(Default)]
pub struct FakeRpc {
    state: Mutex<FakeRpcState>,
}

impl FakeRpc {
    pub fn set_block_count(&self, chain: &str, count: u64) {
        self.set_block_count_value(chain, json!(count));
    }

    pub fn set_block_count_value(&self, chain: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .block_counts
            .insert(chain.to_string(), value);
    }

    pub fn set_unreachable(&self, chain: &str, unreachable: bool) {
        let mut state = self.state.lock().unwrap();
        if unreachable {
            state.unreachable.insert(chain.to_string());
        } else {
            state.unreachable.remove(chain);
        }
    }

    pub fn fail_method(&self, chain: &str, method: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert((chain.to_string(), method.to_string()));
    }

    /// Hold `getblockcount` on `chain` until the returned notify fires
    pub fn gate_probe(&self, chain: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(chain.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl NodeRpc for FakeRpc {
    async fn call(
        &self,
        chain: &ChainDescriptor,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(RecordedCall {
                chain: chain.id.clone(),
                method: method.to_string(),
                params: params.clone(),
            });
            if method == "getblockcount" {
                state.gates.remove(&chain.id)
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let state = self.state.lock().unwrap();
        if state.unreachable.contains(&chain.id) {
            return Err(RpcError::Unreachable("connection refused".into()));
        }
        if state
            .failing
            .contains(&(chain.id.clone(), method.to_string()))
        {
            return Err(RpcError::BadStatus {
                status: 500,
                message: Some(format!("{method} rejected")),
            });
        }

        Ok(match method {
            "getblockcount" => state
                .block_counts
                .get(&chain.id)
                .cloned()
                .unwrap_or_else(|| json!(0)),
            "getdepositaddress" => json!(DEPOSIT_ADDRESS),
            "createsidechaindeposit" => json!("9f2c1e7d"),
            "generate" => {
                let blocks = params.first().and_then(Value::as_u64).unwrap_or(0);
                Value::Array((0..blocks).map(|n| json!(format!("{n:064x}"))).collect())
            }
            "stop" => json!("Bitcoin server stopping"),
            _ => Value::Null,
        })
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    pub chain_id: String,
    pub pid: u32,
    alive: Arc<AtomicBool>,
}

#[derive(Default)]
struct FakeProcessState {
    next_pid: u32,
    launches: Vec<(String, PathBuf)>,
    terminated: Vec<String>,
    alive: HashMap<String, Arc<AtomicBool>>,
    fail_launch: bool,
}

/// Process table where "killing externally" is flipping a flag
#[derive(Default)]
pub struct FakeProcesses {
    state: Mutex<FakeProcessState>,
}

impl FakeProcesses {
    pub fn set_fail_launch(&self, fail: bool) {
        self.state.lock().unwrap().fail_launch = fail;
    }

    /// Simulate a crash or a kill from outside the supervisor
    pub fn kill_externally(&self, chain_id: &str) {
        if let Some(alive) = self.state.lock().unwrap().alive.get(chain_id) {
            alive.store(false, Ordering::SeqCst);
        }
    }

    pub fn launches(&self) -> Vec<(String, PathBuf)> {
        self.state.lock().unwrap().launches.clone()
    }

    pub fn terminated(&self) -> Vec<String> {
        self.state.lock().unwrap().terminated.clone()
    }
}

impl ProcessControl for FakeProcesses {
    type Handle = FakeHandle;

    fn launch(&self, chain: &ChainDescriptor, data_dir: &Path) -> Result<FakeHandle, LaunchError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_launch {
            return Err(LaunchError::MissingExecutable(PathBuf::from(&chain.bin)));
        }
        state.next_pid += 1;
        let alive = Arc::new(AtomicBool::new(true));
        state.alive.insert(chain.id.clone(), alive.clone());
        state
            .launches
            .push((chain.id.clone(), data_dir.to_path_buf()));
        Ok(FakeHandle {
            chain_id: chain.id.clone(),
            pid: 1000 + state.next_pid,
            alive,
        })
    }

    fn terminate(&self, handle: &mut FakeHandle) -> Result<(), TerminateError> {
        if !handle.alive.swap(false, Ordering::SeqCst) {
            return Err(TerminateError::NotRunning { pid: handle.pid });
        }
        self.state
            .lock()
            .unwrap()
            .terminated
            .push(handle.chain_id.clone());
        Ok(())
    }

    fn is_alive(&self, handle: &mut FakeHandle) -> bool {
        handle.alive.load(Ordering::SeqCst)
    }

    fn pid(&self, handle: &FakeHandle) -> Option<u32> {
        Some(handle.pid)
    }
}
