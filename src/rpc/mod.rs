//! JSON-RPC access to running nodes
//!
//! The nodes expose nothing but a synchronous request/response RPC surface,
//! so every observation the supervisor makes goes through [`NodeRpc`].
//! Calls carry no retry; retry policy belongs to the caller.

mod client;
mod types;

pub use client::RpcClient;
pub use types::{RpcRequest, RpcResponse, JSONRPC_VERSION};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::catalog::ChainDescriptor;
use crate::error::RpcError;

/// Methods spoken by the supervised nodes
pub mod methods {
    pub const GET_BLOCK_COUNT: &str = "getblockcount";
    pub const CREATE_SIDECHAIN_PROPOSAL: &str = "createsidechainproposal";
    pub const GENERATE: &str = "generate";
    pub const REFRESH_BMM: &str = "refreshbmm";
    pub const GET_DEPOSIT_ADDRESS: &str = "getdepositaddress";
    pub const CREATE_SIDECHAIN_DEPOSIT: &str = "createsidechaindeposit";
    pub const STOP: &str = "stop";
}

/// Request/response channel into a node
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Issue `method` against `chain` and return the `result` field
    async fn call(
        &self,
        chain: &ChainDescriptor,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError>;

    async fn get_block_count(&self, chain: &ChainDescriptor) -> Result<u64, RpcError> {
        let result = self.call(chain, methods::GET_BLOCK_COUNT, Vec::new()).await?;
        result
            .as_u64()
            .ok_or_else(|| RpcError::Malformed(format!("getblockcount returned {result}")))
    }

    async fn create_sidechain_proposal(
        &self,
        mainchain: &ChainDescriptor,
        sidechain: &ChainDescriptor,
    ) -> Result<Value, RpcError> {
        self.call(
            mainchain,
            methods::CREATE_SIDECHAIN_PROPOSAL,
            vec![json!(sidechain.slot), json!(sidechain.id)],
        )
        .await
    }

    async fn generate(&self, chain: &ChainDescriptor, blocks: u64) -> Result<Value, RpcError> {
        self.call(chain, methods::GENERATE, vec![json!(blocks)]).await
    }

    async fn refresh_bmm(&self, sidechain: &ChainDescriptor, fee: f64) -> Result<Value, RpcError> {
        self.call(sidechain, methods::REFRESH_BMM, vec![json!(fee)])
            .await
    }

    async fn get_deposit_address(&self, sidechain: &ChainDescriptor) -> Result<String, RpcError> {
        let result = self
            .call(sidechain, methods::GET_DEPOSIT_ADDRESS, Vec::new())
            .await?;
        match result {
            Value::String(address) if !address.is_empty() => Ok(address),
            other => Err(RpcError::Malformed(format!(
                "getdepositaddress returned {other}"
            ))),
        }
    }

    async fn create_sidechain_deposit(
        &self,
        mainchain: &ChainDescriptor,
        slot: u32,
        address: &str,
        amount: f64,
        fee: f64,
    ) -> Result<Value, RpcError> {
        self.call(
            mainchain,
            methods::CREATE_SIDECHAIN_DEPOSIT,
            vec![json!(slot), json!(address), json!(amount), json!(fee)],
        )
        .await
    }

    async fn stop(&self, chain: &ChainDescriptor) -> Result<Value, RpcError> {
        self.call(chain, methods::STOP, Vec::new()).await
    }
}
