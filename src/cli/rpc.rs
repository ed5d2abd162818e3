//! `switchboard rpc` — one-shot JSON-RPC call against a catalog node.

use serde_json::Value;

use crate::catalog::Catalog;
use crate::config::RpcConfig;
use crate::error::{Result, SwitchboardError};
use crate::rpc::{NodeRpc, RpcClient};

/// Each argument is read as JSON when it parses, otherwise as a plain string
pub fn parse_params(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|arg| serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone())))
        .collect()
}

pub async fn call(
    rpc: &RpcConfig,
    catalog: &Catalog,
    chain_id: &str,
    method: &str,
    params: &[String],
) -> Result<Value> {
    let chain = catalog
        .by_id(chain_id)
        .ok_or_else(|| SwitchboardError::UnknownChain(chain_id.to_string()))?;
    let client = RpcClient::new(rpc)?;
    let result = client.call(chain, method, parse_params(params)).await?;
    Ok(result)
}
