use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::trace;

use super::types::{RpcRequest, RpcResponse};
use super::NodeRpc;
use crate::catalog::ChainDescriptor;
use crate::config::RpcConfig;
use crate::error::{RpcError, SwitchboardError};

/// Stateless JSON-RPC 2.0 client with HTTP Basic auth
#[derive(Clone)]
pub struct RpcClient {
    http: Client,
    host: String,
    request_id: String,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self, SwitchboardError> {
        let http = Client::builder()
            .user_agent("switchboard/0.1")
            .build()
            .map_err(|e| SwitchboardError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            host: config.host.clone(),
            request_id: config.request_id.clone(),
        })
    }

    pub fn endpoint(&self, chain: &ChainDescriptor) -> String {
        format!("http://{}:{}", self.host, chain.port)
    }

    fn authorization(chain: &ChainDescriptor) -> String {
        let credentials = format!("{}:{}", chain.rpc_user, chain.rpc_password);
        format!("Basic {}", BASE64.encode(credentials.as_bytes()))
    }
}

#[async_trait]
impl NodeRpc for RpcClient {
    async fn call(
        &self,
        chain: &ChainDescriptor,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, RpcError> {
        let request = RpcRequest::new(&self.request_id, method, params);
        trace!(chain = %chain.id, method, "rpc call");

        let resp = self
            .http
            .post(self.endpoint(chain))
            .header(AUTHORIZATION, Self::authorization(chain))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Unreachable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| RpcError::Malformed(format!("failed to read body: {}", e)))?;

        if status != StatusCode::OK {
            // bitcoind-style nodes put the reason in the error object of a non-200 reply
            let message = serde_json::from_slice::<RpcResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .filter(|m| !m.is_empty());
            return Err(RpcError::BadStatus {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: RpcResponse =
            serde_json::from_slice(&body).map_err(|e| RpcError::Malformed(e.to_string()))?;

        match (parsed.result, parsed.error) {
            (Some(Value::Null), Some(error)) => Err(RpcError::BadStatus {
                status: status.as_u16(),
                message: Some(format!("{} (code {})", error.message, error.code)),
            }),
            (Some(result), _) => Ok(result),
            (None, _) => Err(RpcError::Malformed(format!(
                "{} response has no result field",
                method
            ))),
        }
    }
}
