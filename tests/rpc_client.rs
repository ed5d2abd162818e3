//! RpcClient against a scripted JSON-RPC node served on an ephemeral port.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use switchboard::catalog::ChainDescriptor;
use switchboard::config::RpcConfig;
use switchboard::error::RpcError;
use switchboard::rpc::{NodeRpc, RpcClient};

#[derive(Default)]
struct Captured {
    authorization: Option<String>,
    content_type: Option<String>,
    body: Option<Value>,
}

struct FakeNode {
    reply: Mutex<(StatusCode, String)>,
    captured: Mutex<Captured>,
}

impl FakeNode {
    fn reply_with(&self, status: StatusCode, body: impl Into<String>) {
        *self.reply.lock().unwrap() = (status, body.into());
    }

    fn last_body(&self) -> Value {
        self.captured.lock().unwrap().body.clone().unwrap()
    }
}

async fn handle(State(node): State<Arc<FakeNode>>, headers: HeaderMap, body: String) -> (StatusCode, String) {
    {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let mut captured = node.captured.lock().unwrap();
        captured.authorization = header("authorization");
        captured.content_type = header("content-type");
        captured.body = serde_json::from_str(&body).ok();
    }
    node.reply.lock().unwrap().clone()
}

/// Serve a fake node and return it with a descriptor pointing at its port
async fn spawn_node() -> (Arc<FakeNode>, ChainDescriptor) {
    let node = Arc::new(FakeNode {
        reply: Mutex::new((StatusCode::OK, r#"{"result":null,"error":null,"id":"switchboard"}"#.into())),
        captured: Mutex::new(Captured::default()),
    });
    let app = Router::new().route("/", post(handle)).with_state(node.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (node, descriptor(port))
}

fn descriptor(port: u16) -> ChainDescriptor {
    serde_json::from_value(json!({
        "id": "drivechain", "name": "Drivechain", "regtest": true, "bin": "drivechain-qt",
        "port": port, "rpc_user": "user", "rpc_password": "password", "slot": 0
    }))
    .unwrap()
}

fn client() -> RpcClient {
    RpcClient::new(&RpcConfig {
        host: "127.0.0.1".into(),
        ..RpcConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn sends_envelope_with_basic_auth() {
    let (node, chain) = spawn_node().await;
    node.reply_with(StatusCode::OK, r#"{"result":150,"error":null,"id":"switchboard"}"#);

    let count = client().get_block_count(&chain).await.unwrap();
    assert_eq!(count, 150);

    let captured = node.captured.lock().unwrap();
    assert_eq!(captured.authorization.as_deref(), Some("Basic dXNlcjpwYXNzd29yZA=="));
    assert_eq!(captured.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        captured.body,
        Some(json!({
            "jsonrpc": "2.0",
            "id": "switchboard",
            "method": "getblockcount",
            "params": []
        }))
    );
}

#[tokio::test]
async fn parameters_keep_their_order() {
    let (node, chain) = spawn_node().await;
    node.reply_with(StatusCode::OK, r#"{"result":"9f2c","error":null}"#);

    let result = client()
        .create_sidechain_deposit(&chain, 2, "s2_addr", 1.5, 0.001)
        .await
        .unwrap();
    assert_eq!(result, json!("9f2c"));

    let body = node.last_body();
    assert_eq!(body["method"], "createsidechaindeposit");
    assert_eq!(body["params"], json!([2, "s2_addr", 1.5, 0.001]));
}

#[tokio::test]
async fn null_result_without_error_is_success() {
    let (_node, chain) = spawn_node().await;
    assert_eq!(client().refresh_bmm(&chain, 0.001).await.unwrap(), Value::Null);
}

#[tokio::test]
async fn connection_refused_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = client().get_block_count(&descriptor(port)).await.unwrap_err();
    assert!(matches!(err, RpcError::Unreachable(_)), "{err:?}");
}

#[tokio::test]
async fn non_200_is_bad_status() {
    let (node, chain) = spawn_node().await;

    node.reply_with(StatusCode::UNAUTHORIZED, "");
    let err = client().get_block_count(&chain).await.unwrap_err();
    assert_eq!(
        err,
        RpcError::BadStatus {
            status: 401,
            message: None
        }
    );

    node.reply_with(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"result":null,"error":{"code":-32601,"message":"Method not found"},"id":"switchboard"}"#,
    );
    let err = client().call(&chain, "nosuchmethod", vec![]).await.unwrap_err();
    assert_eq!(
        err,
        RpcError::BadStatus {
            status: 500,
            message: Some("Method not found".into())
        }
    );
}

#[tokio::test]
async fn error_object_with_null_result_is_reported() {
    let (node, chain) = spawn_node().await;
    node.reply_with(
        StatusCode::OK,
        r#"{"result":null,"error":{"code":-1,"message":"sidechain slot taken"}}"#,
    );

    let err = client().generate(&chain, 1).await.unwrap_err();
    assert!(err.to_string().contains("sidechain slot taken"), "{err}");
}

#[tokio::test]
async fn undecodable_bodies_are_malformed() {
    let (node, chain) = spawn_node().await;

    node.reply_with(StatusCode::OK, "<html>not json</html>");
    let err = client().stop(&chain).await.unwrap_err();
    assert!(matches!(err, RpcError::Malformed(_)), "{err:?}");

    node.reply_with(StatusCode::OK, r#"{"id":"switchboard"}"#);
    let err = client().stop(&chain).await.unwrap_err();
    assert!(matches!(err, RpcError::Malformed(_)), "{err:?}");

    node.reply_with(StatusCode::OK, r#"{"result":"twelve","error":null}"#);
    let err = client().get_block_count(&chain).await.unwrap_err();
    assert!(matches!(err, RpcError::Malformed(_)), "{err:?}");
}

#[tokio::test]
async fn empty_deposit_address_is_malformed() {
    let (node, chain) = spawn_node().await;
    node.reply_with(StatusCode::OK, r#"{"result":"","error":null}"#);

    let err = client().get_deposit_address(&chain).await.unwrap_err();
    assert!(matches!(err, RpcError::Malformed(_)));
}
