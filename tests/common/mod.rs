//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::extract::Path as UrlPath;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ledger_gateway::backend::NetworkClient;
use ledger_gateway::{start, GatewayConfig, RunningGateway};

/// Path of a PEM file under `tests/fixtures/tls`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

/// Loopback configuration on ephemeral ports with no reachable backend.
pub fn ephemeral_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_host = "127.0.0.1".parse().unwrap();
    config.listener.grpc_port = 0;
    config.listener.http_port = 0;
    config.backend.network_config = "/nonexistent/config_byfn.yaml".into();
    config.backend.pattern = "/nonexistent/matchers_byfn.yaml".into();
    config.backend.connect_timeout = Duration::from_secs(2);
    config.timeouts.shutdown_grace = Duration::from_secs(2);
    config
}

/// Start a gateway with the network client connector.
pub async fn start_gateway(config: GatewayConfig) -> RunningGateway {
    start(config, NetworkClient::new()).await.unwrap()
}

pub fn http_base(gateway: &RunningGateway) -> String {
    format!("http://{}", gateway.http_endpoint().dial_addr())
}

/// Start a mock peer speaking the network client's JSON protocol.
///
/// Queries answer `<function>(<args>)`, invokes also return a txn id.
/// The chaincode `missing` is reported as not found.
pub async fn start_mock_peer() -> SocketAddr {
    async fn transact(kind: &'static str, channel: String, body: Value) -> (StatusCode, Json<Value>) {
        if body["chaincode_id"] == "missing" {
            return (StatusCode::NOT_FOUND, Json(json!({ "message": "chaincode missing not installed" })));
        }
        let args = body["args"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(","))
            .unwrap_or_default();
        let value = format!("{}({})@{}", body["function"].as_str().unwrap_or(""), args, channel);
        let txn_id = if kind == "invoke" { "txn-0001" } else { "" };
        (StatusCode::OK, Json(json!({ "value": value, "txn_id": txn_id })))
    }

    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route(
            "/channels/{channel}/query",
            post(|UrlPath(channel): UrlPath<String>, Json(body): Json<Value>| transact("query", channel, body)),
        )
        .route(
            "/channels/{channel}/invoke",
            post(|UrlPath(channel): UrlPath<String>, Json(body): Json<Value>| transact("invoke", channel, body)),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Write a network profile whose only org1 peer listens on `peer`.
pub fn write_profile(dir: &Path, peer: SocketAddr) -> (PathBuf, PathBuf) {
    let profile = dir.join("config_byfn.yaml");
    std::fs::write(
        &profile,
        r#"
name: test-network
channels:
  mychannel:
    peers:
      peer0.org1.example.com: {}
organizations:
  org1:
    mspid: Org1MSP
    peers: [peer0.org1.example.com]
peers:
  peer0.org1.example.com:
    url: grpcs://peer0.org1.example.com:7051
"#,
    )
    .unwrap();

    let matchers = dir.join("matchers_byfn.yaml");
    std::fs::write(
        &matchers,
        format!(
            "entityMatchers:\n  peer:\n    - pattern: ^peer0\\.org1\\.example\\.com$\n      urlSubstitutionExp: http://{}\n",
            peer
        ),
    )
    .unwrap();

    (profile, matchers)
}

/// Send a raw HTTP/1.1 GET so the path reaches the server unnormalized.
pub async fn raw_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
