//! Transactions through both protocols against a mock peer.

mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tonic::transport::Endpoint;

use common::{ephemeral_config, http_base, start_gateway, start_mock_peer, write_profile};
use ledger_gateway::rpc::proto::{GatewayClient, StatusRequest, TransactionRequest};
use ledger_gateway::{GatewayConfig, StartupError};

async fn connected_config(dir: &tempfile::TempDir) -> GatewayConfig {
    let peer = start_mock_peer().await;
    let (profile, matchers) = write_profile(dir.path(), peer);
    let mut config = ephemeral_config();
    config.backend.network_config = profile;
    config.backend.pattern = matchers;
    config
}

#[tokio::test]
async fn test_query_and_invoke_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = start_gateway(connected_config(&dir).await).await;
    let base = http_base(&gateway);
    let client = reqwest::Client::new();

    let status: Value = client
        .get(format!("{}/v1/status", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["connected"], true);

    let res = client
        .post(format!("{}/v1/query", base))
        .json(&json!({ "chaincode_id": "mycc", "transaction": "query", "parameter": ["a"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let reply: Value = res.json().await.unwrap();
    assert_eq!(reply["value"], "query(a)@mychannel");

    let res = client
        .post(format!("{}/v1/invoke", base))
        .json(&json!({ "chaincode_id": "mycc", "transaction": "move", "parameter": ["a", "b", "10"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let reply: Value = res.json().await.unwrap();
    assert_eq!(reply["value"], "move(a,b,10)@mychannel");
    assert_eq!(reply["txn_id"], "txn-0001");

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_backend_errors_map_to_http_status() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = start_gateway(connected_config(&dir).await).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/v1/query", http_base(&gateway)))
        .json(&json!({ "chaincode_id": "missing", "transaction": "query" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error["code"], 5);
    assert!(error["message"].as_str().unwrap().contains("not installed"));

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_rpc_clients_share_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = start_gateway(connected_config(&dir).await).await;

    let uri = format!("http://{}", gateway.rpc_endpoint().dial_addr());
    let channel = Endpoint::from_shared(uri).unwrap().connect().await.unwrap();
    let mut client = GatewayClient::new(channel);

    let status = client.status(StatusRequest {}).await.unwrap().into_inner();
    assert!(status.connected);
    assert_eq!(status.org, "org1");

    let reply = client
        .query(TransactionRequest {
            chaincode_id: "mycc".into(),
            transaction: "query".into(),
            parameter: vec!["b".into()],
            ..Default::default()
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(reply.value, "query(b)@mychannel");

    let err = client
        .query(TransactionRequest {
            chaincode_id: "mycc".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::InvalidArgument);

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_occupied_rpc_port_is_fatal() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = ephemeral_config();
    config.listener.grpc_port = taken.local_addr().unwrap().port();

    let err = ledger_gateway::start(config, ledger_gateway::backend::NetworkClient::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StartupError::RpcBind { .. }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_occupied_http_port_is_fatal() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = ephemeral_config();
    config.listener.http_port = taken.local_addr().unwrap().port();

    let err = ledger_gateway::start(config, ledger_gateway::backend::NetworkClient::new())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, StartupError::HttpBind { .. }));
}
