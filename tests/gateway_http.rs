//! End-to-end tests of the plaintext HTTP front end.

mod common;

use reqwest::StatusCode;
use serde_json::Value;

use common::{ephemeral_config, fixture, http_base, raw_get, start_gateway};
use ledger_gateway::GatewayState;

#[tokio::test]
async fn test_echo_over_http() {
    let gateway = start_gateway(ephemeral_config()).await;
    let base = http_base(&gateway);

    let res = reqwest::get(format!("{}/v1/echo?message=hello%20gateway", base)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["message"], "hello gateway");

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let gateway = start_gateway(ephemeral_config()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/v1/echo?message=x", http_base(&gateway)))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-42");

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_unrouted_paths_are_404() {
    let gateway = start_gateway(ephemeral_config()).await;
    let base = http_base(&gateway);

    for path in ["/", "/v2/echo", "/docs/x", "/swaggerx"] {
        let res = reqwest::get(format!("{}{}", base, path)).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "path {}", path);
    }

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_degraded_backend_keeps_serving() {
    let gateway = start_gateway(ephemeral_config()).await;
    assert_eq!(gateway.state(), GatewayState::HttpServing);
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
    assert_eq!(status["connected"], false);
    assert_eq!(status["channel"], "mychannel");

    let res = client
        .post(format!("{}/v1/query", base))
        .body(r#"{"chaincode_id":"mycc","transaction":"get","parameter":["a"]}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error["code"], 14);
    assert!(error["message"].is_string());

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_doc_root_served_with_prefix_stripped() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("README.md"), "# gateway").unwrap();
    std::fs::create_dir(docs.path().join("guide")).unwrap();
    std::fs::write(docs.path().join("guide/setup.md"), "setup").unwrap();

    let mut config = ephemeral_config();
    config.routes.doc_root = docs.path().to_path_buf();
    let gateway = start_gateway(config).await;
    let base = http_base(&gateway);

    let res = reqwest::get(format!("{}/doc/README.md", base)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "# gateway");

    let res = reqwest::get(format!("{}/doc/guide/setup.md", base)).await.unwrap();
    assert_eq!(res.text().await.unwrap(), "setup");

    let res = reqwest::get(format!("{}/doc/absent.md", base)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_doc_root_hides_tls_material() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::copy(fixture("cacert.pem"), docs.path().join("cacert.pem")).unwrap();
    std::fs::copy(fixture("serverkey.pem"), docs.path().join("serverkey.pem")).unwrap();
    std::fs::write(docs.path().join("index.html"), "docs").unwrap();

    let mut config = ephemeral_config();
    config.routes.doc_root = docs.path().to_path_buf();
    config.tls.ca_path = docs.path().join("cacert.pem");
    config.tls.key_path = docs.path().join("serverkey.pem");
    let gateway = start_gateway(config).await;
    let base = http_base(&gateway);

    for path in ["/doc/serverkey.pem", "/doc/cacert.pem", "/doc/%73erverkey.pem"] {
        let res = reqwest::get(format!("{}{}", base, path)).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "path {}", path);
    }
    let res = reqwest::get(format!("{}/doc/index.html", base)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_doc_root_traversal_rejected() {
    let outer = tempfile::tempdir().unwrap();
    let docs = outer.path().join("docs");
    std::fs::create_dir(&docs).unwrap();
    std::fs::write(outer.path().join("secret.txt"), "do not serve").unwrap();

    let mut config = ephemeral_config();
    config.routes.doc_root = docs;
    let gateway = start_gateway(config).await;
    let addr = gateway.http_endpoint().dial_addr();

    for path in ["/doc/../secret.txt", "/doc/%2e%2e/secret.txt", "/doc/..%2fsecret.txt"] {
        let response = raw_get(addr, path).await;
        assert!(!response.starts_with("HTTP/1.1 200"), "path {} -> {}", path, response);
        assert!(!response.contains("do not serve"), "path {}", path);
    }

    gateway.shutdown();
    gateway.wait().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_completes_in_order() {
    let gateway = start_gateway(ephemeral_config()).await;
    let mut states = gateway.subscribe();
    let base = http_base(&gateway);

    gateway.shutdown();
    gateway.wait().await.unwrap();
    assert_eq!(*states.borrow_and_update(), GatewayState::Shutdown);

    assert!(reqwest::get(format!("{}/v1/echo?message=late", base)).await.is_err());
}
