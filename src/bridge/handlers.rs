//! HTTP+JSON endpoints, one per RPC method.
//!
//! ```text
//! GET  /echo?message=..    → Echo
//! GET  /status             → Status
//! POST /query   {json}     → Query
//! POST /invoke  {json}     → Invoke
//! ```
//!
//! Paths are relative to the API prefix the router mounts this under.

use std::future::Future;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::Status;

use crate::bridge::proxy::ProtocolBridge;
use crate::bridge::status::ApiError;
use crate::observability::metrics;
use crate::rpc::proto::{EchoRequest, GatewayClient, StatusRequest, TransactionRequest};

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the API router.
pub fn routes(bridge: ProtocolBridge) -> Router {
    Router::new()
        .route("/echo", get(echo))
        .route("/status", get(status))
        .route("/query", post(query))
        .route("/invoke", post(invoke))
        .fallback(unknown_method)
        .with_state(bridge)
}

async fn echo(
    State(bridge): State<ProtocolBridge>,
    headers: HeaderMap,
    params: Result<Query<EchoRequest>, QueryRejection>,
) -> Response {
    let request = params
        .map(|Query(req)| req)
        .map_err(|e| ApiError::invalid_argument(e.body_text()));
    forward(&bridge, "echo", Method::GET, &headers, request, |mut client, req| async move {
        client.echo(req).await
    })
    .await
}

async fn status(
    State(bridge): State<ProtocolBridge>,
    headers: HeaderMap,
    params: Result<Query<StatusRequest>, QueryRejection>,
) -> Response {
    let request = params
        .map(|Query(req)| req)
        .map_err(|e| ApiError::invalid_argument(e.body_text()));
    forward(&bridge, "status", Method::GET, &headers, request, |mut client, req| async move {
        client.status(req).await
    })
    .await
}

async fn query(State(bridge): State<ProtocolBridge>, headers: HeaderMap, body: Bytes) -> Response {
    let request = decode_body::<TransactionRequest>(&body);
    forward(&bridge, "query", Method::POST, &headers, request, |mut client, req| async move {
        client.query(req).await
    })
    .await
}

async fn invoke(State(bridge): State<ProtocolBridge>, headers: HeaderMap, body: Bytes) -> Response {
    let request = decode_body::<TransactionRequest>(&body);
    forward(&bridge, "invoke", Method::POST, &headers, request, |mut client, req| async move {
        client.invoke(req).await
    })
    .await
}

async fn unknown_method(method: Method, uri: axum::http::Uri) -> Response {
    tracing::debug!(%method, path = %uri.path(), "No API method for path");
    ApiError::not_found(format!("no API method at {}", uri.path())).into_response()
}

/// Decode a JSON body. An empty body is the default message.
fn decode_body<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_argument(format!("invalid JSON body: {}", e)))
}

/// Run one RPC over the loopback connection and render the outcome.
async fn forward<Req, Resp, F, Fut>(
    bridge: &ProtocolBridge,
    route: &'static str,
    method: Method,
    headers: &HeaderMap,
    decoded: Result<Req, ApiError>,
    call: F,
) -> Response
where
    Resp: Serialize,
    F: FnOnce(GatewayClient, tonic::Request<Req>) -> Fut,
    Fut: Future<Output = Result<tonic::Response<Resp>, Status>>,
{
    let started = Instant::now();

    let outcome = match decoded {
        Ok(message) => match bridge.client() {
            Ok(client) => call(client, to_rpc_request(message, headers))
                .await
                .map(tonic::Response::into_inner)
                .map_err(ApiError::from),
            Err(status) => Err(ApiError::from(status)),
        },
        Err(e) => Err(e),
    };

    let response = match outcome {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            tracing::debug!(route, code = ?e.code(), "API call failed");
            e.into_response()
        }
    };

    metrics::record_http_request(route, method.as_str(), response.status().as_u16(), started);
    response
}

/// Wrap `message` for the RPC call, carrying the request ID as metadata.
fn to_rpc_request<T>(message: T, headers: &HeaderMap) -> tonic::Request<T> {
    let mut request = tonic::Request::new(message);
    if let Some(value) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<MetadataValue<Ascii>>().ok())
    {
        request.metadata_mut().insert(REQUEST_ID_HEADER, value);
    }
    request
}
