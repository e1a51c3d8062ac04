//! `Gateway` service implementation.
//!
//! A thin translation shim: converts wire messages to backend transactions,
//! delegates to whatever session the [`BackendSlot`] currently holds, and maps
//! [`BackendError`]s onto RPC status codes.

use std::time::Instant;

use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::backend::{BackendError, BackendSettings, BackendSlot, Transaction};
use crate::observability::metrics;
use crate::rpc::proto::{
    self, EchoRequest, EchoResponse, StatusRequest, StatusResponse, TransactionRequest, TransactionResponse,
};

/// RPC service backed by the shared backend session slot.
#[derive(Debug, Clone)]
pub struct GatewayService {
    backend: BackendSlot,
    channel: String,
    org: String,
    user: String,
}

impl GatewayService {
    pub fn new(backend: BackendSlot, settings: &BackendSettings) -> Self {
        Self {
            backend,
            channel: settings.channel.clone(),
            org: settings.org.clone(),
            user: settings.user.clone(),
        }
    }

    async fn execute(
        &self,
        method: &'static str,
        request: Request<TransactionRequest>,
        invoke: bool,
    ) -> Result<Response<TransactionResponse>, Status> {
        let started = Instant::now();
        let request_id = request_id(&request);
        let result = async {
            let tx = to_transaction(request.into_inner())?;
            let session = self.backend.current().map_err(backend_status)?;
            let outcome = if invoke {
                session.invoke(tx).await
            } else {
                session.query(tx).await
            }
            .map_err(backend_status)?;
            Ok::<_, Status>(Response::new(TransactionResponse {
                value: outcome.value,
                txn_id: outcome.txn_id,
            }))
        }
        .await;

        let code = match &result {
            Ok(_) => tonic::Code::Ok,
            Err(status) => status.code(),
        };
        tracing::debug!(
            method,
            ?code,
            request_id = %request_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "RPC call finished"
        );
        metrics::record_rpc_call(method, code);
        result
    }
}

#[tonic::async_trait]
impl proto::Gateway for GatewayService {
    async fn echo(&self, request: Request<EchoRequest>) -> Result<Response<EchoResponse>, Status> {
        let message = request.into_inner().message;
        metrics::record_rpc_call("Echo", tonic::Code::Ok);
        Ok(Response::new(EchoResponse { message }))
    }

    async fn status(&self, _request: Request<StatusRequest>) -> Result<Response<StatusResponse>, Status> {
        metrics::record_rpc_call("Status", tonic::Code::Ok);
        Ok(Response::new(StatusResponse {
            connected: self.backend.is_connected(),
            channel: self.channel.clone(),
            org: self.org.clone(),
            user: self.user.clone(),
        }))
    }

    async fn query(
        &self,
        request: Request<TransactionRequest>,
    ) -> Result<Response<TransactionResponse>, Status> {
        self.execute("Query", request, false).await
    }

    async fn invoke(
        &self,
        request: Request<TransactionRequest>,
    ) -> Result<Response<TransactionResponse>, Status> {
        self.execute("Invoke", request, true).await
    }
}

/// Correlation ID forwarded by the HTTP bridge; direct RPC callers get a
/// fresh one.
fn request_id<T>(request: &Request<T>) -> String {
    request
        .metadata()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Validate a wire request and convert it into a backend transaction.
fn to_transaction(req: TransactionRequest) -> Result<Transaction, Status> {
    if req.chaincode_id.trim().is_empty() {
        return Err(Status::invalid_argument("chaincode_id must not be empty"));
    }
    if req.transaction.trim().is_empty() {
        return Err(Status::invalid_argument("transaction must not be empty"));
    }
    if req.timeout_ms < 0 {
        return Err(Status::invalid_argument("timeout_ms must not be negative"));
    }

    let transient = if req.transient_map.trim().is_empty() {
        None
    } else {
        let value: serde_json::Value = serde_json::from_str(&req.transient_map)
            .map_err(|e| Status::invalid_argument(format!("transient_map is not valid JSON: {}", e)))?;
        if !value.is_object() {
            return Err(Status::invalid_argument("transient_map must be a JSON object"));
        }
        Some(value)
    };

    Ok(Transaction {
        chaincode_id: req.chaincode_id,
        function: req.transaction,
        args: req.parameter,
        transient,
        endorsers: req.endorser,
        timeout_ms: (req.timeout_ms > 0).then_some(req.timeout_ms as u64),
    })
}

/// Map a backend failure onto an RPC status.
pub fn backend_status(err: BackendError) -> Status {
    let message = err.to_string();
    match err {
        BackendError::Unavailable(_) | BackendError::Closed => Status::unavailable(message),
        BackendError::Timeout(_) => Status::deadline_exceeded(message),
        BackendError::Rejected(_) => Status::aborted(message),
        BackendError::NotFound(_) => Status::not_found(message),
        BackendError::InvalidRequest(_) => Status::invalid_argument(message),
        BackendError::Config(_) => Status::failed_precondition(message),
        BackendError::Transport(_) => Status::internal(message),
    }
}
