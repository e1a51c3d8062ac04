//! RPC listener.
//!
//! [`RpcListener::bind`] opens the port synchronously with startup so a bind
//! failure aborts before anything else runs. [`RpcListener::serve`] then moves
//! the accept loop onto its own task and hands back an [`RpcHandle`] whose
//! readiness signal fires once the server owns the socket.
//!
//! # Graceful shutdown
//!
//! The serving task stops accepting when its cancellation token fires and
//! drains in-flight calls before the task completes.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::error::StartupError;
use crate::lifecycle::shutdown;
use crate::net::listener::{self, Protocol, ServerEndpoint};
use crate::rpc::proto::GatewayServer;
use crate::rpc::service::GatewayService;

/// A bound, not yet serving, RPC port.
pub struct RpcListener {
    listener: TcpListener,
    endpoint: ServerEndpoint,
}

impl RpcListener {
    /// Bind the RPC port. Failure here is fatal for the process.
    pub async fn bind(addr: SocketAddr) -> Result<Self, StartupError> {
        let (listener, endpoint) = listener::bind(Protocol::Rpc, addr)
            .await
            .map_err(|source| StartupError::RpcBind { addr, source })?;
        Ok(Self { listener, endpoint })
    }

    pub fn endpoint(&self) -> ServerEndpoint {
        self.endpoint
    }

    /// Start serving `service` on a dedicated task.
    pub fn serve(self, service: GatewayService, shutdown: CancellationToken) -> RpcHandle {
        let (ready_tx, ready_rx) = oneshot::channel();
        let endpoint = self.endpoint;
        let incoming = TcpListenerStream::new(self.listener);
        let token = shutdown.clone();

        let task = tokio::spawn(async move {
            let router = Server::builder().add_service(GatewayServer::new(service));
            let _ = ready_tx.send(());
            tracing::info!(address = %endpoint.addr, "RPC server accepting connections");

            let result = router
                .serve_with_incoming_shutdown(incoming, async move { shutdown.cancelled().await })
                .await;

            match &result {
                Ok(()) => tracing::info!("RPC server stopped"),
                Err(e) => tracing::error!(error = %e, "RPC server error"),
            }
            result.map_err(|e| StartupError::Serve(format!("RPC server: {}", e)))
        });

        RpcHandle {
            endpoint,
            ready: Some(ready_rx),
            token,
            task,
        }
    }
}

/// Supervises the RPC serving task.
pub struct RpcHandle {
    endpoint: ServerEndpoint,
    ready: Option<oneshot::Receiver<()>>,
    token: CancellationToken,
    task: JoinHandle<Result<(), StartupError>>,
}

impl RpcHandle {
    pub fn endpoint(&self) -> ServerEndpoint {
        self.endpoint
    }

    /// Resolves once the server has taken over the socket.
    ///
    /// Fails if the serving task died first. Later calls return immediately.
    pub async fn ready(&mut self) -> Result<(), StartupError> {
        match self.ready.take() {
            Some(rx) => rx.await.map_err(|_| StartupError::RpcNotReady),
            None => Ok(()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting calls without touching the rest of the process.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// The serving task, for callers that supervise it alongside others.
    pub fn into_task(self) -> JoinHandle<Result<(), StartupError>> {
        self.task
    }

    /// Wait up to `grace` for the serving task to end after cancellation.
    pub async fn join(self, grace: Duration) -> Result<(), StartupError> {
        shutdown::drain("rpc", self.task, grace).await
    }
}
