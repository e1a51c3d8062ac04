//! Loopback connection from the HTTP side to the RPC listener.
//!
//! # Responsibilities
//! - Dial the RPC listener once, eagerly, under a deadline
//! - Hand out cheap client clones to request handlers
//! - Release the connection when the bridge's cancellation token fires
//!
//! # Design Decisions
//! - A failed dial is a startup error, not a degraded mode
//! - The connection is plaintext; it never leaves the host
//! - After release every call fails with `Unavailable` instead of redialing

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio_util::sync::CancellationToken;
use tonic::transport::Endpoint;
use tonic::Status;

use crate::error::StartupError;
use crate::rpc::proto::GatewayClient;

/// Owner of the bridge's single RPC connection.
#[derive(Debug, Clone)]
pub struct ProtocolBridge {
    client: Arc<ArcSwapOption<GatewayClient>>,
    target: SocketAddr,
}

impl ProtocolBridge {
    /// Dial `target` and tie the connection's lifetime to `lifetime`.
    pub async fn dial(
        target: SocketAddr,
        connect_timeout: Duration,
        lifetime: CancellationToken,
    ) -> Result<Self, StartupError> {
        let uri = format!("http://{}", target);
        let dial_error = |reason: String| StartupError::BridgeDial {
            endpoint: uri.clone(),
            reason,
        };

        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| dial_error(e.to_string()))?
            .connect_timeout(connect_timeout);

        let channel = match tokio::time::timeout(connect_timeout, endpoint.connect()).await {
            Ok(Ok(channel)) => channel,
            Ok(Err(e)) => return Err(dial_error(e.to_string())),
            Err(_) => return Err(dial_error(format!("timed out after {:?}", connect_timeout))),
        };

        tracing::info!(rpc_addr = %target, "Protocol bridge connected to RPC listener");

        let client = Arc::new(ArcSwapOption::from_pointee(GatewayClient::new(channel)));
        let slot = Arc::clone(&client);
        tokio::spawn(async move {
            lifetime.cancelled().await;
            slot.store(None);
            tracing::info!(rpc_addr = %target, "Protocol bridge released loopback connection");
        });

        Ok(Self { client, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// A client on the loopback connection, or `Unavailable` once released.
    pub fn client(&self) -> Result<GatewayClient, Status> {
        self.client
            .load_full()
            .map(|client| (*client).clone())
            .ok_or_else(|| Status::unavailable("protocol bridge is shut down"))
    }

    pub fn is_released(&self) -> bool {
        self.client.load().is_none()
    }
}
