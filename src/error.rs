//! Gateway error taxonomy.
//!
//! # Classes
//! - Fatal startup errors ([`StartupError`]): abort before serving, non-zero exit.
//! - Degraded-but-serving errors: backend connect failures, see
//!   [`crate::backend::BackendError`]. Logged, never fatal.
//! - Per-request errors: mapped to an HTTP status by the bridge, never fatal.

use std::net::SocketAddr;

use thiserror::Error;

use crate::net::tls::TlsError;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration rejected before any socket was opened.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The RPC listener could not bind its port.
    #[error("failed to bind RPC listener on {addr}: {source}")]
    RpcBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP listener could not bind its port.
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    HttpBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The RPC listener task ended before it reported readiness.
    #[error("RPC listener exited before becoming ready")]
    RpcNotReady,

    /// The protocol bridge could not reach the RPC listener.
    #[error("protocol bridge failed to dial {endpoint}: {reason}")]
    BridgeDial { endpoint: String, reason: String },

    /// TLS material is missing or invalid.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    /// A serving loop failed after startup.
    #[error("server error: {0}")]
    Serve(String),
}

impl StartupError {
    /// Process exit code for this error.
    ///
    /// Usage and configuration errors exit with 2, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Config(_) => 2,
            _ => 1,
        }
    }
}
