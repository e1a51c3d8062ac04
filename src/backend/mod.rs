//! Backend connector subsystem.
//!
//! # Data Flow
//! ```text
//! BackendSettings
//!     → Connector::configure (load network profile + entity matchers)
//!     → Connector::connect   (resolve peer, open session)
//!     → BackendSlot          (shared, swappable session handle)
//!     → RPC service reads the slot on every Query/Invoke
//! ```
//!
//! # Design Decisions
//! - Connect failures are not fatal: the slot stays empty and backend calls
//!   report "unavailable" until a session is installed
//! - An unreachable peer is retried every `connect_timeout` until a session
//!   is installed or shutdown begins; a bad network profile is not retried
//! - Sessions are opaque `Arc<dyn Session>` handles, safe for concurrent use
//! - Session release is tied to a guard so every exit path closes it

pub mod client;
pub mod network;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use thiserror::Error;

pub use crate::config::BackendSettings;
pub use client::NetworkClient;

/// Errors reported by the backend connector or an open session.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network profile or matcher file is unreadable or inconsistent.
    #[error("backend configuration error: {0}")]
    Config(String),

    /// No session, or the peer cannot be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The peer did not answer within the deadline.
    #[error("backend call timed out after {0} ms")]
    Timeout(u64),

    /// The peer refused the transaction (endorsement or validation failure).
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Chaincode or function unknown to the peer.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request cannot be executed as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failure talking to the peer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The session was closed.
    #[error("session closed")]
    Closed,
}

/// A chaincode transaction as the backend sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<String>,
    pub transient: Option<serde_json::Value>,
    pub endorsers: Vec<String>,
    /// Per-call deadline in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Result of a query or invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOutcome {
    pub value: String,
    pub txn_id: String,
}

/// An established backend session.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Evaluate a transaction without committing it.
    async fn query(&self, tx: Transaction) -> Result<TxOutcome, BackendError>;

    /// Submit a transaction for endorsement and commit.
    async fn invoke(&self, tx: Transaction) -> Result<TxOutcome, BackendError>;

    /// Release the session. Calls after the first are no-ops.
    async fn close(&self);
}

/// Establishes sessions with the backend network.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Load connection settings. Idempotent for identical settings.
    fn configure(&mut self, settings: &BackendSettings) -> Result<(), BackendError>;

    /// Open a session using the configured settings.
    async fn connect(&self) -> Result<Arc<dyn Session>, BackendError>;
}

/// Shared slot holding the current backend session, if any.
#[derive(Clone, Default)]
pub struct BackendSlot {
    session: Arc<ArcSwapOption<Arc<dyn Session>>>,
}

impl BackendSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session, replacing any previous one.
    pub fn install(&self, session: Arc<dyn Session>) {
        self.session.store(Some(Arc::new(session)));
    }

    /// Current session, or `Unavailable` when none is installed.
    pub fn current(&self) -> Result<Arc<dyn Session>, BackendError> {
        self.session
            .load_full()
            .map(|session| Arc::clone(&*session))
            .ok_or_else(|| BackendError::Unavailable("not connected".to_string()))
    }

    pub fn is_connected(&self) -> bool {
        self.session.load().is_some()
    }

    /// Remove the session from the slot and close it.
    pub async fn close(&self) {
        if let Some(session) = self.session.swap(None) {
            session.close().await;
            tracing::info!("Backend session closed");
        }
    }

    /// Guard that closes the installed session when dropped.
    pub fn guard(&self) -> SessionGuard {
        SessionGuard { slot: self.clone() }
    }
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSlot")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Closes the backend session on drop.
///
/// Prefer [`SessionGuard::release`] on orderly shutdown; the drop path is for
/// early returns and unwinding, where it hands the close to the runtime.
#[must_use = "dropping the guard closes the backend session"]
pub struct SessionGuard {
    slot: BackendSlot,
}

impl SessionGuard {
    /// Close the session now.
    pub async fn release(self) {
        self.slot.close().await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.slot.session.swap(None) else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    session.close().await;
                    tracing::info!("Backend session closed");
                });
            }
            Err(_) => tracing::warn!("No runtime available, backend session dropped without close"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory session that echoes the function name.
    #[derive(Default)]
    pub struct RecordingSession {
        pub closes: AtomicUsize,
    }

    #[async_trait]
    impl Session for RecordingSession {
        async fn query(&self, tx: Transaction) -> Result<TxOutcome, BackendError> {
            if tx.function == "missing" {
                return Err(BackendError::NotFound(tx.function));
            }
            Ok(TxOutcome {
                value: format!("{}:{}", tx.function, tx.args.join(",")),
                txn_id: String::new(),
            })
        }

        async fn invoke(&self, tx: Transaction) -> Result<TxOutcome, BackendError> {
            Ok(TxOutcome {
                value: tx.function,
                txn_id: "tx-1".to_string(),
            })
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
