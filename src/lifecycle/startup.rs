//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Bring components up in order: RPC listener, backend, bridge, HTTP
//! - Classify failures as fatal (abort) or degraded (log and continue)
//! - Supervise the serving tasks and tear them down in reverse order
//!
//! # Design Decisions
//! - Fail fast: bind, dial and TLS errors abort startup
//! - A backend that cannot be reached only degrades the API
//! - The bridge dials only after the RPC listener reports ready, never on a delay
//!
//! # State Machine
//! ```text
//! Unstarted → RpcListening → BackendConnecting → BridgeDialed → HttpServing → Shutdown
//!        ↘ (bind / dial / TLS failure) → Abort
//! ```

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendSettings, BackendSlot, Connector, SessionGuard};
use crate::bridge::ProtocolBridge;
use crate::config::{validate_config, GatewayConfig};
use crate::error::StartupError;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::net::listener::{self, Protocol, ServerEndpoint};
use crate::net::tls;
use crate::routing::RouteTable;
use crate::rpc::{GatewayService, RpcHandle, RpcListener};

/// Process-level lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Unstarted,
    RpcListening,
    BackendConnecting,
    BridgeDialed,
    HttpServing,
    Shutdown,
    Abort,
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatewayState::Unstarted => "UNSTARTED",
            GatewayState::RpcListening => "RPC_LISTENING",
            GatewayState::BackendConnecting => "BACKEND_CONNECTING",
            GatewayState::BridgeDialed => "BRIDGE_DIALED",
            GatewayState::HttpServing => "HTTP_SERVING",
            GatewayState::Shutdown => "SHUTDOWN",
            GatewayState::Abort => "ABORT",
        };
        f.write_str(name)
    }
}

fn transition(state: &watch::Sender<GatewayState>, next: GatewayState) {
    let previous = state.send_replace(next);
    tracing::info!(from = %previous, to = %next, "Gateway state changed");
}

/// Start the gateway and return once HTTP is serving.
///
/// On error every component started so far has been stopped again.
pub async fn start<C: Connector + 'static>(config: GatewayConfig, connector: C) -> Result<RunningGateway, StartupError> {
    let (state, _) = watch::channel(GatewayState::Unstarted);
    let shutdown = Shutdown::new();

    let mut rpc = None;
    match bring_up(&config, connector, &state, &shutdown, &mut rpc).await {
        Ok(gateway) => Ok(gateway),
        Err(e) => {
            tracing::error!(error = %e, "Startup aborted");
            shutdown.trigger();
            if let Some(handle) = rpc {
                let _ = handle.join(config.timeouts.shutdown_grace).await;
            }
            transition(&state, GatewayState::Abort);
            Err(e)
        }
    }
}

async fn bring_up<C: Connector + 'static>(
    config: &GatewayConfig,
    mut connector: C,
    state: &watch::Sender<GatewayState>,
    shutdown: &Shutdown,
    rpc_slot: &mut Option<RpcHandle>,
) -> Result<RunningGateway, StartupError> {
    validate_config(config).map_err(|errors| {
        let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        StartupError::Config(joined)
    })?;
    let table = RouteTable::from_config(&config.routes).map_err(|e| StartupError::Config(e.to_string()))?;

    // RPC listener
    let rpc_listener = RpcListener::bind(config.listener.rpc_addr()).await?;
    let rpc_endpoint = rpc_listener.endpoint();
    let backend = BackendSlot::new();
    let service = GatewayService::new(backend.clone(), &config.backend);
    let rpc = rpc_slot.insert(rpc_listener.serve(service, shutdown.child()));
    rpc.ready().await?;
    transition(state, GatewayState::RpcListening);

    // Backend connector
    transition(state, GatewayState::BackendConnecting);
    let reconnect = match connect_backend(&mut connector, &config.backend, &backend).await {
        Connect::Retry => Some(tokio::spawn(reconnect_backend(
            connector,
            config.backend.clone(),
            backend.clone(),
            shutdown.child(),
        ))),
        Connect::Done => None,
    };
    let session_guard = backend.guard();

    // Protocol bridge
    let http_token = shutdown.child();
    let bridge = ProtocolBridge::dial(rpc_endpoint.dial_addr(), config.timeouts.connect, http_token.clone()).await?;
    transition(state, GatewayState::BridgeDialed);

    // HTTP router, optionally behind mutual TLS
    let tls = if config.tls.enabled {
        Some(tls::load_mtls_config(&config.tls)?)
    } else {
        tracing::warn!("TLS disabled, HTTP is served in plaintext");
        None
    };
    let protocol = if tls.is_some() { Protocol::Https } else { Protocol::Http };
    let http_addr = config.listener.http_addr();
    let (http_listener, http_endpoint) = listener::bind(protocol, http_addr)
        .await
        .map_err(|source| StartupError::HttpBind { addr: http_addr, source })?;

    let server = HttpServer::new(config, table, bridge);
    let http = tokio::spawn(server.run(http_listener, tls, http_token));
    transition(state, GatewayState::HttpServing);

    let rpc = rpc_slot.take().ok_or(StartupError::RpcNotReady)?;
    Ok(RunningGateway {
        state: state.clone(),
        shutdown: shutdown.clone(),
        rpc,
        http,
        backend,
        reconnect,
        session_guard,
        rpc_endpoint,
        http_endpoint,
        grace: config.timeouts.shutdown_grace,
    })
}

/// Outcome of the first backend connect.
enum Connect {
    Done,
    Retry,
}

/// Configure and connect the backend, leaving the slot empty on failure.
///
/// A bad profile is not retried; an unreachable peer is.
async fn connect_backend<C: Connector>(connector: &mut C, settings: &BackendSettings, backend: &BackendSlot) -> Connect {
    if let Err(e) = connector.configure(settings) {
        tracing::error!(error = %e, "Backend configuration failed, serving without backend");
        return Connect::Done;
    }
    if try_connect(connector, settings, backend).await {
        Connect::Done
    } else {
        Connect::Retry
    }
}

async fn try_connect<C: Connector>(connector: &C, settings: &BackendSettings, backend: &BackendSlot) -> bool {
    match tokio::time::timeout(settings.connect_timeout, connector.connect()).await {
        Ok(Ok(session)) => {
            backend.install(session);
            tracing::info!(channel = %settings.channel, org = %settings.org, user = %settings.user, "Backend connected");
            true
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Backend connect failed, serving without backend");
            false
        }
        Err(_) => {
            tracing::error!(
                timeout_secs = settings.connect_timeout.as_secs(),
                "Backend connect timed out, serving without backend"
            );
            false
        }
    }
}

/// Retry the backend connect every `connect_timeout` until a session is
/// installed or `token` fires. Each attempt is bounded by the same timeout.
async fn reconnect_backend<C: Connector>(
    connector: C,
    settings: BackendSettings,
    backend: BackendSlot,
    token: CancellationToken,
) {
    let mut attempt: u32 = 1;
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(settings.connect_timeout) => {}
        }
        attempt += 1;
        tracing::info!(attempt, "Retrying backend connect");
        let connected = tokio::select! {
            _ = token.cancelled() => return,
            connected = try_connect(&connector, &settings, &backend) => connected,
        };
        if connected {
            return;
        }
    }
}

/// A gateway that is serving RPC and HTTP.
pub struct RunningGateway {
    state: watch::Sender<GatewayState>,
    shutdown: Shutdown,
    rpc: RpcHandle,
    http: JoinHandle<Result<(), StartupError>>,
    backend: BackendSlot,
    reconnect: Option<JoinHandle<()>>,
    session_guard: SessionGuard,
    rpc_endpoint: ServerEndpoint,
    http_endpoint: ServerEndpoint,
    grace: Duration,
}

impl RunningGateway {
    pub fn rpc_endpoint(&self) -> ServerEndpoint {
        self.rpc_endpoint
    }

    pub fn http_endpoint(&self) -> ServerEndpoint {
        self.http_endpoint
    }

    /// Whether a backend session is installed.
    pub fn backend_connected(&self) -> bool {
        self.backend.is_connected()
    }

    pub fn state(&self) -> GatewayState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<GatewayState> {
        self.state.subscribe()
    }

    /// Coordinator whose trigger stops this gateway.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Request a graceful shutdown; [`RunningGateway::wait`] completes it.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Serve until shutdown is triggered or either server exits, then tear
    /// down: bridge and HTTP first, then RPC, then the backend session.
    pub async fn wait(self) -> Result<(), StartupError> {
        let RunningGateway {
            state,
            shutdown,
            rpc,
            mut http,
            reconnect,
            session_guard,
            grace,
            ..
        } = self;
        let mut rpc = rpc.into_task();

        let exit = tokio::select! {
            _ = shutdown.triggered() => Exit::Requested,
            joined = &mut http => Exit::Http(task_result("http", joined)),
            joined = &mut rpc => Exit::Rpc(task_result("rpc", joined)),
        };

        let requested = shutdown.is_triggered();
        tracing::info!(requested, "Shutting down");
        shutdown.trigger();

        let (http_result, rpc_result) = match exit {
            Exit::Requested => (
                shutdown::drain("http", http, grace).await,
                shutdown::drain("rpc", rpc, grace).await,
            ),
            Exit::Http(result) => (
                early_exit("HTTP", result, requested),
                shutdown::drain("rpc", rpc, grace).await,
            ),
            Exit::Rpc(result) => (
                shutdown::drain("http", http, grace).await,
                early_exit("RPC", result, requested),
            ),
        };
        // The retry loop must be gone before the session is released.
        if let Some(task) = reconnect {
            let _ = task.await;
        }
        session_guard.release().await;

        transition(&state, GatewayState::Shutdown);
        tracing::info!("Shutdown complete");
        rpc_result.and(http_result)
    }
}

/// Why [`RunningGateway::wait`] stopped serving.
enum Exit {
    Requested,
    Http(Result<(), StartupError>),
    Rpc(Result<(), StartupError>),
}

fn task_result(
    name: &str,
    joined: Result<Result<(), StartupError>, tokio::task::JoinError>,
) -> Result<(), StartupError> {
    joined.unwrap_or_else(|e| Err(StartupError::Serve(format!("{} task failed: {}", name, e))))
}

/// A server that stops on its own, without a shutdown request, is an error.
fn early_exit(name: &str, result: Result<(), StartupError>, requested: bool) -> Result<(), StartupError> {
    match result {
        Ok(()) if requested => Ok(()),
        Ok(()) => Err(StartupError::Serve(format!("{} server exited unexpectedly", name))),
        Err(e) => Err(e),
    }
}
