//! Ledger Gateway
//!
//! Serves one backend session over two protocols at once.
//!
//! # Architecture Overview
//!
//! ```text
//!   RPC client ──────────────────────────────┐
//!                                            ▼
//!                                   ┌─────────────────┐      ┌──────────┐
//!                                   │  rpc listener   │─────▶│ backend  │──▶ peer
//!                                   │ (GatewayServer) │      │ session  │
//!                                   └─────────────────┘      └──────────┘
//!                                            ▲
//!                                            │ loopback RPC
//!   HTTP client ──▶ ┌──────────┐     ┌──────────────┐
//!                   │  router  │────▶│   bridge     │  /v1/
//!                   │ (mTLS?)  │     └──────────────┘
//!                   │          │────▶ explorer files   /swagger/
//!                   │          │────▶ documentation    /doc/
//!                   └──────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use ledger_gateway::backend::NetworkClient;
use ledger_gateway::config::Cli;
use ledger_gateway::lifecycle::{self, spawn_signal_listener};
use ledger_gateway::observability::{logging, metrics};
use ledger_gateway::StartupError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = logging::init_logging(&cli.log_target(), cli.log_level());

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ledger-gateway starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway exited with error");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = cli.into_config();

    tracing::info!(
        rpc_address = %config.listener.rpc_addr(),
        http_address = %config.listener.http_addr(),
        tls = config.tls.enabled,
        channel = %config.backend.channel,
        "Configuration loaded"
    );

    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr);
    }

    let gateway = lifecycle::start(config, NetworkClient::new()).await?;
    let signals = spawn_signal_listener(gateway.shutdown_handle().token());
    let result = gateway.wait().await;
    signals.abort();
    result
}
