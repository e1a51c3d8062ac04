//! Command-line surface of the gateway binary.
//!
//! Every flag has a default, so the gateway starts with no arguments at all.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::schema::{
    BackendSettings, GatewayConfig, ListenerConfig, ObservabilityConfig, RouteConfig, TimeoutConfig,
    TlsPolicy, TlsVersion,
};
use crate::observability::logging::LogTarget;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-gateway", version, about = "RPC and JSON/HTTP gateway for a ledger backend")]
pub struct Cli {
    /// Path of the blockchain network configuration file
    #[arg(long, default_value = "config_byfn.yaml")]
    pub config: PathBuf,

    /// Path of entity matcher file for blockchain network config
    #[arg(long, default_value = "matchers_byfn.yaml")]
    pub pattern: PathBuf,

    /// ID of the default channel for chaincode transactions
    #[arg(long, default_value = "mychannel")]
    pub channel: String,

    /// Name of the organization that this client connects to
    #[arg(long, default_value = "org1")]
    pub org: String,

    /// Name of the user to execute transactions on this connection
    #[arg(long, default_value = "Admin")]
    pub user: String,

    /// gRPC service listen port
    #[arg(long = "grpcport", default_value_t = 8082, value_parser = clap::value_parser!(u16).range(1..))]
    pub grpc_port: u16,

    /// HTTP REST service listen port
    #[arg(long = "httpport", default_value_t = 8081, value_parser = clap::value_parser!(u16).range(1..))]
    pub http_port: u16,

    /// Address both listeners bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Serve HTTPS with mandatory client certificates
    #[arg(long)]
    pub tls: bool,

    /// CA bundle that client certificates must chain to
    #[arg(long, default_value = "cacert.pem")]
    pub tls_ca: PathBuf,

    /// Server certificate (PEM)
    #[arg(long, default_value = "servercert.pem")]
    pub tls_cert: PathBuf,

    /// Server private key (PEM)
    #[arg(long, default_value = "serverkey.pem")]
    pub tls_key: PathBuf,

    /// Directory served under /swagger/
    #[arg(long, default_value = "swagger-ui")]
    pub swagger_root: PathBuf,

    /// Directory served under /doc/
    #[arg(long, default_value = ".")]
    pub doc_root: PathBuf,

    /// Backend connect and loopback dial deadline, in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,

    /// Per-request deadline on the HTTP side, in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout: u64,

    /// Grace period for in-flight requests on shutdown, in seconds
    #[arg(long, default_value_t = 10)]
    pub shutdown_grace: u64,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Log to stderr instead of files
    #[arg(long)]
    pub logtostderr: bool,

    /// Directory for log files
    #[arg(long, default_value = "./log")]
    pub log_dir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Where log output should go.
    pub fn log_target(&self) -> LogTarget {
        if self.logtostderr {
            LogTarget::Stderr
        } else {
            LogTarget::Directory(self.log_dir.clone())
        }
    }

    /// Default log filter derived from `-v`.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Build the immutable gateway configuration.
    pub fn into_config(self) -> GatewayConfig {
        let connect_timeout = Duration::from_secs(self.connect_timeout);
        GatewayConfig {
            backend: BackendSettings {
                network_config: self.config,
                pattern: self.pattern,
                channel: self.channel,
                org: self.org,
                user: self.user,
                connect_timeout,
            },
            listener: ListenerConfig {
                bind_host: self.bind,
                grpc_port: self.grpc_port,
                http_port: self.http_port,
            },
            tls: TlsPolicy {
                enabled: self.tls,
                ca_path: self.tls_ca,
                cert_path: self.tls_cert,
                key_path: self.tls_key,
                client_auth_required: true,
                min_version: TlsVersion::Tls12,
            },
            routes: RouteConfig {
                doc_root: self.doc_root,
                swagger_root: self.swagger_root,
                ..RouteConfig::default()
            },
            timeouts: TimeoutConfig {
                connect: connect_timeout,
                request: Duration::from_secs(self.request_timeout),
                shutdown_grace: Duration::from_secs(self.shutdown_grace),
            },
            observability: ObservabilityConfig {
                metrics_address: self.metrics_addr,
            },
        }
    }
}
