//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! A [`GatewayConfig`] is built once at startup (from the command line, see
//! [`crate::config::cli`]) and never mutated afterwards.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Backend connector settings (network profile, identity).
    pub backend: BackendSettings,

    /// Listener configuration (bind host, RPC and HTTP ports).
    pub listener: ListenerConfig,

    /// Mutual-TLS policy for the HTTP side.
    pub tls: TlsPolicy,

    /// HTTP route prefixes and static roots.
    pub routes: RouteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Settings handed to the backend connector's `configure` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Path of the backend network profile (YAML).
    pub network_config: PathBuf,

    /// Path of the entity matcher file (YAML).
    pub pattern: PathBuf,

    /// Default channel for transactions.
    pub channel: String,

    /// Organization this gateway connects as.
    pub org: String,

    /// Principal that executes transactions.
    pub user: String,

    /// Deadline for establishing the backend session.
    pub connect_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            network_config: PathBuf::from("config_byfn.yaml"),
            pattern: PathBuf::from("matchers_byfn.yaml"),
            channel: "mychannel".to_string(),
            org: "org1".to_string(),
            user: "Admin".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address both listeners bind to.
    pub bind_host: IpAddr,

    /// RPC listen port. Zero asks the OS for an ephemeral port.
    pub grpc_port: u16,

    /// HTTP listen port. Zero asks the OS for an ephemeral port.
    pub http_port: u16,
}

impl ListenerConfig {
    pub fn rpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.grpc_port)
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.http_port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            grpc_port: 8082,
            http_port: 8081,
        }
    }
}

/// Minimum TLS protocol version accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

/// Mutual-TLS policy for the HTTP listener.
///
/// When enabled, client authentication is mandatory and the trust root
/// must load at least one certificate; anything else is rejected at
/// startup.
#[derive(Debug, Clone)]
pub struct TlsPolicy {
    /// Serve HTTPS with client certificate verification.
    pub enabled: bool,

    /// CA bundle (PEM) client certificates must chain to.
    pub ca_path: PathBuf,

    /// Server certificate chain (PEM).
    pub cert_path: PathBuf,

    /// Server private key (PEM).
    pub key_path: PathBuf,

    /// Require and verify a client certificate on every connection.
    pub client_auth_required: bool,

    /// Oldest protocol version offered.
    pub min_version: TlsVersion,
}

impl TlsPolicy {
    /// Paths of all TLS material, whether or not TLS is enabled.
    pub fn material_paths(&self) -> [&PathBuf; 3] {
        [&self.ca_path, &self.cert_path, &self.key_path]
    }
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            ca_path: PathBuf::from("cacert.pem"),
            cert_path: PathBuf::from("servercert.pem"),
            key_path: PathBuf::from("serverkey.pem"),
            client_auth_required: true,
            min_version: TlsVersion::Tls12,
        }
    }
}

/// HTTP route prefixes and the directories served under them.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Prefix forwarded to the protocol bridge.
    pub api_prefix: String,

    /// Prefix of the documentation file server.
    pub doc_prefix: String,

    /// Directory served under `doc_prefix`.
    pub doc_root: PathBuf,

    /// Prefix of the API explorer file server.
    pub swagger_prefix: String,

    /// Directory served under `swagger_prefix`.
    pub swagger_root: PathBuf,

    /// Maximum accepted API request body in bytes.
    pub max_body_size: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/v1/".to_string(),
            doc_prefix: "/doc/".to_string(),
            doc_root: PathBuf::from("."),
            swagger_prefix: "/swagger/".to_string(),
            swagger_root: PathBuf::from("swagger-ui"),
            max_body_size: 4 * 1024 * 1024, // 4MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Deadline for the bridge's loopback dial.
    pub connect: Duration,

    /// Total time allowed for one HTTP request.
    pub request: Duration,

    /// How long in-flight requests may drain on shutdown.
    pub shutdown_grace: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Prometheus exporter bind address; disabled when `None`.
    pub metrics_address: Option<SocketAddr>,
}
