//! RPC and JSON/HTTP gateway for a ledger backend.

pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod rpc;

pub use config::GatewayConfig;
pub use error::StartupError;
pub use http::HttpServer;
pub use lifecycle::{start, GatewayState, RunningGateway, Shutdown};
