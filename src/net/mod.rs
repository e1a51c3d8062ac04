//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayConfig.listener
//!     → listener.rs (bind RPC and HTTP ports, record ServerEndpoint)
//!     → tls.rs (optional mutual-TLS acceptor for the HTTP port)
//!     → Hand off to rpc / http layers
//! ```
//!
//! # Design Decisions
//! - Both ports are bound before their serving loops start
//! - TLS terminates on the HTTP side only; the RPC loopback hop is plaintext

pub mod listener;
pub mod tls;

pub use listener::{Protocol, ServerEndpoint};
