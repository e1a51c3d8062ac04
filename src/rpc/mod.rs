//! RPC subsystem.
//!
//! # Data Flow
//! ```text
//! RPC client / protocol bridge
//!     → listener.rs (tonic server on the bound port)
//!     → proto.rs (wire messages, service routing)
//!     → service.rs (validation, backend delegation, status mapping)
//!     → backend Session
//! ```

pub mod listener;
pub mod proto;
pub mod service;

pub use listener::{RpcHandle, RpcListener};
pub use service::GatewayService;
