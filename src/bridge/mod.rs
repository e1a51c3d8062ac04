//! Protocol bridge: the RPC service exposed as HTTP+JSON.
//!
//! # Data Flow
//! ```text
//! HTTP request under the API prefix
//!     → handlers.rs (decode query string / JSON body)
//!     → proxy.rs (loopback RPC client)
//!     → RPC listener → GatewayService
//!     → status.rs (RPC status → HTTP status, error body)
//!     → JSON response
//! ```
//!
//! # Design Decisions
//! - One loopback connection per process, dialed before HTTP starts
//! - Decode failures never reach the RPC listener

pub mod handlers;
pub mod proxy;
pub mod status;

pub use handlers::{routes, REQUEST_ID_HEADER};
pub use proxy::ProtocolBridge;
pub use status::{http_status, ApiError, ErrorBody};
