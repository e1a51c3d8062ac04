//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (or mutual-TLS stream)
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → RouteTable prefix dispatch
//!         /swagger/ → explorer files
//!         /doc/     → documentation files
//!         /v1/      → protocol bridge
//!     → Send to client
//! ```

pub mod server;

pub use server::HttpServer;
