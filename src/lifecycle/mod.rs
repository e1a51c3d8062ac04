//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → RPC listener → Backend → Bridge → HTTP listener
//!
//! Shutdown (shutdown.rs):
//!     Root token cancelled → Drain HTTP → Stop RPC → Close backend session
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Cancel root token
//! ```
//!
//! # Design Decisions
//! - Ordered startup, reverse-ordered shutdown
//! - Every drain is bounded by the shutdown grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::spawn_signal_listener;
pub use startup::{start, GatewayState, RunningGateway};
