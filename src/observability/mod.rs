//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, stderr or rolling file)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Operator (stderr / ./log/gateway.log.<date>)
//!     → Metrics endpoint (Prometheus scrape, when enabled)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the HTTP layer into RPC metadata
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
