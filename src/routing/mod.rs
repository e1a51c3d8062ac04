//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (RouteTable lookup, longest prefix)
//!     → matcher.rs (`/`-delimited prefix test)
//!     → Return: owning Route or no match (404)
//!
//! Route handlers:
//!     Explorer      → static_files.rs (ServeDir)
//!     Documentation → static_files.rs (ServeDir minus TLS material)
//!     Api           → bridge
//! ```
//!
//! # Design Decisions
//! - Routes built at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;
pub mod static_files;

pub use router::{Route, RouteClass, RouteError, RouteTable};
pub use static_files::HiddenFiles;
