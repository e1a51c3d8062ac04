//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line
//!     → cli.rs (parse flags, apply defaults)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → borrowed by each subsystem during startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; there is no reload path
//! - All fields have defaults so the gateway starts with no flags
//! - Validation separates syntactic (clap) from semantic checks

pub mod cli;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use schema::{
    BackendSettings, GatewayConfig, ListenerConfig, ObservabilityConfig, RouteConfig, TimeoutConfig,
    TlsPolicy, TlsVersion,
};
pub use validation::{validate_config, ValidationError};
