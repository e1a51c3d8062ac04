//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntactic)
//! - Validate value ranges (timeouts > 0, distinct ports)
//! - Enforce the fail-closed TLS posture
//! - Detect ambiguous route prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before any socket is opened

use std::fmt;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.grpc_port != 0 && listener.grpc_port == listener.http_port {
        errors.push(ValidationError::new(
            "httpport",
            format!("must differ from grpcport ({})", listener.grpc_port),
        ));
    }

    let backend = &config.backend;
    for (field, value) in [
        ("channel", &backend.channel),
        ("org", &backend.org),
        ("user", &backend.user),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    // Both deadlines come from --connect-timeout.
    let timeouts = &config.timeouts;
    if backend.connect_timeout.is_zero() || timeouts.connect.is_zero() {
        errors.push(ValidationError::new("connect-timeout", "must be greater than zero"));
    }
    if timeouts.request.is_zero() {
        errors.push(ValidationError::new("request-timeout", "must be greater than zero"));
    }

    let tls = &config.tls;
    if tls.enabled {
        if !tls.client_auth_required {
            errors.push(ValidationError::new(
                "tls",
                "client authentication cannot be disabled when TLS is enabled",
            ));
        }
        for (field, path) in [
            ("tls-ca", &tls.ca_path),
            ("tls-cert", &tls.cert_path),
            ("tls-key", &tls.key_path),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(field, "required when TLS is enabled"));
            }
        }
    }

    let routes = &config.routes;
    let prefixes = [
        ("api-prefix", &routes.api_prefix),
        ("doc-prefix", &routes.doc_prefix),
        ("swagger-prefix", &routes.swagger_prefix),
    ];
    for (field, prefix) in prefixes {
        if !prefix.starts_with('/') || !prefix.ends_with('/') || prefix.len() < 3 {
            errors.push(ValidationError::new(
                field,
                format!("'{}' must look like /name/", prefix),
            ));
        }
    }
    for (i, (field, a)) in prefixes.iter().enumerate() {
        for (_, b) in prefixes.iter().skip(i + 1) {
            if a == b {
                errors.push(ValidationError::new(field, format!("prefix '{}' is registered twice", a)));
            }
        }
    }
    if routes.max_body_size == 0 {
        errors.push(ValidationError::new("max-body-size", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn equal_ports_rejected() {
        let mut config = GatewayConfig::default();
        config.listener.grpc_port = 9001;
        config.listener.http_port = 9001;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "httpport");
    }

    #[test]
    fn ephemeral_ports_may_coincide() {
        let mut config = GatewayConfig::default();
        config.listener.grpc_port = 0;
        config.listener.http_port = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn tls_without_client_auth_rejected() {
        let mut config = GatewayConfig::default();
        config.tls.enabled = true;
        config.tls.client_auth_required = false;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "tls"));
    }

    #[test]
    fn zero_connect_timeout_reported_once() {
        let cli = Cli::try_parse_from(["ledger-gateway", "--connect-timeout", "0"]).unwrap();
        let errors = validate_config(&cli.into_config()).unwrap_err();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].field, "connect-timeout");
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.backend.user = String::new();
        config.timeouts.request = Duration::ZERO;
        config.routes.doc_prefix = "/v1/".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "{:?}", errors);
    }
}
