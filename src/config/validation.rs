//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, timeouts and log settings
//! - Check masking rules compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{MaskingRules, ProxyConfig};
use crate::masking::JsonPath;
use crate::observability::logging::LogFormat;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("observability.log_format must be 'pretty' or 'json', got '{0}'")]
    UnknownLogFormat(String),

    #[error("{field}: empty name")]
    EmptyName { field: String },

    #[error("{field}: invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("{field}: invalid JSON path '{path}': {reason}")]
    InvalidPath {
        field: String,
        path: String,
        reason: String,
    },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "upstream.address", &config.upstream.address);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let format = &config.observability.log_format;
    if LogFormat::parse(format).is_none() {
        errors.push(ValidationError::UnknownLogFormat(format.clone()));
    }

    check_rules(&mut errors, "masking.request", &config.masking.request);
    check_rules(&mut errors, "masking.response", &config.masking.response);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_rules(errors: &mut Vec<ValidationError>, prefix: &str, rules: &MaskingRules) {
    for (key, names) in [("headers", &rules.headers), ("fields", &rules.fields)] {
        if names.iter().any(|n| n.trim().is_empty()) {
            errors.push(ValidationError::EmptyName {
                field: format!("{prefix}.{key}"),
            });
        }
    }

    for (key, patterns) in [
        ("header_patterns", &rules.header_patterns),
        ("field_patterns", &rules.field_patterns),
    ] {
        for pattern in patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError::InvalidPattern {
                    field: format!("{prefix}.{key}"),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for path in &rules.json_paths {
        if let Err(e) = JsonPath::parse(path) {
            errors.push(ValidationError::InvalidPath {
                field: format!("{prefix}.json_paths"),
                path: path.clone(),
                reason: e.to_string(),
            });
        }
    }
}
