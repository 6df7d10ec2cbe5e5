//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::masking::{MaskConfig, MaskPredicate};

/// Root configuration for the masking proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Masking rules for logged exchanges.
    pub masking: MaskingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format: "pretty" or "json".
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Masking rules for both sides of an exchange.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MaskingConfig {
    pub request: MaskingRules,
    pub response: MaskingRules,
}

/// Masking rules for one side of an exchange.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MaskingRules {
    /// Header names to mask (case-insensitive).
    pub headers: Vec<String>,

    /// Regular expressions over header names.
    pub header_patterns: Vec<String>,

    /// Top-level JSON field names to mask (case-insensitive).
    pub fields: Vec<String>,

    /// Regular expressions over top-level JSON field names.
    pub field_patterns: Vec<String>,

    /// JSON path expressions, applied in order.
    pub json_paths: Vec<String>,
}

impl MaskingRules {
    fn header_predicate(&self) -> Result<MaskPredicate, regex::Error> {
        predicate(&self.headers, &self.header_patterns)
    }

    fn field_predicate(&self) -> Result<MaskPredicate, regex::Error> {
        predicate(&self.fields, &self.field_patterns)
    }
}

fn predicate(names: &[String], patterns: &[String]) -> Result<MaskPredicate, regex::Error> {
    let mut predicate = MaskPredicate::never();
    if !names.is_empty() {
        predicate = predicate.or(MaskPredicate::names(names.iter().cloned()));
    }
    for pattern in patterns {
        predicate = predicate.or(MaskPredicate::pattern(pattern)?);
    }
    Ok(predicate)
}

impl MaskingConfig {
    /// Build the immutable rule set used by the pipeline.
    pub fn build(&self) -> Result<MaskConfig, regex::Error> {
        let mut config = MaskConfig::new()
            .mask_request_headers(self.request.header_predicate()?)
            .mask_request_body_fields(self.request.field_predicate()?)
            .mask_response_headers(self.response.header_predicate()?)
            .mask_response_body_fields(self.response.field_predicate()?);

        for path in &self.request.json_paths {
            config = config.mask_request_body_json_path(path.as_str());
        }
        for path in &self.response.json_paths {
            config = config.mask_response_body_json_path(path.as_str());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.observability.log_format, "pretty");
        assert!(config.masking.request.headers.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            address = "10.0.0.5:9000"

            [masking.request]
            headers = ["Authorization"]
            fields = ["password"]

            [masking.response]
            header_patterns = ["(?i)^set-cookie$"]
            json_paths = ["$.token.value", "$..secret"]
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.address, "10.0.0.5:9000");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");

        let mask = config.masking.build().unwrap();
        assert!(mask.request_headers().test("authorization"));
        assert!(mask.request_body_fields().test("password"));
        assert!(mask.response_headers().test("Set-Cookie"));
        assert!(!mask.response_headers().test("authorization"));
        assert_eq!(mask.response_body_paths().len(), 2);
    }

    #[test]
    fn test_empty_rules_build_never() {
        let mask = MaskingConfig::default().build().unwrap();
        assert!(mask.request_headers().is_never());
        assert!(mask.response_body_fields().is_never());
    }

    #[test]
    fn test_bad_pattern_fails_build() {
        let mut masking = MaskingConfig::default();
        masking.request.field_patterns.push("[".into());
        assert!(masking.build().is_err());
    }
}
