//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check service definitions are routable (unique names and prefixes)
//! - Validate value ranges (timeouts > 0, thresholds within bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the parsed config
//! - Runs before config is accepted into the system; failure is fatal

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service at index {index} has an empty name")]
    EmptyServiceName { index: usize },

    #[error("service '{service}' appears more than once")]
    DuplicateServiceName { service: String },

    #[error("service '{service}' has an invalid base_url '{url}': {reason}")]
    InvalidBaseUrl {
        service: String,
        url: String,
        reason: String,
    },

    #[error("service '{service}' path_prefix '{prefix}' must start with '/'")]
    InvalidPathPrefix { service: String, prefix: String },

    #[error("services '{first}' and '{second}' share path_prefix '{prefix}'")]
    DuplicatePathPrefix {
        first: String,
        second: String,
        prefix: String,
    },

    #[error("service '{service}': {field} must be greater than zero")]
    ZeroField { service: String, field: &'static str },

    #[error("service '{service}': error_threshold_percentage {value} is outside 1..=100")]
    ThresholdOutOfRange { service: String, value: u8 },

    #[error("service '{service}': rolling_window_ms {window} is not divisible by bucket_count {buckets}")]
    WindowNotDivisible {
        service: String,
        window: u64,
        buckets: usize,
    },

    #[error("health_check.interval_ms must be greater than zero")]
    ZeroHealthInterval,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut names: HashSet<&str> = HashSet::new();
    let mut prefixes: Vec<(&str, &str)> = Vec::new();

    for (index, svc) in config.services.iter().enumerate() {
        if svc.name.is_empty() {
            errors.push(ValidationError::EmptyServiceName { index });
            continue;
        }
        if !names.insert(&svc.name) {
            errors.push(ValidationError::DuplicateServiceName {
                service: svc.name.clone(),
            });
        }

        match Url::parse(&svc.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::InvalidBaseUrl {
                service: svc.name.clone(),
                url: svc.base_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidBaseUrl {
                service: svc.name.clone(),
                url: svc.base_url.clone(),
                reason: e.to_string(),
            }),
        }

        if !svc.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPathPrefix {
                service: svc.name.clone(),
                prefix: svc.path_prefix.clone(),
            });
        } else {
            if let Some((other, _)) = prefixes.iter().find(|(_, p)| *p == svc.path_prefix) {
                errors.push(ValidationError::DuplicatePathPrefix {
                    first: (*other).to_string(),
                    second: svc.name.clone(),
                    prefix: svc.path_prefix.clone(),
                });
            }
            prefixes.push((svc.name.as_str(), svc.path_prefix.as_str()));
        }

        for (field, value) in [
            ("timeout_ms", svc.timeout_ms),
            ("reset_timeout_ms", svc.reset_timeout_ms),
            ("rolling_window_ms", svc.rolling_window_ms),
        ] {
            if value == 0 {
                errors.push(ValidationError::ZeroField {
                    service: svc.name.clone(),
                    field,
                });
            }
        }
        if svc.retries == 0 {
            errors.push(ValidationError::ZeroField {
                service: svc.name.clone(),
                field: "retries",
            });
        }
        if svc.bucket_count == 0 {
            errors.push(ValidationError::ZeroField {
                service: svc.name.clone(),
                field: "bucket_count",
            });
        }
        if svc.volume_threshold == 0 {
            errors.push(ValidationError::ZeroField {
                service: svc.name.clone(),
                field: "volume_threshold",
            });
        }

        if svc.error_threshold_percentage == 0 || svc.error_threshold_percentage > 100 {
            errors.push(ValidationError::ThresholdOutOfRange {
                service: svc.name.clone(),
                value: svc.error_threshold_percentage,
            });
        }

        if svc.bucket_count > 0
            && svc.rolling_window_ms > 0
            && svc.rolling_window_ms % svc.bucket_count as u64 != 0
        {
            errors.push(ValidationError::WindowNotDivisible {
                service: svc.name.clone(),
                window: svc.rolling_window_ms,
                buckets: svc.bucket_count,
            });
        }
    }

    if config.health_check.enabled && config.health_check.interval_ms == 0 {
        errors.push(ValidationError::ZeroHealthInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
