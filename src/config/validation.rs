//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Handler URIs have the `app/handler` form and no traversal
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::EngineConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: handler route '{value}' must look like 'app/handler'")]
    MalformedRoute { field: String, value: String },

    #[error("{field}: handler route '{value}' contains '..'")]
    Traversal { field: String, value: String },

    #[error("hook '{0}' has an empty handler entry")]
    EmptyHookEntry(String),

    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: String, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_route("general.default_handler", &config.general.default_handler, &mut errors);
    check_route("general.error_handler", &config.general.error_handler, &mut errors);

    for (name, uris) in &config.hooks {
        if uris.iter().any(|uri| uri.trim().is_empty()) {
            errors.push(ValidationError::EmptyHookEntry(name.clone()));
        }
        for uri in uris {
            if uri.contains("..") {
                errors.push(ValidationError::Traversal {
                    field: format!("hooks.{name}"),
                    value: uri.clone(),
                });
            }
        }
    }

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.admin.enabled {
        check_address("admin.bind_address", &config.admin.bind_address, &mut errors);
    }
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.cache.enabled && config.cache.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero("cache.sweep_interval_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_route(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.contains("..") {
        errors.push(ValidationError::Traversal {
            field: field.to_string(),
            value: value.to_string(),
        });
        return;
    }
    let trimmed = value.trim_start_matches('/');
    let well_formed = trimmed
        .split_once('/')
        .is_some_and(|(app, handler)| !app.is_empty() && !handler.is_empty());
    if !well_formed {
        errors.push(ValidationError::MalformedRoute {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn check_address(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_route_checks() {
        let mut config = EngineConfig::default();
        config.general.default_handler = "main".into();
        config.general.error_handler = "/main/error".into();
        config.hooks.insert("on_save".into(), vec!["".into(), "a/../b".into()]);
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MalformedRoute {
            field: "general.default_handler".into(),
            value: "main".into(),
        }));
        assert!(errors.contains(&ValidationError::EmptyHookEntry("on_save".into())));
        assert!(errors.contains(&ValidationError::Zero("timeouts.request_secs")));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_admin_address_only_checked_when_enabled() {
        let mut config = EngineConfig::default();
        config.admin.bind_address = "not an address".into();
        assert!(validate_config(&config).is_ok());

        config.admin.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
