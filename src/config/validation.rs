//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic, including negative max-age)
//! - Validate the bind address and listener scheme
//! - Validate log level and custom directive names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.scheme must be \"http\" or \"https\", got {0:?}")]
    ListenerScheme(String),

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("hsts.custom_directives[{0}] has an empty name")]
    EmptyDirectiveName(usize),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !matches!(config.listener.scheme.to_ascii_lowercase().as_str(), "http" | "https") {
        errors.push(ValidationError::ListenerScheme(config.listener.scheme.clone()));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    for (i, directive) in config.hsts.custom_directives.iter().enumerate() {
        if directive.name.is_empty() {
            errors.push(ValidationError::EmptyDirectiveName(i));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
