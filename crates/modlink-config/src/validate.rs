//! Configuration validation.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_slots(config)?;
    validate_resolver(config)?;
    validate_events(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_slots(config: &Config) -> ConfigResult<()> {
    let slots = &config.slots;

    if let Some(singleton) = &slots.singleton
        && singleton.trim().is_empty()
    {
        return Err(invalid("slots.singleton", "slot name must not be empty"));
    }

    let mut seen = HashSet::new();
    for name in &slots.pool {
        if name.trim().is_empty() {
            return Err(invalid("slots.pool", "slot name must not be empty"));
        }
        if !seen.insert(name.as_str()) {
            return Err(invalid(
                "slots.pool",
                format!("slot '{name}' is declared more than once"),
            ));
        }
    }

    if let Some(singleton) = &slots.singleton
        && seen.contains(singleton.as_str())
    {
        return Err(invalid(
            "slots.singleton",
            format!("slot '{singleton}' is also declared in slots.pool"),
        ));
    }

    Ok(())
}

fn validate_resolver(config: &Config) -> ConfigResult<()> {
    if config.resolver.max_resolve_attempts == 0 {
        return Err(invalid(
            "resolver.max_resolve_attempts",
            "max_resolve_attempts must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    if config.events.capacity == 0 {
        return Err(invalid("events.capacity", "capacity must be greater than 0"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}
