//! Environment variable fallbacks.
//!
//! Env vars only fill fields the config file left unset; they never override
//! a value written in the file.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

#[derive(Clone, Copy)]
enum ValueKind {
    String,
    Integer,
}

/// Mapping from environment variable name to config field.
struct EnvMapping {
    var_name: &'static str,
    section: &'static str,
    key: &'static str,
    kind: ValueKind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "MODLINK_LOG_LEVEL",
        section: "logging",
        key: "level",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "MODLINK_LOG_FORMAT",
        section: "logging",
        key: "format",
        kind: ValueKind::String,
    },
    EnvMapping {
        var_name: "MODLINK_EVENTS_CAPACITY",
        section: "events",
        key: "capacity",
        kind: ValueKind::Integer,
    },
];

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Fill fields missing from `file` with values from `env_vars`.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_fallbacks<S: BuildHasher>(
    file: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let Some(root) = file.as_table_mut() else {
        return Ok(0);
    };

    let mut applied = 0usize;
    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let section = root
            .entry(mapping.section)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
        let Some(section) = section.as_table_mut() else {
            continue;
        };
        if section.contains_key(mapping.key) {
            continue;
        }

        let value = match mapping.kind {
            ValueKind::String => toml::Value::String(raw.clone()),
            ValueKind::Integer => {
                let n = raw.trim().parse::<i64>().map_err(|e| ConfigError::EnvError {
                    var_name: mapping.var_name.to_owned(),
                    message: format!("expected an integer: {e}"),
                })?;
                toml::Value::Integer(n)
            },
        };
        debug!(
            var = mapping.var_name,
            field = %format_args!("{}.{}", mapping.section, mapping.key),
            "applying env var fallback"
        );
        section.insert(mapping.key.to_owned(), value);
        applied = applied.saturating_add(1);
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_fills_missing_fields() {
        let mut file: toml::Value = toml::from_str("").unwrap();
        let applied = apply_env_fallbacks(
            &mut file,
            &env(&[("MODLINK_LOG_LEVEL", "debug"), ("MODLINK_EVENTS_CAPACITY", "64")]),
        )
        .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(file["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(file["events"]["capacity"].as_integer(), Some(64));
    }

    #[test]
    fn test_file_value_wins() {
        let mut file: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        let applied =
            apply_env_fallbacks(&mut file, &env(&[("MODLINK_LOG_LEVEL", "trace")])).unwrap();
        assert_eq!(applied, 0);
        assert_eq!(file["logging"]["level"].as_str(), Some("warn"));
    }

    #[test]
    fn test_bad_integer() {
        let mut file: toml::Value = toml::from_str("").unwrap();
        let err = apply_env_fallbacks(&mut file, &env(&[("MODLINK_EVENTS_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { .. }));
    }
}
