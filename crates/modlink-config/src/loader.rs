//! Config loading.
//!
//! 1. Parse the embedded `defaults.toml` -> base
//! 2. Parse the user's TOML
//! 3. Fill keys the user left unset from `MODLINK_*` env vars
//! 4. Merge the user's tree over the base
//! 5. Deserialize -> `Config`
//! 6. Validate

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Config files larger than this are rejected unread.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Load configuration from a single TOML file, with env var fallbacks.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    load_file_with_env(path, &collect_env_vars())
}

/// Load configuration from a file using an explicit environment map.
///
/// # Errors
///
/// Same as [`load_file`].
pub fn load_file_with_env<S: BuildHasher>(
    path: &Path,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let read_err = |source| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    };

    let size = std::fs::metadata(path).map_err(read_err)?.len();
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {size} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(read_err)?;
    let config = build(&content, &path.display().to_string(), Some(env_vars))?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Parse configuration from a TOML string. Env vars are not consulted.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the TOML is malformed or fails validation.
pub fn from_toml_str(content: &str) -> ConfigResult<Config> {
    build::<std::collections::hash_map::RandomState>(content, "<inline>", None)
}

fn build<S: BuildHasher>(
    content: &str,
    origin: &str,
    env_vars: Option<&HashMap<String, String, S>>,
) -> ConfigResult<Config> {
    let parse_err = |source| ConfigError::ParseError {
        path: origin.to_owned(),
        source,
    };

    let mut merged: toml::Value = toml::from_str(DEFAULTS_TOML).map_err(|source| {
        ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source,
        }
    })?;
    let mut overlay: toml::Value = toml::from_str(content).map_err(parse_err)?;

    if let Some(env_vars) = env_vars {
        let applied = apply_env_fallbacks(&mut overlay, env_vars)?;
        if applied > 0 {
            debug!(count = applied, "applied env var fallbacks");
        }
    }

    deep_merge(&mut merged, overlay);
    let config: Config = merged.try_into().map_err(parse_err)?;
    validate(&config)?;
    Ok(config)
}

/// Merge `overlay` into `base`. Tables merge key by key; any other value
/// replaces the base value wholesale.
fn deep_merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_str_overrides_defaults() {
        let config = from_toml_str(
            r#"
            [slots]
            singleton = "host.Singleton"
            pool = ["S1", "S2"]

            [resolver]
            max_resolve_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.slots.singleton.as_deref(), Some("host.Singleton"));
        assert_eq!(config.slots.pool, vec!["S1", "S2"]);
        assert_eq!(config.resolver.max_resolve_attempts, 5);
        // Untouched keys keep their defaults.
        assert!(config.resolver.record_dependencies);
        assert_eq!(config.events.capacity, 256);
    }

    #[test]
    fn test_from_toml_str_rejects_malformed() {
        let err = from_toml_str("[slots\npool = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_from_toml_str_rejects_wrong_type() {
        let err = from_toml_str("[events]\ncapacity = \"big\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_from_toml_str_validates() {
        let err = from_toml_str("[slots]\npool = [\"S1\", \"S1\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[slots]\npool = [\"A\", \"B\", \"C\"]").unwrap();

        let env = HashMap::from([("MODLINK_LOG_LEVEL".to_owned(), "debug".to_owned())]);
        let config = load_file_with_env(file.path(), &env).unwrap();
        assert_eq!(config.slots.pool.len(), 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_deep_merge_replaces_arrays() {
        let mut base: toml::Value = toml::from_str("[a]\nlist = [1, 2]\nkeep = true\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\nlist = [3]\n").unwrap();
        deep_merge(&mut base, overlay);
        assert_eq!(base["a"]["list"].as_array().map(Vec::len), Some(1));
        assert_eq!(base["a"]["keep"].as_bool(), Some(true));
    }
}
