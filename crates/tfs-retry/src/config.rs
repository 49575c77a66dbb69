//! Retry configuration loader with precedence
//!
//! Loads retry policies from the following sources (low to high):
//! 1. Built-in defaults (30s interval, 100 attempts)
//! 2. Config file (`~/.git-tfs/retry.yaml`)
//! 3. Environment variables (`TFS_RETRY_*` prefix)

use crate::error::{Error, Result};
use crate::types::RetryPoliciesConfig;
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use std::env;
use std::fs;

/// File name looked up inside the config directory
pub const CONFIG_FILE_NAME: &str = "retry.yaml";

/// Overrides the default policy's interval, in milliseconds
pub const ENV_INTERVAL_MS: &str = "TFS_RETRY_INTERVAL_MS";

/// Overrides the default policy's attempt budget
pub const ENV_MAX_ATTEMPTS: &str = "TFS_RETRY_MAX_ATTEMPTS";

/// Retry configuration loader
pub struct RetryConfigLoader {
    /// Directory holding `retry.yaml`
    config_dir: Utf8PathBuf,
}

impl RetryConfigLoader {
    /// Create a loader rooted at the standard config directory (~/.git-tfs)
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    fn default_config_dir() -> Result<Utf8PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|p| Error::invalid_config(format!("Home directory is not UTF-8: {}", p.display())))?;
        Ok(home.join(".git-tfs"))
    }

    /// Load retry policies with precedence applied
    ///
    /// A missing config file is not an error; the defaults are used.
    pub fn load(&self) -> Result<RetryPoliciesConfig> {
        let mut config = RetryPoliciesConfig::default();

        let path = self.config_path();
        if path.exists() {
            let file_config = self.load_yaml_file::<RetryPoliciesConfig>(&path)?;
            config = Self::merge(config, file_config);
            tracing::debug!(path = %path, "loaded retry configuration");
        }

        Self::apply_env_overrides(config)
    }

    /// Load retry policies from an explicit file, which must exist
    pub fn load_file(&self, path: &Utf8Path) -> Result<RetryPoliciesConfig> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }
        let file_config = self.load_yaml_file::<RetryPoliciesConfig>(path)?;
        Self::apply_env_overrides(Self::merge(RetryPoliciesConfig::default(), file_config))
    }

    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Merge two configs (base is overridden by overlay)
    fn merge(mut base: RetryPoliciesConfig, overlay: RetryPoliciesConfig) -> RetryPoliciesConfig {
        for (key, policy) in overlay.operations {
            base.operations.insert(key, policy);
        }
        base.default = overlay.default;
        base
    }

    fn apply_env_overrides(mut config: RetryPoliciesConfig) -> Result<RetryPoliciesConfig> {
        if let Ok(val) = env::var(ENV_INTERVAL_MS) {
            config.default.interval_ms = val.trim().parse().map_err(|_| {
                Error::invalid_config(format!("{} must be a valid number", ENV_INTERVAL_MS))
            })?;
        }

        if let Ok(val) = env::var(ENV_MAX_ATTEMPTS) {
            config.default.max_attempts = val.trim().parse().map_err(|_| {
                Error::invalid_config(format!("{} must be a valid number", ENV_MAX_ATTEMPTS))
            })?;
        }

        Ok(config)
    }

    /// Path of the config file this loader reads
    pub fn config_path(&self) -> Utf8PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetryPolicy;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_temp_loader() -> (RetryConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        let loader = RetryConfigLoader::with_dir(config_dir);
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_file() {
        let (loader, _temp) = create_temp_loader();
        let config = loader.load().unwrap();
        assert_eq!(config.default, RetryPolicy::default());
        assert!(config.operations.is_empty());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let (loader, _temp) = create_temp_loader();

        let content = r#"
default:
  interval-ms: 2000
  max-attempts: 20
operations:
  checkin:
    interval-ms: 5000
    max-attempts: 10
  fetch:
    max-attempts: 3
"#;
        fs::write(loader.config_path(), content).unwrap();

        let config = loader.load().unwrap();
        assert_eq!(config.default.interval(), Duration::from_secs(2));
        assert_eq!(config.default.max_attempts, 20);
        assert_eq!(config.policy_for("checkin").interval_ms, 5000);
        // Missing fields take the built-in defaults, not the file's default policy
        assert_eq!(config.policy_for("fetch").interval_ms, 30_000);
        assert_eq!(config.policy_for("fetch").max_attempts, 3);
        assert_eq!(config.policy_for("shelve").max_attempts, 20);
    }

    #[test]
    #[serial]
    fn test_invalid_yaml_is_parse_error() {
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.config_path(), "default: [not, a, policy]").unwrap();

        let err = loader.load().unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
        assert!(err.to_string().starts_with("YAML parsing error:"));
    }

    #[test]
    #[serial]
    fn test_load_file_invalid_yaml_is_parse_error() {
        let (loader, _temp) = create_temp_loader();
        let path = loader.config_dir().join("broken.yaml");
        fs::write(&path, "default:\n  interval-ms: soon\n").unwrap();

        let err = loader.load_file(&path).unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    #[serial]
    fn test_load_file_missing() {
        let (loader, _temp) = create_temp_loader();
        let missing = loader.config_dir().join("nope.yaml");

        let err = loader.load_file(&missing).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();
        fs::write(
            loader.config_path(),
            "default:\n  interval-ms: 2000\n  max-attempts: 20\n",
        )
        .unwrap();

        env::set_var(ENV_INTERVAL_MS, "250");
        env::set_var(ENV_MAX_ATTEMPTS, "4");

        let config = loader.load().unwrap();

        env::remove_var(ENV_INTERVAL_MS);
        env::remove_var(ENV_MAX_ATTEMPTS);

        assert_eq!(config.default.interval_ms, 250);
        assert_eq!(config.default.max_attempts, 4);
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        let (loader, _temp) = create_temp_loader();

        env::set_var(ENV_MAX_ATTEMPTS, "lots");
        let result = loader.load();
        env::remove_var(ENV_MAX_ATTEMPTS);

        let err = result.unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_ATTEMPTS));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let mut overlay = RetryPoliciesConfig {
            default: RetryPolicy::with_max_attempts(1),
            ..Default::default()
        };
        overlay
            .operations
            .insert("fetch".to_string(), RetryPolicy::with_max_attempts(2));

        let mut base = RetryPoliciesConfig::default();
        base.operations
            .insert("checkin".to_string(), RetryPolicy::with_max_attempts(9));

        let merged = RetryConfigLoader::merge(base, overlay);
        assert_eq!(merged.default.max_attempts, 1);
        assert_eq!(merged.policy_for("fetch").max_attempts, 2);
        assert_eq!(merged.policy_for("checkin").max_attempts, 9);
    }
}
