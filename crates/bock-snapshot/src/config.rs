//! Mounter configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bock_common::{BockError, BockPaths, BockResult};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Environment variable overriding [`MounterConfig::retries`].
pub const ENV_RETRIES: &str = "BOCK_MOUNT_RETRIES";
/// Environment variable overriding [`MounterConfig::backoff_ms`].
pub const ENV_BACKOFF_MS: &str = "BOCK_MOUNT_BACKOFF_MS";

/// Settings for [`LocalMounter`](crate::LocalMounter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MounterConfig {
    /// Where scratch mount points are created. Defaults to the system temp dir.
    pub temp_root: Option<PathBuf>,
    /// Name prefix of scratch mount points.
    pub temp_prefix: String,
    /// Extra attempts for a mount whose target is busy.
    pub retries: u32,
    /// Backoff unit between busy retries, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for MounterConfig {
    fn default() -> Self {
        Self {
            temp_root: None,
            temp_prefix: "bock-mount".to_string(),
            retries: 2,
            backoff_ms: 30,
        }
    }
}

impl MounterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> BockResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| BockError::Config {
            message: format!("invalid mounter config {}: {e}", path.display()),
        })
    }

    /// Resolve the effective configuration for `paths`.
    ///
    /// Reads `mounter.toml` under the data root if present, falls back to the
    /// runtime mount directory for scratch space when it exists, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file or an override is invalid.
    pub fn discover(paths: &BockPaths) -> BockResult<Self> {
        let file = paths.mounter_config();
        let mut config = if file.is_file() {
            tracing::debug!(path = %file.display(), "Loading mounter config");
            Self::load(&file)?
        } else {
            Self::default()
        };

        if config.temp_root.is_none() && paths.mounts().is_dir() {
            config.temp_root = Some(paths.mounts());
        }

        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by variable name.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is not a valid number.
    pub fn with_overrides<F>(mut self, lookup: F) -> BockResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_RETRIES) {
            self.retries = parse_override(ENV_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_BACKOFF_MS) {
            self.backoff_ms = parse_override(ENV_BACKOFF_MS, &value)?;
        }
        Ok(self)
    }

    /// The retry policy for busy mount targets.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }

    /// Directory scratch mount points are created in.
    #[must_use]
    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> BockResult<T> {
    value.trim().parse().map_err(|_| BockError::Config {
        message: format!("{key} must be a non-negative integer, got '{value}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MounterConfig::default();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.temp_prefix, "bock-mount");
        assert_eq!(config.temp_root(), std::env::temp_dir());
    }

    #[test]
    fn load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mounter.toml");
        std::fs::write(&path, "retries = 5\ntemp_root = \"/scratch\"\n").unwrap();

        let config = MounterConfig::load(&path).unwrap();
        assert_eq!(config.retries, 5);
        assert_eq!(config.backoff_ms, 30);
        assert_eq!(config.temp_root(), PathBuf::from("/scratch"));
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mounter.toml");
        std::fs::write(&path, "retries = \"many\"").unwrap();

        let err = MounterConfig::load(&path).unwrap_err();
        assert!(matches!(err, BockError::Config { .. }));
    }

    #[test]
    fn overrides() {
        let config = MounterConfig::default()
            .with_overrides(|key| match key {
                ENV_RETRIES => Some("4".to_string()),
                ENV_BACKOFF_MS => Some(" 10 ".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(
            config.retry_policy(),
            RetryPolicy {
                retries: 4,
                backoff: Duration::from_millis(10),
            }
        );
    }

    #[test]
    fn bad_override() {
        let err = MounterConfig::default()
            .with_overrides(|key| (key == ENV_RETRIES).then(|| "-1".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_RETRIES));
    }

    #[test]
    fn discover_uses_runtime_mounts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BockPaths::with_root(dir.path());
        paths.create_dirs().unwrap();

        let config = MounterConfig::discover(&paths).unwrap();
        assert_eq!(config.temp_root(), paths.mounts());
    }
}
