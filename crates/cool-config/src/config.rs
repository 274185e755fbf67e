//! Configuration types and loading.
//!
//! The main entry point is [`CoolConfig`], the contents of
//! `.cool/config.yaml`. [`load_config`] merges the file (if any) with
//! `COOL_*` environment variables; nested keys use a double underscore,
//! e.g. `COOL_CLEARTOOL__TIMEOUT_SECS=30`.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Merging the file and environment layers failed.
    #[error("invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Name of the config file inside `.cool/`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Prefix of environment variables overriding file values.
pub const ENV_PREFIX: &str = "COOL_";

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// How cleartool is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleartoolConfig {
    /// Path or name of the cleartool binary.
    #[serde(default = "default_cleartool_binary")]
    pub binary: String,

    /// Kill any single cleartool call running longer than this.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Directory commands are run from (a view root, typically).
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for CleartoolConfig {
    fn default() -> Self {
        Self {
            binary: default_cleartool_binary(),
            timeout_secs: None,
            working_dir: None,
        }
    }
}

fn default_cleartool_binary() -> String {
    "cleartool".to_string()
}

/// Multi-site replication settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisiteConfig {
    /// Include child streams with posted deliveries when polling.
    #[serde(default)]
    pub polling: bool,
}

/// Tag storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagConfig {
    /// Hyperlink type tags are stored under.
    #[serde(default = "default_hlink_type")]
    pub hlink_type: String,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            hlink_type: default_hlink_type(),
        }
    }
}

fn default_hlink_type() -> String {
    "tag".to_string()
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full client configuration, corresponding to `.cool/config.yaml`.
///
/// All fields use `serde` defaults so that a partially-specified YAML file
/// deserializes with sensible defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoolConfig {
    /// Default project VOB for references given without `@scope`.
    #[serde(default)]
    pub pvob: Option<String>,

    #[serde(default)]
    pub cleartool: CleartoolConfig,

    #[serde(default)]
    pub multisite: MultisiteConfig,

    #[serde(default)]
    pub tags: TagConfig,
}

impl CoolConfig {
    /// The cleartool timeout as a `Duration`.
    pub fn timeout(&self) -> Option<Duration> {
        self.cleartool.timeout_secs.map(Duration::from_secs)
    }

    /// Checks values serde cannot express constraints for.
    pub fn validate(&self) -> Result<()> {
        if self.cleartool.binary.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "cleartool.binary".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.cleartool.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "cleartool.timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.tags.hlink_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "tags.hlink_type".into(),
                reason: "must not be empty".into(),
            });
        }
        if let Some(pvob) = &self.pvob {
            if pvob.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "pvob".into(),
                    reason: "must not be empty when set".into(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from `config.yaml` inside `cool_dir` (if given and
/// present), then apply `COOL_*` environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Extract`] if the merged layers do not form a
/// valid configuration, or [`ConfigError::InvalidValue`] if validation
/// fails.
pub fn load_config(cool_dir: Option<&Path>) -> Result<CoolConfig> {
    let mut figment = Figment::from(Serialized::defaults(CoolConfig::default()));

    if let Some(dir) = cool_dir {
        let path = dir.join(CONFIG_FILE_NAME);
        // An empty file is valid and yields the defaults.
        if path.is_file() && !std::fs::read_to_string(&path)?.trim().is_empty() {
            figment = figment.merge(Yaml::file(path));
        }
    }

    let config: CoolConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let cfg = CoolConfig::default();
        assert_eq!(cfg.cleartool.binary, "cleartool");
        assert_eq!(cfg.timeout(), None);
        assert!(!cfg.multisite.polling);
        assert_eq!(cfg.tags.hlink_type, "tag");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_dir_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config(Some(Path::new("/nonexistent/.cool"))).unwrap();
            assert_eq!(cfg, CoolConfig::default());
            Ok(())
        });
    }

    #[test]
    fn partial_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE_NAME,
                "pvob: /vobs/PVOB\ncleartool:\n  timeout_secs: 30\n",
            )?;
            let cfg = load_config(Some(Path::new("."))).unwrap();
            assert_eq!(cfg.pvob.as_deref(), Some("/vobs/PVOB"));
            assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
            assert_eq!(cfg.cleartool.binary, "cleartool");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE_NAME, "pvob: /vobs/FILE\n")?;
            jail.set_env("COOL_PVOB", "/vobs/ENV");
            jail.set_env("COOL_MULTISITE__POLLING", "true");
            let cfg = load_config(Some(Path::new("."))).unwrap();
            assert_eq!(cfg.pvob.as_deref(), Some("/vobs/ENV"));
            assert!(cfg.multisite.polling);
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE_NAME, "cleartool:\n  timeout_secs: 0\n")?;
            let err = load_config(Some(Path::new("."))).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
            Ok(())
        });
    }
}
