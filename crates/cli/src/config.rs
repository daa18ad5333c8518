//! Configuration loading and validation for the `eh` command.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults.
//! 2. A TOML file: `--config <path>` (must exist), else `$HOME/.eh/config.toml`
//!    when present.
//! 3. `EH_*` environment variables, e.g. `EH_KMS_ENDPOINT`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use eh_secrets::Settings;
use serde::Deserialize;

/// Validated `eh` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tracing filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// KMS endpoint override (LocalStack and similar).
    #[serde(default)]
    pub kms_endpoint: Option<String>,

    /// S3 endpoint override for `s3://` includes.
    #[serde(default)]
    pub s3_endpoint: Option<String>,

    /// Timeout for each HTTP(S) fetch.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Deepest include chain `read` will follow.
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
}

fn default_log_level() -> String {
    "warn".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_http_timeout_secs() -> u64 {
    30
}
fn default_max_include_depth() -> usize {
    eh_secrets::settings::DEFAULT_MAX_INCLUDE_DEPTH
}

impl Config {
    /// Load and validate configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(File::from(path).required(true)),
            None => default_path().map(|path| File::from(path).required(false)),
        };

        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file.format(FileFormat::Toml));
        }

        let cfg = builder
            .add_source(Environment::with_prefix("EH").try_parsing(true))
            .build()
            .context("failed to build eh configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise eh configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be greater than zero");
        }
        if self.max_include_depth == 0 {
            anyhow::bail!("max_include_depth must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            anyhow::bail!(
                "log_format must be \"text\" or \"json\", got {:?}",
                self.log_format
            );
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Engine settings derived from this configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            kms_endpoint: self.kms_endpoint.clone(),
            max_include_depth: self.max_include_depth,
        }
    }
}

fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".eh").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            log_level: default_log_level(),
            log_format: default_log_format(),
            kms_endpoint: None,
            s3_endpoint: None,
            http_timeout_secs: default_http_timeout_secs(),
            max_include_depth: default_max_include_depth(),
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(default_log_level(), "warn");
        assert_eq!(default_log_format(), "text");
        assert_eq!(default_http_timeout_secs(), 30);
        assert_eq!(default_max_include_depth(), 16);
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = Config {
            http_timeout_secs: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_depth() {
        let cfg = Config {
            max_include_depth: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let cfg = Config {
            log_format: "yaml".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log_format = \"json\"\nkms_endpoint = \"http://localhost:4566\"\nmax_include_depth = 4\n",
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.log_format, "json");
        assert_eq!(cfg.max_include_depth, 4);
        assert_eq!(cfg.http_timeout_secs, 30);

        let settings = cfg.settings();
        assert_eq!(settings.kms_endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(settings.max_include_depth, 4);
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
