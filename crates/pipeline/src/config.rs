//! Tool configuration.
//!
//! Stored as TOML. Lookup order: an explicit path, then `$SEQPACK_CONFIG`,
//! then the platform config file if it exists:
//! - Linux: `~/.config/seqpack/config.toml`
//! - macOS: `~/Library/Application Support/seqpack/config.toml`
//! - Windows: `%APPDATA%/seqpack/config.toml`
//!
//! Anything missing falls back to the built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_COALESCE_BUFFER_SIZE, DEFAULT_COPY_BUFFER_SIZE, DEFAULT_DIGEST_BUFFER_SIZE};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SEQPACK_CONFIG";

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Buffer sizes, cadences and the sidecar suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Archiver read chunk in bytes.
    #[serde(default = "default_copy_buffer_size")]
    pub copy_buffer_size: usize,

    /// Output coalescing buffer in bytes.
    #[serde(default = "default_coalesce_buffer_size")]
    pub coalesce_buffer_size: usize,

    /// Digest read chunk in bytes.
    #[serde(default = "default_digest_buffer_size")]
    pub digest_buffer_size: usize,

    /// Minimum spacing between speed samples, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub sample_interval_ms: u64,

    /// Progress line redraw cadence, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub report_interval_ms: u64,

    /// Suffix of digest sidecar files, without the dot.
    #[serde(default = "default_sidecar_extension")]
    pub sidecar_extension: String,
}

fn default_copy_buffer_size() -> usize {
    DEFAULT_COPY_BUFFER_SIZE
}

fn default_coalesce_buffer_size() -> usize {
    DEFAULT_COALESCE_BUFFER_SIZE
}

fn default_digest_buffer_size() -> usize {
    DEFAULT_DIGEST_BUFFER_SIZE
}

fn default_interval_ms() -> u64 {
    500
}

fn default_sidecar_extension() -> String {
    "sha256".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            copy_buffer_size: default_copy_buffer_size(),
            coalesce_buffer_size: default_coalesce_buffer_size(),
            digest_buffer_size: default_digest_buffer_size(),
            sample_interval_ms: default_interval_ms(),
            report_interval_ms: default_interval_ms(),
            sidecar_extension: default_sidecar_extension(),
        }
    }
}

impl Config {
    /// Resolves and loads the configuration.
    ///
    /// An explicit or environment-named file must exist; the platform
    /// default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        match config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Reads and validates a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("copy_buffer_size", self.copy_buffer_size),
            ("coalesce_buffer_size", self.coalesce_buffer_size),
            ("digest_buffer_size", self.digest_buffer_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
            }
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "report_interval_ms must be non-zero".into(),
            ));
        }
        let ext = self.sidecar_extension.trim_start_matches('.');
        if ext.is_empty() || ext.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "sidecar_extension {:?} is not a usable file suffix",
                self.sidecar_extension
            )));
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// Sidecar path for `file`: `<file>.<extension>`.
    pub fn sidecar_path(&self, file: &Path) -> PathBuf {
        let mut name = file.as_os_str().to_owned();
        name.push(".");
        name.push(self.sidecar_extension.trim_start_matches('.'));
        PathBuf::from(name)
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("seqpack").join("config.toml"))
    }

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("seqpack")
                .join("config.toml"),
        )
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var_os("APPDATA")?;
        Some(PathBuf::from(appdata).join("seqpack").join("config.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}
