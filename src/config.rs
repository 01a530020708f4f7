//! Server configuration loaded from a JSON file.
//!
//! The on-disk schema is a flat JSON object:
//!
//! ```json
//! { "port": 3333, "path_to_files": "/tmp", "secret_key": "..." }
//! ```
//!
//! The configuration is resolved once at startup and is immutable for the
//! process lifetime; connection handlers receive it behind an `Arc` and
//! never mutate it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

/// Port the server listens on when the config file does not set one.
pub const DEFAULT_PORT: u16 = 3333;

/// Base directory for file operations when the config file does not set one.
pub const DEFAULT_BASE_DIR: &str = "/tmp";

/// Config file location relative to the home directory.
const DEFAULT_CONFIG_RELATIVE: &str = ".execnode/config.json";

/// Configuration as read from the JSON file.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default = "default_port")]
    port: u16,

    /// May start with a literal `$HOME`, expanded from the environment.
    path_to_files: String,

    secret_key: String,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Resolved, immutable server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,

    /// Absolute base directory all `push`/`pull` paths resolve against.
    pub path_to_files: PathBuf,

    /// Shared secret every request must present. Empty disables auth.
    pub secret_key: String,
}

impl Config {
    /// Load configuration from an explicit file path. Any failure is fatal.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in config file {}", path.display()))?;

        Ok(Self {
            port: file.port,
            path_to_files: expand_home(&file.path_to_files),
            secret_key: file.secret_key,
        })
    }

    /// Load from the default location, falling back to generated defaults.
    ///
    /// The fallback mints a fresh UUID secret and logs it at warn level so
    /// the operator can hand it to clients.
    pub fn load_or_generate() -> Self {
        let path = Self::default_path();
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                let config = Self::generated();
                warn!(
                    error = %format!("{e:#}"),
                    port = config.port,
                    base_dir = %config.path_to_files.display(),
                    secret_key = %config.secret_key,
                    "config file unusable, starting with generated defaults"
                );
                config
            }
        }
    }

    /// Default config file path: `$HOME/.execnode/config.json`.
    pub fn default_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(DEFAULT_CONFIG_RELATIVE)
    }

    /// Defaults used when no config file is usable.
    fn generated() -> Self {
        Self {
            port: DEFAULT_PORT,
            path_to_files: PathBuf::from(DEFAULT_BASE_DIR),
            secret_key: Uuid::new_v4().to_string(),
        }
    }

    /// The base directory file operations resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.path_to_files
    }
}

/// Expand a leading literal `$HOME` using the environment.
fn expand_home(path: &str) -> PathBuf {
    path.strip_prefix("$HOME").map_or_else(
        || PathBuf::from(path),
        |rest| {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"port": 4444, "path_to_files": "/var/data", "secret_key": "S"}"#,
        );

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port, 4444);
        assert_eq!(config.path_to_files, PathBuf::from("/var/data"));
        assert_eq!(config.secret_key, "S");
    }

    #[test]
    fn port_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"path_to_files": "/tmp", "secret_key": "S"}"#,
        );

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn missing_secret_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), r#"{"path_to_files": "/tmp"}"#);
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::from_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/config.json"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{not json");
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn expand_home_substitutes_env() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(
            expand_home("$HOME/files"),
            PathBuf::from(&home).join("files")
        );
        assert_eq!(expand_home("/tmp/files"), PathBuf::from("/tmp/files"));
    }

    #[test]
    fn generated_config_has_nonempty_secret() {
        let config = Config::generated();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.secret_key.is_empty());
    }
}
