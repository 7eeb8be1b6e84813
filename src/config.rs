//! Configuration management for ipset-exec.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file location used by the command-line front end.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ipset-exec/config.yaml";

/// Timeout applied when nothing else is configured.
pub const DEFAULT_TIMEOUT: &str = "30s";

/// Interval validation (e.g., "30s", "2m", "1h", "1d").
/// Requires ASCII-only input to prevent Unicode-related edge cases
fn is_valid_interval(interval: &str) -> bool {
    parse_interval(interval).is_some()
}

/// Parse an interval string into a [`Duration`].
pub fn parse_interval(interval: &str) -> Option<Duration> {
    // Reject non-ASCII to prevent Unicode edge cases with split_at
    if !interval.is_ascii() || interval.len() < 2 {
        return None;
    }

    let (num_part, suffix) = interval.split_at(interval.len() - 1);
    let n = num_part.parse::<u32>().ok()? as u64;
    let secs = match suffix {
        "s" => n,
        "m" => n * 60,
        "h" => n * 3600,
        "d" => n * 86_400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Explicit path to the ipset binary (skips the search)
    pub binary: Option<PathBuf>,

    /// PATH-style list of directories searched for `ipset`
    pub search_path: Option<String>,

    /// Per-invocation timeout ("30s", "2m"); "0s" disables it
    pub timeout: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary: None,
            search_path: None,
            timeout: DEFAULT_TIMEOUT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !is_valid_interval(&self.timeout) {
            anyhow::bail!(
                "Invalid timeout '{}'. Use format like '30s', '2m', '1h'",
                self.timeout
            );
        }

        if let Some(ref binary) = self.binary {
            if !binary.is_absolute() {
                anyhow::bail!("binary must be an absolute path: {}", binary.display());
            }
        }

        if let Some(ref search_path) = self.search_path {
            if search_path.trim().is_empty() {
                anyhow::bail!("search_path must not be empty when set");
            }
        }

        Ok(())
    }

    /// The effective timeout; `None` when disabled with a zero interval.
    pub fn timeout(&self) -> Option<Duration> {
        parse_interval(&self.timeout).filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.binary.is_none());
        assert!(config.search_path.is_none());
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_valid_interval() {
        assert!(is_valid_interval("30s"));
        assert!(is_valid_interval("2m"));
        assert!(is_valid_interval("1h"));
        assert!(is_valid_interval("1d"));
        assert!(is_valid_interval("0s"));

        assert!(!is_valid_interval(""));
        assert!(!is_valid_interval("s"));
        assert!(!is_valid_interval("30"));
        assert!(!is_valid_interval("30x"));
        assert!(!is_valid_interval("-1s"));
        assert!(!is_valid_interval("3０s"));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_interval("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_interval("1h"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = Config {
            timeout: "0s".to_string(),
            ..Config::default()
        };
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "binary: /usr/sbin/ipset\nsearch_path: /usr/sbin:/sbin\ntimeout: 5s"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.binary, Some(PathBuf::from("/usr/sbin/ipset")));
        assert_eq!(config.search_path.as_deref(), Some("/usr/sbin:/sbin"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_load_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "search_path: /opt/bin").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.binary.is_none());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_load_rejects_bad_timeout() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timeout: forever").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid timeout"));
    }

    #[test]
    fn test_validate_rejects_relative_binary() {
        let config = Config {
            binary: Some(PathBuf::from("ipset")),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/ipset-exec.yaml").unwrap();
        assert_eq!(config, Config::default());
    }
}
