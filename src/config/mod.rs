//! Configuration module
//!
//! Handles loading, layering, and saving configuration.
//! Precedence: defaults < config file < environment < command line.

mod env;

pub use env::{print_env_help, EnvConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::executor::{DEFAULT_FAILURE_BUFFER, DEFAULT_MAX_OUTPUT_BYTES};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./javatest.yaml",
    "./javatest.yml",
    "./.javatest.yaml",
    "~/.config/javatest/config.yaml",
];

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the Java sources
    pub src_dir: PathBuf,

    /// Output directory for compiled classes
    pub bin_dir: PathBuf,

    /// Directory holding the test case files
    pub test_dir: PathBuf,

    /// Entry point class
    pub entry: String,

    /// `javac --release` value
    pub release: u32,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Per-case deadline in seconds (0 disables it)
    pub timeout_secs: u64,

    /// Failures buffered between workers and the aggregator
    pub failure_buffer: usize,

    /// Test cases buffered ahead of the workers (0 = one per worker)
    pub queue_capacity: usize,

    /// Cap on captured stdout/stderr per invocation
    pub max_output_bytes: usize,

    /// Java launcher
    pub java: String,

    /// Java compiler
    pub javac: String,

    /// Test file extension
    pub test_extension: String,

    /// Source file extension
    pub source_extension: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            bin_dir: PathBuf::from("bin"),
            test_dir: PathBuf::from("tests"),
            entry: "Main".to_string(),
            release: 8,
            concurrency: 1,
            timeout_secs: 3,
            failure_buffer: DEFAULT_FAILURE_BUFFER,
            queue_capacity: 0,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            java: "java".to_string(),
            javac: "javac".to_string(),
            test_extension: "javatest".to_string(),
            source_extension: "java".to_string(),
        }
    }
}

impl AppConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from `path`, or from the first standard location, or defaults
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::find() {
                Some(found) => {
                    tracing::debug!("Using config file {}", found.display());
                    Self::load(found)
                }
                None => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Apply environment overrides
    pub fn merge_env(mut self, env: &EnvConfig) -> Self {
        if let Some(v) = env.concurrency {
            self.concurrency = v;
        }
        if let Some(v) = env.timeout {
            self.timeout_secs = v;
        }
        if let Some(v) = &env.src_dir {
            self.src_dir = PathBuf::from(v);
        }
        if let Some(v) = &env.bin_dir {
            self.bin_dir = PathBuf::from(v);
        }
        if let Some(v) = &env.test_dir {
            self.test_dir = PathBuf::from(v);
        }
        if let Some(v) = &env.entry {
            self.entry = v.clone();
        }
        if let Some(v) = env.release {
            self.release = v;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.failure_buffer == 0 {
            anyhow::bail!("failure_buffer must be at least 1");
        }
        if self.max_output_bytes == 0 {
            anyhow::bail!("max_output_bytes must be at least 1");
        }
        if self.entry.trim().is_empty() {
            anyhow::bail!("entry must not be empty");
        }
        Ok(())
    }

    /// Per-case deadline
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.deadline(), Duration::from_secs(3));
        assert_eq!(config.failure_buffer, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("javatest.yaml");

        let config = AppConfig {
            concurrency: 8,
            entry: "Solution".to_string(),
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("javatest.json");
        std::fs::write(&path, r#"{ "concurrency": 4, "timeout_secs": 10 }"#).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.concurrency, 4);
        assert_eq!(loaded.deadline(), Duration::from_secs(10));
        assert_eq!(loaded.entry, "Main");
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = AppConfig {
            concurrency: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_explicit_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(AppConfig::resolve(Some(&missing)).is_err());
    }

    #[test]
    fn test_merge_env() {
        let env = EnvConfig {
            concurrency: Some(16),
            test_dir: Some("cases".to_string()),
            ..Default::default()
        };
        let config = AppConfig::default().merge_env(&env);
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.test_dir, PathBuf::from("cases"));
        assert_eq!(config.bin_dir, PathBuf::from("bin"));
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
