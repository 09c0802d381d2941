//! Configuration system for ScoreForge.
//!
//! Load score director settings from TOML or YAML to switch match tracking
//! and from-scratch assertions without code changes. The generic loaders are
//! shared with the constraint document format of `scoreforge-scoring`.
//!
//! # Examples
//!
//! ```
//! use scoreforge_config::{DirectorConfig, EnvironmentMode};
//!
//! let config = DirectorConfig::from_toml_str(r#"
//!     environment_mode = "fast_assert"
//!     assert_interval = 5
//! "#).unwrap();
//!
//! assert_eq!(config.environment_mode, EnvironmentMode::FastAssert);
//! assert!(!config.should_assert(4));
//! assert!(config.should_assert(5));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use scoreforge_config::DirectorConfig;
//!
//! let config = DirectorConfig::load("director.toml").unwrap_or_default();
//! assert!(config.constraint_match_enabled.is_none());
//! ```


use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parses any configuration type from a TOML string.
pub fn parse_toml<T: DeserializeOwned>(s: &str) -> Result<T, ConfigError> {
    Ok(toml::from_str(s)?)
}

/// Parses any configuration type from a YAML string.
pub fn parse_yaml<T: DeserializeOwned>(s: &str) -> Result<T, ConfigError> {
    Ok(serde_yaml::from_str(s)?)
}

/// Loads a configuration file, choosing the format by extension.
///
/// # Errors
///
/// Returns error if the file can't be read, has an unknown extension, or
/// doesn't parse.
pub fn load_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Format::Toml,
        Some("yaml") | Some("yml") => Format::Yaml,
        other => {
            return Err(ConfigError::Invalid(format!(
                "unsupported configuration file extension {:?} for {}",
                other.unwrap_or(""),
                path.display()
            )))
        }
    };
    let contents = std::fs::read_to_string(path)?;
    match format {
        Format::Toml => parse_toml(&contents),
        Format::Yaml => parse_yaml(&contents),
    }
}

enum Format {
    Toml,
    Yaml,
}

/// Score director configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectorConfig {
    /// Environment mode affecting assertions.
    #[serde(default)]
    pub environment_mode: EnvironmentMode,

    /// Whether sessions record constraint matches. `None` keeps the session
    /// factory's own setting.
    #[serde(default)]
    pub constraint_match_enabled: Option<bool>,

    /// Calculations between two from-scratch assertions in
    /// [`EnvironmentMode::FastAssert`]. Defaults to 10.
    #[serde(default)]
    pub assert_interval: Option<u64>,
}

impl DirectorConfig {
    pub const DEFAULT_ASSERT_INTERVAL: u64 = 10;

    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a `.toml`, `.yaml` or `.yml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_toml(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = parse_yaml(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_environment_mode(mut self, mode: EnvironmentMode) -> Self {
        self.environment_mode = mode;
        self
    }

    pub fn with_constraint_match_enabled(mut self, enabled: bool) -> Self {
        self.constraint_match_enabled = Some(enabled);
        self
    }

    pub fn with_assert_interval(mut self, interval: u64) -> Self {
        self.assert_interval = Some(interval);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.assert_interval == Some(0) {
            return Err(ConfigError::Invalid(
                "assert_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn assert_interval(&self) -> u64 {
        self.assert_interval
            .unwrap_or(Self::DEFAULT_ASSERT_INTERVAL)
            .max(1)
    }

    /// Whether the `calculation`-th score calculation (1-based) must be
    /// cross-checked against a from-scratch session.
    pub fn should_assert(&self, calculation: u64) -> bool {
        match self.environment_mode {
            EnvironmentMode::FullAssert => true,
            EnvironmentMode::FastAssert => calculation % self.assert_interval() == 0,
            EnvironmentMode::NonReproducible | EnvironmentMode::Reproducible => false,
        }
    }
}

/// Environment mode affecting director behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentMode {
    /// Non-reproducible mode with minimal overhead.
    NonReproducible,

    /// Reproducible mode with deterministic behavior.
    #[default]
    Reproducible,

    /// Fast assert mode: every n-th calculation is checked from scratch.
    FastAssert,

    /// Full assert mode: every calculation is checked from scratch.
    FullAssert,
}

impl EnvironmentMode {
    pub fn is_asserted(self) -> bool {
        matches!(self, EnvironmentMode::FastAssert | EnvironmentMode::FullAssert)
    }
}
