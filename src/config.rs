//! Bridge configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use hostbridge_core::{ContextOptions, DEFAULT_MAX_CALL_DEPTH};

/// Errors loading a [`BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has the wrong shape.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for an [`Extender`](crate::Extender).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Write a listing of every generated type to `diagnostics_dir`.
    pub development: bool,
    /// Directory for generated-type listings.
    pub diagnostics_dir: PathBuf,
    /// Package prefix for explicitly named generated types.
    pub generated_package: String,
    /// Prefix for generated names when none is requested.
    pub name_prefix: String,
    /// Script call depth limit for contexts created from this config.
    pub max_call_depth: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            development: cfg!(debug_assertions),
            diagnostics_dir: PathBuf::from("extended-classes"),
            generated_package: "hostbridge/generated".to_string(),
            name_prefix: "ExtendedClass$".to_string(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generated_package.is_empty() {
            return Err(ConfigError::Invalid("generated_package is empty".into()));
        }
        if self.name_prefix.is_empty() {
            return Err(ConfigError::Invalid("name_prefix is empty".into()));
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid("max_call_depth must be positive".into()));
        }
        Ok(())
    }

    /// Options for entering a script context under this config.
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions::default().with_max_call_depth(self.max_call_depth)
    }

    /// Builder-style toggle for development mode.
    pub fn with_development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    /// Builder-style override of the diagnostics directory.
    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = dir.into();
        self
    }
}
