//! Executor configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TRACE_ID_LENGTH;
use crate::error::{CrudError, CrudResult};
use crate::types::Dialect;

/// Settings for a statement executor.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// SQL dialect statements are rendered for.
    #[serde(default)]
    pub dialect: Dialect,

    /// Whether prepared statements are kept in the statement cache.
    #[serde(default = "default_true")]
    pub cache_statements: bool,

    /// Whether bound parameter values are included in the SQL log line.
    #[serde(default = "default_true")]
    pub log_parameters: bool,

    /// Length of the per-statement trace id.
    #[serde(default = "default_trace_id_length")]
    pub trace_id_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_trace_id_length() -> usize {
    DEFAULT_TRACE_ID_LENGTH
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            cache_statements: true,
            log_parameters: true,
            trace_id_length: default_trace_id_length(),
        }
    }
}

impl ExecutorConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default configuration for a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> CrudResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> CrudResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> CrudResult<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> CrudResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the configuration for values the executor cannot use.
    pub fn validate(&self) -> CrudResult<()> {
        if self.trace_id_length == 0 || self.trace_id_length > 64 {
            return Err(CrudError::configuration(format!(
                "trace_id_length must be between 1 and 64, got {}",
                self.trace_id_length
            )));
        }
        Ok(())
    }

    /// Creates a builder for configuration.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }
}

/// Builder for executor configuration.
#[derive(Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    /// Enables or disables statement caching.
    pub fn cache_statements(mut self, enabled: bool) -> Self {
        self.config.cache_statements = enabled;
        self
    }

    /// Enables or disables parameter values in SQL log lines.
    pub fn log_parameters(mut self, enabled: bool) -> Self {
        self.config.log_parameters = enabled;
        self
    }

    /// Sets the trace id length.
    pub fn trace_id_length(mut self, len: usize) -> Self {
        self.config.trace_id_length = len;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> CrudResult<ExecutorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
