//! Engine configuration

use crate::auth::Permission;
use crate::identity::{Dataset, IdentityError};
use crate::schema::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),
}

impl From<IdentityError> for ConfigError {
    fn from(err: IdentityError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How new identifiers are minted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Sequential,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IRI prefix of every identifier in the graph
    pub dataset_base: String,
    /// Identifier minting strategy
    pub id_strategy: IdStrategy,
    /// Maximum repository operations per batch in bulk deletion
    pub bulk_batch_size: usize,
    /// Deepest accepted nesting of an input tree
    pub max_nesting_depth: usize,
    /// Relation depth expanded in result payloads
    pub query_depth: usize,
    /// Default tracing filter
    pub log_filter: String,
    /// Role to permission table (None = permit all)
    pub roles: Option<HashMap<String, Vec<Permission>>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dataset_base: "http://factograph.io/graph/default/".to_string(),
            id_strategy: IdStrategy::Uuid,
            bulk_batch_size: 256,
            max_nesting_depth: 32,
            query_depth: 8,
            log_filter: "info".to_string(),
            roles: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.dataset()?;

        if self.bulk_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "bulk_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_nesting_depth must be greater than zero".to_string(),
            ));
        }
        if self.query_depth == 0 {
            return Err(ConfigError::Invalid(
                "query_depth must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn dataset(&self) -> ConfigResult<Dataset> {
        Ok(Dataset::new(self.dataset_base.as_str())?)
    }
}
