//! Configuration for a flight recorder

use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};
use crate::event::EventLevel;

/// Main recorder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Number of captured events retained
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Sources enabled at construction
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_capacity() -> usize { 256 }

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            sources: Vec::new(),
        }
    }
}

impl RecorderConfig {
    /// Config with the given capacity and no sources
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Add a source to enable
    pub fn with_source(mut self, name: impl Into<String>, level: EventLevel) -> Self {
        self.sources.push(SourceConfig {
            name: name.into(),
            level,
        });
        self
    }

    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RecorderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check capacity and source names
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(RecorderError::InvalidCapacity);
        }
        if let Some(blank) = self.sources.iter().position(|s| s.name.trim().is_empty()) {
            return Err(RecorderError::invalid_argument(format!(
                "source #{} has an empty name",
                blank
            )));
        }
        Ok(())
    }
}

/// One source to record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name (case-insensitive)
    pub name: String,

    /// Minimum level to record
    #[serde(default)]
    pub level: EventLevel,
}
