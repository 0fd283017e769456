//! Tick pipeline configuration.
//!
//! [`PipelineConfig`] is plain data with serde support so it can be loaded
//! from a JSON file next to the rest of a server's settings. Missing fields
//! take their defaults.

use serde::{Deserialize, Serialize};

use crate::DeltaError;

/// Configuration for a [`DeltaPipeline`](crate::pipeline::DeltaPipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sequence ID of the first delta. Must be non-zero.
    pub first_sequence: u32,
    /// Hand out deltas that contain no changes instead of dropping them.
    pub emit_empty: bool,
}

impl Default for PipelineConfig {
    /// First sequence 1, empty deltas dropped.
    fn default() -> Self {
        Self {
            first_sequence: 1,
            emit_empty: false,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::Serialization`] if the JSON is malformed and
    /// [`DeltaError::InvalidConfig`] if a field is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, DeltaError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::InvalidConfig`] if `first_sequence` is 0.
    pub fn validate(&self) -> Result<(), DeltaError> {
        if self.first_sequence == 0 {
            return Err(DeltaError::InvalidConfig {
                details: "first_sequence must be non-zero (0 means nothing acknowledged)"
                    .to_owned(),
            });
        }
        Ok(())
    }
}
