use codectx_vector_store::ScoreMapping;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::RetrievalError;

/// Configuration for [`crate::HybridRanker`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Weight of the semantic (vector similarity) signal
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Weight of the structural (graph proximity) signal
    #[serde(default = "default_structural_weight")]
    pub structural_weight: f32,

    /// Semantic candidates fetched per requested result
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    /// Maximum BFS depth for structural candidates
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Distance-to-similarity conversion for vector hits
    #[serde(default)]
    pub score_mapping: ScoreMapping,

    /// Fold exact and fuzzy name matches into the structural signal
    #[serde(default = "default_keyword_boost")]
    pub keyword_boost: bool,

    /// Minimum normalized fuzzy score for a keyword candidate
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,

    /// Deadline for each external adapter call (embedding, vector query)
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_structural_weight() -> f32 {
    0.3
}

fn default_overfetch_factor() -> usize {
    2
}

fn default_max_depth() -> usize {
    2
}

fn default_keyword_boost() -> bool {
    true
}

fn default_fuzzy_threshold() -> f32 {
    0.3
}

fn default_adapter_timeout_ms() -> u64 {
    2000
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            structural_weight: default_structural_weight(),
            overfetch_factor: default_overfetch_factor(),
            max_depth: default_max_depth(),
            score_mapping: ScoreMapping::default(),
            keyword_boost: default_keyword_boost(),
            fuzzy_threshold: default_fuzzy_threshold(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("semantic_weight", self.semantic_weight),
            ("structural_weight", self.structural_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(RetrievalError::InvalidConfig(format!(
                    "{name} must be between 0.0 and 1.0, got {weight}"
                )));
            }
        }

        let total = self.semantic_weight + self.structural_weight;
        if (total - 1.0).abs() > 0.01 {
            return Err(RetrievalError::InvalidConfig(format!(
                "signal weights must sum to 1.0, got {total}"
            )));
        }

        if self.overfetch_factor == 0 {
            return Err(RetrievalError::InvalidConfig(
                "overfetch_factor must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(RetrievalError::InvalidConfig(format!(
                "fuzzy_threshold must be between 0.0 and 1.0, got {}",
                self.fuzzy_threshold
            )));
        }

        if self.adapter_timeout_ms == 0 {
            return Err(RetrievalError::InvalidConfig(
                "adapter_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RankerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = RankerConfig {
            semantic_weight: 0.7,
            structural_weight: 0.7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weight_range() {
        let config = RankerConfig {
            semantic_weight: 1.5,
            structural_weight: -0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_overfetch_rejected() {
        let config = RankerConfig {
            overfetch_factor: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = RankerConfig {
            adapter_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
