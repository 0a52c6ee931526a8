use codectx_cache::CacheConfig;
use codectx_graph::GraphConfig;
use codectx_retrieval::RankerConfig;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::EngineError;

/// Configuration for [`crate::RetrievalEngine`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard ceiling on results per retrieval
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Result count used when a query asks for zero
    #[serde(default = "default_default_limit")]
    pub default_limit: usize,

    /// How many top results get a priority bump after each retrieval
    #[serde(default = "default_feedback_top_k")]
    pub feedback_top_k: usize,

    /// Whole-query memoization entries
    #[serde(default = "default_query_cache_size")]
    pub query_cache_size: usize,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub ranker: RankerConfig,
}

fn default_max_limit() -> usize {
    50
}

fn default_default_limit() -> usize {
    10
}

fn default_feedback_top_k() -> usize {
    3
}

fn default_query_cache_size() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
            default_limit: default_default_limit(),
            feedback_top_k: default_feedback_top_k(),
            query_cache_size: default_query_cache_size(),
            cache: CacheConfig::default(),
            graph: GraphConfig::default(),
            ranker: RankerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_limit == 0 {
            return Err(EngineError::InvalidConfig(
                "max_limit must be greater than zero".to_string(),
            ));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(EngineError::InvalidConfig(format!(
                "default_limit must be in 1..={}, got {}",
                self.max_limit, self.default_limit
            )));
        }
        if self.query_cache_size == 0 {
            return Err(EngineError::InvalidConfig(
                "query_cache_size must be greater than zero".to_string(),
            ));
        }
        self.cache.validate()?;
        self.graph.validate()?;
        self.ranker.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_limit_above_max_rejected() {
        let config = EngineConfig {
            max_limit: 5,
            default_limit: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_config_errors_propagate() {
        let config = EngineConfig {
            ranker: RankerConfig {
                semantic_weight: 0.9,
                structural_weight: 0.9,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::Retrieval(_))
        ));
    }
}
