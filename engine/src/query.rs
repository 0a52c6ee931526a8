use codectx_vector_store::QueryFilter;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::EngineConfig;
use crate::error::EngineError;

/// One retrieval request against the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextQuery {
    /// Free-form query text
    pub text: String,

    /// Metadata constraints on semantic candidates
    #[serde(default)]
    pub filter: QueryFilter,

    /// File the caller is working in; enables pinning and structural
    /// expansion
    #[serde(default)]
    pub current_file: Option<String>,

    /// 1-indexed cursor line within `current_file`
    #[serde(default)]
    pub current_line: Option<usize>,

    /// Requested result count; 0 means the configured default
    #[serde(default)]
    pub limit: usize,

    /// Overall deadline for this call. Expiry mid-flight returns whatever
    /// completed, flagged as degraded.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl ContextQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Validate the query and resolve the effective result count:
    /// zero falls back to the default, anything above the ceiling is
    /// clamped down to it.
    pub fn effective_limit(&self, config: &EngineConfig) -> Result<usize> {
        if self.text.trim().is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        let limit = if self.limit == 0 {
            config.default_limit
        } else {
            self.limit.min(config.max_limit)
        };
        Ok(limit)
    }

    /// Memoization key: everything that affects the answer, nothing that
    /// only affects how long we wait for it.
    pub(crate) fn memo_key(&self, limit: usize) -> QueryKey {
        QueryKey {
            text: self.text.clone(),
            language: self.filter.language.clone(),
            project: self.filter.project.clone(),
            current_file: self.current_file.clone(),
            current_line: self.current_line,
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct QueryKey {
    text: String,
    language: Option<String>,
    project: Option<String>,
    current_file: Option<String>,
    current_line: Option<usize>,
    limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_text_rejected() {
        let config = EngineConfig::default();
        assert!(matches!(
            ContextQuery::text("   ").effective_limit(&config),
            Err(EngineError::EmptyQuery)
        ));
    }

    #[test]
    fn test_zero_limit_uses_default() {
        let config = EngineConfig::default();
        let query = ContextQuery::text("load config");
        assert_eq!(query.effective_limit(&config).unwrap(), config.default_limit);
    }

    #[test]
    fn test_limit_clamped_to_max() {
        let config = EngineConfig::default();
        let query = ContextQuery {
            limit: 10_000,
            ..ContextQuery::text("load config")
        };
        assert_eq!(query.effective_limit(&config).unwrap(), config.max_limit);
    }

    #[test]
    fn test_deadline_not_part_of_memo_key() {
        let a = ContextQuery {
            deadline_ms: Some(5),
            ..ContextQuery::text("q")
        };
        let b = ContextQuery {
            deadline_ms: Some(5000),
            ..ContextQuery::text("q")
        };
        assert_eq!(a.memo_key(10), b.memo_key(10));
    }
}
