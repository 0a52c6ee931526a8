use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key: one live block per `(path, start_line, end_line)` at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockKey {
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl BlockKey {
    pub fn new(path: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            path: path.into(),
            start_line,
            end_line,
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.path, self.start_line, self.end_line)
    }
}

/// Structural metadata attached to a block when it was extracted from a
/// parsed entity rather than a bare line window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralInfo {
    /// Entity kind ("function", "class", ...)
    pub kind: String,

    /// Entity display name
    pub name: String,

    /// Names the entity depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A cached extraction of source text tied to a file/line range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBlock {
    pub key: BlockKey,

    /// Raw extracted text
    pub content: String,

    /// Language tag
    #[serde(default)]
    pub language: Option<String>,

    /// Present when the block maps to a parsed entity
    #[serde(default)]
    pub structural: Option<StructuralInfo>,
}

impl ContextBlock {
    pub fn new(key: BlockKey, content: impl Into<String>) -> Self {
        Self {
            key,
            content: content.into(),
            language: None,
            structural: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_structural(mut self, structural: StructuralInfo) -> Self {
        self.structural = Some(structural);
        self
    }

    /// Bytes this block charges against the cache budget.
    pub fn byte_size(&self) -> usize {
        self.content.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_display() {
        let key = BlockKey::new("src/config.py", 10, 42);
        assert_eq!(key.to_string(), "src/config.py:10-42");
    }

    #[test]
    fn test_byte_size_tracks_content() {
        let block = ContextBlock::new(BlockKey::new("a.rs", 1, 2), "fn a() {}");
        assert_eq!(block.byte_size(), 9);
    }

    #[test]
    fn test_builder_metadata() {
        let block = ContextBlock::new(BlockKey::new("a.py", 1, 5), "def a(): pass")
            .with_language("python")
            .with_structural(StructuralInfo {
                kind: "function".to_string(),
                name: "a".to_string(),
                dependencies: vec!["os".to_string()],
            });

        assert_eq!(block.language.as_deref(), Some("python"));
        assert_eq!(block.structural.unwrap().name, "a");
    }
}
