use crate::error::StructureError;
use crate::types::FileStructure;
use async_trait::async_trait;

/// External parser boundary: source text in, structure tree out.
///
/// Implementations wrap whatever language tooling produces the tree
/// (tree-sitter, an LSP, a remote service). Failures must come back as a
/// typed [`StructureError`], never panic.
#[async_trait]
pub trait StructureExtractor: Send + Sync {
    async fn parse(&self, content: &str, language: &str) -> Result<FileStructure, StructureError>;
}
