//! # Codectx Structure
//!
//! Boundary types for the language-specific structure extractor. The engine
//! never parses source text itself; it consumes a [`FileStructure`] produced
//! by an external parser implementing [`StructureExtractor`].

mod error;
mod extractor;
mod types;

pub use error::StructureError;
pub use extractor::StructureExtractor;
pub use types::{FileStructure, StructureItem};

pub type Result<T> = std::result::Result<T, StructureError>;
