//! # Codectx Vector Store
//!
//! Abstract similarity-search backend for code vectors. The engine talks to
//! a [`VectorIndex`] and never assumes a particular on-disk format; the
//! bundled [`MemoryVectorIndex`] is the reference backend used by tests and
//! small deployments.

mod error;
mod memory;
mod store;

pub use error::VectorStoreError;
pub use memory::MemoryVectorIndex;
pub use store::{QueryFilter, ScoreMapping, VectorHit, VectorIndex, VectorMetadata};

pub type Result<T> = std::result::Result<T, VectorStoreError>;
