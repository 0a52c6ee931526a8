/*!
# Codectx Engine

Orchestrates the indexing and retrieval pipeline:

1. **Index**: parse source files through an injected
   [`codectx_structure::StructureExtractor`], feed entities into the
   relationship graph, embed function and class spans into the vector
   index, and invalidate superseded cache entries and vectors.
2. **Retrieve**: pin the caller's current entity at `Critical`, rank
   candidates with the hybrid semantic/structural ranker, materialize
   blocks through the byte-budgeted context cache, and feed usage back
   into the cache tiers.

A caller-supplied deadline turns an over-budget retrieval into a degraded
partial answer rather than an error; once the deadline has passed, the
engine stops mutating cache state for that call. Complete answers are
memoized per query and invalidated on any index change.
*/

mod config;
mod engine;
mod error;
mod query;
mod result;
mod source;

pub use config::EngineConfig;
pub use engine::RetrievalEngine;
pub use error::EngineError;
pub use query::ContextQuery;
pub use result::{ContextHit, CurrentContext, EngineStats, RetrievalResult, RetrievalStats};
pub use source::{FsSourceReader, MemorySourceReader, SourceReader};

pub type Result<T> = std::result::Result<T, EngineError>;
