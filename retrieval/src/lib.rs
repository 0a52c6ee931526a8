/*!
# Codectx Hybrid Ranker

Weighted fusion of two retrieval signals over an indexed codebase:

- **semantic**: embed the query, search a [`codectx_vector_store::VectorIndex`],
  map distances to similarities;
- **structural**: walk the [`codectx_graph::RelationshipGraph`] outward from
  the caller's current entity, decaying by hop count, boosted by exact and
  fuzzy name matches on query identifiers.

Candidates are unioned by context-block key and ordered by
`semantic_weight * semantic + structural_weight * structural`. A signal
that fails or times out degrades the result instead of failing it; the
call only errors when neither signal produced anything to rank.
*/

mod config;
mod error;
mod keyword;
mod ranker;
mod result;

pub use config::RankerConfig;
pub use error::RetrievalError;
pub use ranker::{HybridRanker, RankRequest};
pub use result::{DegradedReason, RankedList, RankedResult};

pub type Result<T> = std::result::Result<T, RetrievalError>;
