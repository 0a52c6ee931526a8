/*!
# Codectx Context Cache

Bounded store of extracted context blocks keyed by `(file, line range)`.
Each block carries a priority tier, access statistics, and its byte size;
the cache enforces a fixed byte budget with a deterministic eviction policy:

- candidates are selected in ascending `(tier, last_used, inserted)` order —
  lowest tier first, least-recently-used within a tier, earliest-inserted on
  a timestamp tie;
- `Critical` entries are never auto-evicted; when only `Critical` entries
  remain and the budget is still exceeded, `put` fails with
  [`CacheError::CapacityExceeded`] instead of growing past budget.

Timestamps are ticks of a per-cache logical clock, so eviction order is
reproducible in tests.
*/

mod block;
mod cache;
mod error;
mod tier;

pub use block::{BlockKey, ContextBlock, StructuralInfo};
pub use cache::{CacheConfig, CacheStats, ContextCache};
pub use error::CacheError;
pub use tier::PriorityTier;

pub type Result<T> = std::result::Result<T, CacheError>;
