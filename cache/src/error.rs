use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache capacity exceeded: need {needed} bytes, budget {budget}, evictable {evictable}")]
    CapacityExceeded {
        needed: usize,
        budget: usize,
        evictable: usize,
    },

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown cache key: {0}")]
    UnknownKey(String),
}
