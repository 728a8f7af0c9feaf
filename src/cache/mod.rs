//! Response caching: identity keys and the bounded LRU store.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheStats, ResponseCache, DEFAULT_COST_LIMIT};
