//! Hotel result cache: Redis when reachable, an in-process map otherwise.

pub mod backend;
pub mod store;

pub use backend::{BackendState, MemoryBackend, RedisBackend};
pub use store::CacheStore;
