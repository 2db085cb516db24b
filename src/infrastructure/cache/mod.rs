//! KV-backed cache infrastructure: Redis adapter, response store, lock

pub mod lock;
pub mod redis;
pub mod store;

pub use lock::{SingleFlightConfig, SingleFlightLock};
pub use redis::{RedisKvConfig, RedisKvStore};
pub use store::{ResponseCache, ResponseCacheConfig};
