mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod traits;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;
pub use traits::{Cache, CacheExt};
