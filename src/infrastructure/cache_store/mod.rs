//! Cache store implementations

mod in_memory;
mod postgres;
mod redis;

pub use in_memory::InMemoryCacheStore;
pub use postgres::{PostgresCacheStore, PostgresConfig};
pub use self::redis::RedisCacheStore;
