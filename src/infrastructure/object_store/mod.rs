//! Object store implementations

mod filesystem;
mod in_memory;
mod redis;

pub use filesystem::FilesystemObjectStore;
pub use in_memory::InMemoryObjectStore;
pub use self::redis::RedisObjectStore;
