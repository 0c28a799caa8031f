//! Infrastructure layer - Store backends, providers and services

pub mod cache_store;
pub mod embedding;
pub mod generation;
pub mod http_client;
pub mod logging;
pub mod object_store;
pub mod observability;
pub mod redis_connection;
pub mod services;
pub mod store_factory;
pub mod vector_index;

pub use services::{CacheComponents, DataManager, Resolution, SemanticCacheService};
pub use store_factory::{StoreBackendsConfig, StoreFactory, StoreHandles};
