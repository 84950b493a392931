//! 存储层模块
//!
//! 提供记录持久化（内存 / SurrealDB）和图片资源存储。

pub mod assets;
pub mod factory;
pub mod gateway;
pub mod memory;

#[cfg(feature = "surrealdb")]
pub mod surrealdb;

pub use assets::{AssetLocator, AssetStore, ByteStream, LocalAssetStore};
pub use gateway::StorageGateway;
pub use memory::MemoryGateway;
