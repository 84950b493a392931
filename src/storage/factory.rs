//! 存储工厂模块
//!
//! 根据配置创建相应的存储网关实例。

use std::sync::Arc;

use crate::config::config::{DatabaseConfig, StorageBackend};
use crate::error::{AppError, Result};
use crate::storage::gateway::StorageGateway;
use crate::storage::memory::MemoryGateway;

#[cfg(feature = "surrealdb")]
use crate::storage::surrealdb::SurrealGateway;

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建存储网关
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<dyn StorageGateway>> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data will not survive a restart");
                Ok(Arc::new(MemoryGateway::new()))
            }
            #[cfg(feature = "surrealdb")]
            StorageBackend::Surrealdb => {
                let gateway = SurrealGateway::connect(config.clone()).await?;
                Ok(Arc::new(gateway))
            }
            #[cfg(not(feature = "surrealdb"))]
            StorageBackend::Surrealdb => Err(AppError::Config(
                "SurrealDB feature is not enabled. Enable 'surrealdb' feature to use SurrealDB."
                    .into(),
            )),
        }
    }

    /// 检查存储是否可用
    pub async fn health_check(gateway: &dyn StorageGateway) -> Result<bool> {
        match gateway.ping().await {
            Ok(()) => Ok(true),
            Err(AppError::Database(e)) => {
                tracing::warn!(error = %e, "Storage health check failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
