//! 账户引用
//!
//! 账户由认证系统维护，画像服务只读取它以校验外键。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::storage::StorageGateway;

/// 账户表名
pub const ACCOUNT_TABLE: &str = "account";

/// 账户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: &str, username: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// 账户仓储（只读，外加开发环境的种子写入）
#[derive(Clone)]
pub struct AccountRepository {
    gateway: Arc<dyn StorageGateway>,
}

impl AccountRepository {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self { gateway }
    }

    /// 账户是否存在
    pub async fn exists(&self, account_id: &str) -> Result<bool> {
        Ok(self
            .gateway
            .find_by_id(ACCOUNT_TABLE, account_id)
            .await?
            .is_some())
    }

    /// 写入账户记录，仅用于开发环境种子数据和测试
    pub async fn seed(&self, account: &Account) -> Result<()> {
        if self.exists(&account.id).await? {
            return Ok(());
        }
        self.gateway
            .insert(ACCOUNT_TABLE, &account.id, serde_json::to_value(account)?)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryGateway;

    #[tokio::test]
    async fn test_seed_and_exists() {
        let repo = AccountRepository::new(Arc::new(MemoryGateway::new()));
        assert!(!repo.exists("7").await.unwrap());

        repo.seed(&Account::new("7", "ada")).await.unwrap();
        // 重复写入是幂等的
        repo.seed(&Account::new("7", "ada")).await.unwrap();

        assert!(repo.exists("7").await.unwrap());
    }
}
