//! Profile 仓储
//!
//! 通过存储网关持久化用户画像，维护“一个账户一个画像”的约束。

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::account::AccountRepository;
use crate::models::profile::{NewProfile, PROFILE_TABLE, Profile, ProfileChanges};
use crate::storage::StorageGateway;

/// 分页遍历时的批大小
const LIST_BATCH_SIZE: usize = 100;

/// Profile 仓储 trait
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// 为账户创建画像
    async fn create(&self, account_id: &str, fields: NewProfile) -> Result<Profile>;

    /// 根据 ID 获取画像
    async fn get_by_id(&self, id: &str) -> Result<Profile>;

    /// 根据账户 ID 获取画像
    async fn get_by_account_id(&self, account_id: &str) -> Result<Profile>;

    /// 分页列出画像
    async fn list(&self, limit: usize, start: usize) -> Result<Vec<Profile>>;

    /// 列出全部画像
    async fn list_all(&self) -> Result<Vec<Profile>> {
        let mut profiles = Vec::new();
        loop {
            let batch = self.list(LIST_BATCH_SIZE, profiles.len()).await?;
            let done = batch.len() < LIST_BATCH_SIZE;
            profiles.extend(batch);
            if done {
                return Ok(profiles);
            }
        }
    }

    /// 统计数量
    async fn count(&self) -> Result<u64>;

    /// 更新画像
    async fn update(&self, id: &str, changes: ProfileChanges) -> Result<Profile>;

    /// 删除画像，返回被删除的记录
    async fn delete(&self, id: &str) -> Result<Profile>;
}

/// Profile 仓储实现
#[derive(Clone)]
pub struct ProfileRepositoryImpl {
    gateway: Arc<dyn StorageGateway>,
    accounts: AccountRepository,
}

impl ProfileRepositoryImpl {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self {
            accounts: AccountRepository::new(gateway.clone()),
            gateway,
        }
    }

    /// 建立 account_id 唯一索引
    pub async fn init_schema(&self) -> Result<()> {
        self.gateway
            .ensure_unique(PROFILE_TABLE, "account_id")
            .await
    }

    async fn find_by_account(&self, account_id: &str) -> Result<Option<Profile>> {
        self.gateway
            .find_one_where(
                PROFILE_TABLE,
                "account_id",
                &Value::String(account_id.to_string()),
            )
            .await?
            .map(decode)
            .transpose()
    }
}

/// 从存储记录解析
fn decode(value: Value) -> Result<Profile> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Database(format!("Failed to deserialize profile: {}", e)))
}

/// 从画像中取出指定字段组成补丁
fn patch_of(profile: &Profile, fields: &[&str]) -> Result<Value> {
    let Value::Object(mut record) = serde_json::to_value(profile)? else {
        return Err(AppError::Serialization(
            "Profile must serialize to an object".to_string(),
        ));
    };
    record.retain(|field, _| fields.contains(&field.as_str()));
    Ok(Value::Object(record))
}

fn duplicate(account_id: &str) -> AppError {
    AppError::Conflict(format!("Profile already exists for account: {}", account_id))
}

#[async_trait]
impl ProfileRepository for ProfileRepositoryImpl {
    async fn create(&self, account_id: &str, fields: NewProfile) -> Result<Profile> {
        if !self.accounts.exists(account_id).await? {
            return Err(AppError::AccountNotFound(account_id.to_string()));
        }

        if self.find_by_account(account_id).await?.is_some() {
            return Err(duplicate(account_id));
        }

        let profile = Profile::new(account_id, fields)?;
        let record = serde_json::to_value(&profile)?;

        // 并发创建由唯一索引兜底
        match self.gateway.insert(PROFILE_TABLE, &profile.id, record).await {
            Ok(stored) => {
                tracing::info!(profile_id = %profile.id, account_id, "Profile created");
                decode(stored)
            }
            Err(AppError::Conflict(_)) => Err(duplicate(account_id)),
            Err(e) => {
                tracing::error!(account_id, error = %e, "Failed to create profile");
                Err(e)
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Profile> {
        self.gateway
            .find_by_id(PROFILE_TABLE, id)
            .await?
            .map(decode)
            .transpose()?
            .ok_or_else(|| AppError::ProfileNotFound(id.to_string()))
    }

    async fn get_by_account_id(&self, account_id: &str) -> Result<Profile> {
        self.find_by_account(account_id)
            .await?
            .ok_or_else(|| AppError::ProfileNotFound(format!("account {}", account_id)))
    }

    async fn list(&self, limit: usize, start: usize) -> Result<Vec<Profile>> {
        let rows = self.gateway.list(PROFILE_TABLE, limit, start).await?;
        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            match decode(row) {
                Ok(profile) => profiles.push(profile),
                Err(e) => tracing::warn!("Skipping malformed profile record: {}", e),
            }
        }
        Ok(profiles)
    }

    async fn count(&self) -> Result<u64> {
        self.gateway.count(PROFILE_TABLE).await
    }

    async fn update(&self, id: &str, changes: ProfileChanges) -> Result<Profile> {
        let mut profile = self.get_by_id(id).await?;
        let fields = changes.fields();
        profile.apply(changes)?;

        // 只写回变更字段，并发的其他更新不会被旧值覆盖
        let patch = patch_of(&profile, &fields)?;
        let saved = self
            .gateway
            .merge(PROFILE_TABLE, id, patch)
            .await
            .inspect_err(|e| tracing::error!(profile_id = id, error = %e, "Failed to save profile"))?
            .ok_or_else(|| AppError::ProfileNotFound(id.to_string()))?;

        tracing::debug!(profile_id = id, "Profile updated");
        decode(saved)
    }

    async fn delete(&self, id: &str) -> Result<Profile> {
        let removed = self
            .gateway
            .delete(PROFILE_TABLE, id)
            .await?
            .ok_or_else(|| AppError::ProfileNotFound(id.to_string()))?;

        tracing::info!(profile_id = id, "Profile deleted");
        decode(removed)
    }
}

/// 创建 Profile 仓储并初始化索引
pub async fn create_profile_repository(
    gateway: Arc<dyn StorageGateway>,
) -> Result<Arc<dyn ProfileRepository>> {
    let repository = ProfileRepositoryImpl::new(gateway);
    repository.init_schema().await?;
    Ok(Arc::new(repository))
}
