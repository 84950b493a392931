//! 画像服务
//!
//! 编排画像的创建、读取、列表、更新、删除和头像上传，
//! 并在写操作上执行所有权校验。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::profile::{NewProfile, Profile, ProfileChanges};
use crate::models::profile_repository::ProfileRepository;
use crate::services::picture_ingestion::PictureIngestion;
use crate::storage::{AssetLocator, ByteStream};

/// 默认每页数量
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// 每页数量上限
pub const MAX_PAGE_SIZE: usize = 100;

/// 分页参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// 页码（从 1 开始）
    pub page: usize,
    /// 每页数量
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// 计算偏移量
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// 检查分页参数是否有效
    pub fn is_valid(&self) -> bool {
        self.page > 0 && self.page_size > 0 && self.page_size <= MAX_PAGE_SIZE
    }
}

/// 一页画像
#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub profiles: Vec<Profile>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

/// 画像服务 trait
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// 为已认证账户创建画像
    ///
    /// `claimed_account_id` 是请求体中声明的账户，与认证身份不一致时拒绝。
    async fn create_profile(
        &self,
        caller: &str,
        claimed_account_id: Option<&str>,
        fields: NewProfile,
    ) -> Result<Profile>;

    /// 根据 ID 读取画像
    async fn read_profile(&self, id: &str) -> Result<Profile>;

    /// 读取调用者自己的画像
    async fn read_own_profile(&self, caller: &str) -> Result<Profile>;

    /// 分页列出画像；不传分页参数时返回全部
    async fn list_profiles(&self, pagination: Option<Pagination>) -> Result<ProfilePage>;

    /// 更新画像（仅限所有者）
    async fn update_profile(&self, caller: &str, id: &str, changes: ProfileChanges)
    -> Result<Profile>;

    /// 删除画像（仅限所有者），返回被删除的记录
    async fn delete_profile(&self, caller: &str, id: &str) -> Result<Profile>;

    /// 上传调用者的头像
    async fn upload_picture(
        &self,
        caller: &str,
        content: ByteStream<'_>,
        content_type: &str,
        byte_size: u64,
    ) -> Result<AssetLocator>;
}

/// 画像服务实现
pub struct ProfileServiceImpl {
    repository: Arc<dyn ProfileRepository>,
    ingestion: PictureIngestion,
}

impl ProfileServiceImpl {
    pub fn new(repository: Arc<dyn ProfileRepository>, ingestion: PictureIngestion) -> Self {
        Self {
            repository,
            ingestion,
        }
    }

    /// 读取画像并校验调用者是所有者
    async fn owned_profile(&self, caller: &str, id: &str) -> Result<Profile> {
        let profile = self.repository.get_by_id(id).await?;
        if !profile.is_owned_by(caller) {
            tracing::warn!(
                account_id = caller,
                profile_id = id,
                "Rejected access to another account's profile"
            );
            return Err(AppError::Forbidden(format!(
                "Profile {} does not belong to the caller",
                id
            )));
        }
        Ok(profile)
    }
}

#[async_trait]
impl ProfileService for ProfileServiceImpl {
    async fn create_profile(
        &self,
        caller: &str,
        claimed_account_id: Option<&str>,
        fields: NewProfile,
    ) -> Result<Profile> {
        if let Some(claimed) = claimed_account_id {
            if claimed != caller {
                return Err(AppError::Forbidden(
                    "Cannot create a profile for another account".to_string(),
                ));
            }
        }

        self.repository.create(caller, fields).await
    }

    async fn read_profile(&self, id: &str) -> Result<Profile> {
        self.repository.get_by_id(id).await
    }

    async fn read_own_profile(&self, caller: &str) -> Result<Profile> {
        self.repository.get_by_account_id(caller).await
    }

    async fn list_profiles(&self, pagination: Option<Pagination>) -> Result<ProfilePage> {
        let total = self.repository.count().await?;

        let Some(pagination) = pagination else {
            let profiles = self.repository.list_all().await?;
            let page_size = profiles.len();
            return Ok(ProfilePage {
                profiles,
                total,
                page: 1,
                page_size,
            });
        };

        if !pagination.is_valid() {
            return Err(AppError::Validation(format!(
                "page must be >= 1 and page_size within 1..={}",
                MAX_PAGE_SIZE
            )));
        }

        let profiles = self
            .repository
            .list(pagination.page_size, pagination.offset())
            .await?;

        Ok(ProfilePage {
            profiles,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
        })
    }

    async fn update_profile(
        &self,
        caller: &str,
        id: &str,
        changes: ProfileChanges,
    ) -> Result<Profile> {
        if changes.picture.is_some() {
            return Err(AppError::Validation(
                "picture can only be changed through an upload".to_string(),
            ));
        }

        self.owned_profile(caller, id).await?;
        self.repository.update(id, changes).await
    }

    async fn delete_profile(&self, caller: &str, id: &str) -> Result<Profile> {
        self.owned_profile(caller, id).await?;
        let removed = self.repository.delete(id).await?;

        if let Some(picture) = &removed.picture {
            self.ingestion.discard(picture).await;
        }
        Ok(removed)
    }

    async fn upload_picture(
        &self,
        caller: &str,
        content: ByteStream<'_>,
        content_type: &str,
        byte_size: u64,
    ) -> Result<AssetLocator> {
        self.ingestion
            .ingest(caller, content, content_type, byte_size)
            .await
    }
}

/// 创建画像服务
pub fn create_profile_service(
    repository: Arc<dyn ProfileRepository>,
    ingestion: PictureIngestion,
) -> Arc<dyn ProfileService> {
    Arc::new(ProfileServiceImpl::new(repository, ingestion))
}
