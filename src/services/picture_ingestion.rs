//! 头像上传服务
//!
//! 校验上传大小和类型，写入资源存储，成功后再把定位符写回画像。

use std::sync::Arc;

use crate::config::config::{AssetsConfig, DEFAULT_MAX_PICTURE_BYTES};
use crate::error::{AppError, Result};
use crate::models::profile::ProfileChanges;
use crate::models::profile_repository::ProfileRepository;
use crate::storage::{AssetLocator, AssetStore, ByteStream};

/// 上传策略
#[derive(Debug, Clone)]
pub struct IngestionPolicy {
    /// 大小上限（字节）
    pub max_bytes: u64,
    /// 允许的媒体类型（小写）
    pub allowed_types: Vec<String>,
}

impl Default for IngestionPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_PICTURE_BYTES,
            allowed_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
        }
    }
}

impl IngestionPolicy {
    pub fn from_config(config: &AssetsConfig) -> Self {
        Self {
            max_bytes: config.max_picture_bytes,
            allowed_types: config
                .allowed_types
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// 校验声明的大小和类型，返回规整后的媒体类型
    pub fn check(&self, content_type: &str, byte_size: u64) -> Result<String> {
        if byte_size > self.max_bytes {
            return Err(AppError::PayloadTooLarge {
                size: byte_size,
                limit: self.max_bytes,
            });
        }

        let media_type = essence(content_type);
        if !self.allowed_types.iter().any(|t| *t == media_type) {
            return Err(AppError::UnsupportedMediaType(if media_type.is_empty() {
                "<missing>".to_string()
            } else {
                media_type
            }));
        }
        Ok(media_type)
    }
}

/// 去掉参数部分并转小写：`Image/PNG; q=1` -> `image/png`
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn extension_for(media_type: &str) -> &str {
    match media_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        other => other
            .strip_prefix("image/")
            .filter(|s| s.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin"),
    }
}

/// 头像上传服务
#[derive(Clone)]
pub struct PictureIngestion {
    profiles: Arc<dyn ProfileRepository>,
    assets: Arc<dyn AssetStore>,
    policy: IngestionPolicy,
}

impl PictureIngestion {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        assets: Arc<dyn AssetStore>,
        policy: IngestionPolicy,
    ) -> Self {
        Self {
            profiles,
            assets,
            policy,
        }
    }

    /// 上传头像并关联到账户的画像
    ///
    /// 校验顺序：大小、类型、画像存在。资源完整落盘之后才会更新画像；
    /// 任一步失败都不会留下指向不完整资源的定位符。
    pub async fn ingest(
        &self,
        account_id: &str,
        content: ByteStream<'_>,
        content_type: &str,
        byte_size: u64,
    ) -> Result<AssetLocator> {
        let media_type = self.policy.check(content_type, byte_size)?;
        let profile = self.profiles.get_by_account_id(account_id).await?;

        let key = format!(
            "{}.{}",
            uuid::Uuid::new_v4(),
            extension_for(&media_type)
        );
        let locator = self
            .assets
            .put(&key, content, self.policy.max_bytes)
            .await?;

        match self
            .profiles
            .update(&profile.id, ProfileChanges::picture(locator.clone()))
            .await
        {
            Ok(saved) => {
                tracing::info!(
                    account_id,
                    profile_id = %profile.id,
                    picture = %locator,
                    bytes = byte_size,
                    "Profile picture stored"
                );
                // 已提交的记录不再引用旧头像时才删除
                if let Some(previous) = profile
                    .picture
                    .filter(|p| saved.picture.as_ref() != Some(p))
                {
                    self.discard(&previous).await;
                }
                Ok(locator)
            }
            Err(e) => {
                tracing::error!(
                    account_id,
                    profile_id = %profile.id,
                    error = %e,
                    "Failed to attach picture, discarding asset"
                );
                self.discard(&locator).await;
                Err(e)
            }
        }
    }

    /// 尽力删除资源，失败只记录日志
    pub async fn discard(&self, locator: &AssetLocator) {
        if let Err(e) = self.assets.remove(locator).await {
            tracing::warn!(picture = %locator, error = %e, "Failed to remove stored picture");
        }
    }
}
