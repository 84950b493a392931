//! 图片资源存储
//!
//! 资源先写入 `<key>.part` 临时文件，完整落盘并 fsync 后再原子重命名，
//! 因此定位符只会指向完整的文件。

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::{StreamExt, stream::BoxStream};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use utoipa::ToSchema;

use crate::error::{AppError, Result};

/// 上传字节流
pub type ByteStream<'a> = BoxStream<'a, std::io::Result<Bytes>>;

/// 资源定位符（相对资源根目录的文件名）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AssetLocator(String);

impl AssetLocator {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 资源存储 trait
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// 写入资源，超过 `limit` 字节时中止并丢弃已写入内容
    async fn put(&self, key: &str, content: ByteStream<'_>, limit: u64) -> Result<AssetLocator>;

    /// 删除资源，资源不存在时返回 `false`
    async fn remove(&self, locator: &AssetLocator) -> Result<bool>;
}

/// 未提交的临时文件，析构时删除
struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            match std::fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!(path = %self.path.display(), "Discarded partial asset"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to discard partial asset"
                ),
            }
        }
    }
}

/// 本地文件系统资源存储
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 定位符对应的磁盘路径
    pub fn resolve(&self, locator: &AssetLocator) -> Result<PathBuf> {
        check_key(locator.as_str())?;
        Ok(self.root.join(locator.as_str()))
    }
}

fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\'])
        && !key.ends_with(".part");
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid asset key: {}", key)))
    }
}

fn write_failed(path: &Path, e: std::io::Error) -> AppError {
    tracing::error!(path = %path.display(), error = %e, "Asset write failed");
    AppError::StorageWriteFailed(e.to_string())
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(
        &self,
        key: &str,
        mut content: ByteStream<'_>,
        limit: u64,
    ) -> Result<AssetLocator> {
        check_key(key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| write_failed(&self.root, e))?;

        let target = self.root.join(key);
        let mut partial = PartialFile::new(self.root.join(format!("{key}.part")));

        let mut file = tokio::fs::File::create(&partial.path)
            .await
            .map_err(|e| write_failed(&partial.path, e))?;

        let mut written: u64 = 0;
        while let Some(chunk) = content.next().await {
            let chunk = chunk.map_err(|e| match e.kind() {
                std::io::ErrorKind::FileTooLarge => AppError::PayloadTooLarge {
                    size: written,
                    limit,
                },
                _ => AppError::Validation(format!("Upload stream interrupted: {}", e)),
            })?;
            written += chunk.len() as u64;
            if written > limit {
                return Err(AppError::PayloadTooLarge {
                    size: written,
                    limit,
                });
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| write_failed(&partial.path, e))?;
        }

        file.flush()
            .await
            .map_err(|e| write_failed(&partial.path, e))?;
        file.sync_all()
            .await
            .map_err(|e| write_failed(&partial.path, e))?;
        drop(file);

        tokio::fs::rename(&partial.path, &target)
            .await
            .map_err(|e| write_failed(&target, e))?;
        partial.disarm();

        tracing::debug!(key, bytes = written, "Asset stored");
        Ok(AssetLocator::new(key))
    }

    async fn remove(&self, locator: &AssetLocator) -> Result<bool> {
        let path = self.resolve(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
