//! 用户画像数据模型
//!
//! 每个账户至多拥有一个公开画像：展示名、简介、GitHub 账号和头像。

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::storage::AssetLocator;

/// 画像表名
pub const PROFILE_TABLE: &str = "profile";

/// 展示名最大长度（字符）
pub const DISPLAY_NAME_MAX_CHARS: usize = 100;

/// 用户画像
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    /// 画像唯一标识
    pub id: String,

    /// 所属账户 ID（全局唯一）
    pub account_id: String,

    /// 展示名
    pub display_name: String,

    /// 个人简介
    pub bio: Option<String>,

    /// GitHub 用户名
    pub github: Option<String>,

    /// 头像资源定位符
    #[schema(value_type = Option<String>)]
    pub picture: Option<AssetLocator>,

    /// 创建时间
    #[serde(with = "fixed_width")]
    pub created_at: DateTime<Utc>,

    /// 更新时间
    #[serde(with = "fixed_width")]
    pub updated_at: DateTime<Utc>,
}

/// 存储中的时间戳固定为微秒精度的 RFC3339，字符串序即时间序
mod fixed_width {
    use super::*;

    pub fn serialize<S: Serializer>(
        at: &DateTime<Utc>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

/// 当前时间，截断到存储精度
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// 创建画像时由客户端提供的字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProfile {
    pub display_name: String,
    pub bio: Option<String>,
    pub github: Option<String>,
}

/// 画像变更
///
/// 外层 `None` 表示字段未提供；`Some(None)` 表示清空可选字段。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub bio: Option<Option<String>>,
    pub github: Option<Option<String>>,
    pub picture: Option<Option<AssetLocator>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.github.is_none()
            && self.picture.is_none()
    }

    /// 本次变更涉及的存储字段，总是包含 `updated_at`
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::with_capacity(5);
        if self.display_name.is_some() {
            fields.push("display_name");
        }
        if self.bio.is_some() {
            fields.push("bio");
        }
        if self.github.is_some() {
            fields.push("github");
        }
        if self.picture.is_some() {
            fields.push("picture");
        }
        fields.push("updated_at");
        fields
    }

    /// 只设置头像的变更
    pub fn picture(locator: AssetLocator) -> Self {
        Self {
            picture: Some(Some(locator)),
            ..Default::default()
        }
    }
}

/// 校验展示名，原样返回
pub fn validate_display_name(name: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(AppError::Validation(
            "display_name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > DISPLAY_NAME_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "display_name must be at most {} characters",
            DISPLAY_NAME_MAX_CHARS
        )));
    }
    Ok(name.to_string())
}

impl Profile {
    /// 创建新画像
    pub fn new(account_id: &str, fields: NewProfile) -> Result<Self> {
        let now = now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            display_name: validate_display_name(&fields.display_name)?,
            bio: fields.bio,
            github: fields.github,
            picture: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// 应用变更
    ///
    /// 校验失败时画像保持不变。
    pub fn apply(&mut self, changes: ProfileChanges) -> Result<()> {
        let display_name = changes
            .display_name
            .as_deref()
            .map(validate_display_name)
            .transpose()?;

        if let Some(name) = display_name {
            self.display_name = name;
        }
        if let Some(bio) = changes.bio {
            self.bio = bio;
        }
        if let Some(github) = changes.github {
            self.github = github;
        }
        if let Some(picture) = changes.picture {
            self.picture = picture;
        }

        self.touch();
        Ok(())
    }

    /// 推进更新时间，保证严格递增
    pub fn touch(&mut self) {
        let now = now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// 是否属于指定账户
    pub fn is_owned_by(&self, account_id: &str) -> bool {
        self.account_id == account_id
    }
}
