//! 用户画像 DTO
//!
//! 用于 Profile API 的请求和响应序列化

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::profile::{DISPLAY_NAME_MAX_CHARS, NewProfile, Profile, ProfileChanges};
use crate::services::profile::{DEFAULT_PAGE_SIZE, Pagination, ProfilePage};

/// 账户 ID 的两种写法：`7` 或 `"7"`
#[derive(Deserialize)]
#[serde(untagged)]
enum AccountIdInput {
    Number(u64),
    Text(String),
}

fn account_id_compat<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<AccountIdInput>::deserialize(deserializer)?.map(|id| match id {
            AccountIdInput::Number(n) => n.to_string(),
            AccountIdInput::Text(s) => s,
        }),
    )
}

/// 创建画像请求
///
/// 兼容旧客户端的 `user_id` / `full_name` 字段名。
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProfileRequest {
    /// 账户 ID，可省略；若提供必须与认证身份一致
    #[serde(default, alias = "user_id", deserialize_with = "account_id_compat")]
    #[schema(value_type = Option<String>)]
    pub account_id: Option<String>,

    /// 显示名称
    #[serde(alias = "full_name")]
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,

    /// 简介
    #[serde(default)]
    pub bio: Option<String>,

    /// GitHub 用户名
    #[serde(default)]
    pub github: Option<String>,
}

impl From<CreateProfileRequest> for NewProfile {
    fn from(request: CreateProfileRequest) -> Self {
        Self {
            display_name: request.display_name,
            bio: request.bio,
            github: request.github,
        }
    }
}

/// 更新画像请求
///
/// 省略的字段保持不变；`bio` 和 `github` 显式传 `null` 表示清空。
/// `picture` 不能通过此接口修改。
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    /// 显示名称
    #[serde(default, alias = "full_name")]
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,

    /// 简介
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,

    /// GitHub 用户名
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub github: Option<Option<String>>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            display_name: request.display_name,
            bio: request.bio,
            github: request.github,
            picture: None,
        }
    }
}

/// 画像响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub account_id: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub github: Option<String>,
    /// 头像定位符
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            account_id: profile.account_id,
            display_name: profile.display_name,
            bio: profile.bio,
            github: profile.github,
            picture: profile.picture.map(|p| p.as_str().to_string()),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// 画像列表查询参数
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProfilesParams {
    /// 页码（从 1 开始）
    pub page: Option<usize>,
    /// 每页数量；page 和 page_size 都省略时返回全部
    pub page_size: Option<usize>,
}

impl ListProfilesParams {
    pub fn pagination(&self) -> Option<Pagination> {
        match (self.page, self.page_size) {
            (None, None) => None,
            (page, page_size) => Some(Pagination::new(
                page.unwrap_or(1),
                page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            )),
        }
    }
}

/// 画像列表响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListProfilesResponse {
    pub profiles: Vec<ProfileResponse>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

impl From<ProfilePage> for ListProfilesResponse {
    fn from(page: ProfilePage) -> Self {
        Self {
            profiles: page.profiles.into_iter().map(ProfileResponse::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

/// 删除画像响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteProfileResponse {
    pub id: String,
    pub message: String,
}

/// 头像上传表单（仅用于文档）
#[derive(Debug, ToSchema)]
pub struct UploadPictureForm {
    /// image/jpeg 或 image/png，最大 5 MiB
    #[schema(value_type = String, format = Binary)]
    pub profile_picture: Vec<u8>,
}

/// 头像上传响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadPictureResponse {
    /// 新头像定位符
    pub picture: String,
    pub message: String,
}
