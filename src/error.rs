//! 错误处理模块
//!
//! 定义应用程序的错误类型和错误处理逻辑。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 数据库错误
    #[error("数据库错误: {0}")]
    Database(String),

    /// 认证错误
    #[error("认证失败: {0}")]
    Authentication(String),

    /// 资源归属不匹配
    #[error("禁止访问: {0}")]
    Forbidden(String),

    /// 账户不存在（创建画像时外键校验失败）
    #[error("账户不存在: {0}")]
    AccountNotFound(String),

    /// 画像不存在
    #[error("画像不存在: {0}")]
    ProfileNotFound(String),

    /// 唯一约束冲突
    #[error("资源冲突: {0}")]
    Conflict(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 上传内容超过大小上限
    #[error("上传内容过大: 至少 {size} 字节，上限 {limit} 字节")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// 不支持的上传类型
    #[error("不支持的媒体类型: {0}")]
    UnsupportedMediaType(String),

    /// 资源写入失败
    #[error("存储写入失败: {0}")]
    StorageWriteFailed(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(e: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(format!("Invalid JSON body: {}", e.body_text()))
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(e: axum::extract::rejection::QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query: {}", e.body_text()))
    }
}

#[cfg(feature = "surrealdb")]
impl From<surrealdb::Error> for AppError {
    fn from(e: surrealdb::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

/// Axum response implementation for AppError
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = (&self).into();
        // 5xx 的细节只进日志
        let body = if status >= 500 {
            tracing::error!(code = %code, error = %self, "Request failed");
            Json(ErrorResponse::new(&code, "服务器内部错误"))
        } else {
            Json(ErrorResponse::new(&code, &self.to_string()))
        };
        (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response()
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,
    /// 错误消息
    pub message: String,
}

impl ErrorResponse {
    /// 创建新错误响应
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// HTTP 状态码映射
impl From<&AppError> for (u16, String) {
    fn from(err: &AppError) -> (u16, String) {
        match err {
            AppError::ProfileNotFound(_) => (404, "NOT_FOUND".to_string()),
            AppError::AccountNotFound(_) => (400, "ACCOUNT_NOT_FOUND".to_string()),
            AppError::Authentication(_) => (401, "UNAUTHORIZED".to_string()),
            AppError::Forbidden(_) => (403, "FORBIDDEN".to_string()),
            AppError::Conflict(_) => (409, "CONFLICT".to_string()),
            AppError::Validation(_) => (400, "BAD_REQUEST".to_string()),
            AppError::PayloadTooLarge { .. } => (400, "PAYLOAD_TOO_LARGE".to_string()),
            AppError::UnsupportedMediaType(_) => (400, "UNSUPPORTED_MEDIA_TYPE".to_string()),
            AppError::Timeout(_) => (408, "TIMEOUT".to_string()),
            AppError::StorageWriteFailed(_) => (500, "STORAGE_WRITE_FAILED".to_string()),
            _ => (500, "INTERNAL_ERROR".to_string()),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::ProfileNotFound("1".into()), 404, "NOT_FOUND"),
            (AppError::AccountNotFound("7".into()), 400, "ACCOUNT_NOT_FOUND"),
            (AppError::Conflict("dup".into()), 409, "CONFLICT"),
            (AppError::Forbidden("x".into()), 403, "FORBIDDEN"),
            (
                AppError::PayloadTooLarge { size: 10, limit: 5 },
                400,
                "PAYLOAD_TOO_LARGE",
            ),
            (
                AppError::UnsupportedMediaType("application/pdf".into()),
                400,
                "UNSUPPORTED_MEDIA_TYPE",
            ),
            (
                AppError::StorageWriteFailed("disk".into()),
                500,
                "STORAGE_WRITE_FAILED",
            ),
            (AppError::Timeout("slow".into()), 408, "TIMEOUT"),
            (AppError::Database("down".into()), 500, "INTERNAL_ERROR"),
        ];

        for (err, status, code) in cases {
            let (s, c): (u16, String) = (&err).into();
            assert_eq!(s, status, "{err}");
            assert_eq!(c, code);
        }
    }

    #[test]
    fn test_error_response_new() {
        let resp = ErrorResponse::new("BAD_REQUEST", "bad");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, serde_json::json!({"code": "BAD_REQUEST", "message": "bad"}));
    }
}
