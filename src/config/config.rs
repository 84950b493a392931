use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 上传图片大小上限：5 MiB
pub const DEFAULT_MAX_PICTURE_BYTES: u64 = 5 * 1024 * 1024;

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存储（开发与测试）
    #[default]
    Memory,
    /// SurrealDB
    Surrealdb,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 存储后端
    pub backend: StorageBackend,
    /// SurrealDB 连接地址
    pub url: String,
    /// 命名空间
    pub namespace: String,
    /// 数据库名称
    pub database: String,
    /// 用户名
    pub username: String,
    /// 密码
    pub password: String,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 请求超时（秒）
    pub request_timeout: u64,
    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

/// 图片资源存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AssetsConfig {
    /// 资源根目录
    pub root: PathBuf,
    /// 单个图片大小上限（字节）
    pub max_picture_bytes: u64,
    /// 允许的图片类型
    pub allowed_types: Vec<String>,
}

/// 安全配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// JWT 密钥
    pub jwt_secret: String,
    /// JWT 签发者
    pub jwt_issuer: String,
    /// JWT 受众
    pub jwt_audience: String,
    /// 启用 JWT 认证
    pub jwt_auth_enabled: bool,
    /// 启用 API Key 认证
    pub api_key_auth_enabled: bool,
    /// API Key 到账户 ID 的映射
    pub api_keys: HashMap<String, String>,
    /// CORS 允许的来源
    pub cors_allowed_origins: Vec<String>,
    /// 启用安全响应头
    pub security_headers_enabled: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// 图片资源配置
    pub assets: AssetsConfig,
    /// 安全配置
    pub security: SecurityConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        let mut api_keys = HashMap::new();
        api_keys.insert("dev-api-key".to_string(), "1".to_string());

        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                request_timeout: 30,
                max_request_size: 6 * 1024 * 1024,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: "ws://localhost:8000".into(),
                namespace: "gitconnect".into(),
                database: "profiles".into(),
                username: "root".into(),
                password: "root".into(),
            },
            assets: AssetsConfig {
                root: PathBuf::from("./uploads"),
                max_picture_bytes: DEFAULT_MAX_PICTURE_BYTES,
                allowed_types: vec!["image/jpeg".into(), "image/png".into()],
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-in-production-min-32-chars".into(),
                jwt_issuer: "gitconnect".into(),
                jwt_audience: "gitconnect-api".into(),
                jwt_auth_enabled: true,
                api_key_auth_enabled: true,
                api_keys,
                cors_allowed_origins: vec!["http://localhost:5173".into()],
                security_headers_enabled: true,
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "gitconnect".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.database.backend = StorageBackend::Surrealdb;
        config.security.api_key_auth_enabled = false;
        config.security.api_keys.clear();
        config
    }
}
