//! GitConnect - 开发者画像服务
//!
//! 管理开发者账户的公开画像：创建、读取、更新、删除以及头像上传，
//! 并保证每个账户至多拥有一个画像。

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
