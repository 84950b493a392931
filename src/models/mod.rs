//! 核心数据模型模块
//!
//! 定义账户引用、用户画像及其仓储。

pub mod account;
pub mod profile;
pub mod profile_repository;

pub use account::*;
pub use profile::*;
