//! 存储网关
//!
//! 以 JSON 记录为单位的通用仓储接口，Profile 仓储只通过它访问持久化存储。

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// 存储网关 trait
///
/// 记录为 JSON 对象，主键通过 `id` 参数传入并由实现写回记录的 `id` 字段。
/// 违反唯一索引的写入必须返回 [`AppError::Conflict`](crate::error::AppError::Conflict)，
/// 且检查与写入需原子完成。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// 根据主键查找记录
    async fn find_by_id(&self, table: &str, id: &str) -> Result<Option<Value>>;

    /// 按字段等值查找第一条记录
    async fn find_one_where(&self, table: &str, field: &str, value: &Value)
    -> Result<Option<Value>>;

    /// 分页列出记录（按创建顺序）
    async fn list(&self, table: &str, limit: usize, start: usize) -> Result<Vec<Value>>;

    /// 统计记录数量
    async fn count(&self, table: &str) -> Result<u64>;

    /// 插入新记录，主键已存在时返回冲突
    async fn insert(&self, table: &str, id: &str, record: Value) -> Result<Value>;

    /// 只写入 `patch` 中出现的顶层字段，其余字段保持存储中的当前值。
    /// 返回合并后的记录；记录不存在时返回 `None`
    async fn merge(&self, table: &str, id: &str, patch: Value) -> Result<Option<Value>>;

    /// 删除记录，返回被删除的记录
    async fn delete(&self, table: &str, id: &str) -> Result<Option<Value>>;

    /// 声明字段唯一约束（幂等）
    async fn ensure_unique(&self, table: &str, field: &str) -> Result<()>;

    /// 连通性检查
    async fn ping(&self) -> Result<()>;
}

/// 将记录中的字段值规整为索引键
pub(crate) fn index_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_key_normalizes_strings() {
        assert_eq!(index_key(&json!("7")), "7");
        assert_eq!(index_key(&json!(7)), "7");
        assert_eq!(index_key(&json!(null)), "null");
    }
}
