//! 内存存储网关
//!
//! 基于 DashMap 的进程内实现，用于开发环境和测试。
//! 唯一索引的检查与写入在同一个分片写锁内完成。

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{AppError, Result};
use crate::storage::gateway::{StorageGateway, index_key};

#[derive(Default)]
struct Table {
    /// id -> (插入序号, 记录)
    rows: HashMap<String, (u64, Value)>,
    /// 字段 -> (索引键 -> 记录 id)
    unique: HashMap<String, HashMap<String, String>>,
}

impl Table {
    fn check_unique(&self, table: &str, id: &str, record: &Value) -> Result<()> {
        for (field, index) in &self.unique {
            let Some(value) = record.get(field) else {
                continue;
            };
            if let Some(owner) = index.get(&index_key(value)) {
                if owner != id {
                    return Err(AppError::Conflict(format!(
                        "{}.{} already contains {}",
                        table, field, value
                    )));
                }
            }
        }
        Ok(())
    }

    fn unindex(&mut self, id: &str, record: &Value) {
        for (field, index) in self.unique.iter_mut() {
            if let Some(value) = record.get(field) {
                let key = index_key(value);
                if index.get(&key).is_some_and(|owner| owner == id) {
                    index.remove(&key);
                }
            }
        }
    }

    fn index(&mut self, id: &str, record: &Value) {
        for (field, index) in self.unique.iter_mut() {
            if let Some(value) = record.get(field) {
                index.insert(index_key(value), id.to_string());
            }
        }
    }
}

/// 内存存储网关
#[derive(Default)]
pub struct MemoryGateway {
    tables: DashMap<String, Table>,
    seq: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

fn with_id(mut record: Value, id: &str) -> Result<Value> {
    let obj = record
        .as_object_mut()
        .ok_or_else(|| AppError::Serialization("Record must be a JSON object".to_string()))?;
    obj.insert("id".to_string(), Value::String(id.to_string()));
    Ok(record)
}

#[async_trait]
impl StorageGateway for MemoryGateway {
    async fn find_by_id(&self, table: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .tables
            .get(table)
            .and_then(|t| t.rows.get(id).map(|(_, v)| v.clone())))
    }

    async fn find_one_where(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>> {
        let Some(t) = self.tables.get(table) else {
            return Ok(None);
        };

        if let Some(index) = t.unique.get(field) {
            return Ok(index
                .get(&index_key(value))
                .and_then(|id| t.rows.get(id))
                .map(|(_, v)| v.clone()));
        }

        let mut matches: Vec<&(u64, Value)> = t
            .rows
            .values()
            .filter(|(_, v)| v.get(field) == Some(value))
            .collect();
        matches.sort_by_key(|(seq, _)| *seq);
        Ok(matches.first().map(|(_, v)| v.clone()))
    }

    async fn list(&self, table: &str, limit: usize, start: usize) -> Result<Vec<Value>> {
        let Some(t) = self.tables.get(table) else {
            return Ok(vec![]);
        };
        let mut rows: Vec<&(u64, Value)> = t.rows.values().collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows
            .into_iter()
            .skip(start)
            .take(limit)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn count(&self, table: &str) -> Result<u64> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.rows.len() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, id: &str, record: Value) -> Result<Value> {
        let record = with_id(record, id)?;
        let mut guard = self.tables.entry(table.to_string()).or_default();
        let t = &mut *guard;

        if t.rows.contains_key(id) {
            return Err(AppError::Conflict(format!(
                "{} record already exists: {}",
                table, id
            )));
        }
        t.check_unique(table, id, &record)?;

        t.index(id, &record);
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        t.rows.insert(id.to_string(), (seq, record.clone()));
        Ok(record)
    }

    async fn merge(&self, table: &str, id: &str, patch: Value) -> Result<Option<Value>> {
        let Value::Object(fields) = patch else {
            return Err(AppError::Serialization(
                "Patch must be a JSON object".to_string(),
            ));
        };
        let Some(mut guard) = self.tables.get_mut(table) else {
            return Ok(None);
        };
        let t = &mut *guard;

        let Some((seq, previous)) = t.rows.get(id).cloned() else {
            return Ok(None);
        };
        let mut record = previous.clone();
        if let Some(obj) = record.as_object_mut() {
            obj.extend(fields.into_iter().filter(|(k, _)| k != "id"));
        }
        t.check_unique(table, id, &record)?;

        t.unindex(id, &previous);
        t.index(id, &record);
        t.rows.insert(id.to_string(), (seq, record.clone()));
        Ok(Some(record))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<Option<Value>> {
        let Some(mut guard) = self.tables.get_mut(table) else {
            return Ok(None);
        };
        let t = &mut *guard;

        let Some((_, removed)) = t.rows.remove(id) else {
            return Ok(None);
        };
        t.unindex(id, &removed);
        Ok(Some(removed))
    }

    async fn ensure_unique(&self, table: &str, field: &str) -> Result<()> {
        let mut guard = self.tables.entry(table.to_string()).or_default();
        let t = &mut *guard;
        if t.unique.contains_key(field) {
            return Ok(());
        }

        let mut index = HashMap::new();
        for (id, (_, record)) in &t.rows {
            if let Some(value) = record.get(field) {
                if index.insert(index_key(value), id.clone()).is_some() {
                    return Err(AppError::Conflict(format!(
                        "Cannot create unique index on {}.{}: duplicate value {}",
                        table, field, value
                    )));
                }
            }
        }
        t.unique.insert(field.to_string(), index);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
