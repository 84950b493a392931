use async_trait::async_trait;
use serde_json::Value;
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};

use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::storage::gateway::StorageGateway;

/// SurrealDB 存储网关
#[derive(Clone)]
pub struct SurrealGateway {
    /// 数据库连接
    db: Surreal<Any>,
}

impl SurrealGateway {
    /// 建立连接
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        let db: Surreal<Any> = connect(&config.url).await?;

        // 认证
        db.signin(Root {
            username: &config.username,
            password: &config.password,
        })
        .await?;

        // 选择命名空间和数据库
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        tracing::info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connected to SurrealDB"
        );

        Ok(Self { db })
    }
}

/// 表名和字段名会拼进 DEFINE 语句，只允许标识符字符
fn ensure_ident(name: &str) -> Result<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid identifier: {}", name)))
    }
}

fn strip_id(mut record: Value) -> Value {
    if let Some(obj) = record.as_object_mut() {
        obj.remove("id");
    }
    record
}

fn map_write_err(e: surrealdb::Error) -> AppError {
    let message = e.to_string();
    if message.contains("already contains") || message.contains("already exists") {
        AppError::Conflict(message)
    } else {
        AppError::Database(message)
    }
}

const SELECT_FIELDS: &str = "SELECT *, meta::id(id) AS id";

#[async_trait]
impl StorageGateway for SurrealGateway {
    async fn find_by_id(&self, table: &str, id: &str) -> Result<Option<Value>> {
        let rows: Vec<Value> = self
            .db
            .query(format!("{SELECT_FIELDS} FROM type::thing($table, $id)"))
            .bind(("table", table.to_string()))
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn find_one_where(
        &self,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Value>> {
        let rows: Vec<Value> = self
            .db
            .query(format!(
                "{SELECT_FIELDS} FROM type::table($table) WHERE type::field($field) = $value LIMIT 1"
            ))
            .bind(("table", table.to_string()))
            .bind(("field", field.to_string()))
            .bind(("value", value.clone()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, table: &str, limit: usize, start: usize) -> Result<Vec<Value>> {
        let rows: Vec<Value> = self
            .db
            .query(format!(
                "{SELECT_FIELDS} FROM type::table($table) ORDER BY created_at ASC, id ASC LIMIT $limit START $start"
            ))
            .bind(("table", table.to_string()))
            .bind(("limit", limit))
            .bind(("start", start))
            .await?
            .take(0)?;
        Ok(rows)
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let result: Vec<Value> = self
            .db
            .query("SELECT count() FROM type::table($table) GROUP ALL")
            .bind(("table", table.to_string()))
            .await?
            .take(0)?;
        Ok(result
            .first()
            .and_then(|v| v.get("count"))
            .and_then(|c| c.as_u64())
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, id: &str, record: Value) -> Result<Value> {
        self.db
            .query("CREATE type::thing($table, $id) CONTENT $content RETURN NONE")
            .bind(("table", table.to_string()))
            .bind(("id", id.to_string()))
            .bind(("content", strip_id(record)))
            .await?
            .check()
            .map_err(map_write_err)?;

        self.find_by_id(table, id).await?.ok_or_else(|| {
            AppError::Database(format!("Failed to read back {} record: {}", table, id))
        })
    }

    async fn merge(&self, table: &str, id: &str, patch: Value) -> Result<Option<Value>> {
        if !patch.is_object() {
            return Err(AppError::Serialization(
                "Patch must be a JSON object".to_string(),
            ));
        }
        if self.find_by_id(table, id).await?.is_none() {
            return Ok(None);
        }

        self.db
            .query("UPDATE type::thing($table, $id) MERGE $patch RETURN NONE")
            .bind(("table", table.to_string()))
            .bind(("id", id.to_string()))
            .bind(("patch", strip_id(patch)))
            .await?
            .check()
            .map_err(map_write_err)?;

        self.find_by_id(table, id).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<Option<Value>> {
        let Some(existing) = self.find_by_id(table, id).await? else {
            return Ok(None);
        };

        self.db
            .query("DELETE type::thing($table, $id)")
            .bind(("table", table.to_string()))
            .bind(("id", id.to_string()))
            .await?
            .check()?;

        Ok(Some(existing))
    }

    async fn ensure_unique(&self, table: &str, field: &str) -> Result<()> {
        ensure_ident(table)?;
        ensure_ident(field)?;

        self.db
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS {table}_{field}_unique ON TABLE {table} FIELDS {field} UNIQUE"
            ))
            .await?
            .check()?;

        tracing::debug!(table, field, "Unique index ensured");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }
}
