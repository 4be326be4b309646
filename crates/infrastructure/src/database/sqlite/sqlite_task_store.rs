use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use shift_core::ShiftResult;
use shift_domain::{TaskRecord, TaskStore};

/// SQLite任务状态存储，适用于嵌入式部署场景
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建嵌入式SQLite任务存储，自动初始化数据库
    pub async fn new_embedded(database_path: &str) -> ShiftResult<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("Creating embedded SQLite task store at: {}", database_path);

        // 创建连接选项，启用外键约束和WAL模式
        let connect_options = SqliteConnectOptions::from_str(database_path)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // 内存数据库必须复用单一连接，每个新连接都是一个独立的空库
        let max_connections = if database_path.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .connect_with(connect_options)
            .await?;

        Self::run_migrations(&pool).await?;

        debug!("Successfully created embedded SQLite task store");
        Ok(Self { pool })
    }

    /// 运行数据库迁移
    pub async fn run_migrations(pool: &SqlitePool) -> ShiftResult<()> {
        debug!("Running SQLite database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_id TEXT NOT NULL,
                entity_type TEXT NOT NULL DEFAULT 'resource',
                task_type TEXT NOT NULL,
                key TEXT NOT NULL,
                state TEXT NOT NULL,
                value TEXT,
                error TEXT,
                last_updated DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        let indexes = vec![
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_entity_key ON tasks(entity_id, task_type, key)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_state ON tasks(state)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_last_updated ON tasks(last_updated)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }

        debug!("Successfully completed SQLite database migrations");
        Ok(())
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> ShiftResult<TaskRecord> {
        // value/error 以JSON文本存储
        let value: Option<String> = row.try_get("value")?;
        let error: Option<String> = row.try_get("error")?;

        Ok(TaskRecord {
            id: row.try_get("id")?,
            entity_id: row.try_get("entity_id")?,
            entity_type: row.try_get("entity_type")?,
            task_type: row.try_get("task_type")?,
            key: row.try_get("key")?,
            state: row.try_get("state")?,
            value: value.as_deref().map(serde_json::from_str).transpose()?,
            error: error.as_deref().map(serde_json::from_str).transpose()?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    #[instrument(skip(self))]
    async fn find_task(
        &self,
        entity_id: &str,
        task_type: &str,
        key: &str,
    ) -> ShiftResult<Option<TaskRecord>> {
        let row = sqlx::query(
            "SELECT id, entity_id, entity_type, task_type, key, state, value, error, last_updated \
             FROM tasks WHERE entity_id = $1 AND task_type = $2 AND key = $3",
        )
        .bind(entity_id)
        .bind(task_type)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn get_task_by_id(&self, id: i64) -> ShiftResult<Option<TaskRecord>> {
        let row = sqlx::query(
            "SELECT id, entity_id, entity_type, task_type, key, state, value, error, last_updated \
             FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, task), fields(entity_id = %task.entity_id, state = %task.state))]
    async fn save_task(&self, task: &TaskRecord) -> ShiftResult<TaskRecord> {
        let value_json = task
            .value
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let error_json = task
            .error
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // 唯一键冲突时覆盖原记录，保留行ID
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (entity_id, entity_type, task_type, key, state, value, error, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (entity_id, task_type, key)
            DO UPDATE SET entity_type = excluded.entity_type, state = excluded.state,
                          value = excluded.value, error = excluded.error,
                          last_updated = excluded.last_updated
            RETURNING id, entity_id, entity_type, task_type, key, state, value, error, last_updated
            "#,
        )
        .bind(&task.entity_id)
        .bind(&task.entity_type)
        .bind(&task.task_type)
        .bind(&task.key)
        .bind(task.state.clone())
        .bind(value_json)
        .bind(error_json)
        .bind(task.last_updated)
        .fetch_one(&self.pool)
        .await?;

        let saved = Self::row_to_task(&row)?;
        debug!("任务记录已保存: {}", saved.entity_description());
        Ok(saved)
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: i64) -> ShiftResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> ShiftResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shift_domain::TaskState;

    async fn memory_store() -> SqliteTaskStore {
        SqliteTaskStore::new_embedded("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_find_round_trip() {
        let store = memory_store().await;

        let mut task = TaskRecord::new_submitting("res-1");
        task.value = Some(serde_json::json!({"job_id": "abc", "job_key": null}));

        let saved = store.save_task(&task).await.unwrap();
        assert!(saved.id > 0);

        let found = store
            .find_task("res-1", TaskRecord::TASK_TYPE_SHIFT, TaskRecord::KEY_SHIFT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, saved.id);
        assert_eq!(found.state, TaskState::Submitting);
        assert_eq!(
            found.value.unwrap()["job_id"],
            serde_json::Value::String("abc".to_string())
        );
        assert!(found.error.is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_row_identity() {
        let store = memory_store().await;

        let first = store
            .save_task(&TaskRecord::new_submitting("res-1"))
            .await
            .unwrap();

        let mut overwrite = TaskRecord::new_submitting("res-1");
        overwrite.state = TaskState::Pending;
        overwrite.last_updated = Utc::now();
        let second = store.save_task(&overwrite).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.state, TaskState::Pending);

        let by_id = store.get_task_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(by_id.state, TaskState::Pending);
    }

    #[tokio::test]
    async fn test_unknown_state_round_trips_verbatim() {
        let store = memory_store().await;

        let mut task = TaskRecord::new_submitting("res-1");
        task.state = TaskState::Other("resubmitting".to_string());
        store.save_task(&task).await.unwrap();

        let found = store
            .find_task("res-1", TaskRecord::TASK_TYPE_SHIFT, TaskRecord::KEY_SHIFT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.state, TaskState::Other("resubmitting".to_string()));
    }

    #[tokio::test]
    async fn test_find_missing_task_returns_none() {
        let store = memory_store().await;
        let found = store
            .find_task("nope", TaskRecord::TASK_TYPE_SHIFT, TaskRecord::KEY_SHIFT)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_task() {
        let store = memory_store().await;
        let saved = store
            .save_task(&TaskRecord::new_submitting("res-1"))
            .await
            .unwrap();

        assert!(store.delete_task(saved.id).await.unwrap());
        assert!(!store.delete_task(saved.id).await.unwrap());
        assert!(store.get_task_by_id(saved.id).await.unwrap().is_none());
    }
}
