use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use shift_core::ShiftResult;
use shift_domain::{TaskRecord, TaskStore};

/// PostgreSQL任务状态存储，适用于多实例部署场景
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 运行数据库迁移
    pub async fn run_migrations(pool: &PgPool) -> ShiftResult<()> {
        debug!("Running PostgreSQL database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id BIGSERIAL PRIMARY KEY,
                entity_id VARCHAR(255) NOT NULL,
                entity_type VARCHAR(50) NOT NULL DEFAULT 'resource',
                task_type VARCHAR(50) NOT NULL,
                key VARCHAR(50) NOT NULL,
                state VARCHAR(50) NOT NULL,
                value JSONB,
                error JSONB,
                last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
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

        debug!("Successfully completed PostgreSQL database migrations");
        Ok(())
    }

    fn row_to_task(row: &sqlx::postgres::PgRow) -> ShiftResult<TaskRecord> {
        Ok(TaskRecord {
            id: row.try_get("id")?,
            entity_id: row.try_get("entity_id")?,
            entity_type: row.try_get("entity_type")?,
            task_type: row.try_get("task_type")?,
            key: row.try_get("key")?,
            state: row.try_get("state")?,
            value: row.try_get("value")?,
            error: row.try_get("error")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
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
        // 唯一键冲突时覆盖原记录，保留行ID
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (entity_id, entity_type, task_type, key, state, value, error, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (entity_id, task_type, key)
            DO UPDATE SET entity_type = EXCLUDED.entity_type, state = EXCLUDED.state,
                          value = EXCLUDED.value, error = EXCLUDED.error,
                          last_updated = EXCLUDED.last_updated
            RETURNING id, entity_id, entity_type, task_type, key, state, value, error, last_updated
            "#,
        )
        .bind(&task.entity_id)
        .bind(&task.entity_type)
        .bind(&task.task_type)
        .bind(&task.key)
        .bind(task.state.clone())
        .bind(&task.value)
        .bind(&task.error)
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
