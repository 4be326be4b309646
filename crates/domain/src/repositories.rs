//! 领域仓储抽象
//!
//! 定义任务状态持久化的抽象接口，遵循依赖倒置原则

use crate::entities::TaskRecord;
use async_trait::async_trait;
use shift_core::ShiftResult;

/// 任务状态存储抽象
///
/// 同一 (entity_id, task_type, key) 最多对应一条记录，save_task 为upsert语义
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_task(
        &self,
        entity_id: &str,
        task_type: &str,
        key: &str,
    ) -> ShiftResult<Option<TaskRecord>>;
    async fn get_task_by_id(&self, id: i64) -> ShiftResult<Option<TaskRecord>>;
    /// 按唯一键插入或覆盖，返回落库后的记录（含id）
    async fn save_task(&self, task: &TaskRecord) -> ShiftResult<TaskRecord>;
    async fn delete_task(&self, id: i64) -> ShiftResult<bool>;
    async fn health_check(&self) -> ShiftResult<()>;
}
