//! 作业队列抽象

use crate::entities::{JobRef, JobRequest};
use async_trait::async_trait;
use shift_core::ShiftResult;

/// 外部作业队列抽象
///
/// enqueue_job 成功即表示作业所有权移交队列，返回的JobRef仅用于记账，
/// 本服务不会轮询作业进度
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_job(&self, queue: &str, job: &JobRequest) -> ShiftResult<JobRef>;
    async fn queue_depth(&self, queue: &str) -> ShiftResult<u32>;
    async fn health_check(&self) -> ShiftResult<()>;
}
