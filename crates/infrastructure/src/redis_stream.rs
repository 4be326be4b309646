use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use shift_core::{ShiftError, ShiftResult};
use shift_domain::{JobQueue, JobRef, JobRequest};

use crate::envelope::JobEnvelope;

/// Redis Stream作业队列实现
///
/// 每个队列对应一个stream,作业以XADD追加,工作进程通过消费组读取。
pub struct RedisStreamJobQueue {
    manager: ConnectionManager,
    url: String,
}

impl RedisStreamJobQueue {
    /// 创建新的Redis Stream作业队列实例
    pub async fn new(url: &str) -> ShiftResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| ShiftError::MessageQueue(format!("创建Redis客户端失败: {e}")))?;

        // ConnectionManager自动处理断线重连
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("连接Redis失败: {e}")))?;

        let queue = Self {
            manager,
            url: url.to_string(),
        };
        queue.ping().await?;

        info!("成功连接到Redis: {}", queue.url);
        Ok(queue)
    }

    async fn ping(&self) -> ShiftResult<()> {
        let mut conn = self.manager.clone();
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("Redis PING失败: {e}")))?;
        if response != "PONG" {
            return Err(ShiftError::MessageQueue(format!(
                "Redis PING返回异常: {response}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisStreamJobQueue {
    async fn enqueue_job(&self, queue: &str, job: &JobRequest) -> ShiftResult<JobRef> {
        let envelope = JobEnvelope::new(job);
        let payload = serde_json::to_string(&envelope)?;

        let mut conn = self.manager.clone();
        let entry_id: String = redis::cmd("XADD")
            .arg(queue)
            .arg("*")
            .arg("job_id")
            .arg(&envelope.job_id)
            .arg("payload")
            .arg(&payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("写入流 {queue} 失败: {e}")))?;

        debug!(
            "作业 {} 已写入Redis流 {} (entry: {})",
            envelope.job_id, queue, entry_id
        );
        Ok(JobRef::new(envelope.job_id))
    }

    async fn queue_depth(&self, queue: &str) -> ShiftResult<u32> {
        let mut conn = self.manager.clone();
        // XLEN对不存在的流返回0
        let depth: i64 = redis::cmd("XLEN")
            .arg(queue)
            .query_async(&mut conn)
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("获取流 {queue} 长度失败: {e}")))?;
        Ok(depth as u32)
    }

    async fn health_check(&self) -> ShiftResult<()> {
        self.ping().await
    }
}
