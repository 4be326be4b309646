use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use shift_core::ShiftResult;
use shift_domain::{JobQueue, JobRef, JobRequest};

use crate::envelope::JobEnvelope;

/// 内存作业队列实现
///
/// 作业只在进程内排队,适用于嵌入式部署和测试场景。
/// 进程重启后队列内容丢失,生产环境应使用RabbitMQ或Redis Stream。
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    /// 队列存储:队列名 -> 排队中的作业
    queues: Arc<RwLock<HashMap<String, Vec<JobEnvelope>>>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        info!("Creating in-memory job queue");
        Self::default()
    }

    /// 取出并清空指定队列的全部作业,供嵌入式工作进程消费
    pub async fn drain(&self, queue: &str) -> Vec<JobEnvelope> {
        let mut queues = self.queues.write().await;
        queues.remove(queue).unwrap_or_default()
    }

    /// 查看指定队列当前的作业,不移除
    pub async fn jobs(&self, queue: &str) -> Vec<JobEnvelope> {
        let queues = self.queues.read().await;
        queues.get(queue).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue_job(&self, queue: &str, job: &JobRequest) -> ShiftResult<JobRef> {
        let envelope = JobEnvelope::new(job);
        let job_id = envelope.job_id.clone();

        let mut queues = self.queues.write().await;
        queues.entry(queue.to_string()).or_default().push(envelope);

        debug!("作业 {} 已进入内存队列 {}", job_id, queue);
        Ok(JobRef::new(job_id))
    }

    async fn queue_depth(&self, queue: &str) -> ShiftResult<u32> {
        let queues = self.queues.read().await;
        Ok(queues.get(queue).map(|q| q.len()).unwrap_or(0) as u32)
    }

    async fn health_check(&self) -> ShiftResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shift_domain::JobMetadata;

    fn test_job() -> JobRequest {
        JobRequest {
            api_key: "key".to_string(),
            job_type: JobRequest::JOB_TYPE_PUSH_TO_DATASTORE.to_string(),
            result_url: "https://ckan.example.org/api/3/action/shift_hook".to_string(),
            metadata: JobMetadata {
                resource_id: "res-1".to_string(),
                site_url: "https://ckan.example.org".to_string(),
                ignore_hash: false,
                set_url_type: false,
                task_created: "2024-05-01T12:00:00.000000".to_string(),
                original_url: "https://files.example.org/data.csv".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_depth() {
        let queue = InMemoryJobQueue::new();

        let job_ref = queue.enqueue_job("shift", &test_job()).await.unwrap();
        assert!(!job_ref.job_id.is_empty());
        assert!(job_ref.job_key.is_none());

        assert_eq!(queue.queue_depth("shift").await.unwrap(), 1);
        // 其他队列不受影响
        assert_eq!(queue.queue_depth("other").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drain_empties_queue() {
        let queue = InMemoryJobQueue::new();
        queue.enqueue_job("shift", &test_job()).await.unwrap();
        queue.enqueue_job("shift", &test_job()).await.unwrap();

        let drained = queue.drain("shift").await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].request.metadata.resource_id, "res-1");
        assert_eq!(queue.queue_depth("shift").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_job_ids_are_unique() {
        let queue = InMemoryJobQueue::new();
        let a = queue.enqueue_job("shift", &test_job()).await.unwrap();
        let b = queue.enqueue_job("shift", &test_job()).await.unwrap();
        assert_ne!(a.job_id, b.job_id);
    }
}
