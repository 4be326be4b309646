use async_trait::async_trait;
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    Queue,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use shift_core::{JobQueueConfig, ShiftError, ShiftResult};
use shift_domain::{JobQueue, JobRef, JobRequest};

use crate::envelope::JobEnvelope;

/// RabbitMQ作业队列实现
pub struct RabbitJobQueue {
    connection: Connection,
    channel: Arc<Mutex<Channel>>,
    config: JobQueueConfig,
}

impl RabbitJobQueue {
    /// 创建新的RabbitMQ作业队列实例
    pub async fn new(config: JobQueueConfig) -> ShiftResult<Self> {
        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("连接RabbitMQ失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("创建通道失败: {e}")))?;

        info!("成功连接到RabbitMQ: {}", config.url);

        Ok(Self {
            connection,
            channel: Arc::new(Mutex::new(channel)),
            config,
        })
    }

    /// 声明队列
    async fn declare_queue(
        &self,
        channel: &Channel,
        queue_name: &str,
        durable: bool,
    ) -> ShiftResult<Queue> {
        let queue = channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("声明队列 {queue_name} 失败: {e}")))?;

        debug!("队列 {} 声明成功", queue_name);
        Ok(queue)
    }

    /// 获取连接状态
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// 关闭连接
    pub async fn close(&self) -> ShiftResult<()> {
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RabbitJobQueue {
    /// 作业入队,持久化投递并等待broker确认
    async fn enqueue_job(&self, queue: &str, job: &JobRequest) -> ShiftResult<JobRef> {
        let channel = self.channel.lock().await;

        // 队列声明是幂等的,保证首个作业入队前队列存在
        self.declare_queue(&channel, queue, true).await?;

        let envelope = JobEnvelope::new(job);
        let payload = serde_json::to_vec(&envelope)?;

        let confirm = channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2), // 2 = persistent
            )
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("发布作业到队列 {queue} 失败: {e}")))?;

        confirm
            .await
            .map_err(|e| ShiftError::MessageQueue(format!("作业发布确认失败: {e}")))?;

        debug!("作业 {} 已发布到队列: {}", envelope.job_id, queue);
        Ok(JobRef::new(envelope.job_id))
    }

    /// 获取队列中的作业数量
    async fn queue_depth(&self, queue: &str) -> ShiftResult<u32> {
        let channel = self.channel.lock().await;
        let queue_info = channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await;

        match queue_info {
            Ok(info) => Ok(info.message_count()),
            Err(e) => {
                // 队列不存在时返回0而不是错误
                let error_msg = e.to_string();
                if error_msg.contains("NOT_FOUND") || error_msg.contains("404") {
                    debug!("队列 {} 不存在，返回大小为0", queue);
                    Ok(0)
                } else {
                    Err(ShiftError::MessageQueue(format!(
                        "获取队列 {queue} 信息失败: {e}"
                    )))
                }
            }
        }
    }

    async fn health_check(&self) -> ShiftResult<()> {
        if !self.is_connected() {
            return Err(ShiftError::MessageQueue(format!(
                "RabbitMQ连接已断开: {}",
                self.config.url
            )));
        }
        Ok(())
    }
}
