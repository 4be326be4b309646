//! 队列载荷信封
//!
//! 三种队列后端使用同一种JSON载荷格式,作业ID由本服务在入队时生成,
//! 工作进程回调 shift_hook 时原样携带元数据。

use serde::{Deserialize, Serialize};
use shift_domain::JobRequest;

/// 入队作业的统一载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: String,
    #[serde(flatten)]
    pub request: JobRequest,
}

impl JobEnvelope {
    pub fn new(request: &JobRequest) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            request: request.clone(),
        }
    }
}
