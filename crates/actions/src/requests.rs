//! 动作请求与结果模型
//!
//! shift_submit 与 shift_hook 的入参在 API 层完成结构校验后,
//! 以这里的强类型形式进入服务层。

use serde::{Deserialize, Serialize};
use shift_domain::TaskState;

/// shift_submit 的入参
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// 目标资源ID
    pub resource_id: String,
    /// 作业完成后是否将资源的url_type改写为datapusher
    #[serde(default)]
    pub set_url_type: bool,
    /// 是否跳过内容哈希比对强制重新入库
    #[serde(default)]
    pub ignore_hash: bool,
}

impl SubmitRequest {
    pub fn new<S: Into<String>>(resource_id: S) -> Self {
        Self {
            resource_id: resource_id.into(),
            set_url_type: false,
            ignore_hash: false,
        }
    }
}

/// shift_hook 的入参
///
/// 由作业执行方在状态变化时回调,metadata 原样携带提交时下发的元数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookRequest {
    pub metadata: HookMetadata,
    /// 作业执行方上报的状态字符串,未知值原样落库
    pub status: String,
}

/// 回调携带的作业元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookMetadata {
    pub resource_id: String,
    /// 提交时刻的线上时间戳,用于与资源的last_modified比较
    #[serde(default)]
    pub task_created: Option<String>,
    /// 提交时资源的源URL,用于检测作业期间的URL变更
    #[serde(default)]
    pub original_url: Option<String>,
}

/// shift_hook 的处理结果
#[derive(Debug, Clone, Serialize)]
pub struct HookOutcome {
    /// 本次回调后任务的最终状态
    pub state: TaskState,
    /// 是否因源数据变化触发了重新提交
    pub resubmitted: bool,
}
