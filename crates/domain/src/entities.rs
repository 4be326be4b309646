use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shift_core::ShiftResult;
use std::collections::HashSet;

/// 入库任务状态记录，按 (entity_id, task_type, key) 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: i64,
    pub entity_id: String,
    pub entity_type: String, // 固定为 "resource"
    pub task_type: String,   // 固定为 "shift"
    pub key: String,         // 固定为 "shift"
    pub state: TaskState,
    /// 作业引用，形如 {"job_id": "...", "job_key": null}
    pub value: Option<serde_json::Value>,
    /// 错误信息，形如 {"message": "..."}
    pub error: Option<serde_json::Value>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Submitting,
    Pending,
    Complete,
    Error,
    /// 工作进程上报的其他状态字符串原样保留
    Other(String),
}

impl TaskState {
    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Submitting => "submitting",
            TaskState::Pending => "pending",
            TaskState::Complete => "complete",
            TaskState::Error => "error",
            TaskState::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for TaskState {
    fn from(s: &str) -> Self {
        match s {
            "submitting" => TaskState::Submitting,
            "pending" => TaskState::Pending,
            "complete" => TaskState::Complete,
            "error" => TaskState::Error,
            other => TaskState::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TaskState::from(s.as_str()))
    }
}

impl sqlx::Type<sqlx::Postgres> for TaskState {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl sqlx::Type<sqlx::Sqlite> for TaskState {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <str as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for TaskState {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(TaskState::from(s))
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskState {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(TaskState::from(s))
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for TaskState {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskState {
    fn encode_by_ref(
        &self,
        args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <String as sqlx::Encode<sqlx::Sqlite>>::encode(self.as_str().to_string(), args)
    }
}

impl TaskRecord {
    pub const ENTITY_TYPE_RESOURCE: &'static str = "resource";
    pub const TASK_TYPE_SHIFT: &'static str = "shift";
    pub const KEY_SHIFT: &'static str = "shift";

    /// 为资源创建一条处于 submitting 状态的新任务记录
    pub fn new_submitting(resource_id: &str) -> Self {
        Self {
            id: 0, // 将由数据库生成
            entity_id: resource_id.to_string(),
            entity_type: Self::ENTITY_TYPE_RESOURCE.to_string(),
            task_type: Self::TASK_TYPE_SHIFT.to_string(),
            key: Self::KEY_SHIFT.to_string(),
            state: TaskState::Submitting,
            value: None,
            error: None,
            last_updated: Utc::now(),
        }
    }
    pub fn is_pending(&self) -> bool {
        matches!(self.state, TaskState::Pending)
    }
    /// 距上次更新经过的秒数
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_seconds()
    }
    pub fn set_job_ref(&mut self, job_ref: &JobRef) -> ShiftResult<()> {
        self.value = Some(serde_json::to_value(job_ref)?);
        Ok(())
    }
    pub fn job_ref(&self) -> Option<JobRef> {
        self.value
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
    pub fn entity_description(&self) -> String {
        format!(
            "入库任务 (资源: {}, 状态: {})",
            self.entity_id, self.state
        )
    }
}

/// 投递给外部工作进程的作业请求，入队后所有权移交队列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub api_key: String,
    pub job_type: String,
    /// 作业完成后回调的 shift_hook 地址
    pub result_url: String,
    pub metadata: JobMetadata,
}

impl JobRequest {
    pub const JOB_TYPE_PUSH_TO_DATASTORE: &'static str = "push_to_datastore";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub resource_id: String,
    pub site_url: String,
    pub ignore_hash: bool,
    pub set_url_type: bool,
    /// 任务创建时间，朴素时间戳格式（见 time 模块）
    pub task_created: String,
    /// 提交时资源的URL，用于完成后检测URL变更
    pub original_url: String,
}

/// 队列返回的作业引用，仅用于记账
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRef {
    pub job_id: String,
    pub job_key: Option<String>,
}

impl JobRef {
    pub fn new<S: Into<String>>(job_id: S) -> Self {
        Self {
            job_id: job_id.into(),
            job_key: None,
        }
    }
}

/// 平台资源，只读输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub package_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// 平台数据集（资源的父级），只读输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// 动作层的能力标识，shift_submit 与 shift_hook 校验同一能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    SubmitIngest,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SubmitIngest => "ingest_submit",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 经过认证的调用方身份，由API层构造后传入动作层
#[derive(Debug, Clone)]
pub struct CallerCredential {
    pub user_id: String,
    pub capabilities: HashSet<Capability>,
}

impl CallerCredential {
    pub fn new<S, C>(user_id: S, capabilities: C) -> Self
    where
        S: Into<String>,
        C: IntoIterator<Item = Capability>,
    {
        Self {
            user_id: user_id.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
