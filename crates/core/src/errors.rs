use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShiftError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("任务记录未找到: 资源 {resource_id}")]
    TaskNotFound { resource_id: String },
    #[error("资源未找到: {resource_id}")]
    ResourceNotFound { resource_id: String },
    #[error("数据集未找到: {dataset_id}")]
    DatasetNotFound { dataset_id: String },
    #[error("缺少必需参数: {name}")]
    MissingParameter { name: String },
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("权限不足: 资源 {resource_id} 的 {capability} 操作被拒绝")]
    AuthorizationDenied {
        capability: String,
        resource_id: String,
    },
    #[error("消息队列错误: {0}")]
    MessageQueue(String),
    #[error("平台接口调用失败: {action} - {reason}")]
    PlatformCall { action: String, reason: String },
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("网络错误: {0}")]
    Network(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type ShiftResult<T> = Result<T, ShiftError>;

impl ShiftError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn task_not_found<S: Into<String>>(resource_id: S) -> Self {
        Self::TaskNotFound {
            resource_id: resource_id.into(),
        }
    }
    pub fn resource_not_found<S: Into<String>>(resource_id: S) -> Self {
        Self::ResourceNotFound {
            resource_id: resource_id.into(),
        }
    }
    pub fn dataset_not_found<S: Into<String>>(dataset_id: S) -> Self {
        Self::DatasetNotFound {
            dataset_id: dataset_id.into(),
        }
    }
    pub fn missing_parameter<S: Into<String>>(name: S) -> Self {
        Self::MissingParameter { name: name.into() }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn authorization_denied<S: Into<String>>(capability: S, resource_id: S) -> Self {
        Self::AuthorizationDenied {
            capability: capability.into(),
            resource_id: resource_id.into(),
        }
    }
    pub fn queue_error<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }
    pub fn platform_call<A: Into<String>, R: Into<String>>(action: A, reason: R) -> Self {
        Self::PlatformCall {
            action: action.into(),
            reason: reason.into(),
        }
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    /// 面向API调用方的提示语，不暴露内部细节
    pub fn user_message(&self) -> &str {
        match self {
            ShiftError::TaskNotFound { .. } => "该资源没有对应的入库任务记录",
            ShiftError::ResourceNotFound { .. } => "请求的资源不存在",
            ShiftError::DatasetNotFound { .. } => "请求的数据集不存在",
            ShiftError::MissingParameter { .. } => "请求缺少必需参数",
            ShiftError::ValidationError(_) => "输入数据验证失败",
            ShiftError::AuthorizationDenied { .. } => "您没有执行此操作的权限",
            ShiftError::MessageQueue(_) => "任务入队失败，请稍后重试",
            ShiftError::PlatformCall { .. } => "平台接口暂时不可用，请稍后重试",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for ShiftError {
    fn from(err: serde_json::Error) -> Self {
        ShiftError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for ShiftError {
    fn from(err: anyhow::Error) -> Self {
        ShiftError::Internal(err.to_string())
    }
}
