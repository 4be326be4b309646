use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shift_core::ShiftError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("入库服务错误: {0}")]
    Shift(#[from] ShiftError),

    #[error("验证错误: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("验证错误: {0}")]
    ValidationError(#[from] validator::ValidationError),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("认证错误: {0}")]
    Authentication(#[from] crate::auth::AuthError),

    #[error("权限不足")]
    Forbidden,

    #[error("未找到资源")]
    NotFound,

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Shift(ShiftError::TaskNotFound { resource_id }) => (
                StatusCode::NOT_FOUND,
                format!("资源 {resource_id} 没有对应的入库任务记录"),
                "TASK_NOT_FOUND".to_string(),
                vec![
                    "回调必须对应一次已有的提交".to_string(),
                    "请先调用 POST /api/3/action/shift_submit".to_string(),
                ],
            ),
            ApiError::Shift(ShiftError::ResourceNotFound { resource_id }) => (
                StatusCode::NOT_FOUND,
                format!("资源 {resource_id} 不存在"),
                "RESOURCE_NOT_FOUND".to_string(),
                vec!["请检查资源ID是否正确".to_string()],
            ),
            ApiError::Shift(ShiftError::DatasetNotFound { dataset_id }) => (
                StatusCode::NOT_FOUND,
                format!("数据集 {dataset_id} 不存在"),
                "DATASET_NOT_FOUND".to_string(),
                vec!["请检查数据集ID是否正确".to_string()],
            ),
            ApiError::Shift(ShiftError::MissingParameter { name }) => (
                StatusCode::BAD_REQUEST,
                format!("缺少必需参数: {name}"),
                "MISSING_PARAMETER".to_string(),
                vec!["请补全请求体中的必需字段".to_string()],
            ),
            ApiError::Shift(ShiftError::ValidationError(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("数据验证失败: {msg}"),
                "VALIDATION_ERROR".to_string(),
                vec!["请检查请求参数是否符合要求".to_string()],
            ),
            ApiError::Shift(ShiftError::AuthorizationDenied {
                capability,
                resource_id,
            }) => (
                StatusCode::FORBIDDEN,
                format!("资源 {resource_id} 的 {capability} 操作被拒绝"),
                "AUTHORIZATION_DENIED".to_string(),
                vec!["当前API密钥没有提交入库任务的权限".to_string()],
            ),
            ApiError::Shift(ShiftError::MessageQueue(msg)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("作业入队失败: {msg}"),
                "ENQUEUE_FAILED".to_string(),
                vec![
                    "任务已被置为error状态，可以直接重新提交".to_string(),
                    "如果问题持续存在，请检查作业队列连接".to_string(),
                ],
            ),
            ApiError::Shift(ShiftError::PlatformCall { action, reason }) => (
                StatusCode::BAD_GATEWAY,
                format!("平台接口 {action} 调用失败: {reason}"),
                "PLATFORM_CALL_FAILED".to_string(),
                vec!["宿主平台暂时不可用，请稍后重试".to_string()],
            ),
            ApiError::Validation(errors) => {
                let error_details: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .map(|(field, errors)| {
                        let messages: Vec<String> = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .unwrap_or(&std::borrow::Cow::Borrowed("验证失败"))
                                    .to_string()
                            })
                            .collect();
                        format!("{}: {}", field, messages.join(", "))
                    })
                    .collect();

                (
                    StatusCode::BAD_REQUEST,
                    format!("请求参数验证失败: {}", error_details.join("; ")),
                    "VALIDATION_ERROR".to_string(),
                    vec!["请检查请求参数是否符合要求".to_string()],
                )
            }
            ApiError::ValidationError(error) => (
                StatusCode::BAD_REQUEST,
                format!(
                    "参数验证失败: {}",
                    error
                        .message
                        .as_ref()
                        .unwrap_or(&std::borrow::Cow::Borrowed("验证失败"))
                ),
                "VALIDATION_ERROR".to_string(),
                vec!["请检查请求参数格式".to_string()],
            ),
            ApiError::Serialization(err) => (
                StatusCode::BAD_REQUEST,
                "请求数据格式错误".to_string(),
                "SERIALIZATION_ERROR".to_string(),
                vec![
                    "请检查JSON格式是否正确".to_string(),
                    format!("详细错误: {err}"),
                ],
            ),
            ApiError::Authentication(auth_error) => {
                let (msg, suggestions) = match auth_error {
                    crate::auth::AuthError::MissingApiKey => (
                        "缺少API密钥".to_string(),
                        vec![format!(
                            "请在请求头中添加 {}: <key>",
                            crate::auth::API_KEY_HEADER
                        )],
                    ),
                    crate::auth::AuthError::InvalidApiKey => (
                        "API密钥无效".to_string(),
                        vec!["请检查密钥是否正确或已被停用".to_string()],
                    ),
                    crate::auth::AuthError::InsufficientPermissions => (
                        "权限不足".to_string(),
                        vec!["请联系管理员获取相应权限".to_string()],
                    ),
                };
                let status = match auth_error {
                    crate::auth::AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
                    _ => StatusCode::UNAUTHORIZED,
                };
                (status, msg, "AUTHENTICATION_ERROR".to_string(), suggestions)
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "权限不足".to_string(),
                "FORBIDDEN".to_string(),
                vec!["您没有执行此操作的权限".to_string()],
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND".to_string(),
                vec![
                    "请检查请求URL是否正确".to_string(),
                    "访问 GET / 查看可用的API端点".to_string(),
                ],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {msg}"),
                "BAD_REQUEST".to_string(),
                vec![
                    "请检查请求格式和参数".to_string(),
                    "确保Content-Type正确设置".to_string(),
                ],
            ),
            ApiError::Shift(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.user_message().to_string(),
                "INTERNAL_ERROR".to_string(),
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    "查看 GET /health 检查系统状态".to_string(),
                ],
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR".to_string(),
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    format!("错误详情: {msg}"),
                ],
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
