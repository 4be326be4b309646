//! shift_submit / shift_hook 动作端点
//!
//! 处理器只做协议转换:结构校验、权限检查、强类型化，然后把请求
//! 交给动作层服务，结果包进统一的响应信封。

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use shift_actions::{HookRequest, SubmitRequest};

use crate::auth::{AuthenticatedUser, Permission};
use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::AppState;
use crate::validation;

/// POST /api/3/action/shift_submit
///
/// 返回 `{"submitted": bool}`，false表示本次提交被正常跳过
/// （资源不存在、扩展否决或已有进行中的任务）。
pub async fn shift_submit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SubmitRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_permission(Permission::IngestSubmit)?;
    validation::validate_submit_request(&payload)?;

    let resource_id = payload.resource_id.clone();
    let credential = user.to_credential();
    let submitted = state.shift_service.submit(&credential, payload).await?;

    info!(
        "shift_submit 处理完成: resource_id={}, submitted={}",
        resource_id, submitted
    );
    Ok(ApiResponse::success(json!({ "submitted": submitted })))
}

/// POST /api/3/action/shift_hook
///
/// 作业执行方的状态回调，返回 `{"state": ..., "resubmitted": bool}`。
pub async fn shift_hook(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<HookRequest>,
) -> ApiResult<impl IntoResponse> {
    user.require_permission(Permission::IngestSubmit)?;
    validation::validate_hook_request(&payload)?;

    let resource_id = payload.metadata.resource_id.clone();
    let credential = user.to_credential();
    let outcome = state.shift_service.handle_hook(&credential, payload).await?;

    info!(
        "shift_hook 处理完成: resource_id={}, state={}, resubmitted={}",
        resource_id, outcome.state, outcome.resubmitted
    );
    Ok(ApiResponse::success(json!({
        "state": outcome.state,
        "resubmitted": outcome.resubmitted,
    })))
}
