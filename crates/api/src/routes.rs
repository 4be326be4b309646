use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use shift_actions::ShiftService;
use shift_domain::{JobQueue, TaskStore};

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers::{
    actions::{shift_hook, shift_submit},
    health::health_check,
    root::root_handler,
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub shift_service: Arc<ShiftService>,
    pub task_store: Arc<dyn TaskStore>,
    pub job_queue: Arc<dyn JobQueue>,
    pub auth_config: Arc<AuthConfig>,
}

/// 创建API路由
///
/// 动作端点沿用宿主平台的action路径约定，外部工作进程的回调地址
/// 因此无需改动。根路径和健康检查不要求密钥，供编排器探活。
pub fn create_routes(state: AppState) -> Router {
    let actions = Router::new()
        .route("/api/3/action/shift_submit", post(shift_submit))
        .route("/api/3/action/shift_hook", post(shift_hook))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .merge(actions)
        .with_state(state)
}
