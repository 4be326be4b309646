//! # Shift API
//!
//! 入库编排服务的HTTP接口层，基于Axum构建。只暴露两个动作端点和
//! 基础运维端点:
//!
//! - `POST /api/3/action/shift_submit` - 提交资源进入入库流水线
//! - `POST /api/3/action/shift_hook` - 作业执行方的状态回调
//! - `GET /health` - 健康检查（含任务存储与作业队列连通性）
//! - `GET /` - 服务信息
//!
//! 业务规则全部在 shift-actions 中，这一层只负责协议转换:
//! 结构校验（validation）、API密钥认证（auth）、错误到HTTP状态码
//! 的映射（error）和统一响应信封（response）。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use shift_api::create_app;
//!
//! let app = create_app(shift_service, task_store, job_queue, &config.api);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! ```bash
//! # 提交资源
//! curl -X POST http://localhost:8080/api/3/action/shift_submit \
//!   -H "Content-Type: application/json" \
//!   -H "X-API-Key: <key>" \
//!   -d '{"resource_id": "6f54b1c0-aa11-4b52-9642-0de64fe5b87a"}'
//!
//! # 作业回调（由外部工作进程发起）
//! curl -X POST http://localhost:8080/api/3/action/shift_hook \
//!   -H "Content-Type: application/json" \
//!   -H "X-API-Key: <key>" \
//!   -d '{"metadata": {"resource_id": "..."}, "status": "complete"}'
//! ```

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod validation;

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;

use shift_actions::ShiftService;
use shift_domain::{JobQueue, TaskStore};

use auth::AuthConfig;
use middleware::{cors_layer, request_logging, trace_layer};
use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(
    shift_service: Arc<ShiftService>,
    task_store: Arc<dyn TaskStore>,
    job_queue: Arc<dyn JobQueue>,
    api_config: &shift_core::ApiConfig,
) -> Router {
    let state = AppState {
        shift_service,
        task_store,
        job_queue,
        auth_config: Arc::new(AuthConfig::from_settings(&api_config.auth)),
    };

    create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
