use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

/// GET /health
///
/// 存活探针，同时上报任务存储和作业队列的连通性。
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let store_status = match state.task_store.health_check().await {
        Ok(()) => "ok",
        Err(_) => "unavailable",
    };
    let queue_status = match state.job_queue.health_check().await {
        Ok(()) => "ok",
        Err(_) => "unavailable",
    };

    let status = if store_status == "ok" && queue_status == "ok" {
        "ok"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "components": {
            "task_store": store_status,
            "job_queue": queue_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "shift",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
