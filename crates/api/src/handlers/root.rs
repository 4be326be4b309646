use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: String,
    pub endpoints: ActionEndpoints,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionEndpoints {
    pub shift_submit: String,
    pub shift_hook: String,
    pub health: String,
}

/// 根路径处理器，返回服务信息和可用端点
pub async fn root_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "shift".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "数据资源入库任务编排服务".to_string(),
        status: "running".to_string(),
        endpoints: ActionEndpoints {
            shift_submit: "/api/3/action/shift_submit".to_string(),
            shift_hook: "/api/3/action/shift_hook".to_string(),
            health: "/health".to_string(),
        },
        timestamp: chrono::Utc::now(),
    })
}
