use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use shift_core::{PlatformConfig, ShiftError, ShiftResult};
use shift_domain::{Dataset, PlatformDirectory, Resource};

/// 宿主平台HTTP客户端
///
/// 通过平台的action接口读取资源和数据集,并在作业完成后触发默认
/// 数据视图的创建。所有请求都携带服务自身的API密钥。
pub struct HttpPlatformClient {
    client: reqwest::Client,
    config: PlatformConfig,
}

impl HttpPlatformClient {
    pub fn new(config: PlatformConfig) -> ShiftResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ShiftError::Network(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self { client, config })
    }

    fn action_url(&self, action: &str) -> String {
        format!(
            "{}/api/3/action/{}",
            self.config.site_url.trim_end_matches('/'),
            action
        )
    }

    async fn post_action(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> ShiftResult<(reqwest::StatusCode, serde_json::Value)> {
        let url = self.action_url(action);
        debug!("调用平台接口: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ShiftError::Network(format!("请求平台接口 {action} 失败: {e}")))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ShiftError::platform_call(action, format!("响应不是合法JSON: {e}")))?;

        Ok((status, body))
    }

    /// 解开平台的响应信封,返回result字段
    fn unwrap_envelope(
        action: &str,
        status: reqwest::StatusCode,
        body: serde_json::Value,
    ) -> ShiftResult<serde_json::Value> {
        if body.get("success").and_then(|v| v.as_bool()) == Some(true) {
            return Ok(body
                .get("result")
                .cloned()
                .unwrap_or(serde_json::Value::Null));
        }

        let reason = body
            .get("error")
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("HTTP {status}"));
        Err(ShiftError::platform_call(action, reason))
    }
}

#[async_trait]
impl PlatformDirectory for HttpPlatformClient {
    #[instrument(skip(self))]
    async fn resource_show(&self, resource_id: &str) -> ShiftResult<Resource> {
        let (status, body) = self
            .post_action("resource_show", serde_json::json!({ "id": resource_id }))
            .await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ShiftError::resource_not_found(resource_id));
        }

        let result = Self::unwrap_envelope("resource_show", status, body)?;
        serde_json::from_value(result)
            .map_err(|e| ShiftError::platform_call("resource_show", format!("解析资源失败: {e}")))
    }

    #[instrument(skip(self))]
    async fn dataset_show(&self, dataset_id: &str) -> ShiftResult<Dataset> {
        let (status, body) = self
            .post_action("package_show", serde_json::json!({ "id": dataset_id }))
            .await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ShiftError::dataset_not_found(dataset_id));
        }

        let result = Self::unwrap_envelope("package_show", status, body)?;
        serde_json::from_value(result)
            .map_err(|e| ShiftError::platform_call("package_show", format!("解析数据集失败: {e}")))
    }

    #[instrument(skip(self, resource, dataset), fields(resource_id = %resource.id))]
    async fn create_default_views(
        &self,
        resource: &Resource,
        dataset: &Dataset,
    ) -> ShiftResult<()> {
        let payload = serde_json::json!({
            "resource": serde_json::to_value(resource)?,
            "package": serde_json::to_value(dataset)?,
            "create_datastore_views": true,
        });

        let (status, body) = self
            .post_action("resource_create_default_resource_views", payload)
            .await?;
        Self::unwrap_envelope("resource_create_default_resource_views", status, body)?;

        debug!("资源 {} 的默认视图已创建", resource.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(site_url: &str) -> HttpPlatformClient {
        HttpPlatformClient::new(PlatformConfig {
            site_url: site_url.to_string(),
            api_key: "key".to_string(),
            request_timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_action_url_strips_trailing_slash() {
        let client = test_client("https://ckan.example.org/");
        assert_eq!(
            client.action_url("resource_show"),
            "https://ckan.example.org/api/3/action/resource_show"
        );

        let client = test_client("https://ckan.example.org");
        assert_eq!(
            client.action_url("package_show"),
            "https://ckan.example.org/api/3/action/package_show"
        );
    }

    #[test]
    fn test_unwrap_envelope_returns_result() {
        let body = serde_json::json!({"success": true, "result": {"id": "res-1"}});
        let result =
            HttpPlatformClient::unwrap_envelope("resource_show", reqwest::StatusCode::OK, body)
                .unwrap();
        assert_eq!(result["id"], "res-1");
    }

    #[test]
    fn test_unwrap_envelope_maps_platform_error() {
        let body = serde_json::json!({"success": false, "error": {"message": "boom"}});
        let result =
            HttpPlatformClient::unwrap_envelope("resource_show", reqwest::StatusCode::CONFLICT, body);
        assert!(matches!(result, Err(ShiftError::PlatformCall { .. })));
    }

    #[test]
    fn test_unwrap_envelope_handles_missing_envelope() {
        let body = serde_json::json!({"unexpected": "shape"});
        let result = HttpPlatformClient::unwrap_envelope(
            "resource_show",
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body,
        );
        assert!(matches!(result, Err(ShiftError::PlatformCall { .. })));
    }
}
