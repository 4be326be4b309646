//! 宿主平台访问抽象

use crate::entities::{CallerCredential, Capability, Dataset, Resource};
use async_trait::async_trait;
use shift_core::ShiftResult;

/// 宿主平台目录服务抽象
///
/// 资源与数据集归平台所有，这里只做只读查询；create_default_views
/// 通过平台接口触发默认数据视图的创建，本服务不直接修改资源
#[async_trait]
pub trait PlatformDirectory: Send + Sync {
    /// 资源不存在时返回 ShiftError::ResourceNotFound
    async fn resource_show(&self, resource_id: &str) -> ShiftResult<Resource>;
    async fn dataset_show(&self, dataset_id: &str) -> ShiftResult<Dataset>;
    async fn create_default_views(&self, resource: &Resource, dataset: &Dataset)
        -> ShiftResult<()>;
}

/// 动作层授权抽象
///
/// 校验失败时返回 ShiftError::AuthorizationDenied
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        credential: &CallerCredential,
        capability: Capability,
        resource_id: &str,
    ) -> ShiftResult<()>;
}

/// 基于调用方能力集的默认授权实现
pub struct CapabilityAuthorizer;

#[async_trait]
impl Authorizer for CapabilityAuthorizer {
    async fn authorize(
        &self,
        credential: &CallerCredential,
        capability: Capability,
        resource_id: &str,
    ) -> ShiftResult<()> {
        if credential.has_capability(capability) {
            Ok(())
        } else {
            Err(shift_core::ShiftError::authorization_denied(
                capability.as_str().to_string(),
                resource_id.to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_capability_authorizer_allows_holder() {
        let credential = CallerCredential::new(
            "alice",
            HashSet::from([Capability::SubmitIngest]),
        );
        let authorizer = CapabilityAuthorizer;
        assert!(authorizer
            .authorize(&credential, Capability::SubmitIngest, "res-1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_capability_authorizer_denies_missing_capability() {
        let credential = CallerCredential::new("mallory", HashSet::new());
        let authorizer = CapabilityAuthorizer;
        let result = authorizer
            .authorize(&credential, Capability::SubmitIngest, "res-1")
            .await;
        assert!(matches!(
            result,
            Err(shift_core::ShiftError::AuthorizationDenied { .. })
        ));
    }
}
