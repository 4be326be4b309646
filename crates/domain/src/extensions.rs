//! 入库扩展点
//!
//! 宿主平台插件体系在本服务中的对应物：实现 ShiftExtension 的对象
//! 注册到 ExtensionRegistry，按注册顺序被征询/通知

use crate::entities::{Dataset, Resource};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ShiftExtension: Send + Sync {
    fn name(&self) -> &str;
    /// 提交前征询，返回false即否决本次提交（否决不是错误）
    async fn can_upload(&self, resource_id: &str) -> bool;
    /// 作业完成后通知，返回值不被采纳
    async fn after_upload(&self, resource: &Resource, dataset: &Dataset);
}

/// 扩展注册表，迭代顺序即注册顺序
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn ShiftExtension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn register(&mut self, extension: Arc<dyn ShiftExtension>) {
        self.extensions.push(extension);
    }
    pub fn extensions(&self) -> &[Arc<dyn ShiftExtension>] {
        &self.extensions
    }
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
    pub fn len(&self) -> usize {
        self.extensions.len()
    }
}
