//! 入库协调服务
//!
//! 实现 shift_submit / shift_hook 两个动作的完整语义:提交侧负责
//! 授权、扩展否决、重复提交检查和作业入队;回调侧负责状态落库、
//! 完成后处理(扩展通知、默认视图)以及源数据变化时的重新提交。

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use shift_core::{IngestConfig, PlatformConfig, ShiftError, ShiftResult};
use shift_domain::time::{format_wire_timestamp, parse_wire_timestamp};
use shift_domain::{
    Authorizer, CallerCredential, Capability, ExtensionRegistry, JobMetadata, JobQueue, JobRequest,
    PlatformDirectory, Resource, TaskRecord, TaskState, TaskStore,
};

use crate::requests::{HookMetadata, HookOutcome, HookRequest, SubmitRequest};

/// 入库协调服务
///
/// 所有依赖都通过端口注入,便于在不同的存储/队列实现之间切换。
pub struct ShiftService {
    task_store: Arc<dyn TaskStore>,
    job_queue: Arc<dyn JobQueue>,
    platform: Arc<dyn PlatformDirectory>,
    authorizer: Arc<dyn Authorizer>,
    registry: Arc<ExtensionRegistry>,
    platform_config: PlatformConfig,
    ingest_config: IngestConfig,
}

impl ShiftService {
    pub fn new(
        task_store: Arc<dyn TaskStore>,
        job_queue: Arc<dyn JobQueue>,
        platform: Arc<dyn PlatformDirectory>,
        authorizer: Arc<dyn Authorizer>,
        registry: Arc<ExtensionRegistry>,
        platform_config: PlatformConfig,
        ingest_config: IngestConfig,
    ) -> Self {
        Self {
            task_store,
            job_queue,
            platform,
            authorizer,
            registry,
            platform_config,
            ingest_config,
        }
    }

    /// 提交一个资源进入数据入库流水线
    ///
    /// 返回 `Ok(true)` 表示作业已入队,`Ok(false)` 表示本次提交被
    /// 正常跳过(资源不存在、扩展否决或已有进行中的任务)。
    pub async fn submit(
        &self,
        credential: &CallerCredential,
        request: SubmitRequest,
    ) -> ShiftResult<bool> {
        let span = tracing::info_span!("shift_submit", resource_id = %request.resource_id);
        let _guard = span.enter();

        // 1. 参数校验
        if request.resource_id.trim().is_empty() {
            return Err(ShiftError::validation_error("resource_id 不能为空"));
        }

        // 2. 授权检查,与 shift_hook 使用同一能力
        self.authorizer
            .authorize(credential, Capability::SubmitIngest, &request.resource_id)
            .await?;

        // 3. 解析资源,资源不存在按"未提交"处理而不是报错
        let resource = match self.platform.resource_show(&request.resource_id).await {
            Ok(resource) => resource,
            Err(ShiftError::ResourceNotFound { .. }) => {
                info!("资源 {} 不存在,跳过本次提交", request.resource_id);
                return Ok(false);
            }
            Err(e) => {
                error!("查询资源 {} 失败: {}", request.resource_id, e);
                return Err(e);
            }
        };

        // 4. 扩展否决,任一扩展拒绝即放弃,后续扩展不再询问
        for extension in self.registry.extensions() {
            if !extension.can_upload(&resource.id).await {
                info!(
                    "扩展 {} 否决了资源 {} 的入库提交",
                    extension.name(),
                    resource.id
                );
                return Ok(false);
            }
        }

        // 5. 重复提交检查:时效窗口内的pending任务视为仍在进行
        let existing = self
            .task_store
            .find_task(
                &resource.id,
                TaskRecord::TASK_TYPE_SHIFT,
                TaskRecord::KEY_SHIFT,
            )
            .await?;
        if let Some(task) = &existing {
            if task.is_pending() {
                let age = task.age_seconds(Utc::now());
                let stale_after = self.ingest_config.assume_task_stale_after as i64;
                if age <= stale_after {
                    info!(
                        "资源 {} 已有进行中的入库任务({}秒前更新),跳过本次提交",
                        resource.id, age
                    );
                    return Ok(false);
                }
                warn!(
                    "资源 {} 的pending任务已 {} 秒未更新(阈值 {} 秒),视为遗弃并覆盖",
                    resource.id, age, stale_after
                );
            }
        }

        // 6. 写入submitting状态,复用已有记录的身份,清空旧的结果和错误
        let mut task = TaskRecord::new_submitting(&resource.id);
        if let Some(previous) = existing {
            task.id = previous.id;
        }
        let task = self.task_store.save_task(&task).await?;

        // 7. 构造作业请求并入队
        let job = self.build_job_request(&resource, &task, &request);
        let job_ref = match self
            .job_queue
            .enqueue_job(&self.ingest_config.queue_name, &job)
            .await
        {
            Ok(job_ref) => job_ref,
            Err(e) => {
                // 入队失败是硬失败:任务不能停留在submitting状态,
                // 先落error再把错误抛给调用方
                error!("资源 {} 的入库作业入队失败: {}", resource.id, e);
                let mut failed = task;
                failed.state = TaskState::Error;
                failed.error = Some(serde_json::json!({ "message": e.to_string() }));
                failed.last_updated = Utc::now();
                self.task_store.save_task(&failed).await?;
                return Err(e);
            }
        };

        // 8. 记录作业引用并置为pending
        let mut pending = task;
        pending.set_job_ref(&job_ref)?;
        pending.state = TaskState::Pending;
        pending.last_updated = Utc::now();
        self.task_store.save_task(&pending).await?;

        // 9. 提交完成
        info!(
            "资源 {} 的入库作业已入队: job_id={}",
            resource.id, job_ref.job_id
        );
        Ok(true)
    }

    /// 处理作业执行方的状态回调
    ///
    /// 状态原样落库;作业完成时执行完成后处理,并在检测到源数据
    /// 于作业执行期间发生变化时自动重新提交。
    pub async fn handle_hook(
        &self,
        credential: &CallerCredential,
        request: HookRequest,
    ) -> ShiftResult<HookOutcome> {
        let span = tracing::info_span!(
            "shift_hook",
            resource_id = %request.metadata.resource_id,
            status = %request.status
        );
        let _guard = span.enter();

        // 1. 参数校验
        if request.metadata.resource_id.trim().is_empty() {
            return Err(ShiftError::missing_parameter("metadata.resource_id"));
        }
        if request.status.trim().is_empty() {
            return Err(ShiftError::missing_parameter("status"));
        }

        // 2. 授权检查,资源ID取自回调元数据
        self.authorizer
            .authorize(
                credential,
                Capability::SubmitIngest,
                &request.metadata.resource_id,
            )
            .await?;

        // 3. 回调必须对应已有任务,找不到属于协议违规
        let mut task = self
            .task_store
            .find_task(
                &request.metadata.resource_id,
                TaskRecord::TASK_TYPE_SHIFT,
                TaskRecord::KEY_SHIFT,
            )
            .await?
            .ok_or_else(|| ShiftError::task_not_found(request.metadata.resource_id.clone()))?;

        // 4. 状态原样落库,未知状态不做解释
        task.state = TaskState::from(request.status.as_str());
        task.last_updated = Utc::now();

        // 5. 完成后处理
        let mut resubmit = false;
        if task.state == TaskState::Complete {
            let resource = self
                .platform
                .resource_show(&request.metadata.resource_id)
                .await?;
            let dataset = self.platform.dataset_show(&resource.package_id).await?;

            // 按注册顺序通知每个扩展
            for extension in self.registry.extensions() {
                extension.after_upload(&resource, &dataset).await;
            }

            // 默认视图只创建一次
            self.platform.create_default_views(&resource, &dataset).await?;

            resubmit = decide_resubmission(&resource, &request.metadata);
        }

        // 6. 先持久化状态变更,再决定是否重新提交
        let task = self.task_store.save_task(&task).await?;

        // 7. 源数据在作业执行期间发生变化时重新进入提交流程
        if resubmit {
            info!(
                "资源 {} 的源数据在作业执行期间发生变化,重新提交",
                task.entity_id
            );
            self.submit(credential, SubmitRequest::new(&task.entity_id))
                .await?;
        }

        info!(
            "资源 {} 的回调处理完成: state={}, resubmitted={}",
            task.entity_id, task.state, resubmit
        );
        Ok(HookOutcome {
            state: task.state,
            resubmitted: resubmit,
        })
    }

    /// 根据资源和提交参数构造下发给执行方的作业请求
    fn build_job_request(
        &self,
        resource: &Resource,
        task: &TaskRecord,
        request: &SubmitRequest,
    ) -> JobRequest {
        JobRequest {
            api_key: self.platform_config.api_key.clone(),
            job_type: JobRequest::JOB_TYPE_PUSH_TO_DATASTORE.to_string(),
            result_url: self.hook_callback_url(),
            metadata: JobMetadata {
                resource_id: resource.id.clone(),
                site_url: self.platform_config.site_url.clone(),
                ignore_hash: request.ignore_hash,
                set_url_type: request.set_url_type,
                task_created: format_wire_timestamp(task.last_updated),
                original_url: resource.url.clone(),
            },
        }
    }

    /// 作业执行方回调 shift_hook 的完整URL
    fn hook_callback_url(&self) -> String {
        format!(
            "{}/api/3/action/shift_hook",
            self.platform_config.site_url.trim_end_matches('/')
        )
    }
}

/// 判断作业完成后是否需要重新提交
///
/// 时间路径优先:双方时间戳都存在时只看时间比较结果,哪怕解析
/// 失败也不再落入URL检查;两个时间戳任一缺失时才比较URL变更。
fn decide_resubmission(resource: &Resource, metadata: &HookMetadata) -> bool {
    if let (Some(last_modified), Some(task_created)) = (
        resource.last_modified.as_deref(),
        metadata.task_created.as_deref(),
    ) {
        if let (Some(modified), Some(created)) = (
            parse_wire_timestamp(last_modified),
            parse_wire_timestamp(task_created),
        ) {
            return modified > created;
        }
        // 无法解析的时间戳静默忽略
        return false;
    }

    if let Some(original_url) = metadata.original_url.as_deref() {
        // 资源当前没有URL时不算变更
        return !resource.url.is_empty() && resource.url != original_url;
    }

    false
}
