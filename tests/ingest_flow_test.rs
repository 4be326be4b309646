//! 完整入库流程集成测试
//!
//! 使用内存SQLite任务存储和内存作业队列,走一遍真实的
//! 提交 -> 作业入队 -> 回调 -> 重新提交 流程。

use std::sync::Arc;

use shift_actions::{HookMetadata, HookRequest, ShiftService, SubmitRequest};
use shift_core::config::{DatabaseConfig, IngestConfig, PlatformConfig};
use shift_core::ShiftError;
use shift_domain::{
    CallerCredential, Capability, CapabilityAuthorizer, Dataset, ExtensionRegistry, JobQueue,
    Resource, TaskRecord, TaskState, TaskStore,
};
use shift_infrastructure::{DatabaseManager, InMemoryJobQueue};
use shift_testing_utils::{MockPlatformDirectory, RecordingExtension};

const QUEUE: &str = "shift";

fn test_resource(id: &str, url: &str) -> Resource {
    Resource {
        id: id.to_string(),
        package_id: "pkg-1".to_string(),
        url: url.to_string(),
        url_type: None,
        format: Some("CSV".to_string()),
        last_modified: None,
    }
}

fn test_dataset() -> Dataset {
    Dataset {
        id: "pkg-1".to_string(),
        name: "integration-dataset".to_string(),
        title: Some("集成测试数据集".to_string()),
    }
}

fn submitter() -> CallerCredential {
    CallerCredential::new("tester", vec![Capability::SubmitIngest])
}

struct Harness {
    service: ShiftService,
    task_store: Arc<dyn TaskStore>,
    job_queue: Arc<InMemoryJobQueue>,
    platform: Arc<MockPlatformDirectory>,
    extension: Arc<RecordingExtension>,
    manager: DatabaseManager,
}

async fn build_harness(platform: MockPlatformDirectory) -> Harness {
    let db_config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    };
    let manager = DatabaseManager::new(&db_config).await.unwrap();
    let task_store: Arc<dyn TaskStore> = Arc::from(manager.task_store());

    let job_queue = Arc::new(InMemoryJobQueue::new());
    let platform = Arc::new(platform);
    let extension = Arc::new(RecordingExtension::new("recording", true));

    let mut registry = ExtensionRegistry::new();
    registry.register(extension.clone());

    let service = ShiftService::new(
        Arc::clone(&task_store),
        job_queue.clone() as Arc<dyn JobQueue>,
        platform.clone(),
        Arc::new(CapabilityAuthorizer),
        Arc::new(registry),
        PlatformConfig {
            site_url: "http://ckan.example.org".to_string(),
            api_key: "platform-key".to_string(),
            request_timeout_seconds: 30,
        },
        IngestConfig {
            queue_name: QUEUE.to_string(),
            assume_task_stale_after: 3600,
        },
    );

    Harness {
        service,
        task_store,
        job_queue,
        platform,
        extension,
        manager,
    }
}

#[tokio::test]
async fn test_submit_persists_pending_task_and_enqueues_job() {
    let platform = MockPlatformDirectory::new()
        .with_resource(test_resource("res-1", "http://files.example.org/a.csv"))
        .with_dataset(test_dataset());
    let harness = build_harness(platform).await;

    let submitted = harness
        .service
        .submit(&submitter(), SubmitRequest::new("res-1"))
        .await
        .unwrap();
    assert!(submitted);

    // 任务落在SQLite里,状态为pending且携带作业引用
    let task = harness
        .task_store
        .find_task("res-1", TaskRecord::TASK_TYPE_SHIFT, TaskRecord::KEY_SHIFT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.state, TaskState::Pending);

    // 队列里有一条完整的作业请求
    let jobs = harness.job_queue.drain(QUEUE).await;
    assert_eq!(jobs.len(), 1);

    // 任务value记录的作业引用与入队作业一致
    let job_ref = task.job_ref().expect("pending任务应携带作业引用");
    assert_eq!(job_ref.job_id, jobs[0].job_id);
    assert!(job_ref.job_key.is_none());
    let request = &jobs[0].request;
    assert_eq!(request.job_type, "push_to_datastore");
    assert_eq!(request.api_key, "platform-key");
    assert_eq!(
        request.result_url,
        "http://ckan.example.org/api/3/action/shift_hook"
    );
    assert_eq!(request.metadata.resource_id, "res-1");
    assert_eq!(request.metadata.site_url, "http://ckan.example.org");
    assert_eq!(
        request.metadata.original_url,
        "http://files.example.org/a.csv"
    );

    harness.manager.close().await;
}

#[tokio::test]
async fn test_complete_hook_finishes_task_without_resubmission() {
    let platform = MockPlatformDirectory::new()
        .with_resource(test_resource("res-1", "http://files.example.org/a.csv"))
        .with_dataset(test_dataset());
    let harness = build_harness(platform).await;

    harness
        .service
        .submit(&submitter(), SubmitRequest::new("res-1"))
        .await
        .unwrap();
    let jobs = harness.job_queue.drain(QUEUE).await;
    let metadata = &jobs[0].request.metadata;

    // 执行方回传提交时下发的元数据,源数据未变化
    let outcome = harness
        .service
        .handle_hook(
            &submitter(),
            HookRequest {
                metadata: HookMetadata {
                    resource_id: metadata.resource_id.clone(),
                    task_created: Some(metadata.task_created.clone()),
                    original_url: Some(metadata.original_url.clone()),
                },
                status: "complete".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, TaskState::Complete);
    assert!(!outcome.resubmitted);

    let task = harness
        .task_store
        .find_task("res-1", TaskRecord::TASK_TYPE_SHIFT, TaskRecord::KEY_SHIFT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.state, TaskState::Complete);

    // 完成后处理:扩展通知和默认视图各执行一次
    assert_eq!(harness.extension.after_upload_calls(), 1);
    assert_eq!(harness.platform.view_call_count(), 1);

    // 没有触发重新提交,队列应为空
    assert!(harness.job_queue.drain(QUEUE).await.is_empty());

    harness.manager.close().await;
}

#[tokio::test]
async fn test_url_change_during_job_triggers_resubmission() {
    let platform = MockPlatformDirectory::new()
        .with_resource(test_resource("res-1", "http://files.example.org/a.csv"))
        .with_dataset(test_dataset());
    let harness = build_harness(platform).await;

    harness
        .service
        .submit(&submitter(), SubmitRequest::new("res-1"))
        .await
        .unwrap();
    let jobs = harness.job_queue.drain(QUEUE).await;
    let original_url = jobs[0].request.metadata.original_url.clone();

    // 作业执行期间资源URL被修改
    harness
        .platform
        .update_resource(test_resource("res-1", "http://files.example.org/b.csv"));

    let outcome = harness
        .service
        .handle_hook(
            &submitter(),
            HookRequest {
                metadata: HookMetadata {
                    resource_id: "res-1".to_string(),
                    task_created: None,
                    original_url: Some(original_url),
                },
                status: "complete".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, TaskState::Complete);
    assert!(outcome.resubmitted);

    // 重新提交把任务推回pending并入队了新作业
    let task = harness
        .task_store
        .find_task("res-1", TaskRecord::TASK_TYPE_SHIFT, TaskRecord::KEY_SHIFT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.state, TaskState::Pending);

    let jobs = harness.job_queue.drain(QUEUE).await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[0].request.metadata.original_url,
        "http://files.example.org/b.csv"
    );

    harness.manager.close().await;
}

#[tokio::test]
async fn test_error_hook_persists_error_state() {
    let platform = MockPlatformDirectory::new()
        .with_resource(test_resource("res-1", "http://files.example.org/a.csv"))
        .with_dataset(test_dataset());
    let harness = build_harness(platform).await;

    harness
        .service
        .submit(&submitter(), SubmitRequest::new("res-1"))
        .await
        .unwrap();

    let outcome = harness
        .service
        .handle_hook(
            &submitter(),
            HookRequest {
                metadata: HookMetadata {
                    resource_id: "res-1".to_string(),
                    task_created: None,
                    original_url: None,
                },
                status: "error".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, TaskState::Error);
    assert!(!outcome.resubmitted);

    // 失败回调不触发完成后处理
    assert_eq!(harness.extension.after_upload_calls(), 0);
    assert_eq!(harness.platform.view_call_count(), 0);

    harness.manager.close().await;
}

#[tokio::test]
async fn test_hook_without_submitted_task_is_rejected() {
    let platform = MockPlatformDirectory::new()
        .with_resource(test_resource("res-1", "http://files.example.org/a.csv"))
        .with_dataset(test_dataset());
    let harness = build_harness(platform).await;

    let result = harness
        .service
        .handle_hook(
            &submitter(),
            HookRequest {
                metadata: HookMetadata {
                    resource_id: "res-1".to_string(),
                    task_created: None,
                    original_url: None,
                },
                status: "complete".to_string(),
            },
        )
        .await;

    assert!(matches!(result, Err(ShiftError::TaskNotFound { .. })));

    harness.manager.close().await;
}
