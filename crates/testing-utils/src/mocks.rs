//! Mock implementations for the domain ports
//!
//! This module provides in-memory mock implementations that can be used
//! for unit testing without requiring actual database connections or
//! external services.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use shift_core::{ShiftError, ShiftResult};
use shift_domain::{
    Dataset, JobQueue, JobRef, JobRequest, PlatformDirectory, Resource, ShiftExtension, TaskRecord,
    TaskStore,
};

/// Mock implementation of TaskStore for testing
///
/// Mirrors the upsert semantics of the real stores: records are unique
/// per (entity_id, task_type, key) and saving with id 0 either inserts
/// a new row or overwrites the existing row for that key.
#[derive(Debug, Clone)]
pub struct MockTaskStore {
    tasks: Arc<Mutex<HashMap<i64, TaskRecord>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Seed the store with a task, assigning an id when none is set
    pub fn with_task(self, task: TaskRecord) -> Self {
        {
            let mut tasks = self.tasks.lock().unwrap();
            let mut next_id = self.next_id.lock().unwrap();

            let mut task = task;
            if task.id == 0 {
                task.id = *next_id;
            }
            if task.id >= *next_id {
                *next_id = task.id + 1;
            }
            tasks.insert(task.id, task);
        }
        self
    }

    /// Look up a task by its unique key without going through the trait
    pub fn get(&self, entity_id: &str, task_type: &str, key: &str) -> Option<TaskRecord> {
        self.tasks
            .lock()
            .unwrap()
            .values()
            .find(|t| t.entity_id == entity_id && t.task_type == task_type && t.key == key)
            .cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn all_tasks(&self) -> Vec<TaskRecord> {
        self.tasks.lock().unwrap().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.tasks.lock().unwrap().clear();
        *self.next_id.lock().unwrap() = 1;
    }
}

impl Default for MockTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MockTaskStore {
    async fn find_task(
        &self,
        entity_id: &str,
        task_type: &str,
        key: &str,
    ) -> ShiftResult<Option<TaskRecord>> {
        Ok(self.get(entity_id, task_type, key))
    }

    async fn get_task_by_id(&self, id: i64) -> ShiftResult<Option<TaskRecord>> {
        Ok(self.tasks.lock().unwrap().get(&id).cloned())
    }

    async fn save_task(&self, task: &TaskRecord) -> ShiftResult<TaskRecord> {
        let mut tasks = self.tasks.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let mut saved = task.clone();
        if saved.id == 0 {
            // Unique-key conflict keeps the existing row identity
            let existing_id = tasks
                .values()
                .find(|t| {
                    t.entity_id == saved.entity_id
                        && t.task_type == saved.task_type
                        && t.key == saved.key
                })
                .map(|t| t.id);
            saved.id = match existing_id {
                Some(id) => id,
                None => {
                    let id = *next_id;
                    *next_id += 1;
                    id
                }
            };
        }
        tasks.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_task(&self, id: i64) -> ShiftResult<bool> {
        Ok(self.tasks.lock().unwrap().remove(&id).is_some())
    }

    async fn health_check(&self) -> ShiftResult<()> {
        Ok(())
    }
}

/// Mock implementation of JobQueue for testing
///
/// Records every enqueued job for inspection and can be switched into
/// a failing mode to exercise enqueue error paths.
#[derive(Debug, Clone)]
pub struct MockJobQueue {
    enqueued: Arc<Mutex<Vec<(String, JobRequest)>>>,
    next_job: Arc<Mutex<u64>>,
    fail: Arc<AtomicBool>,
}

impl MockJobQueue {
    pub fn new() -> Self {
        Self {
            enqueued: Arc::new(Mutex::new(Vec::new())),
            next_job: Arc::new(Mutex::new(1)),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent enqueue fail
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn enqueued(&self) -> Vec<(String, JobRequest)> {
        self.enqueued.lock().unwrap().clone()
    }

    pub fn job_count(&self) -> usize {
        self.enqueued.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.enqueued.lock().unwrap().clear();
        *self.next_job.lock().unwrap() = 1;
    }
}

impl Default for MockJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MockJobQueue {
    async fn enqueue_job(&self, queue: &str, job: &JobRequest) -> ShiftResult<JobRef> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShiftError::queue_error("simulated enqueue failure"));
        }
        let job_id = {
            let mut next_job = self.next_job.lock().unwrap();
            let id = format!("job-{}", *next_job);
            *next_job += 1;
            id
        };
        self.enqueued
            .lock()
            .unwrap()
            .push((queue.to_string(), job.clone()));
        Ok(JobRef::new(job_id))
    }

    async fn queue_depth(&self, queue: &str) -> ShiftResult<u32> {
        let depth = self
            .enqueued
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _)| q == queue)
            .count() as u32;
        Ok(depth)
    }

    async fn health_check(&self) -> ShiftResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShiftError::queue_error("simulated queue outage"));
        }
        Ok(())
    }
}

/// Mock implementation of PlatformDirectory for testing
///
/// Serves resources and datasets from in-memory maps and records every
/// create_default_views call.
#[derive(Debug, Clone)]
pub struct MockPlatformDirectory {
    resources: Arc<Mutex<HashMap<String, Resource>>>,
    datasets: Arc<Mutex<HashMap<String, Dataset>>>,
    view_calls: Arc<Mutex<Vec<String>>>,
}

impl MockPlatformDirectory {
    pub fn new() -> Self {
        Self {
            resources: Arc::new(Mutex::new(HashMap::new())),
            datasets: Arc::new(Mutex::new(HashMap::new())),
            view_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_resource(self, resource: Resource) -> Self {
        self.resources
            .lock()
            .unwrap()
            .insert(resource.id.clone(), resource);
        self
    }

    pub fn with_dataset(self, dataset: Dataset) -> Self {
        self.datasets
            .lock()
            .unwrap()
            .insert(dataset.id.clone(), dataset);
        self
    }

    /// Replace an already registered resource, e.g. to simulate edits
    /// that happen while a job is running
    pub fn update_resource(&self, resource: Resource) {
        self.resources
            .lock()
            .unwrap()
            .insert(resource.id.clone(), resource);
    }

    /// Resource ids passed to create_default_views, in call order
    pub fn view_calls(&self) -> Vec<String> {
        self.view_calls.lock().unwrap().clone()
    }

    pub fn view_call_count(&self) -> usize {
        self.view_calls.lock().unwrap().len()
    }
}

impl Default for MockPlatformDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformDirectory for MockPlatformDirectory {
    async fn resource_show(&self, resource_id: &str) -> ShiftResult<Resource> {
        self.resources
            .lock()
            .unwrap()
            .get(resource_id)
            .cloned()
            .ok_or_else(|| ShiftError::resource_not_found(resource_id))
    }

    async fn dataset_show(&self, dataset_id: &str) -> ShiftResult<Dataset> {
        self.datasets
            .lock()
            .unwrap()
            .get(dataset_id)
            .cloned()
            .ok_or_else(|| ShiftError::dataset_not_found(dataset_id))
    }

    async fn create_default_views(
        &self,
        resource: &Resource,
        _dataset: &Dataset,
    ) -> ShiftResult<()> {
        self.view_calls.lock().unwrap().push(resource.id.clone());
        Ok(())
    }
}

/// Extension stub that records every consultation
///
/// `can_upload` answers with the configured verdict and counts calls,
/// `after_upload` only counts calls.
#[derive(Debug)]
pub struct RecordingExtension {
    name: String,
    allow: bool,
    can_upload_calls: AtomicUsize,
    after_upload_calls: AtomicUsize,
}

impl RecordingExtension {
    pub fn new<S: Into<String>>(name: S, allow: bool) -> Self {
        Self {
            name: name.into(),
            allow,
            can_upload_calls: AtomicUsize::new(0),
            after_upload_calls: AtomicUsize::new(0),
        }
    }

    pub fn can_upload_calls(&self) -> usize {
        self.can_upload_calls.load(Ordering::SeqCst)
    }

    pub fn after_upload_calls(&self) -> usize {
        self.after_upload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShiftExtension for RecordingExtension {
    fn name(&self) -> &str {
        &self.name
    }

    async fn can_upload(&self, _resource_id: &str) -> bool {
        self.can_upload_calls.fetch_add(1, Ordering::SeqCst);
        self.allow
    }

    async fn after_upload(&self, _resource: &Resource, _dataset: &Dataset) {
        self.after_upload_calls.fetch_add(1, Ordering::SeqCst);
    }
}
