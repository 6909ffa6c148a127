//! Fixtures and fakes shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::actors::{Actor, ActorInvoker, ActorReply, InvokeError};
use crate::models::environment::Environment;
use crate::models::general_config::GeneralConfig;
use crate::models::repository::{Repository, RepositoryUpdate};
use crate::models::settings::EnvironmentVariables;
use crate::models::status::EnvironmentStatus;
use crate::services::lifecycle::Lifecycle;
use crate::store::memory::MemoryStore;
use crate::store::{GeneralConfigStore, RepositoryStore, StoreError, StoreResult, Stores};

pub const STAGE: &str = "test";

pub fn role_arn(name: &str) -> String {
    format!("arn:aws:iam::123456789012:role/{name}")
}

pub fn repository(name: &str) -> Repository {
    Repository {
        repository: name.to_string(),
        infrastructure_repo_url: format!("https://git.example.com/{name}-infra.git"),
        webhook: true,
        filters: vec![],
        shutdown_schedules: vec![],
        startup_schedules: vec![],
        code_build_role_arn: role_arn(&format!("{name}-build")),
        environment_variables: EnvironmentVariables::new(),
    }
}

pub fn environment(repository: &str, branch: &str) -> Environment {
    Environment {
        repository: repository.to_string(),
        branch: branch.to_string(),
        status: EnvironmentStatus::Pending,
        creation_date: Utc::now(),
        infrastructure_repo_url: format!("https://git.example.com/{repository}-infra.git"),
        shutdown_schedules: vec![],
        startup_schedules: vec![],
        code_build_role_arn: role_arn(&format!("{repository}-build")),
        environment_variables: EnvironmentVariables::new(),
    }
}

pub fn environment_with_status(
    repository: &str,
    branch: &str,
    status: EnvironmentStatus,
) -> Environment {
    Environment {
        status,
        ..environment(repository, branch)
    }
}

enum SyncOutcome {
    Reply(ActorReply),
    Fail,
}

/// Records every invocation. Async calls succeed unless `fail_async` is set;
/// sync calls pop scripted outcomes and default to an empty 200 reply.
#[derive(Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<(Actor, Value)>>,
    fail_async: AtomicBool,
    sync_outcomes: Mutex<VecDeque<SyncOutcome>>,
}

impl RecordingInvoker {
    pub fn fail_async(&self) {
        self.fail_async.store(true, Ordering::SeqCst);
    }

    pub fn reply_with(&self, status: u16, payload: Value) {
        self.sync_outcomes
            .lock()
            .unwrap()
            .push_back(SyncOutcome::Reply(ActorReply { status, payload }));
    }

    pub fn fail_next_sync(&self) {
        self.sync_outcomes.lock().unwrap().push_back(SyncOutcome::Fail);
    }

    pub fn calls(&self) -> Vec<(Actor, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// `operation` tags of Builder payloads, in dispatch order.
    pub fn builder_operations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(actor, _)| *actor == Actor::Builder)
            .map(|(_, payload)| payload["operation"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn record(&self, actor: Actor, payload: Value) {
        self.calls.lock().unwrap().push((actor, payload));
    }
}

#[async_trait]
impl ActorInvoker for RecordingInvoker {
    async fn invoke_async(&self, actor: Actor, payload: Value) -> Result<(), InvokeError> {
        self.record(actor, payload);
        if self.fail_async.load(Ordering::SeqCst) {
            return Err(InvokeError::Rejected { actor, status: 500 });
        }
        Ok(())
    }

    async fn invoke_sync(&self, actor: Actor, payload: Value) -> Result<ActorReply, InvokeError> {
        self.record(actor, payload);
        match self.sync_outcomes.lock().unwrap().pop_front() {
            Some(SyncOutcome::Reply(reply)) => Ok(reply),
            Some(SyncOutcome::Fail) => Err(InvokeError::Decode {
                actor,
                reason: "scripted failure".to_string(),
            }),
            None => Ok(ActorReply {
                status: 200,
                payload: Value::Null,
            }),
        }
    }
}

/// A backend that fails every call, for swapping into one collection.
pub struct UnavailableStore;

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Backend(anyhow::anyhow!("store unavailable")))
}

#[async_trait]
impl RepositoryStore for UnavailableStore {
    async fn get_repository(&self, _name: &str) -> StoreResult<Option<Repository>> {
        unavailable()
    }

    async fn list_repositories(&self) -> StoreResult<Vec<Repository>> {
        unavailable()
    }

    async fn create_repository(&self, _repository: &Repository) -> StoreResult<()> {
        unavailable()
    }

    async fn update_repository(
        &self,
        _name: &str,
        _update: &RepositoryUpdate,
    ) -> StoreResult<Repository> {
        unavailable()
    }

    async fn delete_repository(&self, _name: &str) -> StoreResult<Repository> {
        unavailable()
    }
}

#[async_trait]
impl GeneralConfigStore for UnavailableStore {
    async fn get_general_config(&self, _stage: &str) -> StoreResult<Option<GeneralConfig>> {
        unavailable()
    }

    async fn put_general_config(
        &self,
        _stage: &str,
        _config: &GeneralConfig,
    ) -> StoreResult<GeneralConfig> {
        unavailable()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub invoker: Arc<RecordingInvoker>,
    pub lifecycle: Lifecycle,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_stores(|_| {})
    }

    /// Memory-backed harness with some collections replaced by `swap`.
    pub fn with_stores(swap: impl FnOnce(&mut Stores)) -> Self {
        let store = Arc::new(MemoryStore::new());
        let invoker = Arc::new(RecordingInvoker::default());
        let mut stores = Stores::from_backend(store.clone());
        swap(&mut stores);
        let lifecycle = Lifecycle::new(stores, invoker.clone(), STAGE);
        Self {
            store,
            invoker,
            lifecycle,
        }
    }
}
