// ABOUTME: Shared fixtures for integration tests.
// ABOUTME: Scriptable supervisor, acceptance hook, flaky store, and a pipeline harness.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use relevo::deploy::{
    AcceptanceHook, AcceptanceOutcome, AnyFormat, DeployOptions, DeploymentOrchestrator,
    PipelineSettings, SlotLocks,
};
use relevo::store::{MemoryStore, ObjectStore, StoreError};
use relevo::supervisor::{ProcessSupervisor, SupervisorError};
use relevo::types::{Artifact, ArtifactId, SlotName, StorePath};

/// Supervisor whose probe consults what the production slot actually
/// points at: healthy unless the serving artifact is marked bad.
///
/// This keeps health outcomes deterministic no matter how many times the
/// controller polls.
pub struct FakeSupervisor<S> {
    store: Arc<S>,
    slot_pointer: StorePath,
    unhealthy_artifacts: Mutex<HashSet<String>>,
    restart_count: AtomicU32,
    failing_restarts: AtomicU32,
}

impl<S: ObjectStore> FakeSupervisor<S> {
    pub fn new(store: Arc<S>, slot: &str) -> Self {
        Self {
            store,
            slot_pointer: StorePath::parse(&format!("production/{slot}/slot.json")).unwrap(),
            unhealthy_artifacts: Mutex::new(HashSet::new()),
            restart_count: AtomicU32::new(0),
            failing_restarts: AtomicU32::new(0),
        }
    }

    /// Mark an artifact id as one the serving process cannot come up on.
    pub fn mark_unhealthy(&self, artifact_id: &str) {
        self.unhealthy_artifacts
            .lock()
            .insert(artifact_id.to_string());
    }

    /// Make the next `n` restart calls fail.
    pub fn fail_next_restarts(&self, n: u32) {
        self.failing_restarts.store(n, Ordering::SeqCst);
    }

    pub fn restarts(&self) -> u32 {
        self.restart_count.load(Ordering::SeqCst)
    }

    async fn serving_artifact(&self) -> Option<String> {
        let bytes = self.store.read(&self.slot_pointer).await.ok()?;
        let artifact: Artifact = serde_json::from_slice(&bytes).ok()?;
        Some(artifact.id.to_string())
    }
}

#[async_trait]
impl<S: ObjectStore> ProcessSupervisor for FakeSupervisor<S> {
    async fn restart(&self, service: &str) -> Result<(), SupervisorError> {
        self.restart_count.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_restarts.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_restarts.store(failing - 1, Ordering::SeqCst);
            return Err(SupervisorError::RestartFailed {
                service: service.to_string(),
                reason: "injected restart failure".to_string(),
            });
        }
        Ok(())
    }

    async fn probe(&self, _service: &str) -> Result<bool, SupervisorError> {
        match self.serving_artifact().await {
            Some(id) => Ok(!self.unhealthy_artifacts.lock().contains(&id)),
            None => Ok(false),
        }
    }
}

/// Acceptance hook with a scripted outcome and optional delay.
pub struct FakeAcceptance {
    outcome: Mutex<AcceptanceOutcome>,
    delay: Mutex<Option<Duration>>,
    runs: AtomicU32,
}

impl Default for FakeAcceptance {
    fn default() -> Self {
        Self {
            outcome: Mutex::new(AcceptanceOutcome::pass("ok")),
            delay: Mutex::new(None),
            runs: AtomicU32::new(0),
        }
    }
}

impl FakeAcceptance {
    pub fn set_outcome(&self, outcome: AcceptanceOutcome) {
        *self.outcome.lock() = outcome;
    }

    /// Delay every run, e.g. beyond the orchestrator's acceptance budget.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AcceptanceHook for FakeAcceptance {
    async fn run(&self, _staged: &Artifact) -> AcceptanceOutcome {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.lock().clone()
    }
}

/// Store wrapper that fails the next N atomic renames whose destination
/// matches a substring, for exercising the promoter's retry budget
/// without disturbing backup-index renames.
pub struct FlakyStore {
    inner: MemoryStore,
    failing_renames: Mutex<Option<(String, u32)>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_renames: Mutex::new(None),
        }
    }

    pub fn fail_next_renames_to(&self, dst_contains: &str, n: u32) {
        *self.failing_renames.lock() = Some((dst_contains.to_string(), n));
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn read(&self, path: &StorePath) -> Result<Bytes, StoreError> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &StorePath, bytes: Bytes) -> Result<(), StoreError> {
        self.inner.write(path, bytes).await
    }

    async fn copy(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError> {
        self.inner.copy(src, dst).await
    }

    async fn atomic_rename(&self, src: &StorePath, dst: &StorePath) -> Result<(), StoreError> {
        {
            let mut failing = self.failing_renames.lock();
            if let Some((dst_contains, remaining)) = failing.as_mut()
                && dst.as_str().contains(dst_contains.as_str())
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(StoreError::Unavailable {
                    reason: "injected rename failure".to_string(),
                });
            }
        }
        self.inner.atomic_rename(src, dst).await
    }

    async fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        self.inner.exists(path).await
    }

    async fn size(&self, path: &StorePath) -> Result<u64, StoreError> {
        self.inner.size(path).await
    }

    async fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        self.inner.delete(path).await
    }
}

/// A fully wired pipeline over an arbitrary store.
pub struct Harness<S> {
    pub store: Arc<S>,
    pub supervisor: Arc<FakeSupervisor<S>>,
    pub acceptance: Arc<FakeAcceptance>,
    pub orchestrator: DeploymentOrchestrator<S, FakeSupervisor<S>>,
    pub locks: Arc<SlotLocks>,
}

pub fn harness_on<S: ObjectStore>(store: Arc<S>, slot: &str) -> Harness<S> {
    let supervisor = Arc::new(FakeSupervisor::new(Arc::clone(&store), slot));
    let acceptance = Arc::new(FakeAcceptance::default());
    let locks = Arc::new(SlotLocks::new());

    let orchestrator = DeploymentOrchestrator::new(
        SlotName::new(slot).unwrap(),
        Arc::clone(&store),
        Arc::clone(&supervisor),
        Arc::clone(&acceptance) as Arc<dyn AcceptanceHook>,
        PipelineSettings {
            min_artifact_bytes: 4,
            format: Arc::new(AnyFormat),
            service: "model-server".to_string(),
            poll_interval: Duration::from_millis(5),
        },
        Arc::clone(&locks),
    );

    Harness {
        store,
        supervisor,
        acceptance,
        orchestrator,
        locks,
    }
}

pub fn harness(slot: &str) -> Harness<MemoryStore> {
    harness_on(Arc::new(MemoryStore::new()), slot)
}

/// Options tuned for fast tests: tight budgets, one-shot polling.
pub fn fast_opts() -> DeployOptions {
    DeployOptions {
        acceptance_timeout: Duration::from_millis(200),
        health_check_timeout: Duration::from_millis(50),
        retain_backups: 5,
        swap_retries: 3,
        restart_retries: 2,
        store_timeout: Duration::from_secs(5),
    }
}

/// Write candidate bytes into the store's incoming area and describe them.
pub async fn put_artifact<S: ObjectStore>(store: &S, id: &str, bytes: &[u8]) -> Artifact {
    let location = StorePath::parse(&format!("incoming/{id}.bin")).unwrap();
    store
        .write(&location, Bytes::copy_from_slice(bytes))
        .await
        .unwrap();
    Artifact::new(
        ArtifactId::new(id),
        location,
        bytes.len() as u64,
        Artifact::digest(bytes),
    )
}
