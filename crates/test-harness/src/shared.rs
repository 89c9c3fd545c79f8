//! Per-worker shared lifecycle state.
//!
//! In per-class mode the first test method on a worker builds the context
//! and stores its handles here; later methods on the same worker reuse
//! them. The registry is an explicit value carried in an
//! [`ExecutionContext`], so two workers never see each other's entries.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::ThreadId;

use switchyard_core::runtime::{ConsumerGateway, ProducerGateway, RuntimeContext};
use switchyard_core::service::Service;

/// Identity under which shared state is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkerKey {
    Thread(ThreadId),
    Named(String),
}

impl WorkerKey {
    /// Key of the calling thread.
    pub fn current() -> Self {
        Self::Thread(std::thread::current().id())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for WorkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread(id) => write!(f, "{id:?}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Handles owned by one worker in per-class mode.
#[derive(Clone)]
pub struct SharedLifecycleState {
    pub context: Arc<dyn RuntimeContext>,
    pub producer: Arc<dyn ProducerGateway>,
    pub consumer: Arc<dyn ConsumerGateway>,
    /// Owning service substituted for the context, if any.
    pub service: Option<Arc<dyn Service>>,
}

impl SharedLifecycleState {
    /// Whether `context` is the very instance stored here.
    pub fn is_owned_by(&self, context: &Arc<dyn RuntimeContext>) -> bool {
        Arc::ptr_eq(&self.context, context)
    }
}

impl fmt::Debug for SharedLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLifecycleState")
            .field("context", &self.context.name())
            .field("service", &self.service.as_ref().map(|s| s.service_name()))
            .finish()
    }
}

/// Map from worker key to shared state. Cloning shares the map.
#[derive(Clone, Default)]
pub struct SharedLifecycleRegistry {
    entries: Arc<Mutex<HashMap<WorkerKey, SharedLifecycleState>>>,
}

impl SharedLifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<WorkerKey, SharedLifecycleState>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &WorkerKey) -> Option<SharedLifecycleState> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &WorkerKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Store `state` under `key`, returning the entry it replaced.
    pub fn insert(&self, key: WorkerKey, state: SharedLifecycleState) -> Option<SharedLifecycleState> {
        self.lock().insert(key, state)
    }

    /// Record a substituted owning service on an existing entry.
    pub fn set_service(&self, key: &WorkerKey, service: Arc<dyn Service>) -> bool {
        match self.lock().get_mut(key) {
            Some(state) => {
                state.service = Some(service);
                true
            }
            None => false,
        }
    }

    /// Remove the entry under `key` only if it holds `context`.
    pub fn clear_if_owner(
        &self,
        key: &WorkerKey,
        context: &Arc<dyn RuntimeContext>,
    ) -> Option<SharedLifecycleState> {
        let mut entries = self.lock();
        if entries.get(key)?.is_owned_by(context) {
            entries.remove(key)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl fmt::Debug for SharedLifecycleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLifecycleRegistry")
            .field("workers", &self.lock().keys().cloned().collect::<Vec<_>>())
            .finish()
    }
}

/// Worker identity plus the registry it reads and writes.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    worker: WorkerKey,
    shared: SharedLifecycleRegistry,
}

impl ExecutionContext {
    pub fn new(worker: WorkerKey, shared: SharedLifecycleRegistry) -> Self {
        Self { worker, shared }
    }

    /// Same registry, different worker.
    pub fn for_worker(&self, worker: WorkerKey) -> Self {
        Self {
            worker,
            shared: self.shared.clone(),
        }
    }

    pub fn worker(&self) -> &WorkerKey {
        &self.worker
    }

    pub fn shared(&self) -> &SharedLifecycleRegistry {
        &self.shared
    }
}

impl Default for ExecutionContext {
    /// The calling thread with a fresh registry.
    fn default() -> Self {
        Self::new(WorkerKey::current(), SharedLifecycleRegistry::new())
    }
}
