//! Mock owning service for lifecycle tests.
//!
//! Substituted for the runtime context through
//! `LifecycleOrchestrator::substitute_service`, it tracks start/stop calls
//! and supports failure injection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use switchyard_core::error::RuntimeError;
use switchyard_core::service::{BoxFuture, Service, ServiceStatus};

/// A mock service that records start/stop calls.
pub struct MockService {
    /// Number of completed `start()` calls.
    pub starts: Arc<AtomicUsize>,
    /// Whether `stop()` has been called.
    pub stopped: Arc<AtomicBool>,
    started: AtomicBool,
    /// If set, `start()` will return this error.
    start_error: Option<String>,
    /// If set, `stop()` will return this error.
    stop_error: Option<String>,
    /// If set, `stop()` will sleep for this duration before returning.
    stop_delay: Option<Duration>,
    name: String,
}

#[allow(dead_code)]
impl MockService {
    /// A service whose start and stop succeed.
    pub fn healthy(name: &str) -> Self {
        Self {
            starts: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            start_error: None,
            stop_error: None,
            stop_delay: None,
            name: name.to_owned(),
        }
    }

    /// A service whose `start()` fails.
    pub fn failing_start(name: &str, error: &str) -> Self {
        Self {
            start_error: Some(error.to_owned()),
            ..Self::healthy(name)
        }
    }

    /// A service whose `stop()` fails.
    pub fn failing_stop(name: &str, error: &str) -> Self {
        Self {
            stop_error: Some(error.to_owned()),
            ..Self::healthy(name)
        }
    }

    /// Delay `stop()` by `delay`.
    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl Service for MockService {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> ServiceStatus {
        if self.started.load(Ordering::SeqCst) {
            ServiceStatus::Started
        } else {
            ServiceStatus::Stopped
        }
    }

    fn start(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            if let Some(reason) = &self.start_error {
                return Err(RuntimeError::InvalidState {
                    service: self.name.clone(),
                    reason: reason.clone(),
                });
            }
            self.started.store(true, Ordering::SeqCst);
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            if let Some(delay) = self.stop_delay {
                tokio::time::sleep(delay).await;
            }
            self.stopped.store(true, Ordering::SeqCst);
            self.started.store(false, Ordering::SeqCst);
            match &self.stop_error {
                Some(reason) => Err(RuntimeError::InvalidState {
                    service: self.name.clone(),
                    reason: reason.clone(),
                }),
                None => Ok(()),
            }
        })
    }
}
