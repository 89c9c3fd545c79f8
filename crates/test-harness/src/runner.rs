//! Class runner: the host adapter that executes a registered test class.
//!
//! ```text
//! scan ─▶ before_all ─▶ ┌ for each method ──────────────────────────────┐ ─▶ after_all ─▶ final teardown
//!                       │ fixture ─▶ setup ─▶ before_each ─▶ body       │
//!                       │          ─▶ after_each ─▶ teardown ─▶ outcome │
//!                       └───────────────────────────────────────────────┘
//! ```
//!
//! Methods run sequentially on the calling task. Every method gets a fresh
//! fixture from the class definition. A body that panics (a failed
//! `assert!`) is reported as a [`FailurePhase::Test`] failure and the
//! method is torn down like any other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use serde::Serialize;
use tracing::{info, warn};

use switchyard_core::config::LifecycleSettings;
use switchyard_core::metrics as m;
use switchyard_core::runtime::ContextFactory;
use switchyard_core::service::BoxFuture;

use crate::definition::ClassDefinition;
use crate::error::HarnessError;
use crate::hooks::{HookChain, TestFn, catch_panic, with_class_teardown, with_setup, with_teardown};
use crate::orchestrator::LifecycleOrchestrator;
use crate::shared::ExecutionContext;

/// One named test method.
pub struct TestMethod<T> {
    name: String,
    body: TestFn<T>,
}

impl<T> TestMethod<T> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Where a method failed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    /// The class definition was rejected by the scanner.
    Configuration,
    /// Orchestrator setup or a before-each hook.
    Setup,
    /// The test body.
    Test,
    /// An after-each hook or orchestrator teardown.
    Teardown,
}

/// Result of one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodStatus {
    Passed,
    Failed { phase: FailurePhase, message: String },
    NotRun { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: MethodStatus,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl MethodOutcome {
    pub fn passed(&self) -> bool {
        self.status == MethodStatus::Passed
    }
}

/// Results of a whole class run.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub methods: Vec<MethodOutcome>,
    /// Failure of a class-level step (scan, before/after-all hooks, final teardown).
    pub class_error: Option<String>,
}

impl ClassReport {
    pub fn is_success(&self) -> bool {
        self.class_error.is_none() && self.methods.iter().all(MethodOutcome::passed)
    }

    pub fn passed(&self) -> usize {
        self.methods.iter().filter(|o| o.passed()).count()
    }

    /// Methods that did not pass, in run order.
    pub fn failures(&self) -> Vec<&MethodOutcome> {
        self.methods.iter().filter(|o| !o.passed()).collect()
    }

    pub fn outcome(&self, name: &str) -> Option<&MethodOutcome> {
        self.methods.iter().find(|o| o.name == name)
    }
}

/// Runs the methods of one class through the orchestrator and hook chain.
pub struct ClassRunner<T> {
    class: Arc<ClassDefinition<T>>,
    factory: Arc<dyn ContextFactory>,
    hooks: HookChain<T>,
    methods: Vec<TestMethod<T>>,
    execution: Option<ExecutionContext>,
    settings: Option<LifecycleSettings>,
}

impl<T: Send + 'static> ClassRunner<T> {
    pub fn new(class: ClassDefinition<T>, factory: Arc<dyn ContextFactory>) -> Self {
        Self {
            class: Arc::new(class),
            factory,
            hooks: HookChain::new(),
            methods: Vec::new(),
            execution: None,
            settings: None,
        }
    }

    pub fn hooks(mut self, hooks: HookChain<T>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Register a test method. Methods run in registration order.
    pub fn test(
        mut self,
        name: impl Into<String>,
        body: impl for<'a> Fn(&'a mut T) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    ) -> Self {
        self.methods.push(TestMethod {
            name: name.into(),
            body: Arc::new(body),
        });
        self
    }

    pub fn execution(mut self, execution: ExecutionContext) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn methods(&self) -> &[TestMethod<T>] {
        &self.methods
    }

    fn orchestrator(&self) -> LifecycleOrchestrator<T> {
        let mut orchestrator =
            LifecycleOrchestrator::new(Arc::clone(&self.class), Arc::clone(&self.factory));
        if let Some(execution) = &self.execution {
            orchestrator = orchestrator.with_execution(execution.clone());
        }
        if let Some(settings) = &self.settings {
            orchestrator = orchestrator.with_settings(settings.clone());
        }
        orchestrator
    }

    /// Run every method and collect the outcomes.
    pub async fn run(&self) -> ClassReport {
        let mut orchestrator = self.orchestrator();
        let class = self.class.name().to_owned();
        info!(class = %class, methods = self.methods.len(), "running test class");

        let prepared = match orchestrator.configuration() {
            Ok(_) => self.hooks.run_before_all().await,
            Err(e) => Err(HarnessError::from(e).into()),
        };

        let mut methods = Vec::with_capacity(self.methods.len());
        let class_outcome = match prepared {
            Ok(()) => {
                for method in &self.methods {
                    methods.push(self.run_method(&mut orchestrator, method).await);
                }
                Ok(())
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(class = %class, error = %reason, "class preparation failed, skipping methods");
                methods.extend(self.methods.iter().map(|method| MethodOutcome {
                    name: method.name.clone(),
                    status: MethodStatus::NotRun {
                        reason: reason.clone(),
                    },
                    elapsed: Duration::ZERO,
                }));
                Err(e)
            }
        };

        let class_error = with_class_teardown(&mut orchestrator, &self.hooks, class_outcome)
            .await
            .err()
            .map(|e| format!("{e:#}"));

        let report = ClassReport {
            class,
            methods,
            class_error,
        };
        info!(
            class = %report.class,
            passed = report.passed(),
            failed = report.methods.len() - report.passed(),
            "test class finished"
        );
        report
    }

    async fn run_method(
        &self,
        orchestrator: &mut LifecycleOrchestrator<T>,
        method: &TestMethod<T>,
    ) -> MethodOutcome {
        let mut fixture = self.class.instantiate();
        let started = Instant::now();

        let (phase, primary) = match with_setup(orchestrator, &self.hooks, &method.name, &mut fixture).await {
            Err(e) => (Some(setup_phase(&e)), Err(e)),
            Ok(()) => match catch_panic(async { (method.body)(&mut fixture).await }).await {
                Err(e) => (Some(FailurePhase::Test), Err(e)),
                Ok(()) => (None, Ok(())),
            },
        };
        let result = with_teardown(orchestrator, &self.hooks, &method.name, &mut fixture, primary).await;
        let elapsed = started.elapsed();

        let status = match result {
            Ok(()) => MethodStatus::Passed,
            Err(e) => MethodStatus::Failed {
                phase: phase.unwrap_or(FailurePhase::Teardown),
                message: format!("{e:#}"),
            },
        };
        let label = if status == MethodStatus::Passed {
            "success"
        } else {
            "failure"
        };
        histogram!(m::LIFECYCLE_TEST_DURATION_SECONDS, m::LABEL_RESULT => label)
            .record(elapsed.as_secs_f64());

        MethodOutcome {
            name: method.name.clone(),
            status,
            elapsed,
        }
    }
}

fn setup_phase(error: &anyhow::Error) -> FailurePhase {
    match error.downcast_ref::<HarnessError>() {
        Some(HarnessError::Configuration(_)) => FailurePhase::Configuration,
        _ => FailurePhase::Setup,
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
