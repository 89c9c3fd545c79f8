//! Lifecycle orchestration -- context build, configuration side effects and release.
//!
//! The [`LifecycleOrchestrator`] drives one test class on one worker.
//!
//! # Setup
//!
//! 1. Scan the class definition (cached after the first call).
//! 2. Per-test mode: build a fresh context for every method.
//! 3. Per-class mode: build on the first method of a worker and store the
//!    handles in the shared registry; later methods re-inject fields and
//!    reset every test double instead.
//! 4. On a newly built context only: debugger and breakpoints, intercept
//!    strategies, property overrides.
//! 5. Register routes from every provider, then apply replace-from entries.
//! 6. Start the context unless the skip flag or advice-with mode is set.
//! 7. Start the duration timer.
//!
//! # Teardown
//!
//! Per-test mode stops the consumer, the producer and then the context (or
//! the substituted owning service). Per-class mode defers everything to
//! [`LifecycleOrchestrator::final_teardown`], which only releases the
//! shared entry if it still holds this orchestrator's context.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::{debug, info, warn};

use switchyard_core::config::{HarnessSettings, LifecycleSettings, SKIP_CONTEXT_START_ENV};
use switchyard_core::error::RuntimeError;
use switchyard_core::metrics as m;
use switchyard_core::registry::Registry;
use switchyard_core::runtime::{
    ConsumerGateway, ContextFactory, ContextSpec, ProducerGateway, RuntimeContext,
};
use switchyard_core::service::Service;

use crate::configuration::{FieldInjection, TestConfiguration};
use crate::definition::ClassDefinition;
use crate::error::{ConfigurationError, HarnessError, RuntimeSetupError, TeardownError};
use crate::lifecycle::{LifecycleMode, LifecycleState};
use crate::scanner::ConfigurationScanner;
use crate::shared::{ExecutionContext, SharedLifecycleState, WorkerKey};

/// Extra time granted on top of the context's own shutdown timeout.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Drives setup and teardown of runtime contexts for one test class.
pub struct LifecycleOrchestrator<T> {
    class: Arc<ClassDefinition<T>>,
    factory: Arc<dyn ContextFactory>,
    execution: ExecutionContext,
    /// Explicit settings; `None` reads the environment on every build.
    settings: Option<LifecycleSettings>,
    scanner: ConfigurationScanner,
    configuration: Option<Arc<TestConfiguration<T>>>,
    state: LifecycleState,
    /// Handles of the context used by the current (or last) test method.
    handles: Option<SharedLifecycleState>,
    /// Owning service that starts and stops the context instead of the context itself.
    service: Option<Arc<dyn Service>>,
    watch: Option<Instant>,
}

impl<T: Send + 'static> LifecycleOrchestrator<T> {
    /// Create an orchestrator for `class` on the calling thread.
    ///
    /// Lifecycle settings are read from the environment each time a context
    /// is built, unless [`Self::with_settings`] fixes them.
    pub fn new(class: Arc<ClassDefinition<T>>, factory: Arc<dyn ContextFactory>) -> Self {
        Self {
            class,
            factory,
            execution: ExecutionContext::default(),
            settings: None,
            scanner: ConfigurationScanner::new(),
            configuration: None,
            state: LifecycleState::Unstarted,
            handles: None,
            service: None,
            watch: None,
        }
    }

    /// Use an explicit worker key and shared registry.
    pub fn with_execution(mut self, execution: ExecutionContext) -> Self {
        self.execution = execution;
        self
    }

    /// Use `settings` for every build instead of reading the environment.
    pub fn with_settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn worker(&self) -> &WorkerKey {
        self.execution.worker()
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Configuration scanned so far, if any.
    pub fn scanned(&self) -> Option<Arc<TestConfiguration<T>>> {
        self.configuration.clone()
    }

    pub fn context(&self) -> Option<Arc<dyn RuntimeContext>> {
        self.handles.as_ref().map(|h| Arc::clone(&h.context))
    }

    pub fn producer(&self) -> Option<Arc<dyn ProducerGateway>> {
        self.handles.as_ref().map(|h| Arc::clone(&h.producer))
    }

    pub fn consumer(&self) -> Option<Arc<dyn ConsumerGateway>> {
        self.handles.as_ref().map(|h| Arc::clone(&h.consumer))
    }

    /// Time since the current test method finished setup.
    pub fn elapsed(&self) -> Option<Duration> {
        self.watch.map(|started| started.elapsed())
    }

    /// Start and stop `service` instead of the context.
    ///
    /// Applies to the current context and to every context built afterwards.
    pub fn substitute_service(&mut self, service: Arc<dyn Service>) {
        if let Some(handles) = self.handles.as_mut() {
            handles.service = Some(Arc::clone(&service));
            if self.configuration.as_ref().is_some_and(|c| c.share_context_per_class) {
                self.execution
                    .shared()
                    .set_service(self.execution.worker(), Arc::clone(&service));
            }
        }
        self.service = Some(service);
    }

    // ─── Setup ───────────────────────────────────────────────────────

    /// Scan the class definition, or return the cached configuration.
    pub fn configuration(&mut self) -> Result<Arc<TestConfiguration<T>>, ConfigurationError> {
        if let Some(config) = &self.configuration {
            return Ok(Arc::clone(config));
        }

        let config = match self.scanner.scan(self.class.as_ref()) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                counter!(m::LIFECYCLE_SETUP_FAILURES_TOTAL, m::LABEL_STAGE => "scan").increment(1);
                warn!(class = %self.class.name(), error = %e, "class definition rejected");
                return Err(e);
            }
        };
        if let Some(next) = self.state.after_scan() {
            self.state = next;
        }
        self.configuration = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Prepare a context for `method` and inject it into `fixture`.
    pub async fn setup(&mut self, method: &str, fixture: &mut T) -> Result<(), HarnessError> {
        let config = self.configuration()?;
        let next = self
            .state
            .after_setup()
            .ok_or(RuntimeSetupError::InvalidTransition {
                from: self.state,
                operation: "setup",
            })?;

        info!(
            class = %config.class_name,
            method,
            mode = %config.mode(),
            worker = %self.execution.worker(),
            "setting up test"
        );

        let result = match config.mode() {
            LifecycleMode::PerTest => self.build(&config, fixture).await,
            LifecycleMode::PerClass => match self.execution.shared().get(self.execution.worker()) {
                Some(shared) => self.reuse(&config, shared, fixture),
                None => self.build(&config, fixture).await.inspect(|handles| {
                    self.execution
                        .shared()
                        .insert(self.execution.worker().clone(), handles.clone());
                }),
            },
        };

        match result {
            Ok(handles) => self.handles = Some(handles),
            Err(e) => {
                counter!(m::LIFECYCLE_SETUP_FAILURES_TOTAL, m::LABEL_STAGE => e.stage())
                    .increment(1);
                warn!(class = %config.class_name, method, error = %e, "test setup failed");
                return Err(e.into());
            }
        }

        self.state = next;
        // setup cost is excluded from the reported duration
        self.watch = Some(Instant::now());
        Ok(())
    }

    fn reuse(
        &self,
        config: &TestConfiguration<T>,
        shared: SharedLifecycleState,
        fixture: &mut T,
    ) -> Result<SharedLifecycleState, RuntimeSetupError> {
        inject(config, &shared, fixture, |_| true)?;
        shared.context.reset_mocks();
        counter!(m::LIFECYCLE_CONTEXTS_REUSED_TOTAL).increment(1);
        debug!(
            class = %config.class_name,
            context = %shared.context.name(),
            "reusing shared context"
        );
        Ok(shared)
    }

    async fn build(
        &self,
        config: &TestConfiguration<T>,
        fixture: &mut T,
    ) -> Result<SharedLifecycleState, RuntimeSetupError> {
        let class = config.class_name.as_str();
        let registry = match &config.registry_factory {
            Some(factory) => factory.invoke_with(fixture, Registry::new())?,
            None => Registry::new(),
        };

        let context = self
            .factory
            .create_context(ContextSpec {
                name: class.to_owned(),
                registry,
                management_enabled: !config.disable_management_agent,
            })
            .map_err(|e| RuntimeSetupError::runtime(class, "create", e))?;
        counter!(m::LIFECYCLE_CONTEXTS_CREATED_TOTAL, m::LABEL_MODE => config.mode().label())
            .increment(1);
        context.set_shutdown_timeout(config.shutdown_timeout.as_duration());

        let handles = SharedLifecycleState {
            producer: context.create_producer(),
            consumer: context.create_consumer(),
            context,
            service: self.service.clone(),
        };

        if let Err(setup_error) = self.configure(config, &handles, fixture).await {
            if let Err(release_error) = release(&handles, config.mode()).await {
                warn!(
                    class,
                    setup_error = %setup_error,
                    release_error = %release_error,
                    "failed to release partially built context"
                );
            }
            return Err(setup_error);
        }
        Ok(handles)
    }

    /// Side effects applied once per newly built context.
    async fn configure(
        &self,
        config: &TestConfiguration<T>,
        handles: &SharedLifecycleState,
        fixture: &mut T,
    ) -> Result<(), RuntimeSetupError> {
        let class = config.class_name.as_str();
        let context = &handles.context;
        let fail = |stage: &'static str| move |e: RuntimeError| RuntimeSetupError::runtime(class, stage, e);

        if config.use_debugger {
            if context.status().is_started() {
                info!(class, "stopping started context to install the debugger");
                context.stop().await.map_err(fail("debugger"))?;
            }
            context.install_debugger().map_err(fail("debugger"))?;
            for provider in &config.breakpoint_providers {
                let breakpoint = provider.invoke(fixture)?;
                context.add_breakpoint(breakpoint).map_err(fail("debugger"))?;
            }
        }

        inject(config, handles, fixture, FieldInjection::is_context)?;
        handles.producer.start().await.map_err(fail("gateway"))?;
        handles.consumer.start().await.map_err(fail("gateway"))?;

        for strategy in &config.intercept_strategies {
            debug!(class, pattern = %strategy.pattern, skip = strategy.skip, "intercepting endpoints");
            context.add_endpoint_strategy(strategy.clone());
        }

        let properties = context.property_provider();
        if let Some(supplier) = &config.property_override {
            let overrides = supplier.invoke(fixture)?;
            if !overrides.is_empty() {
                debug!(class, count = overrides.len(), "applying property overrides");
                properties.set_override_properties(overrides);
            }
        }
        properties.set_ignore_missing_location(config.ignore_missing_property_location);

        inject(config, handles, fixture, |i| !i.is_context())?;

        if !config.use_route_builder {
            apply_replacements(config, context.as_ref())?;
            debug!(class, "route builders disabled, leaving context as created");
            return Ok(());
        }

        if config.route_providers.is_empty() {
            warn!(class, "no route definition providers registered");
        }
        for provider in &config.route_providers {
            let builder = provider.invoke(fixture)?;
            debug!(
                class,
                provider = provider.name(),
                routes = builder.routes().len(),
                "registering routes"
            );
            context.add_routes(builder).map_err(fail("routes"))?;
        }
        apply_replacements(config, context.as_ref())?;

        if self.settings().skip_context_start {
            info!(class, flag = SKIP_CONTEXT_START_ENV, "skipping context start");
        } else if config.use_advice_with {
            info!(class, "skipping context start in advice-with mode");
        } else {
            let started = match &handles.service {
                Some(service) => service.start().await,
                None => context.start().await,
            };
            started.map_err(fail("start"))?;
        }
        Ok(())
    }

    // ─── Teardown ────────────────────────────────────────────────────

    /// Finish `method` and return its duration.
    ///
    /// Per-test mode releases the context here; per-class mode keeps it.
    pub async fn teardown(&mut self, method: &str) -> Result<Duration, TeardownError> {
        let next = self
            .state
            .after_teardown()
            .ok_or(TeardownError::InvalidTransition {
                from: self.state,
                operation: "teardown",
            })?;
        self.state = next;
        let elapsed = self.watch.take().map(|s| s.elapsed()).unwrap_or_default();
        let mode = self.mode();

        info!(
            class = %self.class.name(),
            method,
            elapsed_ms = elapsed.as_millis() as u64,
            "testing done"
        );

        if mode == LifecycleMode::PerClass {
            return Ok(elapsed);
        }

        if let Some(handles) = self.handles.take() {
            release(&handles, mode).await?;
        }
        Ok(elapsed)
    }

    /// Class-scope teardown. Calling it again is a no-op.
    pub async fn final_teardown(&mut self) -> Result<(), TeardownError> {
        if self.state.is_terminal() {
            return Ok(());
        }
        let from = self.state;
        self.state = LifecycleState::TornDown;
        self.watch = None;
        let mode = self.mode();

        let Some(handles) = self.handles.take() else {
            debug!(class = %self.class.name(), "nothing to release");
            return Ok(());
        };

        let owned = match mode {
            LifecycleMode::PerTest => Some(handles),
            LifecycleMode::PerClass => {
                let worker = self.execution.worker();
                let removed = self.execution.shared().clear_if_owner(worker, &handles.context);
                if removed.is_none() {
                    debug!(
                        class = %self.class.name(),
                        worker = %worker,
                        "shared state is not owned by this context, leaving it"
                    );
                }
                removed
            }
        };

        if let Some(handles) = owned {
            release(&handles, mode).await?;
        }
        info!(class = %self.class.name(), from = %from, "class teardown complete");
        Ok(())
    }

    fn settings(&self) -> LifecycleSettings {
        self.settings
            .clone()
            .unwrap_or_else(|| HarnessSettings::from_env().lifecycle)
    }

    fn mode(&self) -> LifecycleMode {
        self.configuration
            .as_ref()
            .map_or(LifecycleMode::PerTest, |c| c.mode())
    }
}

impl<T> std::fmt::Debug for LifecycleOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleOrchestrator")
            .field("class", &self.class.name())
            .field("worker", self.execution.worker())
            .field("state", &self.state)
            .field("handles", &self.handles)
            .finish()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn inject<T>(
    config: &TestConfiguration<T>,
    handles: &SharedLifecycleState,
    fixture: &mut T,
    filter: impl Fn(&FieldInjection<T>) -> bool,
) -> Result<(), RuntimeSetupError> {
    for injection in config.injections.iter().filter(|&i| filter(i)) {
        injection
            .apply(fixture, &handles.context, &handles.producer)
            .map_err(|e| RuntimeSetupError::runtime(&config.class_name, "inject", e))?;
    }
    Ok(())
}

fn apply_replacements<T>(
    config: &TestConfiguration<T>,
    context: &dyn RuntimeContext,
) -> Result<(), RuntimeSetupError> {
    for (route_id, uri) in &config.replace_from {
        debug!(class = %config.class_name, route_id, uri, "replacing route source");
        context
            .replace_from(route_id, uri)
            .map_err(|e| RuntimeSetupError::runtime(&config.class_name, "replace_from", e))?;
    }
    Ok(())
}

/// Stop gateways, then the owning service or the context.
///
/// Every stop is attempted even when an earlier one fails.
async fn release(handles: &SharedLifecycleState, mode: LifecycleMode) -> Result<(), TeardownError> {
    let timeout = handles.context.shutdown_timeout();
    let mut errors = Vec::new();

    if let Err(source) = handles.consumer.stop().await {
        errors.push(TeardownError::Stop {
            service: handles.consumer.service_name().to_owned(),
            source,
        });
    }
    if let Err(source) = handles.producer.stop().await {
        errors.push(TeardownError::Stop {
            service: handles.producer.service_name().to_owned(),
            source,
        });
    }
    let stopped = match &handles.service {
        Some(service) => stop_bounded(service.as_ref(), timeout).await,
        None => stop_bounded(handles.context.as_ref(), timeout).await,
    };
    if let Err(source) = stopped {
        errors.push(TeardownError::Stop {
            service: handles.context.name().to_owned(),
            source,
        });
    }
    counter!(m::LIFECYCLE_CONTEXTS_STOPPED_TOTAL, m::LABEL_MODE => mode.label()).increment(1);

    let result = match errors.len() {
        0 => return Ok(()),
        1 => errors.remove(0),
        _ => TeardownError::Multiple(errors),
    };
    counter!(m::LIFECYCLE_TEARDOWN_FAILURES_TOTAL).increment(1);
    Err(result)
}

async fn stop_bounded<S>(service: &S, timeout: Duration) -> Result<(), RuntimeError>
where
    S: Service + ?Sized,
{
    match tokio::time::timeout(timeout + STOP_GRACE, service.stop()).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                service = service.service_name(),
                timeout_ms = timeout.as_millis() as u64,
                "stop did not finish within the shutdown timeout, treating as stopped"
            );
            Ok(())
        }
    }
}
