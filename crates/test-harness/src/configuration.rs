//! Scanned, immutable configuration of one test class.
//!
//! [`TestConfiguration`] is produced once per class by the scanner and
//! shared behind an `Arc` afterwards. Provider methods are kept as
//! [`BoundMethod`]s whose argument and return types were already checked,
//! so invoking them only fails on a broken registration.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use switchyard_core::debug::Breakpoint;
use switchyard_core::endpoint::InterceptStrategy;
use switchyard_core::error::RuntimeError;
use switchyard_core::properties::Properties;
use switchyard_core::registry::Registry;
use switchyard_core::route::RouteBuilder;
use switchyard_core::runtime::{BoundProducer, ProducerGateway, RuntimeContext};

use crate::definition::{FieldSetter, Invoker};
use crate::error::RuntimeSetupError;
use crate::lifecycle::LifecycleMode;
use crate::marker::{FieldMarker, TimeUnit};

/// Default shutdown timeout value, in [`DEFAULT_SHUTDOWN_UNIT`].
pub const DEFAULT_SHUTDOWN_VALUE: u64 = 10;

/// Default shutdown timeout unit.
pub const DEFAULT_SHUTDOWN_UNIT: TimeUnit = TimeUnit::Seconds;

/// Upper bound for stopping a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownTimeout {
    pub value: u64,
    pub unit: TimeUnit,
}

impl ShutdownTimeout {
    pub fn as_duration(&self) -> Duration {
        self.unit.to_duration(self.value)
    }
}

impl Default for ShutdownTimeout {
    fn default() -> Self {
        Self {
            value: DEFAULT_SHUTDOWN_VALUE,
            unit: DEFAULT_SHUTDOWN_UNIT,
        }
    }
}

impl fmt::Display for ShutdownTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

// ─── Provider methods ────────────────────────────────────────────────

/// A validated provider method returning `R`.
pub struct BoundMethod<T, R> {
    name: String,
    invoker: Invoker<T>,
    _returns: PhantomData<fn() -> R>,
}

/// Produces route definitions to register.
pub type RouteProvider<T> = BoundMethod<T, RouteBuilder>;
/// Produces a breakpoint for the debugger.
pub type BreakpointProvider<T> = BoundMethod<T, Arc<dyn Breakpoint>>;
/// Produces code-level property overrides.
pub type PropertyOverrideSupplier<T> = BoundMethod<T, Properties>;
/// Decorates the registry handed to the context factory.
pub type RegistryFactory<T> = BoundMethod<T, Registry>;

impl<T, R: Any> BoundMethod<T, R> {
    pub(crate) fn new(name: impl Into<String>, invoker: Invoker<T>) -> Self {
        Self {
            name: name.into(),
            invoker,
            _returns: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke a no-argument provider on `fixture`.
    pub fn invoke(&self, fixture: &mut T) -> Result<R, RuntimeSetupError> {
        self.call(fixture, Vec::new())
    }

    /// Invoke a one-argument provider on `fixture`.
    pub fn invoke_with<A: Any + Send>(&self, fixture: &mut T, arg: A) -> Result<R, RuntimeSetupError> {
        self.call(fixture, vec![Box::new(arg)])
    }

    fn call(&self, fixture: &mut T, args: Vec<Box<dyn Any + Send>>) -> Result<R, RuntimeSetupError> {
        let out = (self.invoker)(fixture, args).ok_or_else(|| RuntimeSetupError::Invocation {
            method: self.name.clone(),
            reason: "argument type mismatch".to_owned(),
        })?;
        out.downcast::<R>()
            .map(|value| *value)
            .map_err(|_| RuntimeSetupError::Invocation {
                method: self.name.clone(),
                reason: format!("expected {}", std::any::type_name::<R>()),
            })
    }
}

impl<T, R> Clone for BoundMethod<T, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            invoker: Arc::clone(&self.invoker),
            _returns: PhantomData,
        }
    }
}

impl<T, R> fmt::Debug for BoundMethod<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundMethod").field(&self.name).finish()
    }
}

// ─── Field injection ─────────────────────────────────────────────────

/// A validated injection into a public fixture field.
pub struct FieldInjection<T> {
    name: String,
    setter: FieldSetter<T>,
}

impl<T> FieldInjection<T> {
    pub(crate) fn new(name: impl Into<String>, setter: FieldSetter<T>) -> Self {
        Self {
            name: name.into(),
            setter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marker(&self) -> FieldMarker {
        self.setter.marker()
    }

    /// Whether the field receives the context itself.
    pub fn is_context(&self) -> bool {
        matches!(self.setter, FieldSetter::Context(_))
    }

    /// Write the injected value into `fixture`.
    pub(crate) fn apply(
        &self,
        fixture: &mut T,
        context: &Arc<dyn RuntimeContext>,
        producer: &Arc<dyn ProducerGateway>,
    ) -> Result<(), RuntimeError> {
        match &self.setter {
            FieldSetter::Context(set) => set(fixture, Arc::clone(context)),
            FieldSetter::Endpoint { uri, set } => set(fixture, context.mock_endpoint(uri)?),
            FieldSetter::Producer { uri, set } => {
                set(fixture, BoundProducer::new(Arc::clone(producer), uri.clone()))
            }
        }
        Ok(())
    }
}

impl<T> Clone for FieldInjection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<T> fmt::Debug for FieldInjection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInjection")
            .field("name", &self.name)
            .field("marker", &self.marker())
            .finish()
    }
}

// ─── TestConfiguration ───────────────────────────────────────────────

/// Everything the orchestrator needs to know about one test class.
pub struct TestConfiguration<T> {
    pub class_name: String,
    pub use_advice_with: bool,
    pub use_route_builder: bool,
    pub disable_management_agent: bool,
    pub use_debugger: bool,
    pub share_context_per_class: bool,
    pub ignore_missing_property_location: bool,
    pub mock_endpoints_pattern: Option<String>,
    pub mock_and_skip_pattern: Option<String>,
    pub shutdown_timeout: ShutdownTimeout,
    /// Discovery order.
    pub route_providers: Vec<RouteProvider<T>>,
    /// Discovery order.
    pub breakpoint_providers: Vec<BreakpointProvider<T>>,
    pub property_override: Option<PropertyOverrideSupplier<T>>,
    pub registry_factory: Option<RegistryFactory<T>>,
    pub injections: Vec<FieldInjection<T>>,
    pub replace_from: Vec<(String, String)>,
    /// Strategies built from the mock patterns, already validated.
    pub intercept_strategies: Vec<InterceptStrategy>,
}

impl<T> fmt::Debug for TestConfiguration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConfiguration")
            .field("class_name", &self.class_name)
            .field("use_advice_with", &self.use_advice_with)
            .field("use_route_builder", &self.use_route_builder)
            .field("disable_management_agent", &self.disable_management_agent)
            .field("use_debugger", &self.use_debugger)
            .field("share_context_per_class", &self.share_context_per_class)
            .field("ignore_missing_property_location", &self.ignore_missing_property_location)
            .field("mock_endpoints_pattern", &self.mock_endpoints_pattern)
            .field("mock_and_skip_pattern", &self.mock_and_skip_pattern)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("route_providers", &self.route_providers)
            .field("breakpoint_providers", &self.breakpoint_providers)
            .field("property_override", &self.property_override)
            .field("registry_factory", &self.registry_factory)
            .field("injections", &self.injections)
            .field("replace_from", &self.replace_from)
            .field("intercept_strategies", &self.intercept_strategies)
            .finish()
    }
}

impl<T> TestConfiguration<T> {
    /// Configuration of a class without any marker.
    pub fn empty(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            use_advice_with: false,
            use_route_builder: true,
            disable_management_agent: false,
            use_debugger: false,
            share_context_per_class: false,
            ignore_missing_property_location: false,
            mock_endpoints_pattern: None,
            mock_and_skip_pattern: None,
            shutdown_timeout: ShutdownTimeout::default(),
            route_providers: Vec::new(),
            breakpoint_providers: Vec::new(),
            property_override: None,
            registry_factory: None,
            injections: Vec::new(),
            replace_from: Vec::new(),
            intercept_strategies: Vec::new(),
        }
    }

    pub fn mode(&self) -> LifecycleMode {
        if self.share_context_per_class {
            LifecycleMode::PerClass
        } else {
            LifecycleMode::PerTest
        }
    }

    /// Serializable view without the callables.
    pub fn summary(&self) -> ConfigurationSummary {
        ConfigurationSummary {
            class_name: self.class_name.clone(),
            mode: self.mode(),
            use_advice_with: self.use_advice_with,
            use_route_builder: self.use_route_builder,
            disable_management_agent: self.disable_management_agent,
            use_debugger: self.use_debugger,
            ignore_missing_property_location: self.ignore_missing_property_location,
            mock_endpoints_pattern: self.mock_endpoints_pattern.clone(),
            mock_and_skip_pattern: self.mock_and_skip_pattern.clone(),
            shutdown_timeout: self.shutdown_timeout,
            route_providers: self
                .route_providers
                .iter()
                .map(|m| m.name().to_owned())
                .collect(),
            breakpoint_providers: self
                .breakpoint_providers
                .iter()
                .map(|m| m.name().to_owned())
                .collect(),
            property_override: self.property_override.as_ref().map(|m| m.name().to_owned()),
            registry_factory: self.registry_factory.as_ref().map(|m| m.name().to_owned()),
            injections: self
                .injections
                .iter()
                .map(|i| (i.name().to_owned(), i.marker()))
                .collect(),
            replace_from: self.replace_from.clone(),
        }
    }
}

/// Flags, patterns and provider names of a [`TestConfiguration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationSummary {
    pub class_name: String,
    pub mode: LifecycleMode,
    pub use_advice_with: bool,
    pub use_route_builder: bool,
    pub disable_management_agent: bool,
    pub use_debugger: bool,
    pub ignore_missing_property_location: bool,
    pub mock_endpoints_pattern: Option<String>,
    pub mock_and_skip_pattern: Option<String>,
    pub shutdown_timeout: ShutdownTimeout,
    pub route_providers: Vec<String>,
    pub breakpoint_providers: Vec<String>,
    pub property_override: Option<String>,
    pub registry_factory: Option<String>,
    pub injections: Vec<(String, FieldMarker)>,
    pub replace_from: Vec<(String, String)>,
}
