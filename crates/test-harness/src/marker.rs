//! Declarative markers attached to a test class definition.
//!
//! Markers come in three flavours:
//!
//! - [`TypeMarker`]: class-wide switches (debugger, shared context, mock patterns ...).
//! - [`FieldMarker`]: injection targets on fixture fields.
//! - [`MethodRole`]: provider roles on fixture methods.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time unit of a [`TypeMarker::ShutdownTimeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Convert `value` of this unit into a [`Duration`], saturating on overflow.
    pub fn to_duration(self, value: u64) -> Duration {
        match self {
            Self::Nanoseconds => Duration::from_nanos(value),
            Self::Microseconds => Duration::from_micros(value),
            Self::Milliseconds => Duration::from_millis(value),
            Self::Seconds => Duration::from_secs(value),
            Self::Minutes => Duration::from_secs(value.saturating_mul(60)),
            Self::Hours => Duration::from_secs(value.saturating_mul(3_600)),
            Self::Days => Duration::from_secs(value.saturating_mul(86_400)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nanoseconds => write!(f, "ns"),
            Self::Microseconds => write!(f, "us"),
            Self::Milliseconds => write!(f, "ms"),
            Self::Seconds => write!(f, "s"),
            Self::Minutes => write!(f, "min"),
            Self::Hours => write!(f, "h"),
            Self::Days => write!(f, "d"),
        }
    }
}

/// Class-wide marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeMarker {
    /// Advice-only mode: the context is built but never auto-started.
    UseAdviceWith(bool),
    /// Whether route-definition providers are invoked at all.
    UseRouteBuilder(bool),
    /// Disable the runtime's management agent.
    DisableManagementAgent(bool),
    /// Install a debugger and register breakpoint providers.
    UseDebugger(bool),
    /// Share one context across all methods of the class on a worker.
    ShareContextPerClass(bool),
    /// Copy exchanges sent to matching endpoints into `mock:` test doubles.
    MockEndpoints(String),
    /// Like [`TypeMarker::MockEndpoints`] but skip the original destination.
    MockEndpointsAndSkip(String),
    /// Upper bound for a graceful context stop.
    ShutdownTimeout { value: u64, unit: TimeUnit },
    /// Do not fail when a property file location is missing.
    IgnoreMissingPropertyLocation(bool),
}

impl TypeMarker {
    /// `MockEndpoints` with the default pattern, matching every endpoint.
    pub fn mock_endpoints() -> Self {
        Self::MockEndpoints("*".to_owned())
    }

    /// Marker kind; two markers of the same kind conflict.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UseAdviceWith(_) => "UseAdviceWith",
            Self::UseRouteBuilder(_) => "UseRouteBuilder",
            Self::DisableManagementAgent(_) => "DisableManagementAgent",
            Self::UseDebugger(_) => "UseDebugger",
            Self::ShareContextPerClass(_) => "ShareContextPerClass",
            Self::MockEndpoints(_) => "MockEndpoints",
            Self::MockEndpointsAndSkip(_) => "MockEndpointsAndSkip",
            Self::ShutdownTimeout { .. } => "ShutdownTimeout",
            Self::IgnoreMissingPropertyLocation(_) => "IgnoreMissingPropertyLocation",
        }
    }
}

/// Injection target on a fixture field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldMarker {
    /// Receives the live runtime context.
    ContextInject,
    /// Receives the `mock:` test double with this URI.
    EndpointInject(String),
    /// Receives a producer bound to this default URI.
    Produce(String),
}

impl FieldMarker {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ContextInject => "ContextInject",
            Self::EndpointInject(_) => "EndpointInject",
            Self::Produce(_) => "Produce",
        }
    }
}

/// Provider role of a fixture method.
///
/// Declaration order is the precedence order: when a method carries several
/// roles, the smallest one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MethodRole {
    /// `fn(&mut self) -> RouteBuilder`
    RouteDefinitionProvider,
    /// `fn(&mut self) -> Properties`
    PropertyOverrideSupplier,
    /// `fn(&mut self, Registry) -> Registry`
    RegistryFactory,
    /// `fn(&mut self) -> Arc<dyn Breakpoint>`
    BreakpointProvider,
}

impl fmt::Display for MethodRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteDefinitionProvider => write!(f, "RouteDefinitionProvider"),
            Self::PropertyOverrideSupplier => write!(f, "PropertyOverrideSupplier"),
            Self::RegistryFactory => write!(f, "RegistryFactory"),
            Self::BreakpointProvider => write!(f, "BreakpointProvider"),
        }
    }
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Crate,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Whether a method takes the fixture as receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Receiver {
    #[default]
    Instance,
    Static,
}
