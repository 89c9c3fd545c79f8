//! Error types for the test harness.
//!
//! Three failure kinds are kept apart so the host can tell *when* a test
//! failed:
//!
//! - [`ConfigurationError`]: raised while scanning a class definition,
//!   before any runtime resource exists.
//! - [`RuntimeSetupError`]: raised while building or starting a context.
//! - [`TeardownError`]: raised while releasing gateways or the context.
//!
//! [`HarnessError`] aggregates them for callers that only care about the
//! failure reason.

use switchyard_core::error::RuntimeError;

use crate::lifecycle::LifecycleState;
use crate::marker::MethodRole;

/// A malformed declarative configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The same type-level marker kind was registered twice.
    #[error("class [{class}] declares marker {marker} more than once")]
    ConflictingMarkers { class: String, marker: &'static str },

    /// A marked field is not public.
    #[error("field [{field}] is annotated with {marker} but is not public")]
    FieldNotPublic { field: String, marker: &'static str },

    /// A role method declares the wrong number of parameters.
    #[error(
        "method [{method}] is annotated with {role} but declares {actual} argument(s), expected {expected}"
    )]
    MethodArity {
        method: String,
        role: MethodRole,
        expected: usize,
        actual: usize,
    },

    /// A role method has the wrong return type.
    #[error("method [{method}] is annotated with {role} but does not return {expected} (returns {actual})")]
    MethodReturnType {
        method: String,
        role: MethodRole,
        expected: &'static str,
        actual: &'static str,
    },

    /// A role method parameter has the wrong type.
    #[error(
        "method [{method}] is annotated with {role} but its argument is {actual}, expected {expected}"
    )]
    MethodArgumentType {
        method: String,
        role: MethodRole,
        expected: &'static str,
        actual: &'static str,
    },

    /// A role method is not public.
    #[error("method [{method}] is annotated with {role} but is not public")]
    MethodNotPublic { method: String, role: MethodRole },

    /// A role method has no receiver.
    #[error("method [{method}] is annotated with {role} but is static")]
    MethodStatic { method: String, role: MethodRole },

    /// A mock pattern is empty or not a valid regular expression.
    #[error("marker {marker} has an invalid endpoint pattern '{pattern}': {reason}")]
    InvalidPattern {
        marker: &'static str,
        pattern: String,
        reason: String,
    },
}

impl ConfigurationError {
    /// Name of the method or field this error points at, if any.
    pub fn member(&self) -> Option<&str> {
        match self {
            Self::FieldNotPublic { field, .. } => Some(field),
            Self::MethodArity { method, .. }
            | Self::MethodReturnType { method, .. }
            | Self::MethodArgumentType { method, .. }
            | Self::MethodNotPublic { method, .. }
            | Self::MethodStatic { method, .. } => Some(method),
            Self::ConflictingMarkers { .. } | Self::InvalidPattern { .. } => None,
        }
    }
}

/// Failure while building, configuring or starting a runtime context.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeSetupError {
    /// A runtime collaborator call failed.
    #[error("{stage} failed for [{class}]: {source}")]
    Runtime {
        class: String,
        stage: &'static str,
        #[source]
        source: RuntimeError,
    },

    /// A registered provider could not be invoked with the expected types.
    #[error("provider method [{method}] could not be invoked: {reason}")]
    Invocation { method: String, reason: String },

    /// The orchestrator was driven out of order.
    #[error("invalid lifecycle transition from {from} on {operation}")]
    InvalidTransition {
        from: LifecycleState,
        operation: &'static str,
    },
}

impl RuntimeSetupError {
    pub(crate) fn runtime(class: &str, stage: &'static str, source: RuntimeError) -> Self {
        Self::Runtime {
            class: class.to_owned(),
            stage,
            source,
        }
    }

    /// Setup stage label used for logging and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Runtime { stage, .. } => stage,
            Self::Invocation { .. } => "invoke",
            Self::InvalidTransition { .. } => "transition",
        }
    }
}

/// Failure while releasing gateways or a context.
#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    /// Stopping a service failed.
    #[error("failed to stop {service}: {source}")]
    Stop {
        service: String,
        #[source]
        source: RuntimeError,
    },

    /// Several services failed to stop; all were still attempted.
    #[error("{} service(s) failed to stop: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<TeardownError>),

    /// The orchestrator was driven out of order.
    #[error("invalid lifecycle transition from {from} on {operation}")]
    InvalidTransition {
        from: LifecycleState,
        operation: &'static str,
    },
}

fn join_errors(errors: &[TeardownError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Any failure the harness reports to the host.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("setup error: {0}")]
    Setup(#[from] RuntimeSetupError),

    #[error("teardown error: {0}")]
    Teardown(#[from] TeardownError),
}
