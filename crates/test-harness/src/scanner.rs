//! Configuration scanner.
//!
//! Turns a [`ClassDefinition`] into a [`TestConfiguration`]. Scanning is
//! eager and total: every marker, field and method is checked and the first
//! violation is returned before any runtime resource exists.
//!
//! # Method role contracts
//!
//! | role | params | returns |
//! |------|--------|---------|
//! | `RouteDefinitionProvider` | none | `RouteBuilder` |
//! | `PropertyOverrideSupplier` | none | `Properties` |
//! | `RegistryFactory` | `Registry` | `Registry` |
//! | `BreakpointProvider` | none | `Arc<dyn Breakpoint>` |
//!
//! Every role method must also be public and take the fixture as receiver.
//! Checks run in that order: arity, return type, visibility, receiver.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use switchyard_core::debug::Breakpoint;
use switchyard_core::endpoint::InterceptStrategy;
use switchyard_core::properties::Properties;
use switchyard_core::registry::Registry;
use switchyard_core::route::RouteBuilder;

use crate::configuration::{BoundMethod, FieldInjection, ShutdownTimeout, TestConfiguration};
use crate::definition::{ClassDefinition, MethodDecl, TypeTag};
use crate::error::ConfigurationError;
use crate::marker::{MethodRole, Receiver, TypeMarker};

/// Expected signature of a role method.
struct RoleContract {
    params: Vec<TypeTag>,
    returns: TypeTag,
}

impl RoleContract {
    fn of(role: MethodRole) -> Self {
        match role {
            MethodRole::RouteDefinitionProvider => Self {
                params: Vec::new(),
                returns: TypeTag::of::<RouteBuilder>(),
            },
            MethodRole::PropertyOverrideSupplier => Self {
                params: Vec::new(),
                returns: TypeTag::of::<Properties>(),
            },
            MethodRole::RegistryFactory => Self {
                params: vec![TypeTag::of::<Registry>()],
                returns: TypeTag::of::<Registry>(),
            },
            MethodRole::BreakpointProvider => Self {
                params: Vec::new(),
                returns: TypeTag::of::<Arc<dyn Breakpoint>>(),
            },
        }
    }
}

/// Scans class definitions into configurations.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigurationScanner;

impl ConfigurationScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan `class`. Scanning the same definition twice gives equal results.
    pub fn scan<T: 'static>(
        &self,
        class: &ClassDefinition<T>,
    ) -> Result<TestConfiguration<T>, ConfigurationError> {
        let mut config = TestConfiguration::empty(class.name());
        scan_type_markers(class, &mut config)?;
        scan_fields(class, &mut config)?;
        scan_methods(class, &mut config)?;
        config.replace_from = class.pending_replacements().to_vec();

        debug!(
            class = %config.class_name,
            mode = %config.mode(),
            routes = config.route_providers.len(),
            breakpoints = config.breakpoint_providers.len(),
            injections = config.injections.len(),
            "class definition scanned"
        );
        Ok(config)
    }
}

fn scan_type_markers<T>(
    class: &ClassDefinition<T>,
    config: &mut TestConfiguration<T>,
) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for marker in class.type_markers() {
        if !seen.insert(marker.kind()) {
            return Err(ConfigurationError::ConflictingMarkers {
                class: class.name().to_owned(),
                marker: marker.kind(),
            });
        }

        match marker {
            TypeMarker::UseAdviceWith(v) => config.use_advice_with = *v,
            TypeMarker::UseRouteBuilder(v) => config.use_route_builder = *v,
            TypeMarker::DisableManagementAgent(v) => config.disable_management_agent = *v,
            TypeMarker::UseDebugger(v) => config.use_debugger = *v,
            TypeMarker::ShareContextPerClass(v) => config.share_context_per_class = *v,
            TypeMarker::IgnoreMissingPropertyLocation(v) => {
                config.ignore_missing_property_location = *v;
            }
            TypeMarker::ShutdownTimeout { value, unit } => {
                config.shutdown_timeout = ShutdownTimeout {
                    value: *value,
                    unit: *unit,
                };
            }
            TypeMarker::MockEndpoints(pattern) => {
                config
                    .intercept_strategies
                    .push(strategy(marker.kind(), pattern, false)?);
                config.mock_endpoints_pattern = Some(pattern.clone());
            }
            TypeMarker::MockEndpointsAndSkip(pattern) => {
                config
                    .intercept_strategies
                    .push(strategy(marker.kind(), pattern, true)?);
                config.mock_and_skip_pattern = Some(pattern.clone());
            }
        }
    }
    Ok(())
}

fn strategy(
    marker: &'static str,
    pattern: &str,
    skip: bool,
) -> Result<InterceptStrategy, ConfigurationError> {
    InterceptStrategy::new(pattern, skip).map_err(|e| ConfigurationError::InvalidPattern {
        marker,
        pattern: pattern.to_owned(),
        reason: e.to_string(),
    })
}

fn scan_fields<T>(
    class: &ClassDefinition<T>,
    config: &mut TestConfiguration<T>,
) -> Result<(), ConfigurationError> {
    for field in class.fields() {
        let Some(setter) = field.setter() else {
            continue;
        };
        if !field.is_public() {
            return Err(ConfigurationError::FieldNotPublic {
                field: field.name().to_owned(),
                marker: setter.marker().name(),
            });
        }
        config
            .injections
            .push(FieldInjection::new(field.name(), setter.clone()));
    }
    Ok(())
}

fn scan_methods<T>(
    class: &ClassDefinition<T>,
    config: &mut TestConfiguration<T>,
) -> Result<(), ConfigurationError> {
    for method in class.methods() {
        let Some(role) = method.primary_role() else {
            continue;
        };
        check_contract(method, role)?;

        let name = method.name();
        match role {
            MethodRole::RouteDefinitionProvider => config
                .route_providers
                .push(BoundMethod::new(name, method.invoker())),
            MethodRole::BreakpointProvider => config
                .breakpoint_providers
                .push(BoundMethod::new(name, method.invoker())),
            // last registration wins
            MethodRole::PropertyOverrideSupplier => {
                config.property_override = Some(BoundMethod::new(name, method.invoker()));
            }
            MethodRole::RegistryFactory => {
                config.registry_factory = Some(BoundMethod::new(name, method.invoker()));
            }
        }
    }
    Ok(())
}

fn check_contract<T>(method: &MethodDecl<T>, role: MethodRole) -> Result<(), ConfigurationError> {
    let contract = RoleContract::of(role);
    let name = || method.name().to_owned();

    if method.params().len() != contract.params.len() {
        return Err(ConfigurationError::MethodArity {
            method: name(),
            role,
            expected: contract.params.len(),
            actual: method.params().len(),
        });
    }
    if method.returns() != contract.returns {
        return Err(ConfigurationError::MethodReturnType {
            method: name(),
            role,
            expected: contract.returns.name(),
            actual: method.returns().name(),
        });
    }
    if !method.is_public() {
        return Err(ConfigurationError::MethodNotPublic { method: name(), role });
    }
    if method.receiver() == Receiver::Static {
        return Err(ConfigurationError::MethodStatic { method: name(), role });
    }
    if let Some((actual, expected)) = method
        .params()
        .iter()
        .zip(&contract.params)
        .find(|(actual, expected)| actual != expected)
    {
        return Err(ConfigurationError::MethodArgumentType {
            method: name(),
            role,
            expected: expected.name(),
            actual: actual.name(),
        });
    }
    Ok(())
}
