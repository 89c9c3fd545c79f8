#![doc = include_str!("../README.md")]
//!
//! # Modules
//!
//! - [`marker`]: type, field and method markers
//! - [`definition`]: explicit class registration ([`ClassDefinition`])
//! - [`scanner`]: validation of a class definition into a [`TestConfiguration`]
//! - [`configuration`]: the immutable per-class configuration
//! - [`orchestrator`]: context build, reuse and release per test method
//! - [`lifecycle`]: orchestrator state machine and lifecycle modes
//! - [`shared`]: per-worker shared lifecycle registry
//! - [`hooks`]: user hook chain and the setup/teardown wrappers
//! - [`runner`]: class runner that produces a [`ClassReport`]
//! - [`logging`]: `tracing-subscriber` initialization
//! - [`error`]: harness error taxonomy
//!
//! # Flow
//!
//! ```text
//! ClassDefinition -> ConfigurationScanner -> TestConfiguration
//!                                                  |
//!   HookChain -> ClassRunner -> LifecycleOrchestrator -> ContextFactory
//!                                        |
//!                             SharedLifecycleRegistry (per worker)
//! ```

pub mod configuration;
pub mod definition;
pub mod error;
pub mod hooks;
pub mod lifecycle;
pub mod logging;
pub mod marker;
pub mod orchestrator;
pub mod runner;
pub mod scanner;
pub mod shared;

// --- re-exports ---

pub use configuration::{ConfigurationSummary, ShutdownTimeout, TestConfiguration};
pub use definition::{ClassDefinition, FieldDecl, MethodDecl, TypeTag};
pub use error::{ConfigurationError, HarnessError, RuntimeSetupError, TeardownError};
pub use hooks::{HookChain, catch_panic, with_class_teardown, with_setup, with_teardown};
pub use lifecycle::{LifecycleMode, LifecycleState};
pub use marker::{FieldMarker, MethodRole, Receiver, TimeUnit, TypeMarker, Visibility};
pub use orchestrator::LifecycleOrchestrator;
pub use runner::{ClassReport, ClassRunner, FailurePhase, MethodOutcome, MethodStatus};
pub use scanner::ConfigurationScanner;
pub use shared::{ExecutionContext, SharedLifecycleRegistry, SharedLifecycleState, WorkerKey};
