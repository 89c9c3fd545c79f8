//! E2E test scenarios.
//!
//! - `per_test`: a fresh context per method
//! - `shared_context`: one context per class and worker
//! - `configuration`: malformed class definitions
//! - `debugger`: breakpoints through the debugger marker
//! - `properties`: property overrides, registry and context options
//! - `endpoints`: intercept strategies, seda, replace-from, route builder switch
//! - `lifecycle`: hooks, skip-start, owning service and teardown composition

mod configuration;
mod debugger;
mod endpoints;
mod lifecycle;
mod shared_context;
