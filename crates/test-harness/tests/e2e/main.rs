//! E2E integration tests for switchyard-test.
//!
//! These tests drive whole test classes through the class runner and the
//! lifecycle orchestrator against the in-memory runtime.
//!
//! # Test Structure
//!
//! - `helpers/` -- Shared test utilities (recording factory, mock service, fixtures, assertions)
//! - `scenarios/` -- Test files organized by scenario
//!
//! # Running
//!
//! ```bash
//! cargo test -p switchyard-test --test e2e
//! ```

mod helpers;
mod scenarios;
