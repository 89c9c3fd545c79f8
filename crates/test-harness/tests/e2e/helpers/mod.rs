//! Shared E2E test helpers.
//!
//! Provides a context factory that records every build, a mock owning
//! service with failure injection, common fixtures and report assertions.

pub mod assertions;
pub mod fixtures;
pub mod mock_service;
