//! Class report assertion helpers.

use std::time::Duration;

use switchyard_test::{ClassReport, FailurePhase, MethodStatus};

/// Wait bound for test-double expectations.
#[allow(dead_code)]
pub const WAIT: Duration = Duration::from_secs(5);

/// Assert that every method passed and no class-level step failed.
///
/// # Panics
///
/// Panics with the full report otherwise.
#[allow(dead_code)]
pub fn assert_all_passed(report: &ClassReport) {
    assert!(
        report.is_success(),
        "expected class {} to pass, got {:#?}",
        report.class,
        report
    );
}

/// Assert that `method` failed in `phase` and return its failure message.
#[allow(dead_code)]
pub fn assert_failed_in(report: &ClassReport, method: &str, phase: FailurePhase) -> String {
    let outcome = report
        .outcome(method)
        .unwrap_or_else(|| panic!("no outcome for method {method}"));
    match &outcome.status {
        MethodStatus::Failed {
            phase: actual,
            message,
        } => {
            assert_eq!(*actual, phase, "unexpected failure phase: {message}");
            message.clone()
        }
        other => panic!("expected {method} to fail in {phase:?}, got {other:?}"),
    }
}
