//! 메트릭 상수 및 설명 등록
//!
//! 하네스와 메모리 런타임이 기록하는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다. 레코더가 설치되지 않으면
//! 모든 호출은 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `switchyard_`
//! - 영역: `lifecycle_`, `runtime_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(switchyard_core::metrics::LIFECYCLE_CONTEXTS_CREATED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 생명주기 모드 레이블 키 (per_test, per_class)
pub const LABEL_MODE: &str = "mode";

/// 실패 단계 레이블 키 (scan, build, start, stop)
pub const LABEL_STAGE: &str = "stage";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 엔드포인트 스킴 레이블 키 (direct, seda, mock, log)
pub const LABEL_SCHEME: &str = "scheme";

// ─── Lifecycle 메트릭 ──────────────────────────────────────────────

/// Lifecycle: 생성된 컨텍스트 수 (counter, label: mode)
pub const LIFECYCLE_CONTEXTS_CREATED_TOTAL: &str = "switchyard_lifecycle_contexts_created_total";

/// Lifecycle: 재사용(리셋)된 공유 컨텍스트 수 (counter)
pub const LIFECYCLE_CONTEXTS_REUSED_TOTAL: &str = "switchyard_lifecycle_contexts_reused_total";

/// Lifecycle: 정지된 컨텍스트 수 (counter, label: mode)
pub const LIFECYCLE_CONTEXTS_STOPPED_TOTAL: &str = "switchyard_lifecycle_contexts_stopped_total";

/// Lifecycle: 셋업 실패 수 (counter, label: stage)
pub const LIFECYCLE_SETUP_FAILURES_TOTAL: &str = "switchyard_lifecycle_setup_failures_total";

/// Lifecycle: 티어다운 실패 수 (counter)
pub const LIFECYCLE_TEARDOWN_FAILURES_TOTAL: &str = "switchyard_lifecycle_teardown_failures_total";

/// Lifecycle: 테스트 본문 실행 시간 (histogram, 초, label: result)
pub const LIFECYCLE_TEST_DURATION_SECONDS: &str = "switchyard_lifecycle_test_duration_seconds";

// ─── Runtime 메트릭 ────────────────────────────────────────────────

/// Runtime: 처리된 교환 수 (counter, label: scheme)
pub const RUNTIME_EXCHANGES_PROCESSED_TOTAL: &str = "switchyard_runtime_exchanges_processed_total";

/// Runtime: 처리 실패한 교환 수 (counter)
pub const RUNTIME_EXCHANGES_FAILED_TOTAL: &str = "switchyard_runtime_exchanges_failed_total";

/// Runtime: 테스트 더블이 수신한 교환 수 (counter)
pub const RUNTIME_MOCK_RECEIVED_TOTAL: &str = "switchyard_runtime_mock_received_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 테스트 실행 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 60s 범위
pub const TEST_DURATION_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 10.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    // Lifecycle
    describe_counter!(
        LIFECYCLE_CONTEXTS_CREATED_TOTAL,
        "Total number of runtime contexts built by the orchestrator"
    );
    describe_counter!(
        LIFECYCLE_CONTEXTS_REUSED_TOTAL,
        "Total number of shared contexts reset and reused between tests"
    );
    describe_counter!(
        LIFECYCLE_CONTEXTS_STOPPED_TOTAL,
        "Total number of runtime contexts stopped during teardown"
    );
    describe_counter!(
        LIFECYCLE_SETUP_FAILURES_TOTAL,
        "Total number of setup failures by stage"
    );
    describe_counter!(
        LIFECYCLE_TEARDOWN_FAILURES_TOTAL,
        "Total number of teardown failures"
    );
    describe_histogram!(
        LIFECYCLE_TEST_DURATION_SECONDS,
        "Test body execution time in seconds"
    );

    // Runtime
    describe_counter!(
        RUNTIME_EXCHANGES_PROCESSED_TOTAL,
        "Total number of exchanges processed by the in-memory runtime"
    );
    describe_counter!(
        RUNTIME_EXCHANGES_FAILED_TOTAL,
        "Total number of exchanges that failed during processing"
    );
    describe_counter!(
        RUNTIME_MOCK_RECEIVED_TOTAL,
        "Total number of exchanges received by mock endpoints"
    );
}
