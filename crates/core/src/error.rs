//! 에러 타입 — 런타임 협력자와 설정 에러 정의
//!
//! [`RuntimeError`]는 런타임 컨텍스트, 게이트웨이, 속성 제공자 등
//! 외부 협력자가 반환하는 에러입니다. 테스트 하네스는 이를
//! 셋업/정리 에러로 감싸서 보고합니다.

/// 런타임 협력자 에러
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// 서비스가 요청한 상태 전환을 수행할 수 없음
    #[error("invalid service state for '{service}': {reason}")]
    InvalidState { service: String, reason: String },

    /// 알 수 없는 엔드포인트 컴포넌트 (URI scheme)
    #[error("no component found for endpoint uri: {0}")]
    UnknownComponent(String),

    /// direct 엔드포인트에 소비자가 없음
    #[error("no consumers available on endpoint: {0}")]
    NoConsumers(String),

    /// 라우트 ID를 찾을 수 없음
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// 라우트 등록 실패
    #[error("failed to add route '{route}': {reason}")]
    RouteRegistration { route: String, reason: String },

    /// 속성 플레이스홀더를 해석할 수 없음
    #[error("property with key [{key}] not found in properties")]
    PropertyNotFound { key: String },

    /// 속성 파일 위치를 찾을 수 없음
    #[error("properties location not found: {path}")]
    PropertyLocationNotFound { path: String },

    /// 디버거가 설치되지 않은 상태에서 브레이크포인트 등록 시도
    #[error("debugger is not installed on context '{0}'")]
    DebuggerNotInstalled(String),

    /// 잘못된 엔드포인트 패턴
    #[error("invalid endpoint pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// 메시지 처리 실패
    #[error("exchange {exchange_id} failed at '{endpoint}': {reason}")]
    Processing {
        exchange_id: String,
        endpoint: String,
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 하네스 설정 에러
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// 설정 파일을 찾을 수 없음
    #[error("settings file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse settings: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid settings value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 테스트 더블 엔드포인트의 기대값 검증 실패
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionError {
    /// 수신 메시지 수 불일치
    #[error("{endpoint}: received message count {actual}, expected {expected}")]
    MessageCount {
        endpoint: String,
        expected: usize,
        actual: usize,
    },

    /// 메시지 본문 불일치
    #[error("{endpoint}: message #{index} body {actual}, expected {expected}")]
    Body {
        endpoint: String,
        index: usize,
        expected: String,
        actual: String,
    },

    /// 헤더 불일치
    #[error("{endpoint}: header '{header}' was {actual}, expected {expected}")]
    Header {
        endpoint: String,
        header: String,
        expected: String,
        actual: String,
    },
}
