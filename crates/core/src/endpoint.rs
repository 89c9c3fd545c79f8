//! 엔드포인트 URI 패턴 매칭과 테스트 더블 가로채기 전략
//!
//! 패턴 규칙 (순서대로 시도):
//! 1. 정확히 일치
//! 2. `*`로 끝나면 접두어 일치 (`"*"` 단독이면 모든 URI)
//! 3. 정규식 전체 일치

use regex::Regex;
use serde::Serialize;

use crate::error::RuntimeError;

/// 테스트 더블 엔드포인트 scheme
pub const MOCK_SCHEME: &str = "mock";

/// URI의 scheme 부분을 반환합니다 (`"seda:foo"` → `"seda"`).
pub fn scheme(uri: &str) -> &str {
    uri.split_once(':').map_or(uri, |(s, _)| s)
}

/// 가로챈 엔드포인트에 대응하는 테스트 더블 URI를 반환합니다.
///
/// `"direct:foo"` → `"mock:direct:foo"`, `"file://target/out"` → `"mock:file:target/out"`
pub fn mock_uri_for(uri: &str) -> String {
    format!("{MOCK_SCHEME}:{}", normalize_uri(uri))
}

/// `scheme://path`를 `scheme:path`로 정규화합니다.
pub fn normalize_uri(uri: &str) -> String {
    match uri.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}:{rest}"),
        None => uri.to_owned(),
    }
}

/// URI가 패턴과 일치하는지 확인합니다.
///
/// 호출마다 정규식을 컴파일합니다. 디스패치 경로에서는 패턴을 한 번만
/// 컴파일해 두는 [`InterceptStrategy::applies_to`]를 사용합니다.
/// 정규식 컴파일 실패는 일치하지 않음으로 처리합니다.
pub fn matches_endpoint(uri: &str, pattern: &str) -> bool {
    let compiled = compile(pattern).ok();
    matches_normalized(&normalize_uri(uri), &normalize_uri(pattern), compiled.as_ref())
}

/// 패턴 전체 일치 정규식
fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", normalize_uri(pattern)))
}

fn matches_normalized(uri: &str, pattern: &str, compiled: Option<&Regex>) -> bool {
    if uri == pattern {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*')
        && uri.starts_with(prefix)
    {
        return true;
    }
    compiled.is_some_and(|re| re.is_match(uri))
}

/// 테스트 더블 가로채기 전략
///
/// 패턴과 일치하는 엔드포인트로 전송되는 메시지를 `mock:<uri>`로 복제합니다.
/// `skip`이 설정되면 원래 목적지로는 전송하지 않습니다.
#[derive(Debug, Clone, Serialize)]
pub struct InterceptStrategy {
    /// 가로챌 엔드포인트 패턴
    pub pattern: String,
    /// 원래 목적지 전송 생략 여부
    pub skip: bool,
    /// 정규화된 패턴
    #[serde(skip)]
    normalized: String,
    /// 생성 시 한 번 컴파일한 정규식 (접두어 와일드카드 전용 패턴이면 `None`일 수 있음)
    #[serde(skip)]
    compiled: Option<Regex>,
}

impl PartialEq for InterceptStrategy {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.skip == other.skip
    }
}

impl Eq for InterceptStrategy {}

impl InterceptStrategy {
    /// 패턴을 검증하고 전략을 생성합니다.
    pub fn new(pattern: impl Into<String>, skip: bool) -> Result<Self, RuntimeError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(RuntimeError::InvalidPattern {
                pattern,
                reason: "pattern must not be empty".to_owned(),
            });
        }
        let is_wildcard = pattern.ends_with('*') && !pattern[..pattern.len() - 1].contains('*');
        let compiled = match compile(&pattern) {
            Ok(re) => Some(re),
            Err(_) if is_wildcard => None,
            Err(e) => {
                return Err(RuntimeError::InvalidPattern {
                    pattern,
                    reason: e.to_string(),
                });
            }
        };
        Ok(Self {
            normalized: normalize_uri(&pattern),
            pattern,
            skip,
            compiled,
        })
    }

    /// 주어진 URI를 가로채야 하는지 판정합니다.
    ///
    /// 테스트 더블 엔드포인트 자신은 가로채지 않습니다.
    pub fn applies_to(&self, uri: &str) -> bool {
        scheme(uri) != MOCK_SCHEME
            && matches_normalized(&normalize_uri(uri), &self.normalized, self.compiled.as_ref())
    }
}
