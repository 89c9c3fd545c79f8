//! 속성 제공자 — `{{key}}` 플레이스홀더 해석과 코드 수준 오버라이드
//!
//! 조회 우선순위:
//! 1. 코드 수준 오버라이드 ([`PropertyProvider::set_override_properties`])
//! 2. 외부 속성 (속성 파일 위치, 직접 지정한 초기 속성)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// 플레이스홀더 시작 토큰
pub const PLACEHOLDER_PREFIX: &str = "{{";
/// 플레이스홀더 종료 토큰
pub const PLACEHOLDER_SUFFIX: &str = "}}";

/// 키-값 속성 묶음
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// 빈 속성 묶음을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 속성을 추가한 뒤 자신을 반환합니다.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// 속성을 설정합니다.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// 속성을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// 다른 속성 묶음을 덮어씁니다.
    pub fn extend(&mut self, other: Properties) {
        self.0.extend(other.0);
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 속성 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 키-값 쌍을 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// 런타임 컨텍스트의 속성 제공자 (설정 컴포넌트)
pub trait PropertyProvider: Send + Sync {
    /// 코드 수준 오버라이드 속성을 설정합니다.
    fn set_override_properties(&self, properties: Properties);

    /// 속성 파일 위치가 없을 때 무시할지 설정합니다.
    fn set_ignore_missing_location(&self, ignore: bool);

    /// 속성 파일 위치가 없을 때 무시하는지 반환합니다.
    fn ignore_missing_location(&self) -> bool;

    /// 키에 해당하는 값을 조회합니다 (오버라이드 우선).
    fn resolve(&self, key: &str) -> Option<String>;

    /// 텍스트 안의 `{{key}}` 플레이스홀더를 모두 해석합니다.
    fn resolve_placeholders(&self, text: &str) -> Result<String, RuntimeError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
            out.push_str(&rest[..start]);
            let after = &rest[start + PLACEHOLDER_PREFIX.len()..];
            let Some(end) = after.find(PLACEHOLDER_SUFFIX) else {
                // 닫히지 않은 토큰은 리터럴로 취급
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let key = after[..end].trim();
            let value = self
                .resolve(key)
                .ok_or_else(|| RuntimeError::PropertyNotFound {
                    key: key.to_owned(),
                })?;
            out.push_str(&value);
            rest = &after[end + PLACEHOLDER_SUFFIX.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
