//! 메시지 교환 단위 — 라우트를 흐르는 메시지
//!
//! [`Exchange`]는 런타임 컨텍스트 안에서 엔드포인트 사이를 이동하는
//! 단일 메시지입니다. 본문은 JSON 값으로, 헤더는 이름순으로 정렬된
//! 맵으로 보관되어 테스트 더블이 기록한 내용을 비교하기 쉽습니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 파일 이름 헤더 키
pub const HEADER_FILE_NAME: &str = "SwitchyardFileName";

/// 라우트를 흐르는 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// 교환 고유 ID (UUID v4)
    pub id: String,
    /// 메시지 본문
    pub body: Value,
    /// 메시지 헤더
    pub headers: BTreeMap<String, Value>,
}

impl Exchange {
    /// 주어진 본문으로 새 교환을 생성합니다.
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    /// 헤더를 추가한 교환을 반환합니다.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// 헤더 값을 조회합니다.
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// 헤더를 설정합니다.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.headers.insert(name.into(), value.into());
    }

    /// 본문이 문자열이면 해당 문자열을 반환합니다.
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_str()
    }

    /// 같은 본문과 헤더를 가진 새 ID의 복사본을 생성합니다.
    ///
    /// 가로채기 전략이 원본 메시지를 테스트 더블로 복제할 때 사용합니다.
    pub fn copy_with_new_id(&self) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            body: self.body.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exchange[{}] body={}", self.id, self.body)
    }
}
