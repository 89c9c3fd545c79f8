//! 라우트 모델 — 런타임에 설치되는 최소 라우트 정의
//!
//! 라우트 제공자 메서드는 [`RouteBuilder`]를 반환하고, 오케스트레이터는
//! 이를 그대로 런타임 컨텍스트에 등록합니다. 라우트 DSL 전체가 아니라
//! 테스트 시나리오에 필요한 단계(to, filter, transform, set-header)만 다룹니다.
//!
//! # 사용 예시
//! ```
//! use switchyard_core::route::{RouteBuilder, RouteDefinition, header_eq};
//!
//! let builder = RouteBuilder::new().route(
//!     RouteDefinition::from("direct:start")
//!         .route_id("filter-route")
//!         .filter(header_eq("foo", "bar"))
//!         .to("mock:result"),
//! );
//! assert_eq!(builder.routes().len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::exchange::Exchange;

/// 교환에 대한 참/거짓 판정
#[derive(Clone)]
pub struct Predicate {
    description: String,
    test: Arc<dyn Fn(&Exchange) -> bool + Send + Sync>,
}

impl Predicate {
    /// 설명과 판정 함수로 조건을 생성합니다.
    pub fn new(
        description: impl Into<String>,
        test: impl Fn(&Exchange) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// 교환이 조건을 만족하는지 판정합니다.
    pub fn matches(&self, exchange: &Exchange) -> bool {
        (self.test)(exchange)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.description)
    }
}

/// 교환으로부터 값을 계산하는 표현식
#[derive(Clone)]
pub struct Expression {
    description: String,
    eval: Arc<dyn Fn(&Exchange) -> Value + Send + Sync>,
}

impl Expression {
    /// 설명과 평가 함수로 표현식을 생성합니다.
    pub fn new(
        description: impl Into<String>,
        eval: impl Fn(&Exchange) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            eval: Arc::new(eval),
        }
    }

    /// 표현식을 평가합니다.
    pub fn evaluate(&self, exchange: &Exchange) -> Value {
        (self.eval)(exchange)
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self.description)
    }
}

/// 헤더 값이 주어진 값과 같은지 판정합니다.
pub fn header_eq(name: impl Into<String>, value: impl Into<Value>) -> Predicate {
    let name = name.into();
    let value = value.into();
    Predicate::new(format!("header({name}) == {value}"), move |ex| {
        ex.header(&name) == Some(&value)
    })
}

/// 문자열 본문이 주어진 부분 문자열을 포함하는지 판정합니다.
pub fn body_contains(needle: impl Into<String>) -> Predicate {
    let needle = needle.into();
    Predicate::new(format!("body contains '{needle}'"), move |ex| {
        ex.body_str().is_some_and(|b| b.contains(needle.as_str()))
    })
}

/// 항상 같은 값을 반환하는 표현식
pub fn constant(value: impl Into<Value>) -> Expression {
    let value = value.into();
    Expression::new(format!("constant({value})"), move |_| value.clone())
}

/// 라우트 처리 단계
#[derive(Debug, Clone)]
pub enum Step {
    /// 엔드포인트로 전송
    To(String),
    /// 조건을 만족하지 않으면 이후 단계를 건너뜀
    Filter(Predicate),
    /// 본문을 표현식 결과로 교체
    Transform(Expression),
    /// 헤더를 표현식 결과로 설정
    SetHeader(String, Expression),
}

impl Step {
    /// 디버거와 로그에 표시할 단계 레이블
    pub fn label(&self) -> String {
        match self {
            Self::To(uri) => format!("to({uri})"),
            Self::Filter(p) => format!("filter({})", p.description),
            Self::Transform(e) => format!("transform({})", e.description),
            Self::SetHeader(name, _) => format!("setHeader({name})"),
        }
    }
}

/// 단일 라우트 정의
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    /// 라우트 ID (없으면 런타임이 `route1`, `route2`... 를 부여)
    pub id: Option<String>,
    /// 소스 엔드포인트 URI
    pub from: String,
    /// 처리 단계
    pub steps: Vec<Step>,
}

impl RouteDefinition {
    /// 소스 엔드포인트에서 시작하는 라우트를 생성합니다.
    pub fn from(uri: impl Into<String>) -> Self {
        Self {
            id: None,
            from: uri.into(),
            steps: Vec::new(),
        }
    }

    /// 라우트 ID를 지정합니다.
    pub fn route_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 엔드포인트로 전송하는 단계를 추가합니다.
    pub fn to(mut self, uri: impl Into<String>) -> Self {
        self.steps.push(Step::To(uri.into()));
        self
    }

    /// 필터 단계를 추가합니다.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.steps.push(Step::Filter(predicate));
        self
    }

    /// 본문 변환 단계를 추가합니다.
    pub fn transform(mut self, expression: Expression) -> Self {
        self.steps.push(Step::Transform(expression));
        self
    }

    /// 헤더 설정 단계를 추가합니다.
    pub fn set_header(mut self, name: impl Into<String>, expression: Expression) -> Self {
        self.steps.push(Step::SetHeader(name.into(), expression));
        self
    }
}

/// 라우트 정의 묶음 — 라우트 제공자 역할 메서드의 반환 타입
#[derive(Debug, Clone, Default)]
pub struct RouteBuilder {
    routes: Vec<RouteDefinition>,
}

impl RouteBuilder {
    /// 빈 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 라우트를 추가합니다.
    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.routes.push(route);
        self
    }

    /// 등록된 라우트 정의를 반환합니다.
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// 빌더를 소비하여 라우트 정의를 반환합니다.
    pub fn into_routes(self) -> Vec<RouteDefinition> {
        self.routes
    }
}
