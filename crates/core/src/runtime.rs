//! 런타임 계약 — 오케스트레이터가 사용하는 외부 협력자 인터페이스
//!
//! 테스트 하네스는 라우팅 엔진 자체를 알지 못하며, 이 모듈의 trait만을
//! 통해 컨텍스트를 생성/시작/정지하고 설정 부수효과를 적용합니다.
//!
//! - [`ContextFactory`]: 레지스트리와 관리 에이전트 설정으로 컨텍스트 생성
//! - [`RuntimeContext`]: 라우트, 엔드포인트, 디버거, 속성 제공자를 소유한 엔진 인스턴스
//! - [`ProducerGateway`] / [`ConsumerGateway`]: 메시지 송수신 핸들
//! - [`BoundProducer`]: 기본 URI에 묶인 프로듀서 (`Produce` 필드 주입용)

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::debug::{Breakpoint, Debugger};
use crate::endpoint::InterceptStrategy;
use crate::error::RuntimeError;
use crate::exchange::Exchange;
use crate::mock::MockEndpoint;
use crate::properties::PropertyProvider;
use crate::registry::Registry;
use crate::route::RouteBuilder;
use crate::service::{BoxFuture, Service};

/// 컨텍스트 생성 요청
#[derive(Debug, Clone)]
pub struct ContextSpec {
    /// 컨텍스트 이름 (보통 테스트 클래스 이름)
    pub name: String,
    /// 컨텍스트가 사용할 의존성 레지스트리
    pub registry: Registry,
    /// 관리(introspection) 에이전트 활성화 여부
    pub management_enabled: bool,
}

/// 런타임 컨텍스트 생성기
pub trait ContextFactory: Send + Sync {
    /// 새 컨텍스트를 생성합니다. 생성된 컨텍스트는 정지 상태입니다.
    fn create_context(&self, spec: ContextSpec) -> Result<Arc<dyn RuntimeContext>, RuntimeError>;
}

/// 라우트와 엔드포인트를 소유한 런타임 엔진 인스턴스
pub trait RuntimeContext: Service {
    /// 컨텍스트 이름
    fn name(&self) -> &str;

    /// 정지 시 진행 중인 작업을 기다리는 최대 시간을 설정합니다.
    fn set_shutdown_timeout(&self, timeout: Duration);

    /// 설정된 정지 타임아웃을 반환합니다.
    fn shutdown_timeout(&self) -> Duration;

    /// 관리 에이전트 활성화 여부
    fn management_enabled(&self) -> bool;

    /// 생성 시 전달된 레지스트리
    fn registry(&self) -> Registry;

    /// 디버거를 설치합니다. 실행 중인 컨텍스트에는 설치할 수 없습니다.
    fn install_debugger(&self) -> Result<(), RuntimeError>;

    /// 설치된 디버거를 반환합니다.
    fn debugger(&self) -> Option<Arc<Debugger>>;

    /// 설치된 디버거에 브레이크포인트를 등록합니다.
    fn add_breakpoint(&self, breakpoint: Arc<dyn Breakpoint>) -> Result<(), RuntimeError> {
        let debugger = self
            .debugger()
            .ok_or_else(|| RuntimeError::DebuggerNotInstalled(self.name().to_owned()))?;
        debugger.add_breakpoint(breakpoint);
        Ok(())
    }

    /// 엔드포인트 가로채기 전략을 등록합니다.
    fn add_endpoint_strategy(&self, strategy: InterceptStrategy);

    /// 속성 제공자
    fn property_provider(&self) -> Arc<dyn PropertyProvider>;

    /// 라우트를 등록합니다. 실행 중인 컨텍스트면 즉시 활성화됩니다.
    fn add_routes(&self, builder: RouteBuilder) -> Result<(), RuntimeError>;

    /// 등록된 라우트 ID 목록
    fn route_ids(&self) -> Vec<String>;

    /// 라우트의 소스 엔드포인트를 교체합니다.
    fn replace_from(&self, route_id: &str, uri: &str) -> Result<(), RuntimeError>;

    /// 프로듀서 게이트웨이를 생성합니다 (정지 상태).
    fn create_producer(&self) -> Arc<dyn ProducerGateway>;

    /// 컨슈머 게이트웨이를 생성합니다 (정지 상태).
    fn create_consumer(&self) -> Arc<dyn ConsumerGateway>;

    /// 테스트 더블 엔드포인트를 조회하거나 생성합니다.
    fn mock_endpoint(&self, uri: &str) -> Result<Arc<MockEndpoint>, RuntimeError>;

    /// 엔드포인트가 생성되어 있는지 확인합니다.
    fn has_endpoint(&self, uri: &str) -> bool;

    /// 모든 테스트 더블의 기록과 기대값을 초기화합니다.
    fn reset_mocks(&self);
}

/// 메시지를 컨텍스트로 보내는 게이트웨이
pub trait ProducerGateway: Service {
    /// 교환을 엔드포인트로 전송하고 처리된 결과를 반환합니다.
    fn send<'a>(
        &'a self,
        uri: &'a str,
        exchange: Exchange,
    ) -> BoxFuture<'a, Result<Exchange, RuntimeError>>;

    /// 본문만으로 전송합니다.
    fn send_body<'a>(
        &'a self,
        uri: &'a str,
        body: Value,
    ) -> BoxFuture<'a, Result<Exchange, RuntimeError>> {
        self.send(uri, Exchange::new(body))
    }

    /// 본문과 헤더 하나로 전송합니다.
    fn send_body_and_header<'a>(
        &'a self,
        uri: &'a str,
        body: Value,
        header: &'a str,
        value: Value,
    ) -> BoxFuture<'a, Result<Exchange, RuntimeError>> {
        self.send(uri, Exchange::new(body).with_header(header, value))
    }
}

/// 컨텍스트에서 메시지를 꺼내는 게이트웨이
pub trait ConsumerGateway: Service {
    /// 엔드포인트 큐에서 메시지를 하나 꺼냅니다. 시간 내 없으면 `None`.
    fn receive<'a>(
        &'a self,
        uri: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Option<Exchange>, RuntimeError>>;
}

/// 기본 URI에 묶인 프로듀서
///
/// `Produce(uri)` 마커가 붙은 필드에 주입됩니다.
#[derive(Clone)]
pub struct BoundProducer {
    gateway: Arc<dyn ProducerGateway>,
    default_uri: String,
}

impl BoundProducer {
    /// 게이트웨이와 기본 URI로 생성합니다.
    pub fn new(gateway: Arc<dyn ProducerGateway>, default_uri: impl Into<String>) -> Self {
        Self {
            gateway,
            default_uri: default_uri.into(),
        }
    }

    /// 기본 URI를 반환합니다.
    pub fn default_uri(&self) -> &str {
        &self.default_uri
    }

    /// 기본 URI로 본문을 전송합니다.
    pub async fn send_body(&self, body: impl Into<Value>) -> Result<Exchange, RuntimeError> {
        self.gateway.send_body(&self.default_uri, body.into()).await
    }

    /// 기본 URI로 본문과 헤더를 전송합니다.
    pub async fn send_body_and_header(
        &self,
        body: impl Into<Value>,
        header: &str,
        value: impl Into<Value>,
    ) -> Result<Exchange, RuntimeError> {
        self.gateway
            .send_body_and_header(&self.default_uri, body.into(), header, value.into())
            .await
    }

    /// 지정한 URI로 교환을 전송합니다.
    pub async fn send_to(&self, uri: &str, exchange: Exchange) -> Result<Exchange, RuntimeError> {
        self.gateway.send(uri, exchange).await
    }

    /// 지정한 URI로 본문과 헤더를 전송합니다.
    pub async fn send_body_and_header_to(
        &self,
        uri: &str,
        body: impl Into<Value>,
        header: &str,
        value: impl Into<Value>,
    ) -> Result<Exchange, RuntimeError> {
        self.gateway
            .send_body_and_header(uri, body.into(), header, value.into())
            .await
    }
}

impl std::fmt::Debug for BoundProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundProducer")
            .field("default_uri", &self.default_uri)
            .finish()
    }
}
