#![doc = include_str!("../README.md")]

pub mod config;
pub mod debug;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod mock;
pub mod properties;
pub mod registry;
pub mod route;
pub mod runtime;
pub mod service;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{AssertionError, RuntimeError, SettingsError};

// 설정
pub use config::HarnessSettings;

// 메시지와 라우트
pub use exchange::Exchange;
pub use route::{RouteBuilder, RouteDefinition, Step};

// 엔드포인트
pub use endpoint::InterceptStrategy;
pub use mock::MockEndpoint;

// 디버거, 레지스트리, 속성
pub use debug::{Breakpoint, Debugger, StepInfo};
pub use properties::{Properties, PropertyProvider};
pub use registry::Registry;

// 런타임 계약 trait
pub use runtime::{
    BoundProducer, ConsumerGateway, ContextFactory, ContextSpec, ProducerGateway, RuntimeContext,
};
pub use service::{BoxFuture, Service, ServiceStatus};
