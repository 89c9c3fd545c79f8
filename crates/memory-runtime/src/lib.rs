#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`runtime`]: 컨텍스트 팩토리 [`MemoryRuntime`]
//! - [`context`]: `RuntimeContext` 구현 [`MemoryContext`]
//! - [`gateway`]: 프로듀서/컨슈머 게이트웨이
//! - [`properties`]: TOML 속성 파일 위치를 읽는 속성 컴포넌트
//! - [`stats`]: 컨텍스트 생성/시작/정지 통계
//!
//! # 아키텍처
//!
//! ```text
//! ProducerGateway -> Engine::dispatch -> direct route (same task)
//!                                     -> seda queue -> consumer task -> route
//!                                     -> mock endpoint / log
//! ```

pub mod context;
mod engine;
pub mod gateway;
pub mod properties;
pub mod runtime;
pub mod stats;

// --- 주요 타입 re-export ---

pub use context::MemoryContext;
pub use gateway::{MemoryConsumer, MemoryProducer};
pub use properties::MemoryPropertyProvider;
pub use runtime::MemoryRuntime;
pub use stats::{RuntimeStats, StatsSnapshot};
