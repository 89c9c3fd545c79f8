//! 서비스 trait — 시작/정지 가능한 런타임 구성요소의 공통 생명주기
//!
//! 런타임 컨텍스트, 프로듀서/컨슈머 게이트웨이, 외부 소유 서비스는 모두
//! [`Service`]를 구현합니다. 여러 핸들이 같은 인스턴스를 공유하므로
//! 모든 메서드는 `&self`를 받고 내부 가변성으로 상태를 관리합니다.
//!
//! # 생명주기
//! ```text
//! Stopped → start() → Started → stop() → Stopped
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// dyn-compatible trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 서비스 상태
///
/// 상태 전환:
/// - `Stopped` → `start()` → `Starting` → `Started`
/// - `Started` → `stop()` → `Stopping` → `Stopped`
/// - 에러 발생 시 → `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    /// 시작 중
    Starting,
    /// 실행 중
    Started,
    /// 정지 중
    Stopping,
    /// 정지됨 (초기 상태)
    Stopped,
    /// 오류 상태
    Failed,
}

impl ServiceStatus {
    /// 실행 중인지 확인합니다.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started)
    }

    /// 정지(또는 미시작) 상태인지 확인합니다.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Started => write!(f, "started"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 시작/정지 가능한 런타임 구성요소
///
/// `start()`는 이미 실행 중이면 아무것도 하지 않고,
/// `stop()`은 이미 정지 상태면 아무것도 하지 않아야 합니다 (멱등).
pub trait Service: Send + Sync {
    /// 서비스 이름 (로그 및 에러 메시지용)
    fn service_name(&self) -> &str;

    /// 현재 상태를 반환합니다.
    fn status(&self) -> ServiceStatus;

    /// 서비스를 시작합니다.
    fn start(&self) -> BoxFuture<'_, Result<(), RuntimeError>>;

    /// 서비스를 정지합니다.
    fn stop(&self) -> BoxFuture<'_, Result<(), RuntimeError>>;
}

/// 테스트 등에서 async 블록을 `BoxFuture`로 감쌀 때 사용합니다.
pub fn boxed<'a, T, F>(future: F) -> BoxFuture<'a, T>
where
    F: Future<Output = T> + Send + 'a,
{
    Box::pin(future)
}
