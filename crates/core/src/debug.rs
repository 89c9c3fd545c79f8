//! 디버거와 브레이크포인트
//!
//! [`Debugger`]가 컨텍스트에 설치되면 런타임은 라우트의 각 처리 단계
//! 전후로 등록된 모든 [`Breakpoint`]를 호출합니다. 컨텍스트가 정지되면
//! 브레이크포인트도 함께 제거됩니다.

use std::sync::{Arc, RwLock};

use crate::exchange::Exchange;

/// 처리 중인 단계에 대한 설명
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
    /// 라우트 ID
    pub route_id: String,
    /// 라우트 내 단계 인덱스
    pub index: usize,
    /// 단계 레이블 (예: `"to(mock:result)"`)
    pub label: String,
}

/// 메시지 처리 지점을 가로채는 브레이크포인트
///
/// 기본 구현은 아무것도 하지 않으므로 필요한 콜백만 구현하면 됩니다.
pub trait Breakpoint: Send + Sync {
    /// 단계 처리 직전에 호출됩니다.
    fn before_process(&self, _exchange: &Exchange, _step: &StepInfo) {}

    /// 단계 처리 직후에 호출됩니다.
    fn after_process(&self, _exchange: &Exchange, _step: &StepInfo) {}
}

/// 브레이크포인트 목록을 관리하는 디버거
#[derive(Default)]
pub struct Debugger {
    breakpoints: RwLock<Vec<Arc<dyn Breakpoint>>>,
}

impl Debugger {
    /// 빈 디버거를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 브레이크포인트를 등록합니다.
    pub fn add_breakpoint(&self, breakpoint: Arc<dyn Breakpoint>) {
        self.breakpoints
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(breakpoint);
    }

    /// 등록된 브레이크포인트를 반환합니다.
    pub fn breakpoints(&self) -> Vec<Arc<dyn Breakpoint>> {
        self.breakpoints
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 모든 브레이크포인트를 제거합니다.
    pub fn clear(&self) {
        self.breakpoints
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// 단계 처리 전 콜백을 호출합니다.
    pub fn before_process(&self, exchange: &Exchange, step: &StepInfo) {
        for bp in self.breakpoints() {
            bp.before_process(exchange, step);
        }
    }

    /// 단계 처리 후 콜백을 호출합니다.
    pub fn after_process(&self, exchange: &Exchange, step: &StepInfo) {
        for bp in self.breakpoints() {
            bp.after_process(exchange, step);
        }
    }
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debugger")
            .field("breakpoints", &self.breakpoints().len())
            .finish()
    }
}
