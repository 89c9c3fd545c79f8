//! 런타임 통계 — 컨텍스트 생성/시작/정지 횟수 카운터
//!
//! 같은 [`MemoryRuntime`](crate::MemoryRuntime)이 만든 모든 컨텍스트가
//! 하나의 [`RuntimeStats`]를 공유합니다. 생명주기 모드별 빌드 횟수를
//! 테스트에서 검증할 때 사용합니다.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// 런타임 통계 카운터
#[derive(Debug, Default)]
pub struct RuntimeStats {
    contexts_created: AtomicU64,
    contexts_started: AtomicU64,
    contexts_stopped: AtomicU64,
    mock_resets: AtomicU64,
    exchanges_processed: AtomicU64,
}

/// 특정 시점의 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// 생성된 컨텍스트 수
    pub contexts_created: u64,
    /// 시작된 컨텍스트 수 (재시작 포함)
    pub contexts_started: u64,
    /// 정지된 컨텍스트 수
    pub contexts_stopped: u64,
    /// 테스트 더블 일괄 리셋 횟수
    pub mock_resets: u64,
    /// 처리된 교환 수
    pub exchanges_processed: u64,
}

impl RuntimeStats {
    pub(crate) fn record_created(&self) {
        self.contexts_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_started(&self) {
        self.contexts_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stopped(&self) {
        self.contexts_stopped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mock_reset(&self) {
        self.mock_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exchange(&self) {
        self.exchanges_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// 현재 값을 스냅샷으로 반환합니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            contexts_created: self.contexts_created.load(Ordering::Relaxed),
            contexts_started: self.contexts_started.load(Ordering::Relaxed),
            contexts_stopped: self.contexts_stopped.load(Ordering::Relaxed),
            mock_resets: self.mock_resets.load(Ordering::Relaxed),
            exchanges_processed: self.exchanges_processed.load(Ordering::Relaxed),
        }
    }
}
