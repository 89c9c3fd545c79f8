//! 테스트 더블 엔드포인트 — 수신 메시지 기록과 기대값 검증
//!
//! [`MockEndpoint`]는 수신한 교환을 모두 기록하고, 테스트가 설정한
//! 기대값(메시지 수, 본문, 헤더)을 [`MockEndpoint::assert_is_satisfied`]로
//! 검증합니다. 비동기 엔드포인트(seda)를 거치는 메시지를 위해 검증은
//! 주어진 대기 시간까지 도착을 기다립니다.
//!
//! 클래스 단위 컨텍스트 공유 모드에서는 테스트 메서드 사이마다
//! [`MockEndpoint::reset`]이 호출되어 기록과 기대값이 모두 지워집니다.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::AssertionError;
use crate::exchange::Exchange;

#[derive(Debug, Default)]
struct MockState {
    received: Vec<Exchange>,
    expected_count: Option<usize>,
    expected_bodies: Option<Vec<Value>>,
    expected_headers: Vec<(String, Value)>,
}

/// 수신 메시지를 기록하는 테스트 더블 엔드포인트
#[derive(Debug)]
pub struct MockEndpoint {
    uri: String,
    state: Mutex<MockState>,
    arrivals: Notify,
}

impl MockEndpoint {
    /// 주어진 URI로 테스트 더블을 생성합니다.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            state: Mutex::new(MockState::default()),
            arrivals: Notify::new(),
        }
    }

    /// 엔드포인트 URI를 반환합니다.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // 기록 중 패닉이 나도 남은 기록은 유효하므로 poison을 무시합니다.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 기대 메시지 수를 설정합니다.
    pub fn expected_message_count(&self, count: usize) {
        self.lock().expected_count = Some(count);
    }

    /// 기대 본문 목록을 순서대로 설정합니다.
    pub fn expected_bodies_received<I, V>(&self, bodies: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.lock().expected_bodies = Some(bodies.into_iter().map(Into::into).collect());
    }

    /// 모든 수신 메시지가 가져야 할 헤더를 추가합니다.
    pub fn expected_header_received(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.lock()
            .expected_headers
            .push((name.into(), value.into()));
    }

    /// 런타임이 메시지를 전달할 때 호출합니다.
    pub fn receive(&self, exchange: Exchange) {
        self.lock().received.push(exchange);
        self.arrivals.notify_waiters();
    }

    /// 지금까지 수신한 메시지 수를 반환합니다.
    pub fn received_count(&self) -> usize {
        self.lock().received.len()
    }

    /// 수신한 메시지 복사본을 반환합니다.
    pub fn received_exchanges(&self) -> Vec<Exchange> {
        self.lock().received.clone()
    }

    /// 기록과 기대값을 모두 초기화합니다. 여러 번 호출해도 결과는 같습니다.
    pub fn reset(&self) {
        *self.lock() = MockState::default();
    }

    fn awaited_count(&self) -> Option<usize> {
        let state = self.lock();
        match (state.expected_count, &state.expected_bodies) {
            (Some(count), _) => Some(count),
            (None, Some(bodies)) => Some(bodies.len()),
            (None, None) => None,
        }
    }

    /// 기대값이 충족되었는지 검증합니다.
    ///
    /// 기대 메시지 수가 0보다 크면 `wait`까지 도착을 기다린 뒤 검증합니다.
    pub async fn assert_is_satisfied(&self, wait: Duration) -> Result<(), AssertionError> {
        if let Some(target) = self.awaited_count().filter(|n| *n > 0) {
            let deadline = Instant::now() + wait;
            loop {
                let arrival = self.arrivals.notified();
                if self.received_count() >= target {
                    break;
                }
                if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                    break;
                }
            }
        }
        self.verify()
    }

    fn verify(&self) -> Result<(), AssertionError> {
        let state = self.lock();
        let actual = state.received.len();

        if let Some(expected) = state.expected_count {
            if actual != expected {
                return Err(AssertionError::MessageCount {
                    endpoint: self.uri.clone(),
                    expected,
                    actual,
                });
            }
        }

        if let Some(bodies) = &state.expected_bodies {
            if actual != bodies.len() {
                return Err(AssertionError::MessageCount {
                    endpoint: self.uri.clone(),
                    expected: bodies.len(),
                    actual,
                });
            }
            for (index, (expected, exchange)) in bodies.iter().zip(&state.received).enumerate() {
                if *expected != exchange.body {
                    return Err(AssertionError::Body {
                        endpoint: self.uri.clone(),
                        index,
                        expected: expected.to_string(),
                        actual: exchange.body.to_string(),
                    });
                }
            }
        }

        for (name, expected) in &state.expected_headers {
            for exchange in &state.received {
                let actual = exchange.header(name);
                if actual != Some(expected) {
                    return Err(AssertionError::Header {
                        endpoint: self.uri.clone(),
                        header: name.clone(),
                        expected: expected.to_string(),
                        actual: actual.map_or_else(|| "absent".to_owned(), Value::to_string),
                    });
                }
            }
        }

        Ok(())
    }
}
