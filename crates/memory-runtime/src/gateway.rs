//! 프로듀서/컨슈머 게이트웨이
//!
//! 두 게이트웨이 모두 생성 시 정지 상태이며, 시작된 뒤에만 송수신을 허용합니다.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use switchyard_core::error::RuntimeError;
use switchyard_core::exchange::Exchange;
use switchyard_core::runtime::{ConsumerGateway, ProducerGateway};
use switchyard_core::service::{BoxFuture, Service, ServiceStatus};

use crate::engine::Engine;

/// 게이트웨이 공통 상태
struct GatewayState {
    name: String,
    status: Mutex<ServiceStatus>,
}

impl GatewayState {
    fn new(name: String) -> Self {
        Self {
            name,
            status: Mutex::new(ServiceStatus::Stopped),
        }
    }

    fn status(&self) -> ServiceStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, status: ServiceStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
        debug!(service = %self.name, %status, "gateway status changed");
    }

    fn ensure_started(&self) -> Result<(), RuntimeError> {
        if self.status().is_started() {
            Ok(())
        } else {
            Err(RuntimeError::InvalidState {
                service: self.name.clone(),
                reason: "gateway is not started".to_owned(),
            })
        }
    }
}

/// 인메모리 프로듀서 게이트웨이
pub struct MemoryProducer {
    state: GatewayState,
    engine: Arc<Engine>,
}

impl MemoryProducer {
    pub(crate) fn new(context_name: &str, engine: Arc<Engine>) -> Self {
        Self {
            state: GatewayState::new(format!("{context_name}-producer")),
            engine,
        }
    }
}

impl Service for MemoryProducer {
    fn service_name(&self) -> &str {
        &self.state.name
    }

    fn status(&self) -> ServiceStatus {
        self.state.status()
    }

    fn start(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            self.state.set(ServiceStatus::Started);
            Ok(())
        })
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            self.state.set(ServiceStatus::Stopped);
            Ok(())
        })
    }
}

impl ProducerGateway for MemoryProducer {
    fn send<'a>(
        &'a self,
        uri: &'a str,
        exchange: Exchange,
    ) -> BoxFuture<'a, Result<Exchange, RuntimeError>> {
        Box::pin(async move {
            self.state.ensure_started()?;
            self.engine.dispatch(uri.to_owned(), exchange).await
        })
    }
}

/// 인메모리 컨슈머 게이트웨이 (seda 큐 폴링)
pub struct MemoryConsumer {
    state: GatewayState,
    engine: Arc<Engine>,
}

impl MemoryConsumer {
    pub(crate) fn new(context_name: &str, engine: Arc<Engine>) -> Self {
        Self {
            state: GatewayState::new(format!("{context_name}-consumer")),
            engine,
        }
    }
}

impl Service for MemoryConsumer {
    fn service_name(&self) -> &str {
        &self.state.name
    }

    fn status(&self) -> ServiceStatus {
        self.state.status()
    }

    fn start(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            self.state.set(ServiceStatus::Started);
            Ok(())
        })
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            self.state.set(ServiceStatus::Stopped);
            Ok(())
        })
    }
}

impl ConsumerGateway for MemoryConsumer {
    fn receive<'a>(
        &'a self,
        uri: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Option<Exchange>, RuntimeError>> {
        Box::pin(async move {
            self.state.ensure_started()?;
            self.engine.poll(uri, timeout).await
        })
    }
}
