//! 인메모리 런타임 컨텍스트
//!
//! [`MemoryContext`]는 [`RuntimeContext`] 계약을 구현합니다.
//!
//! # 생명주기
//! ```text
//! 생성(Stopped) → start() → Started → stop() → Stopped → start() ...
//! ```
//!
//! - `start()`: 속성 파일 위치 로드, 라우트 소스 해석, seda 소비자 태스크 시작
//! - `stop()`: 소비자 태스크에 정지 신호, 정지 타임아웃까지 대기 후 남은 태스크 중단,
//!   디버거 브레이크포인트 제거

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use switchyard_core::debug::Debugger;
use switchyard_core::endpoint::InterceptStrategy;
use switchyard_core::error::RuntimeError;
use switchyard_core::mock::MockEndpoint;
use switchyard_core::properties::PropertyProvider;
use switchyard_core::registry::Registry;
use switchyard_core::route::RouteBuilder;
use switchyard_core::runtime::{ConsumerGateway, ContextSpec, ProducerGateway, RuntimeContext};
use switchyard_core::service::{BoxFuture, Service, ServiceStatus};

use crate::engine::{ActiveRoute, Engine};
use crate::gateway::{MemoryConsumer, MemoryProducer};
use crate::properties::MemoryPropertyProvider;
use crate::stats::RuntimeStats;

/// 기본 정지 타임아웃
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct ConsumerTasks {
    shutdown: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

/// 인메모리 런타임 컨텍스트
pub struct MemoryContext {
    name: String,
    registry: Registry,
    management_enabled: bool,
    engine: Arc<Engine>,
    properties: Arc<MemoryPropertyProvider>,
    stats: Arc<RuntimeStats>,
    status: Mutex<ServiceStatus>,
    shutdown_timeout: Mutex<Duration>,
    consumers: Mutex<ConsumerTasks>,
}

impl MemoryContext {
    pub(crate) fn new(
        spec: ContextSpec,
        properties: Arc<MemoryPropertyProvider>,
        stats: Arc<RuntimeStats>,
    ) -> Self {
        let engine = Arc::new(Engine::new(
            spec.name.clone(),
            Arc::clone(&properties),
            Arc::clone(&stats),
        ));
        Self {
            name: spec.name,
            registry: spec.registry,
            management_enabled: spec.management_enabled,
            engine,
            properties,
            stats,
            status: Mutex::new(ServiceStatus::Stopped),
            shutdown_timeout: Mutex::new(DEFAULT_SHUTDOWN_TIMEOUT),
            consumers: Mutex::new(ConsumerTasks::default()),
        }
    }

    fn set_status(&self, status: ServiceStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// seda 소비 라우트마다 소비자 태스크를 띄웁니다.
    fn spawn_consumers(&self, routes: Vec<ActiveRoute>) {
        let mut consumers = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        let shutdown = consumers
            .shutdown
            .get_or_insert_with(|| watch::channel(false).0)
            .subscribe();
        for route in routes {
            if let Some(handle) = self.engine.spawn_consumer(route, shutdown.clone()) {
                consumers.handles.push(handle);
            }
        }
    }

    fn do_start(&self) -> Result<(), RuntimeError> {
        self.properties.load_locations()?;
        let seda_routes = self.engine.prepare_routes(None)?;
        self.engine.set_started(true);
        self.spawn_consumers(seda_routes);
        Ok(())
    }

    async fn drain_consumers(&self) {
        let tasks = {
            let mut consumers = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *consumers)
        };
        if let Some(shutdown) = &tasks.shutdown {
            // 수신자가 모두 끝났으면 실패하지만 기다릴 태스크도 없습니다.
            let _ = shutdown.send(true);
        }
        if tasks.handles.is_empty() {
            return;
        }

        let timeout = self.shutdown_timeout();
        let aborts: Vec<_> = tasks.handles.iter().map(JoinHandle::abort_handle).collect();
        let joined = tokio::time::timeout(timeout, async move {
            for handle in tasks.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "seda consumer task ended abnormally");
                }
            }
        })
        .await;

        if joined.is_err() {
            warn!(
                context = %self.name,
                timeout_ms = timeout.as_millis() as u64,
                "shutdown timeout elapsed, aborting in-flight consumers"
            );
            for abort in aborts {
                abort.abort();
            }
        }
    }
}

impl Service for MemoryContext {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> ServiceStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            if self.status().is_started() {
                debug!(context = %self.name, "context already started");
                return Ok(());
            }

            self.set_status(ServiceStatus::Starting);
            match self.do_start() {
                Ok(()) => {
                    self.set_status(ServiceStatus::Started);
                    self.stats.record_started();
                    info!(
                        context = %self.name,
                        routes = self.engine.route_ids().len(),
                        management = self.management_enabled,
                        "context started"
                    );
                    Ok(())
                }
                Err(e) => {
                    self.engine.set_started(false);
                    self.set_status(ServiceStatus::Failed);
                    Err(e)
                }
            }
        })
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), RuntimeError>> {
        Box::pin(async move {
            if self.status().is_stopped() {
                return Ok(());
            }

            self.set_status(ServiceStatus::Stopping);
            self.engine.set_started(false);
            self.drain_consumers().await;
            if let Some(debugger) = self.engine.debugger() {
                debugger.clear();
            }
            self.set_status(ServiceStatus::Stopped);
            self.stats.record_stopped();
            info!(context = %self.name, "context stopped");
            Ok(())
        })
    }
}

impl RuntimeContext for MemoryContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_shutdown_timeout(&self, timeout: Duration) {
        *self
            .shutdown_timeout
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = timeout;
    }

    fn shutdown_timeout(&self) -> Duration {
        *self
            .shutdown_timeout
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn management_enabled(&self) -> bool {
        self.management_enabled
    }

    fn registry(&self) -> Registry {
        self.registry.clone()
    }

    fn install_debugger(&self) -> Result<(), RuntimeError> {
        if self.status().is_started() {
            return Err(RuntimeError::InvalidState {
                service: self.name.clone(),
                reason: "debugger must be installed before the context starts".to_owned(),
            });
        }
        self.engine.install_debugger();
        debug!(context = %self.name, "debugger installed");
        Ok(())
    }

    fn debugger(&self) -> Option<Arc<Debugger>> {
        self.engine.debugger()
    }

    fn add_endpoint_strategy(&self, strategy: InterceptStrategy) {
        self.engine.add_strategy(strategy);
    }

    fn property_provider(&self) -> Arc<dyn PropertyProvider> {
        self.properties.clone()
    }

    fn add_routes(&self, builder: RouteBuilder) -> Result<(), RuntimeError> {
        let added = self.engine.register_routes(builder)?;
        if self.status().is_started() {
            let seda_routes = self.engine.prepare_routes(Some(&added))?;
            self.spawn_consumers(seda_routes);
        }
        Ok(())
    }

    fn route_ids(&self) -> Vec<String> {
        self.engine.route_ids()
    }

    fn replace_from(&self, route_id: &str, uri: &str) -> Result<(), RuntimeError> {
        self.engine.replace_from(route_id, uri)
    }

    fn create_producer(&self) -> Arc<dyn ProducerGateway> {
        Arc::new(MemoryProducer::new(&self.name, Arc::clone(&self.engine)))
    }

    fn create_consumer(&self) -> Arc<dyn ConsumerGateway> {
        Arc::new(MemoryConsumer::new(&self.name, Arc::clone(&self.engine)))
    }

    fn mock_endpoint(&self, uri: &str) -> Result<Arc<MockEndpoint>, RuntimeError> {
        self.engine.mock_endpoint(uri)
    }

    fn has_endpoint(&self, uri: &str) -> bool {
        self.engine.has_endpoint(uri)
    }

    fn reset_mocks(&self) {
        self.engine.reset_mocks();
    }
}

impl std::fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContext")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("routes", &self.engine.route_ids())
            .finish()
    }
}
