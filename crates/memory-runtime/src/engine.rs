//! 라우팅 엔진 — 엔드포인트 디스패치와 라우트 단계 처리
//!
//! 컨텍스트, 게이트웨이, seda 소비자 태스크가 하나의 [`Engine`]을 `Arc`로
//! 공유합니다. 잠금은 조회/갱신 동안만 잡고 `.await` 너머로 들고 가지 않습니다.
//!
//! # 디스패치 순서
//! ```text
//! uri → 플레이스홀더 해석 → 정규화 → 가로채기(mock 복제, skip) → scheme별 전달
//! ```
//!
//! | scheme | 동작 |
//! |--------|------|
//! | `direct` | 같은 태스크에서 소비 라우트를 동기 실행 (컨텍스트 시작 전이면 `NoConsumers`) |
//! | `seda` | 큐에 적재 후 즉시 반환, 소비 라우트가 있으면 백그라운드 태스크가 처리 |
//! | `mock` | 테스트 더블에 기록 |
//! | `log` | `tracing`으로 출력 |

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use switchyard_core::debug::{Debugger, StepInfo};
use switchyard_core::endpoint::{InterceptStrategy, MOCK_SCHEME, mock_uri_for, normalize_uri, scheme};
use switchyard_core::error::RuntimeError;
use switchyard_core::exchange::Exchange;
use switchyard_core::metrics as m;
use switchyard_core::mock::MockEndpoint;
use switchyard_core::properties::PropertyProvider;
use switchyard_core::route::{RouteBuilder, Step};
use switchyard_core::service::BoxFuture;

use crate::properties::MemoryPropertyProvider;
use crate::stats::RuntimeStats;

/// 라우트 소스로 사용할 수 있는 scheme
const CONSUMER_SCHEMES: [&str; 2] = ["direct", "seda"];

/// 등록된 라우트
#[derive(Debug, Clone)]
pub(crate) struct ActiveRoute {
    pub(crate) id: String,
    /// 등록 시점의 소스 URI (플레이스홀더 포함 가능)
    from: String,
    /// 시작 시 해석된 소스 URI
    resolved_from: Option<String>,
    steps: Arc<Vec<Step>>,
}

impl ActiveRoute {
    pub(crate) fn resolved_from(&self) -> Option<&str> {
        self.resolved_from.as_deref()
    }
}

#[derive(Clone)]
struct SedaQueue {
    tx: mpsc::UnboundedSender<Exchange>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Exchange>>>,
}

impl SedaQueue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }
}

/// 컨텍스트 하나의 라우팅 상태
pub(crate) struct Engine {
    context_name: String,
    properties: Arc<MemoryPropertyProvider>,
    stats: Arc<RuntimeStats>,
    started: AtomicBool,
    route_seq: AtomicUsize,
    routes: RwLock<Vec<ActiveRoute>>,
    strategies: RwLock<Vec<InterceptStrategy>>,
    mocks: Mutex<BTreeMap<String, Arc<MockEndpoint>>>,
    queues: Mutex<BTreeMap<String, SedaQueue>>,
    endpoints: Mutex<BTreeSet<String>>,
    debugger: RwLock<Option<Arc<Debugger>>>,
}

impl Engine {
    pub(crate) fn new(
        context_name: impl Into<String>,
        properties: Arc<MemoryPropertyProvider>,
        stats: Arc<RuntimeStats>,
    ) -> Self {
        Self {
            context_name: context_name.into(),
            properties,
            stats,
            started: AtomicBool::new(false),
            route_seq: AtomicUsize::new(0),
            routes: RwLock::new(Vec::new()),
            strategies: RwLock::new(Vec::new()),
            mocks: Mutex::new(BTreeMap::new()),
            queues: Mutex::new(BTreeMap::new()),
            endpoints: Mutex::new(BTreeSet::new()),
            debugger: RwLock::new(None),
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn set_started(&self, started: bool) {
        self.started.store(started, Ordering::SeqCst);
    }

    // ─── 라우트 ────────────────────────────────────────────────────────

    /// 라우트를 등록하고 새로 부여된 ID 목록을 반환합니다.
    pub(crate) fn register_routes(&self, builder: RouteBuilder) -> Result<Vec<String>, RuntimeError> {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        let mut added = Vec::new();

        for def in builder.into_routes() {
            let id = match def.id {
                Some(id) => id,
                None => format!("route{}", self.route_seq.fetch_add(1, Ordering::SeqCst) + 1),
            };
            if routes.iter().any(|r| r.id == id) || added.contains(&id) {
                return Err(RuntimeError::RouteRegistration {
                    route: id,
                    reason: "duplicate route id".to_owned(),
                });
            }
            debug!(context = %self.context_name, route = %id, from = %def.from, "route registered");
            added.push(id.clone());
            routes.push(ActiveRoute {
                id,
                from: def.from,
                resolved_from: None,
                steps: Arc::new(def.steps),
            });
        }

        Ok(added)
    }

    pub(crate) fn route_ids(&self) -> Vec<String> {
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    pub(crate) fn replace_from(&self, route_id: &str, uri: &str) -> Result<(), RuntimeError> {
        if self.is_started() {
            return Err(RuntimeError::InvalidState {
                service: self.context_name.clone(),
                reason: format!("cannot replace source of route '{route_id}' while started"),
            });
        }
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        let route = routes
            .iter_mut()
            .find(|r| r.id == route_id)
            .ok_or_else(|| RuntimeError::RouteNotFound(route_id.to_owned()))?;
        info!(route = %route_id, from = %route.from, to = %uri, "replacing route source");
        route.from = uri.to_owned();
        route.resolved_from = None;
        Ok(())
    }

    /// 라우트 소스를 해석하고 엔드포인트를 생성합니다.
    ///
    /// `only`가 주어지면 해당 ID의 라우트만 준비합니다. seda를 소비하는
    /// 라우트 목록을 반환하며, 호출자가 소비자 태스크를 띄웁니다.
    pub(crate) fn prepare_routes(
        &self,
        only: Option<&[String]>,
    ) -> Result<Vec<ActiveRoute>, RuntimeError> {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        let mut seda_routes = Vec::new();

        for route in routes
            .iter_mut()
            .filter(|r| only.is_none_or(|ids| ids.contains(&r.id)))
        {
            let from = normalize_uri(&self.properties.resolve_placeholders(&route.from)?);
            if !CONSUMER_SCHEMES.contains(&scheme(&from)) {
                return Err(RuntimeError::UnknownComponent(from));
            }
            self.touch_endpoint(&from);
            for step in route.steps.iter() {
                if let Step::To(uri) = step {
                    let to = normalize_uri(&self.properties.resolve_placeholders(uri)?);
                    self.touch_endpoint(&to);
                }
            }
            let is_seda = scheme(&from) == "seda";
            if is_seda {
                self.queue(&from);
            }
            route.resolved_from = Some(from);
            if is_seda {
                seda_routes.push(route.clone());
            }
        }

        Ok(seda_routes)
    }

    fn direct_consumer(&self, uri: &str) -> Option<ActiveRoute> {
        if !self.is_started() {
            return None;
        }
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|r| r.resolved_from() == Some(uri))
            .cloned()
    }

    // ─── 엔드포인트 ────────────────────────────────────────────────────

    /// 엔드포인트를 생성된 것으로 기록하고, 가로채기 대상이면 테스트 더블도 만듭니다.
    fn touch_endpoint(&self, uri: &str) {
        self.endpoints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.to_owned());
        if self.intercept(uri).0 {
            self.mock_for(&mock_uri_for(uri));
        }
    }

    pub(crate) fn has_endpoint(&self, uri: &str) -> bool {
        let uri = normalize_uri(uri);
        self.endpoints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&uri)
    }

    pub(crate) fn add_strategy(&self, strategy: InterceptStrategy) {
        debug!(context = %self.context_name, pattern = %strategy.pattern, skip = strategy.skip, "endpoint strategy added");
        let endpoints: Vec<String> = self
            .endpoints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect();
        for uri in endpoints.iter().filter(|u| strategy.applies_to(u)) {
            self.mock_for(&mock_uri_for(uri));
        }
        self.strategies
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(strategy);
    }

    /// (가로채기 여부, 원래 목적지 생략 여부)
    fn intercept(&self, uri: &str) -> (bool, bool) {
        let strategies = self.strategies.read().unwrap_or_else(|e| e.into_inner());
        strategies
            .iter()
            .filter(|s| s.applies_to(uri))
            .fold((false, false), |(_, skip), s| (true, skip || s.skip))
    }

    fn mock_for(&self, uri: &str) -> Arc<MockEndpoint> {
        let uri = normalize_uri(uri);
        let mut mocks = self.mocks.lock().unwrap_or_else(|e| e.into_inner());
        let mock = mocks
            .entry(uri.clone())
            .or_insert_with(|| Arc::new(MockEndpoint::new(uri.clone())))
            .clone();
        drop(mocks);
        self.endpoints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri);
        mock
    }

    pub(crate) fn mock_endpoint(&self, uri: &str) -> Result<Arc<MockEndpoint>, RuntimeError> {
        let uri = normalize_uri(&self.properties.resolve_placeholders(uri)?);
        if scheme(&uri) != MOCK_SCHEME {
            return Err(RuntimeError::InvalidState {
                service: self.context_name.clone(),
                reason: format!("'{uri}' is not a mock endpoint"),
            });
        }
        Ok(self.mock_for(&uri))
    }

    pub(crate) fn reset_mocks(&self) {
        let mocks: Vec<Arc<MockEndpoint>> = self
            .mocks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for mock in &mocks {
            mock.reset();
        }
        self.stats.record_mock_reset();
        debug!(context = %self.context_name, count = mocks.len(), "mock endpoints reset");
    }

    fn queue(&self, uri: &str) -> SedaQueue {
        self.queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(uri.to_owned())
            .or_insert_with(SedaQueue::new)
            .clone()
    }

    /// seda 큐에서 메시지를 하나 꺼냅니다. 시간 내 없으면 `None`.
    pub(crate) async fn poll(
        &self,
        uri: &str,
        timeout: std::time::Duration,
    ) -> Result<Option<Exchange>, RuntimeError> {
        let uri = normalize_uri(&self.properties.resolve_placeholders(uri)?);
        if scheme(&uri) != "seda" {
            return Err(RuntimeError::InvalidState {
                service: self.context_name.clone(),
                reason: format!("polling is not supported for '{uri}'"),
            });
        }
        let queue = self.queue(&uri);
        let received = tokio::time::timeout(timeout, async {
            let mut rx = queue.rx.lock().await;
            rx.recv().await
        })
        .await;
        Ok(received.ok().flatten())
    }

    // ─── 디버거 ────────────────────────────────────────────────────────

    pub(crate) fn install_debugger(&self) {
        let mut slot = self.debugger.write().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(Arc::new(Debugger::new()));
        }
    }

    pub(crate) fn debugger(&self) -> Option<Arc<Debugger>> {
        self.debugger
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // ─── 처리 ──────────────────────────────────────────────────────────

    /// 교환을 엔드포인트로 전달하고 처리 결과를 반환합니다.
    pub(crate) fn dispatch(
        self: &Arc<Self>,
        uri: String,
        exchange: Exchange,
    ) -> BoxFuture<'static, Result<Exchange, RuntimeError>> {
        let engine = Arc::clone(self);
        Box::pin(async move {
            let uri = normalize_uri(&engine.properties.resolve_placeholders(&uri)?);
            engine.touch_endpoint(&uri);

            let (intercepted, skip) = engine.intercept(&uri);
            if intercepted {
                engine.mock_for(&mock_uri_for(&uri)).receive(exchange.clone());
                metrics::counter!(m::RUNTIME_MOCK_RECEIVED_TOTAL).increment(1);
            }
            if skip {
                debug!(endpoint = %uri, exchange_id = %exchange.id, "skipped original endpoint");
                return Ok(exchange);
            }

            let scheme = scheme(&uri).to_owned();
            let result = match scheme.as_str() {
                MOCK_SCHEME => {
                    engine.mock_for(&uri).receive(exchange.clone());
                    metrics::counter!(m::RUNTIME_MOCK_RECEIVED_TOTAL).increment(1);
                    Ok(exchange)
                }
                "direct" => match engine.direct_consumer(&uri) {
                    Some(route) => engine.run_route(&route, exchange).await,
                    None => Err(RuntimeError::NoConsumers(uri.clone())),
                },
                "seda" => engine
                    .queue(&uri)
                    .tx
                    .send(exchange.clone())
                    .map(|()| exchange)
                    .map_err(|_| RuntimeError::InvalidState {
                        service: engine.context_name.clone(),
                        reason: format!("queue '{uri}' is closed"),
                    }),
                "log" => {
                    info!(endpoint = %uri, exchange_id = %exchange.id, body = %exchange.body, "exchange logged");
                    Ok(exchange)
                }
                _ => Err(RuntimeError::UnknownComponent(uri.clone())),
            };

            match &result {
                Ok(_) => {
                    engine.stats.record_exchange();
                    metrics::counter!(m::RUNTIME_EXCHANGES_PROCESSED_TOTAL, m::LABEL_SCHEME => scheme)
                        .increment(1);
                }
                Err(e) => {
                    debug!(endpoint = %uri, error = %e, "dispatch failed");
                    metrics::counter!(m::RUNTIME_EXCHANGES_FAILED_TOTAL).increment(1);
                }
            }
            result
        })
    }

    async fn run_route(
        self: &Arc<Self>,
        route: &ActiveRoute,
        mut exchange: Exchange,
    ) -> Result<Exchange, RuntimeError> {
        let debugger = self.debugger();

        for (index, step) in route.steps.iter().enumerate() {
            let info = StepInfo {
                route_id: route.id.clone(),
                index,
                label: step.label(),
            };
            if let Some(d) = &debugger {
                d.before_process(&exchange, &info);
            }

            let proceed = match step {
                Step::To(uri) => {
                    exchange = self.dispatch(uri.clone(), exchange).await?;
                    true
                }
                Step::Filter(predicate) => predicate.matches(&exchange),
                Step::Transform(expression) => {
                    exchange.body = expression.evaluate(&exchange);
                    true
                }
                Step::SetHeader(name, expression) => {
                    let value = expression.evaluate(&exchange);
                    exchange.set_header(name.clone(), value);
                    true
                }
            };

            if let Some(d) = &debugger {
                d.after_process(&exchange, &info);
            }
            if !proceed {
                debug!(route = %route.id, exchange_id = %exchange.id, step = index, "exchange filtered out");
                break;
            }
        }

        Ok(exchange)
    }

    /// seda 소비 라우트의 백그라운드 태스크를 띄웁니다.
    ///
    /// 정지 신호를 받으면 큐에 남은 메시지를 모두 처리한 뒤 종료합니다.
    pub(crate) fn spawn_consumer(
        self: &Arc<Self>,
        route: ActiveRoute,
        mut shutdown: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        let from = route.resolved_from()?.to_owned();
        let queue = self.queue(&from);
        let engine = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut rx = queue.rx.lock().await;
            debug!(route = %route.id, from = %from, "seda consumer started");
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        let stop = changed.is_err() || *shutdown.borrow_and_update();
                        if stop {
                            break;
                        }
                    }
                    next = rx.recv() => match next {
                        Some(exchange) => engine.consume(&route, exchange).await,
                        None => break,
                    },
                }
            }
            while let Ok(exchange) = rx.try_recv() {
                engine.consume(&route, exchange).await;
            }
            debug!(route = %route.id, "seda consumer stopped");
        }))
    }

    async fn consume(self: &Arc<Self>, route: &ActiveRoute, exchange: Exchange) {
        let exchange_id = exchange.id.clone();
        if let Err(e) = self.run_route(route, exchange).await {
            warn!(route = %route.id, exchange_id = %exchange_id, error = %e, "async exchange failed");
            metrics::counter!(m::RUNTIME_EXCHANGES_FAILED_TOTAL).increment(1);
        }
    }
}
