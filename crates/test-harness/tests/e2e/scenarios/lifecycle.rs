//! Hook ordering, skip-start, advice-with, owning service and teardown composition.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::helpers::assertions::*;
use crate::helpers::factory::RecordingFactory;
use crate::helpers::fixtures::*;
use crate::helpers::mock_service::MockService;

use switchyard_core::config::{LifecycleSettings, SKIP_CONTEXT_START_ENV};
use switchyard_memory::MemoryRuntime;
use switchyard_test::{
    ClassRunner, FailurePhase, HarnessError, HookChain, LifecycleOrchestrator, LifecycleState,
    TeardownError, TimeUnit, TypeMarker, with_setup, with_teardown,
};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

/// Orchestrator setup precedes before-each hooks and teardown follows
/// after-each hooks.
#[tokio::test]
async fn test_e2e_hook_order() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let log: Log = Arc::default();

    let hooks = {
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        HookChain::<RouteTest>::new()
            .before_all(move || {
                record(&a, "before_all");
                Box::pin(async { Ok(()) })
            })
            .before_each(move |t| {
                let log = b.clone();
                Box::pin(async move {
                    let started = t.context()?.status().is_started();
                    record(&log, format!("before_each started={started}"));
                    Ok(())
                })
            })
            .after_each(move |t| {
                let log = c.clone();
                Box::pin(async move {
                    let started = t.context()?.status().is_started();
                    record(&log, format!("after_each started={started}"));
                    Ok(())
                })
            })
            .after_all(move || {
                record(&d, "after_all");
                Box::pin(async { Ok(()) })
            })
    };

    let body_log = log.clone();
    let report = runner(forwarding_class("HookOrder"), &factory)
        .hooks(hooks)
        .test("body", move |_| {
            record(&body_log, "body");
            Box::pin(async { Ok(()) })
        })
        .run()
        .await;

    assert_all_passed(&report);
    assert_eq!(
        *log.lock().unwrap(),
        [
            "before_all",
            "before_each started=true",
            "body",
            "after_each started=true",
            "after_all",
        ]
    );
    assert!(factory.contexts()[0].status().is_stopped());
}

/// A failing before-each hook skips the body but still tears down.
#[tokio::test]
async fn test_e2e_before_each_failure_still_tears_down() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let log: Log = Arc::default();
    let after = log.clone();
    let hooks = HookChain::<RouteTest>::new()
        .before_each(|_| Box::pin(async { anyhow::bail!("fixture data missing") }))
        .after_each(move |_| {
            record(&after, "after_each");
            Box::pin(async { Ok(()) })
        });

    let body_log = log.clone();
    let report = runner(forwarding_class("BeforeEachFails"), &factory)
        .hooks(hooks)
        .test("body", move |_| {
            record(&body_log, "body");
            Box::pin(async { Ok(()) })
        })
        .run()
        .await;

    let message = assert_failed_in(&report, "body", FailurePhase::Setup);
    assert_eq!(message, "fixture data missing");
    assert_eq!(*log.lock().unwrap(), ["after_each"]);
    assert!(factory.contexts()[0].status().is_stopped());
}

/// A failing after-all hook is a class error; final teardown still runs.
#[tokio::test]
async fn test_e2e_after_all_failure_still_releases_shared_context() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let hooks = HookChain::<RouteTest>::new()
        .after_all(|| Box::pin(async { anyhow::bail!("cleanup failed") }));

    let report = runner(
        forwarding_class("AfterAllFails").marker(TypeMarker::ShareContextPerClass(true)),
        &factory,
    )
    .hooks(hooks)
    .test("body", |_| Box::pin(async { Ok(()) }))
    .run()
    .await;

    assert!(report.outcome("body").unwrap().passed());
    assert_eq!(report.class_error.as_deref(), Some("cleanup failed"));
    assert!(factory.contexts()[0].status().is_stopped());
}

/// The environment flag leaves every context unstarted.
#[tokio::test]
#[serial_test::serial]
async fn test_e2e_skip_start_flag() {
    // SAFETY: serialized with every other test touching this variable
    unsafe { std::env::set_var(SKIP_CONTEXT_START_ENV, "true") };

    let factory = RecordingFactory::new(MemoryRuntime::new());
    let report = ClassRunner::new(forwarding_class("SkipStart"), factory.handle())
        .execution(isolated_worker("skip"))
        .test("not_started", |t| {
            Box::pin(async move {
                let context = t.context()?;
                anyhow::ensure!(!context.status().is_started(), "context started");
                anyhow::ensure!(context.route_ids().len() == 1, "routes not registered");
                Ok(())
            })
        })
        .run()
        .await;

    unsafe { std::env::remove_var(SKIP_CONTEXT_START_ENV) };
    assert_all_passed(&report);
    assert_eq!(factory.runtime().stats().contexts_started, 0);
}

/// Advice-with mode configures the context and lets the test start it.
#[tokio::test]
async fn test_e2e_advice_with_defers_start() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = forwarding_class("AdviceWith").marker(TypeMarker::UseAdviceWith(true));

    let report = runner(class, &factory)
        .test("starts_manually", |t| {
            Box::pin(async move {
                let context = t.context()?;
                anyhow::ensure!(!context.status().is_started(), "context auto-started");
                context.start().await?;
                t.start()?.send_body("advised").await?;
                t.out()?.expected_bodies_received(["advised"]);
                t.out()?.assert_is_satisfied(WAIT).await?;
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
    assert!(factory.contexts()[0].status().is_stopped());
}

fn orchestrator(factory: &RecordingFactory, class_name: &str) -> LifecycleOrchestrator<RouteTest> {
    LifecycleOrchestrator::new(Arc::new(forwarding_class(class_name)), factory.handle())
        .with_execution(isolated_worker(class_name))
        .with_settings(LifecycleSettings::default())
}

/// A substituted owning service is stopped instead of the context, and
/// started instead of it on later builds.
#[tokio::test]
async fn test_e2e_substituted_service_owns_start_and_stop() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let mut orch = orchestrator(&factory, "OwnedContext");
    let service = Arc::new(MockService::healthy("owner"));

    let mut first = RouteTest::default();
    orch.setup("first", &mut first).await.unwrap();
    orch.substitute_service(service.clone());
    orch.teardown("first").await.unwrap();
    assert!(service.is_stopped());
    assert!(first.context.as_ref().unwrap().status().is_started());

    let mut second = RouteTest::default();
    orch.setup("second", &mut second).await.unwrap();
    assert_eq!(service.start_count(), 1);
    assert!(!second.context.as_ref().unwrap().status().is_started());
    orch.teardown("second").await.unwrap();
    orch.final_teardown().await.unwrap();
}

/// A teardown failure is reported when nothing failed before it.
#[tokio::test]
async fn test_e2e_teardown_failure_is_reported() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let mut orch = orchestrator(&factory, "StopFails");
    let mut fixture = RouteTest::default();

    orch.setup("m", &mut fixture).await.unwrap();
    orch.substitute_service(Arc::new(MockService::failing_stop("owner", "stuck")));
    let producer = orch.producer().unwrap();
    let err = orch.teardown("m").await.unwrap_err();

    assert!(matches!(err, TeardownError::Stop { .. }));
    assert!(err.to_string().contains("stuck"));
    assert!(producer.status().is_stopped());
    assert_eq!(orch.state(), LifecycleState::Initialized);
}

/// A body failure stays primary over a later teardown failure.
#[tokio::test]
async fn test_e2e_body_failure_stays_primary() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let mut orch = orchestrator(&factory, "PrimaryFailure");
    let hooks = HookChain::<RouteTest>::new();
    let mut fixture = RouteTest::default();

    with_setup(&mut orch, &hooks, "m", &mut fixture).await.unwrap();
    orch.substitute_service(Arc::new(MockService::failing_stop("owner", "stuck")));
    let outcome = Err(anyhow::anyhow!("body assertion failed"));
    let err = with_teardown(&mut orch, &hooks, "m", &mut fixture, outcome)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "body assertion failed");
    assert_eq!(orch.state(), LifecycleState::Initialized);
}

/// Without a primary failure the teardown error surfaces as a harness error.
#[tokio::test]
async fn test_e2e_teardown_error_surfaces_through_wrapper() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let mut orch = orchestrator(&factory, "WrapperTeardown");
    let hooks = HookChain::<RouteTest>::new();
    let mut fixture = RouteTest::default();

    with_setup(&mut orch, &hooks, "m", &mut fixture).await.unwrap();
    orch.substitute_service(Arc::new(MockService::failing_stop("owner", "stuck")));
    let err = with_teardown(&mut orch, &hooks, "m", &mut fixture, Ok(()))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::Teardown(TeardownError::Stop { .. }))
    ));
}

/// A stop that outlives the shutdown timeout is abandoned.
#[tokio::test]
async fn test_e2e_stop_is_bounded_by_shutdown_timeout() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = forwarding_class("SlowStop").marker(TypeMarker::ShutdownTimeout {
        value: 50,
        unit: TimeUnit::Milliseconds,
    });
    let mut orch = LifecycleOrchestrator::new(Arc::new(class), factory.handle())
        .with_execution(isolated_worker("slow"))
        .with_settings(LifecycleSettings::default());
    let mut fixture = RouteTest::default();

    orch.setup("m", &mut fixture).await.unwrap();
    orch.substitute_service(Arc::new(
        MockService::healthy("slow-owner").with_stop_delay(Duration::from_secs(5)),
    ));
    let started = Instant::now();
    orch.teardown("m").await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
}

/// The consumer gateway polls seda queues of the orchestrated context.
#[tokio::test]
async fn test_e2e_consumer_gateway_receives() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let mut orch = orchestrator(&factory, "Consumer");
    let mut fixture = RouteTest::default();
    orch.setup("m", &mut fixture).await.unwrap();

    fixture
        .start
        .as_ref()
        .unwrap()
        .send_to("seda:inbox", switchyard_core::exchange::Exchange::new("queued"))
        .await
        .unwrap();
    let received = orch
        .consumer()
        .unwrap()
        .receive("seda:inbox", WAIT)
        .await
        .unwrap()
        .expect("message");
    assert_eq!(received.body, json!("queued"));

    orch.teardown("m").await.unwrap();
    orch.final_teardown().await.unwrap();
    assert_eq!(orch.state(), LifecycleState::TornDown);
}

/// A failed assertion in a shared-context body still runs after-each hooks
/// and releases the worker entry.
#[tokio::test]
async fn test_e2e_panicking_body_releases_shared_context() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let execution = isolated_worker("panicking");
    let registry = execution.shared().clone();
    let log: Log = Arc::default();
    let after = log.clone();
    let hooks = HookChain::<RouteTest>::new().after_each(move |_| {
        record(&after, "after_each");
        Box::pin(async { Ok(()) })
    });

    let runner = ClassRunner::new(
        forwarding_class("PanickingBody").marker(TypeMarker::ShareContextPerClass(true)),
        factory.handle(),
    )
    .execution(execution)
    .settings(LifecycleSettings::default())
    .hooks(hooks)
    .test("fails_assertion", |t| {
        Box::pin(async move {
            assert_eq!(t.out()?.received_count(), 1, "nothing was sent");
            Ok(())
        })
    });
    let report = tokio::spawn(async move { runner.run().await })
        .await
        .expect("runner must not unwind");

    let message = assert_failed_in(&report, "fails_assertion", FailurePhase::Test);
    assert!(message.contains("nothing was sent"), "{message}");
    assert_eq!(*log.lock().unwrap(), ["after_each"]);
    assert!(factory.contexts()[0].status().is_stopped());
    assert!(registry.is_empty());
}

/// The skip-start flag is read when the context is built, not when the
/// orchestrator is created.
#[tokio::test]
#[serial_test::serial]
async fn test_e2e_skip_start_flag_read_at_build() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let mut orch = LifecycleOrchestrator::new(
        Arc::new(forwarding_class("LateSkipStart")),
        factory.handle(),
    )
    .with_execution(isolated_worker("late-skip"));

    // SAFETY: serialized with every other test touching this variable
    unsafe { std::env::set_var(SKIP_CONTEXT_START_ENV, "true") };
    let mut fixture = RouteTest::default();
    let result = orch.setup("m", &mut fixture).await;
    unsafe { std::env::remove_var(SKIP_CONTEXT_START_ENV) };

    result.unwrap();
    assert!(!fixture.context.as_ref().unwrap().status().is_started());
    orch.teardown("m").await.unwrap();
    orch.final_teardown().await.unwrap();
}
