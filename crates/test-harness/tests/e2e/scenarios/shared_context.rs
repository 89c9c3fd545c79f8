//! Per-class mode: one context per class and worker.

use std::sync::Arc;

use crate::helpers::assertions::*;
use crate::helpers::factory::RecordingFactory;
use crate::helpers::fixtures::*;

use switchyard_core::config::LifecycleSettings;
use switchyard_core::registry::Registry;
use switchyard_core::runtime::{ContextFactory, ContextSpec};
use switchyard_memory::MemoryRuntime;
use switchyard_test::{
    ClassRunner, ExecutionContext, LifecycleOrchestrator, SharedLifecycleRegistry,
    SharedLifecycleState, TypeMarker, WorkerKey,
};

fn shared_class(name: &str) -> switchyard_test::ClassDefinition<RouteTest> {
    forwarding_class(name).marker(TypeMarker::ShareContextPerClass(true))
}

/// Two methods with single-message expectations on the same endpoint:
/// one build, expectations reset in between.
#[tokio::test]
async fn test_e2e_shared_context_resets_expectations_between_methods() {
    let factory = RecordingFactory::new(MemoryRuntime::new());

    let report = runner(shared_class("SharedRoute"), &factory)
        .test("sends_a", |t| {
            Box::pin(async move {
                let out = t.out()?;
                out.expected_message_count(1);
                out.expected_bodies_received(["a"]);
                t.start()?.send_body("a").await?;
                out.assert_is_satisfied(WAIT).await?;
                Ok(())
            })
        })
        .test("sends_b", |t| {
            Box::pin(async move {
                let out = t.out()?;
                anyhow::ensure!(out.received_count() == 0, "records survived the reset");
                out.expected_message_count(1);
                out.expected_bodies_received(["b"]);
                t.start()?.send_body("b").await?;
                out.assert_is_satisfied(WAIT).await?;
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
    assert_eq!(factory.builds(), 1);
    assert!(factory.contexts()[0].status().is_stopped());

    let stats = factory.runtime().stats();
    assert_eq!(stats.contexts_started, 1);
    assert_eq!(stats.contexts_stopped, 1);
    assert_eq!(stats.mock_resets, 1);
}

/// N methods -> one build and N-1 reset passes.
#[tokio::test]
async fn test_e2e_shared_context_reset_count() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let mut shared = runner(shared_class("SharedMany"), &factory);
    for i in 0..4 {
        shared = shared.test(format!("method_{i}"), |t| {
            Box::pin(async move {
                anyhow::ensure!(t.context()?.status().is_started(), "context not started");
                Ok(())
            })
        });
    }

    let report = shared.run().await;

    assert_all_passed(&report);
    let stats = factory.runtime().stats();
    assert_eq!(stats.contexts_created, 1);
    assert_eq!(stats.contexts_started, 1);
    assert_eq!(stats.mock_resets, 3);
    assert_eq!(stats.contexts_stopped, 1);
}

/// Final teardown removes the worker entry; the next class on the same
/// worker starts clean.
#[tokio::test]
async fn test_e2e_final_teardown_clears_worker_entry() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let execution = ExecutionContext::new(WorkerKey::named("w"), SharedLifecycleRegistry::new());

    for class in ["FirstShared", "SecondShared"] {
        let report = ClassRunner::new(shared_class(class), factory.handle())
            .execution(execution.clone())
            .settings(LifecycleSettings::default())
            .test("checks_context", |t| {
                Box::pin(async move {
                    anyhow::ensure!(t.context()?.status().is_started(), "stale context injected");
                    Ok(())
                })
            })
            .run()
            .await;
        assert_all_passed(&report);
        assert!(execution.shared().is_empty());
    }

    let contexts = factory.contexts();
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[0].name(), "FirstShared");
    assert_eq!(contexts[1].name(), "SecondShared");
    assert!(contexts.iter().all(|c| c.status().is_stopped()));
}

/// Two workers on one registry never see each other's context.
#[tokio::test]
async fn test_e2e_workers_are_isolated() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let registry = SharedLifecycleRegistry::new();
    let class = Arc::new(shared_class("Isolated"));

    let mut first = LifecycleOrchestrator::new(Arc::clone(&class), factory.handle())
        .with_execution(ExecutionContext::new(WorkerKey::named("w1"), registry.clone()))
        .with_settings(LifecycleSettings::default());
    let mut second = LifecycleOrchestrator::new(Arc::clone(&class), factory.handle())
        .with_execution(ExecutionContext::new(WorkerKey::named("w2"), registry.clone()))
        .with_settings(LifecycleSettings::default());

    let mut a = class.instantiate();
    let mut b = class.instantiate();
    first.setup("a", &mut a).await.unwrap();
    second.setup("b", &mut b).await.unwrap();

    assert_eq!(factory.builds(), 2);
    assert!(!Arc::ptr_eq(a.context.as_ref().unwrap(), b.context.as_ref().unwrap()));
    assert_eq!(registry.len(), 2);

    first.teardown("a").await.unwrap();
    first.final_teardown().await.unwrap();
    assert!(!registry.contains(&WorkerKey::named("w1")));
    assert!(registry.contains(&WorkerKey::named("w2")));
    assert!(b.context.as_ref().unwrap().status().is_started());

    second.teardown("b").await.unwrap();
    second.final_teardown().await.unwrap();
    assert!(registry.is_empty());
}

/// Final teardown leaves an entry that holds another context.
#[tokio::test]
async fn test_e2e_final_teardown_only_clears_owned_entry() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let registry = SharedLifecycleRegistry::new();
    let worker = WorkerKey::named("w");
    let class = Arc::new(shared_class("Guarded"));

    let mut orchestrator = LifecycleOrchestrator::new(Arc::clone(&class), factory.handle())
        .with_execution(ExecutionContext::new(worker.clone(), registry.clone()))
        .with_settings(LifecycleSettings::default());
    let mut fixture = class.instantiate();
    orchestrator.setup("m", &mut fixture).await.unwrap();
    orchestrator.teardown("m").await.unwrap();

    let stranger = factory
        .runtime()
        .create_context(ContextSpec {
            name: "stranger".to_owned(),
            registry: Registry::new(),
            management_enabled: false,
        })
        .unwrap();
    registry.insert(
        worker.clone(),
        SharedLifecycleState {
            producer: stranger.create_producer(),
            consumer: stranger.create_consumer(),
            context: Arc::clone(&stranger),
            service: None,
        },
    );

    orchestrator.final_teardown().await.unwrap();

    let entry = registry.get(&worker).expect("entry kept");
    assert!(entry.is_owned_by(&stranger));
    assert!(fixture.context.as_ref().unwrap().status().is_started());
    assert_eq!(factory.runtime().stats().contexts_stopped, 0);
}
