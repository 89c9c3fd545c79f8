//! Intercept strategies, seda routes, replace-from and the route builder switch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::helpers::assertions::*;
use crate::helpers::factory::RecordingFactory;
use crate::helpers::fixtures::*;

use switchyard_core::route::{RouteBuilder, RouteDefinition};
use switchyard_memory::MemoryRuntime;
use switchyard_test::TypeMarker;

/// Every non-mock endpoint gets a `mock:` copy.
#[tokio::test]
async fn test_e2e_mock_all_endpoints() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = injected_class("MockAll")
        .marker(TypeMarker::mock_endpoints())
        .route_provider("routes", |_| {
            RouteBuilder::new()
                .route(RouteDefinition::from("direct:start").to("seda:queue"))
                .route(RouteDefinition::from("seda:queue").to("log:foo").to("mock:out"))
        });

    let report = runner(class, &factory)
        .test("copies_every_hop", |t| {
            Box::pin(async move {
                t.start()?.send_body("Hello World").await?;
                let context = t.context()?;
                for uri in ["mock:direct:start", "mock:seda:queue", "mock:log:foo", "mock:out"] {
                    let mock = context.mock_endpoint(uri)?;
                    mock.expected_bodies_received(["Hello World"]);
                    mock.assert_is_satisfied(WAIT).await?;
                }
                anyhow::ensure!(!context.has_endpoint("mock:mock:out"), "mock of a mock");
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
}

/// Matching sends are copied to the test double and skip the original.
#[tokio::test]
async fn test_e2e_mock_and_skip() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = injected_class("MockAndSkip")
        .marker(TypeMarker::MockEndpointsAndSkip("direct:audit".to_owned()))
        .route_provider("routes", |_| {
            RouteBuilder::new()
                .route(RouteDefinition::from("direct:start").to("direct:audit").to("mock:out"))
                .route(RouteDefinition::from("direct:audit").to("mock:audited"))
        });

    let report = runner(class, &factory)
        .test("skips_audit", |t| {
            Box::pin(async move {
                t.start()?.send_body("x").await?;
                let context = t.context()?;
                anyhow::ensure!(context.mock_endpoint("mock:direct:audit")?.received_count() == 1);
                anyhow::ensure!(context.mock_endpoint("mock:audited")?.received_count() == 0);
                anyhow::ensure!(t.out()?.received_count() == 1);
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
}

/// Seda routes run asynchronously; headers travel with the body.
#[tokio::test]
async fn test_e2e_seda_route_with_header() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = injected_class("SedaHeader").route_provider("routes", |_| {
        RouteBuilder::new().route(RouteDefinition::from("seda:start").to("mock:out"))
    });

    let report = runner(class, &factory)
        .test("sends_with_header", |t| {
            Box::pin(async move {
                let out = t.out()?;
                out.expected_message_count(1);
                out.expected_header_received("foo", "bar");
                t.start()?
                    .send_body_and_header_to("seda:start", "<hello/>", "foo", "bar")
                    .await?;
                out.assert_is_satisfied(WAIT).await?;
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
}

/// Replace-from swaps a route source before the context starts.
#[tokio::test]
async fn test_e2e_replace_from() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = injected_class("ReplaceFrom")
        .route_provider("routes", |_| {
            RouteBuilder::new().route(
                RouteDefinition::from("seda:external")
                    .route_id("ingest")
                    .to("mock:out"),
            )
        })
        .replace_from("ingest", "direct:start");

    let report = runner(class, &factory)
        .test("ingests_directly", |t| {
            Box::pin(async move {
                t.start()?.send_body("now").await?;
                anyhow::ensure!(t.out()?.received_count() == 1, "direct:start did not reach the route");
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
}

/// Replacing the source of an unknown route fails setup.
#[tokio::test]
async fn test_e2e_replace_from_unknown_route() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = forwarding_class("ReplaceUnknown").replace_from("missing", "direct:other");

    let report = runner(class, &factory)
        .test("never_runs", |_| Box::pin(async { Ok(()) }))
        .run()
        .await;

    let message = assert_failed_in(&report, "never_runs", switchyard_test::FailurePhase::Setup);
    assert!(message.contains("missing"), "{message}");
    assert!(factory.contexts()[0].status().is_stopped());
}

/// With route builders disabled no provider runs and the context stays unstarted.
#[tokio::test]
async fn test_e2e_route_builder_disabled() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let invoked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&invoked);
    let class = injected_class("NoRouteBuilder")
        .marker(TypeMarker::UseRouteBuilder(false))
        .route_provider("routes", move |_| {
            flag.store(true, Ordering::SeqCst);
            RouteBuilder::new().route(RouteDefinition::from("direct:start").to("mock:out"))
        });

    let report = runner(class, &factory)
        .test("context_left_alone", |t| {
            Box::pin(async move {
                let context = t.context()?;
                anyhow::ensure!(!context.status().is_started(), "context started");
                anyhow::ensure!(context.route_ids().is_empty(), "routes registered");
                Ok(())
            })
        })
        .run()
        .await;

    assert_all_passed(&report);
    assert!(!invoked.load(Ordering::SeqCst));
}
