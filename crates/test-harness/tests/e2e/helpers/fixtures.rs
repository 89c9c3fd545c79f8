//! Common fixtures and class definitions.

use std::sync::Arc;

use anyhow::Context as _;

use switchyard_core::config::LifecycleSettings;
use switchyard_core::mock::MockEndpoint;
use switchyard_core::route::{RouteBuilder, RouteDefinition};
use switchyard_core::runtime::{BoundProducer, RuntimeContext};
use switchyard_test::{
    ClassDefinition, ClassRunner, ExecutionContext, SharedLifecycleRegistry, WorkerKey,
};

use super::factory::RecordingFactory;

/// Fixture with the three injectable field kinds.
#[derive(Default)]
pub struct RouteTest {
    pub context: Option<Arc<dyn RuntimeContext>>,
    pub out: Option<Arc<MockEndpoint>>,
    pub start: Option<BoundProducer>,
}

#[allow(dead_code)]
impl RouteTest {
    pub fn context(&self) -> anyhow::Result<&Arc<dyn RuntimeContext>> {
        self.context.as_ref().context("context was not injected")
    }

    pub fn out(&self) -> anyhow::Result<&Arc<MockEndpoint>> {
        self.out.as_ref().context("mock:out was not injected")
    }

    pub fn start(&self) -> anyhow::Result<&BoundProducer> {
        self.start.as_ref().context("producer was not injected")
    }
}

/// `direct:start -> mock:out`, with context, `mock:out` and a
/// `direct:start` producer injected.
#[allow(dead_code)]
pub fn forwarding_class(name: &str) -> ClassDefinition<RouteTest> {
    injected_class(name).route_provider("routes", |_| {
        RouteBuilder::new().route(RouteDefinition::from("direct:start").to("mock:out"))
    })
}

/// Injection points of [`RouteTest`] without any route provider.
#[allow(dead_code)]
pub fn injected_class(name: &str) -> ClassDefinition<RouteTest> {
    ClassDefinition::<RouteTest>::with_default(name)
        .inject_context("context", |t, ctx| t.context = Some(ctx))
        .inject_endpoint("out", "mock:out", |t, mock| t.out = Some(mock))
        .inject_producer("start", "direct:start", |t, producer| {
            t.start = Some(producer)
        })
}

/// A runner on its own worker with default lifecycle settings.
#[allow(dead_code)]
pub fn runner<T: Send + 'static>(
    class: ClassDefinition<T>,
    factory: &RecordingFactory,
) -> ClassRunner<T> {
    ClassRunner::new(class, factory.handle())
        .execution(isolated_worker("e2e"))
        .settings(LifecycleSettings::default())
}

/// Fresh registry and a named worker key.
#[allow(dead_code)]
pub fn isolated_worker(name: &str) -> ExecutionContext {
    ExecutionContext::new(WorkerKey::named(name), SharedLifecycleRegistry::new())
}
