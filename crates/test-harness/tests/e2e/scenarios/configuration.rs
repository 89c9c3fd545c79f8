//! Malformed class definitions fail before any context exists.

use serde_json::json;

use crate::helpers::assertions::*;
use crate::helpers::factory::RecordingFactory;
use crate::helpers::fixtures::*;

use switchyard_core::properties::Properties;
use switchyard_core::route::{RouteBuilder, RouteDefinition};
use switchyard_memory::MemoryRuntime;
use switchyard_test::{
    ConfigurationError, ConfigurationScanner, FieldDecl, MethodDecl, MethodRole, MethodStatus,
    TypeMarker, Visibility,
};

/// A route provider returning the wrong type is named in the error and no
/// context is built.
#[tokio::test]
async fn test_e2e_wrong_route_provider_type_is_rejected() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = injected_class("WrongReturn").method(
        MethodDecl::new("createRoutes", |_: &mut RouteTest| "not a route".to_owned())
            .role(MethodRole::RouteDefinitionProvider),
    );

    let err = ConfigurationScanner::new().scan(&class).unwrap_err();
    assert_eq!(err.member(), Some("createRoutes"));
    assert!(matches!(err, ConfigurationError::MethodReturnType { .. }));

    let report = runner(class, &factory)
        .test("never_runs", |_| Box::pin(async { Ok(()) }))
        .run()
        .await;

    let class_error = report.class_error.clone().expect("class error");
    assert!(class_error.contains("createRoutes"), "{class_error}");
    assert!(matches!(
        report.outcome("never_runs").unwrap().status,
        MethodStatus::NotRun { .. }
    ));
    assert!(factory.specs().is_empty());
}

/// The same marker kind twice is a conflict, whatever the values.
#[test]
fn test_e2e_conflicting_markers_are_rejected() {
    let class = forwarding_class("Conflicting")
        .marker(TypeMarker::ShareContextPerClass(true))
        .marker(TypeMarker::ShareContextPerClass(true));

    let err = ConfigurationScanner::new().scan(&class).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::ConflictingMarkers {
            class: "Conflicting".to_owned(),
            marker: "ShareContextPerClass",
        }
    );
}

/// Different marker kinds compose.
#[test]
fn test_e2e_distinct_markers_compose() {
    let class = forwarding_class("Composed")
        .marker(TypeMarker::ShareContextPerClass(true))
        .marker(TypeMarker::UseDebugger(true))
        .marker(TypeMarker::mock_endpoints())
        .marker(TypeMarker::DisableManagementAgent(true));

    let config = ConfigurationScanner::new().scan(&class).unwrap();
    assert!(config.share_context_per_class);
    assert!(config.use_debugger);
    assert!(config.disable_management_agent);
    assert_eq!(config.mock_endpoints_pattern.as_deref(), Some("*"));
}

/// A marked field must be public.
#[tokio::test]
async fn test_e2e_non_public_injected_field_is_rejected() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = forwarding_class("HiddenField").field(
        FieldDecl::context("hidden", |t: &mut RouteTest, ctx| t.context = Some(ctx))
            .visibility(Visibility::Private),
    );

    let report = runner(class, &factory)
        .test("never_runs", |_| Box::pin(async { Ok(()) }))
        .run()
        .await;

    let class_error = report.class_error.expect("class error");
    assert!(class_error.contains("hidden"), "{class_error}");
    assert!(factory.specs().is_empty());
}

/// An unmarked private field is ignored.
#[test]
fn test_e2e_unmarked_private_field_is_ignored() {
    let class = forwarding_class("PlainField")
        .field(FieldDecl::plain("scratch").visibility(Visibility::Private));

    let config = ConfigurationScanner::new().scan(&class).unwrap();
    assert_eq!(config.injections.len(), 3);
}

/// An invalid mock pattern is a configuration error.
#[test]
fn test_e2e_invalid_mock_pattern_is_rejected() {
    let class = forwarding_class("BadPattern").marker(TypeMarker::MockEndpoints("(".to_owned()));

    let err = ConfigurationScanner::new().scan(&class).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::InvalidPattern {
            marker: "MockEndpoints",
            ..
        }
    ));
}

/// With two property-override suppliers the last registered one wins.
#[tokio::test]
async fn test_e2e_last_property_supplier_wins() {
    let factory = RecordingFactory::new(MemoryRuntime::new());
    let class = injected_class("LastWins")
        .route_provider("routes", |_| {
            RouteBuilder::new().route(RouteDefinition::from("direct:start").to("{{target}}"))
        })
        .property_override("first", |_| Properties::new().with("target", "mock:first"))
        .property_override("second", |_| Properties::new().with("target", "mock:second"));

    let config = ConfigurationScanner::new().scan(&class).unwrap();
    assert_eq!(config.property_override.as_ref().map(|p| p.name()), Some("second"));

    let report = runner(class, &factory)
        .test("routes_to_second", |t| {
            Box::pin(async move {
                t.start()?.send_body("x").await?;
                let context = t.context()?;
                anyhow::ensure!(context.mock_endpoint("mock:second")?.received_count() == 1);
                anyhow::ensure!(context.mock_endpoint("mock:first")?.received_count() == 0);
                Ok(())
            })
        })
        .run()
        .await;
    assert_all_passed(&report);
}

/// Scanning twice yields the same configuration.
#[test]
fn test_e2e_scanning_is_deterministic() {
    let class = forwarding_class("Twice")
        .marker(TypeMarker::MockEndpointsAndSkip("direct:*".to_owned()))
        .property_override("props", |_| Properties::new().with("k", "v"));
    let scanner = ConfigurationScanner::new();

    let first = scanner.scan(&class).unwrap().summary();
    let second = scanner.scan(&class).unwrap().summary();
    assert_eq!(first, second);
    assert_eq!(serde_json::to_value(&first).unwrap()["class_name"], json!("Twice"));
}

/// A registry factory declared without its argument breaks the arity contract.
#[test]
fn test_e2e_registry_factory_arity_is_checked() {
    let class = forwarding_class("Arity").method(
        MethodDecl::new("registry", |_: &mut RouteTest| switchyard_core::registry::Registry::new())
            .role(MethodRole::RegistryFactory),
    );

    let err = ConfigurationScanner::new().scan(&class).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::MethodArity {
            expected: 1,
            actual: 0,
            ..
        }
    ));
}
