//! Explicit registration of a test class.
//!
//! A [`ClassDefinition`] describes a test class without reflection: the
//! fixture factory, type-level markers, injectable fields and provider
//! methods are all registered through a builder. Each method keeps its
//! parameter and return types as [`TypeTag`]s so the scanner can check
//! role contracts before anything is invoked.
//!
//! # Example
//!
//! ```
//! use switchyard_core::route::{RouteBuilder, RouteDefinition};
//! use switchyard_test::definition::ClassDefinition;
//! use switchyard_test::marker::TypeMarker;
//!
//! #[derive(Default)]
//! struct OrderTest;
//!
//! let class = ClassDefinition::<OrderTest>::with_default("OrderTest")
//!     .marker(TypeMarker::ShareContextPerClass(true))
//!     .route_provider("create_route_builder", |_| {
//!         RouteBuilder::new().route(RouteDefinition::from("direct:start").to("mock:result"))
//!     });
//! assert_eq!(class.methods().len(), 1);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use switchyard_core::debug::Breakpoint;
use switchyard_core::mock::MockEndpoint;
use switchyard_core::properties::Properties;
use switchyard_core::registry::Registry;
use switchyard_core::route::RouteBuilder;
use switchyard_core::runtime::{BoundProducer, RuntimeContext};

use crate::marker::{FieldMarker, MethodRole, Receiver, TypeMarker, Visibility};

/// Erased method body. Returns `None` when an argument has an unexpected type.
pub(crate) type Invoker<T> =
    Arc<dyn Fn(&mut T, Vec<Box<dyn Any + Send>>) -> Option<Box<dyn Any + Send>> + Send + Sync>;

// ─── TypeTag ─────────────────────────────────────────────────────────

/// Runtime identity of a parameter or return type.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<X: Any>() -> Self {
        Self {
            id: TypeId::of::<X>(),
            name: std::any::type_name::<X>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this tag denotes `X`.
    pub fn is<X: Any>(&self) -> bool {
        self.id == TypeId::of::<X>()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ─── Fields ──────────────────────────────────────────────────────────

pub(crate) enum FieldSetter<T> {
    Context(Arc<dyn Fn(&mut T, Arc<dyn RuntimeContext>) + Send + Sync>),
    Endpoint {
        uri: String,
        set: Arc<dyn Fn(&mut T, Arc<MockEndpoint>) + Send + Sync>,
    },
    Producer {
        uri: String,
        set: Arc<dyn Fn(&mut T, BoundProducer) + Send + Sync>,
    },
}

impl<T> Clone for FieldSetter<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Context(set) => Self::Context(Arc::clone(set)),
            Self::Endpoint { uri, set } => Self::Endpoint {
                uri: uri.clone(),
                set: Arc::clone(set),
            },
            Self::Producer { uri, set } => Self::Producer {
                uri: uri.clone(),
                set: Arc::clone(set),
            },
        }
    }
}

impl<T> FieldSetter<T> {
    pub(crate) fn marker(&self) -> FieldMarker {
        match self {
            Self::Context(_) => FieldMarker::ContextInject,
            Self::Endpoint { uri, .. } => FieldMarker::EndpointInject(uri.clone()),
            Self::Producer { uri, .. } => FieldMarker::Produce(uri.clone()),
        }
    }
}

/// A fixture field, optionally marked for injection.
pub struct FieldDecl<T> {
    name: String,
    visibility: Visibility,
    setter: Option<FieldSetter<T>>,
}

impl<T: 'static> FieldDecl<T> {
    /// A field without any marker. The scanner ignores it.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            setter: None,
        }
    }

    /// A `ContextInject` field receiving the live context.
    pub fn context(
        name: impl Into<String>,
        set: impl Fn(&mut T, Arc<dyn RuntimeContext>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            setter: Some(FieldSetter::Context(Arc::new(set))),
        }
    }

    /// An `EndpointInject(uri)` field receiving the test double for `uri`.
    pub fn endpoint(
        name: impl Into<String>,
        uri: impl Into<String>,
        set: impl Fn(&mut T, Arc<MockEndpoint>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            setter: Some(FieldSetter::Endpoint {
                uri: uri.into(),
                set: Arc::new(set),
            }),
        }
    }

    /// A `Produce(uri)` field receiving a producer bound to `uri`.
    pub fn producer(
        name: impl Into<String>,
        uri: impl Into<String>,
        set: impl Fn(&mut T, BoundProducer) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            setter: Some(FieldSetter::Producer {
                uri: uri.into(),
                set: Arc::new(set),
            }),
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

impl<T> FieldDecl<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_public(&self) -> bool {
        self.visibility.is_public()
    }

    pub fn marker(&self) -> Option<FieldMarker> {
        self.setter.as_ref().map(FieldSetter::marker)
    }

    pub(crate) fn setter(&self) -> Option<&FieldSetter<T>> {
        self.setter.as_ref()
    }
}

// ─── Methods ─────────────────────────────────────────────────────────

/// A fixture method with its signature and optional provider roles.
pub struct MethodDecl<T> {
    name: String,
    visibility: Visibility,
    receiver: Receiver,
    params: Vec<TypeTag>,
    returns: TypeTag,
    roles: Vec<MethodRole>,
    invoker: Invoker<T>,
}

impl<T: 'static> MethodDecl<T> {
    /// An instance method without arguments.
    pub fn new<R>(name: impl Into<String>, f: impl Fn(&mut T) -> R + Send + Sync + 'static) -> Self
    where
        R: Any + Send,
    {
        let invoker: Invoker<T> =
            Arc::new(move |fixture: &mut T, _args: Vec<Box<dyn Any + Send>>| {
                Some(Box::new(f(fixture)) as Box<dyn Any + Send>)
            });
        Self::from_parts(name, Receiver::Instance, Vec::new(), TypeTag::of::<R>(), invoker)
    }

    /// An instance method with one argument.
    pub fn with_arg<A, R>(
        name: impl Into<String>,
        f: impl Fn(&mut T, A) -> R + Send + Sync + 'static,
    ) -> Self
    where
        A: Any + Send,
        R: Any + Send,
    {
        let invoker: Invoker<T> = Arc::new(move |fixture: &mut T, args: Vec<Box<dyn Any + Send>>| {
            let arg = args.into_iter().next()?.downcast::<A>().ok()?;
            Some(Box::new(f(fixture, *arg)) as Box<dyn Any + Send>)
        });
        Self::from_parts(
            name,
            Receiver::Instance,
            vec![TypeTag::of::<A>()],
            TypeTag::of::<R>(),
            invoker,
        )
    }

    /// An associated function without receiver or arguments.
    pub fn associated<R>(name: impl Into<String>, f: impl Fn() -> R + Send + Sync + 'static) -> Self
    where
        R: Any + Send,
    {
        let invoker: Invoker<T> =
            Arc::new(move |_fixture: &mut T, _args: Vec<Box<dyn Any + Send>>| {
                Some(Box::new(f()) as Box<dyn Any + Send>)
            });
        Self::from_parts(name, Receiver::Static, Vec::new(), TypeTag::of::<R>(), invoker)
    }

    fn from_parts(
        name: impl Into<String>,
        receiver: Receiver,
        params: Vec<TypeTag>,
        returns: TypeTag,
        invoker: Invoker<T>,
    ) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            receiver,
            params,
            returns,
            roles: Vec::new(),
            invoker,
        }
    }

    /// Mark the method with a provider role.
    pub fn role(mut self, role: MethodRole) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

impl<T> MethodDecl<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_public(&self) -> bool {
        self.visibility.is_public()
    }

    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    pub fn params(&self) -> &[TypeTag] {
        &self.params
    }

    pub fn returns(&self) -> TypeTag {
        self.returns
    }

    pub fn roles(&self) -> &[MethodRole] {
        &self.roles
    }

    /// The role that applies when several are present.
    pub fn primary_role(&self) -> Option<MethodRole> {
        self.roles.iter().min().copied()
    }

    pub(crate) fn invoker(&self) -> Invoker<T> {
        Arc::clone(&self.invoker)
    }
}

// ─── ClassDefinition ─────────────────────────────────────────────────

/// Registration of one test class.
pub struct ClassDefinition<T> {
    name: String,
    factory: Arc<dyn Fn() -> T + Send + Sync>,
    type_markers: Vec<TypeMarker>,
    fields: Vec<FieldDecl<T>>,
    methods: Vec<MethodDecl<T>>,
    replace_from: Vec<(String, String)>,
}

impl<T: Default + 'static> ClassDefinition<T> {
    /// A class whose fixture is built with `T::default()`.
    pub fn with_default(name: impl Into<String>) -> Self {
        Self::new(name, T::default)
    }
}

impl<T: 'static> ClassDefinition<T> {
    /// A class whose fixture is built by `factory` once per test method.
    pub fn new(name: impl Into<String>, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            type_markers: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            replace_from: Vec::new(),
        }
    }

    pub fn marker(mut self, marker: TypeMarker) -> Self {
        self.type_markers.push(marker);
        self
    }

    pub fn field(mut self, field: FieldDecl<T>) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDecl<T>) -> Self {
        self.methods.push(method);
        self
    }

    /// Register a public `RouteDefinitionProvider`.
    pub fn route_provider(
        self,
        name: impl Into<String>,
        f: impl Fn(&mut T) -> RouteBuilder + Send + Sync + 'static,
    ) -> Self {
        self.method(MethodDecl::new(name, f).role(MethodRole::RouteDefinitionProvider))
    }

    /// Register a public `BreakpointProvider`.
    pub fn breakpoint_provider(
        self,
        name: impl Into<String>,
        f: impl Fn(&mut T) -> Arc<dyn Breakpoint> + Send + Sync + 'static,
    ) -> Self {
        self.method(MethodDecl::new(name, f).role(MethodRole::BreakpointProvider))
    }

    /// Register a public `PropertyOverrideSupplier`.
    pub fn property_override(
        self,
        name: impl Into<String>,
        f: impl Fn(&mut T) -> Properties + Send + Sync + 'static,
    ) -> Self {
        self.method(MethodDecl::new(name, f).role(MethodRole::PropertyOverrideSupplier))
    }

    /// Register a public `RegistryFactory`.
    pub fn registry_factory(
        self,
        name: impl Into<String>,
        f: impl Fn(&mut T, Registry) -> Registry + Send + Sync + 'static,
    ) -> Self {
        self.method(MethodDecl::with_arg(name, f).role(MethodRole::RegistryFactory))
    }

    /// Register a public `ContextInject` field.
    pub fn inject_context(
        self,
        name: impl Into<String>,
        set: impl Fn(&mut T, Arc<dyn RuntimeContext>) + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldDecl::context(name, set))
    }

    /// Register a public `EndpointInject(uri)` field.
    pub fn inject_endpoint(
        self,
        name: impl Into<String>,
        uri: impl Into<String>,
        set: impl Fn(&mut T, Arc<MockEndpoint>) + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldDecl::endpoint(name, uri, set))
    }

    /// Register a public `Produce(uri)` field.
    pub fn inject_producer(
        self,
        name: impl Into<String>,
        uri: impl Into<String>,
        set: impl Fn(&mut T, BoundProducer) + Send + Sync + 'static,
    ) -> Self {
        self.field(FieldDecl::producer(name, uri, set))
    }

    /// Replace the source endpoint of `route_id` with `uri` once routes are registered.
    pub fn replace_from(mut self, route_id: impl Into<String>, uri: impl Into<String>) -> Self {
        self.replace_from.push((route_id.into(), uri.into()));
        self
    }
}

impl<T> ClassDefinition<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_markers(&self) -> &[TypeMarker] {
        &self.type_markers
    }

    pub fn fields(&self) -> &[FieldDecl<T>] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodDecl<T>] {
        &self.methods
    }

    pub fn pending_replacements(&self) -> &[(String, String)] {
        &self.replace_from
    }

    /// Build a fresh fixture instance.
    pub fn instantiate(&self) -> T {
        (self.factory)()
    }
}

impl<T> fmt::Debug for ClassDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("type_markers", &self.type_markers)
            .field(
                "fields",
                &self.fields.iter().map(FieldDecl::name).collect::<Vec<_>>(),
            )
            .field(
                "methods",
                &self.methods.iter().map(MethodDecl::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
