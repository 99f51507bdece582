//! Registrations whose resolutions are wrapped in interception proxies.
//!
//! Each `add_intercepted*` call takes an [`Interception`]: the interceptors
//! to apply plus proxy generation options. An empty interception produces a
//! plain registration. Otherwise the registration call validates every
//! interceptor type up front, makes sure the shared [`ProxyGenerator`] is
//! registered, and installs a factory that builds the real service and
//! returns a proxy over it.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::activation::{create_instance, Activate, ConstructorArgs};
use crate::collection::ServiceCollection;
use crate::error::{DiError, DiResult};
use crate::intercept::{AsyncInterceptor, AsyncInterceptorAdapter, Interceptor};
use crate::key::{key_of_named_trait, key_of_named_type, key_of_trait, key_of_type, Key};
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::proxy::{ClassProxy, InterfaceProxy, ProxyGenerationOptions, ProxyGenerator, ProxyRequest, TypeKind, TypeRef};
use crate::registration::{AnyArc, Registration};
use crate::traits::{Resolver, ResolverCore};

/// Name under which the shared [`ProxyGenerator`] is registered.
pub const PROXY_GENERATOR_KEY: &str = "ferrous_intercept::proxy_generator";

type Activator = Arc<dyn Fn(&dyn ResolverCore) -> DiResult<AnyArc> + Send + Sync>;
type Capability = Arc<dyn Fn(AnyArc) -> DiResult<Arc<dyn Interceptor>> + Send + Sync>;

/// An interceptor named by type, constructed when the service resolves.
///
/// A registered service of the same type is preferred; otherwise the type is
/// activated with its container dependencies. The registration call rejects
/// types that could never produce an interceptor.
///
/// ```rust
/// use ferrous_intercept::{Activate, ConstructorArgs, DiResult, Interceptor, InterceptorType, Invocation, ResolverCore};
///
/// struct Audit;
///
/// impl Interceptor for Audit {
///     fn intercept(&self, invocation: &Invocation) {
///         invocation.proceed();
///     }
/// }
///
/// impl Activate for Audit {
///     fn activate(_: &dyn ResolverCore, _: &mut ConstructorArgs) -> DiResult<Self> {
///         Ok(Audit)
///     }
/// }
///
/// assert!(InterceptorType::of::<Audit>().validate().is_ok());
/// ```
#[derive(Clone)]
pub struct InterceptorType {
    type_ref: TypeRef,
    activator: Option<Activator>,
    capability: Option<Capability>,
}

impl InterceptorType {
    /// A constructible synchronous interceptor.
    pub fn of<I: Interceptor + Activate>() -> Self {
        Self {
            type_ref: TypeRef::class::<I>(),
            activator: Some(activator::<I>()),
            capability: Some(Arc::new(|any: AnyArc| -> DiResult<Arc<dyn Interceptor>> {
                let interceptor = any
                    .downcast::<I>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>()))?;
                Ok(interceptor as Arc<dyn Interceptor>)
            })),
        }
    }

    /// A constructible asynchronous interceptor, adapted on realisation.
    pub fn of_async<A: AsyncInterceptor + Activate>() -> Self {
        Self {
            type_ref: TypeRef::class::<A>(),
            activator: Some(activator::<A>()),
            capability: Some(Arc::new(|any: AnyArc| -> DiResult<Arc<dyn Interceptor>> {
                let interceptor = any
                    .downcast::<A>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<A>()))?;
                Ok(Arc::new(AsyncInterceptorAdapter::from_arc(interceptor)) as Arc<dyn Interceptor>)
            })),
        }
    }

    /// An interceptor type the container cannot construct on its own.
    pub fn implementing<I: Interceptor>() -> Self {
        Self {
            type_ref: TypeRef::class::<I>(),
            activator: None,
            capability: Some(Arc::new(|any: AnyArc| -> DiResult<Arc<dyn Interceptor>> {
                let interceptor = any
                    .downcast::<I>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>()))?;
                Ok(interceptor as Arc<dyn Interceptor>)
            })),
        }
    }

    /// A constructible type that does not intercept anything.
    pub fn activatable<T: Activate>() -> Self {
        Self {
            type_ref: TypeRef::class::<T>(),
            activator: Some(activator::<T>()),
            capability: None,
        }
    }

    /// A bare type reference, with neither constructor nor capability.
    pub fn from_type(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            activator: None,
            capability: None,
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    /// Checks that the type can produce an interceptor.
    pub fn validate(&self) -> DiResult<()> {
        let reason = if self.type_ref.is_generic_definition() {
            Some("is an unbound generic type definition")
        } else if self.type_ref.kind() == Some(TypeKind::Interface) {
            Some("is abstract (a trait object)")
        } else if self.capability.is_none() {
            Some("does not implement Interceptor")
        } else if self.activator.is_none() {
            Some("has no constructor the container can call (implement Activate)")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(DiError::InvalidInterceptorType {
                type_name: self.type_ref.name(),
                reason,
            }),
            None => Ok(()),
        }
    }

    fn realize(&self, resolver: &dyn ResolverCore) -> DiResult<Arc<dyn Interceptor>> {
        self.validate()?;
        let (Some(capability), Some(activator)) = (&self.capability, &self.activator) else {
            return Err(DiError::InvalidInterceptorType {
                type_name: self.type_ref.name(),
                reason: "cannot be constructed",
            });
        };
        let instance = match self.type_ref.key() {
            Some(key) if resolver.is_registered(&key) => resolver.resolve_any(&key)?,
            _ => activator(resolver)?,
        };
        capability(instance)
    }
}

impl fmt::Debug for InterceptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorType")
            .field("type_ref", &self.type_ref)
            .field("activatable", &self.activator.is_some())
            .field("intercepts", &self.capability.is_some())
            .finish()
    }
}

fn activator<T: Activate>() -> Activator {
    Arc::new(|resolver: &dyn ResolverCore| -> DiResult<AnyArc> {
        let instance: T = create_instance(resolver, ConstructorArgs::new())?;
        Ok(Arc::new(instance) as AnyArc)
    })
}

#[derive(Clone)]
enum InterceptorSource {
    Instance(Arc<dyn Interceptor>),
    Type(InterceptorType),
}

impl InterceptorSource {
    fn name(&self) -> &'static str {
        match self {
            InterceptorSource::Instance(interceptor) => interceptor.name(),
            InterceptorSource::Type(interceptor_type) => interceptor_type.type_ref.name(),
        }
    }
}

/// Interceptors and generation options for one registration, applied in the
/// order they were added.
///
/// ```rust
/// use ferrous_intercept::{interceptor_fn, Interception, ProxyGenerationOptions};
///
/// let interception = Interception::new()
///     .with(interceptor_fn("first", |i| i.proceed()))
///     .with(interceptor_fn("second", |i| i.proceed()))
///     .with_options(ProxyGenerationOptions::default());
/// assert_eq!(interception.names(), vec!["first", "second"]);
/// ```
#[derive(Clone, Default)]
pub struct Interception {
    sources: Vec<InterceptorSource>,
    options: ProxyGenerationOptions,
}

impl Interception {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I: Interceptor>(self, interceptor: I) -> Self {
        self.with_arc(Arc::new(interceptor))
    }

    pub fn with_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.sources.push(InterceptorSource::Instance(interceptor));
        self
    }

    /// Adds an asynchronous interceptor, wrapped in its adapter.
    pub fn with_async<A: AsyncInterceptor>(self, interceptor: A) -> Self {
        self.with_arc(interceptor.into_interceptor())
    }

    /// Adds an interceptor constructed at resolution time.
    pub fn with_type(mut self, interceptor_type: InterceptorType) -> Self {
        self.sources.push(InterceptorSource::Type(interceptor_type));
        self
    }

    pub fn with_options(mut self, options: ProxyGenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(InterceptorSource::name).collect()
    }

    pub fn options(&self) -> &ProxyGenerationOptions {
        &self.options
    }

    /// Validates every interceptor type.
    pub fn validate(&self) -> DiResult<()> {
        self.sources.iter().try_for_each(|source| match source {
            InterceptorSource::Instance(_) => Ok(()),
            InterceptorSource::Type(interceptor_type) => interceptor_type.validate(),
        })
    }

    /// Produces the interceptor instances, in order.
    pub fn realize(&self, resolver: &dyn ResolverCore) -> DiResult<Vec<Arc<dyn Interceptor>>> {
        self.sources
            .iter()
            .map(|source| match source {
                InterceptorSource::Instance(interceptor) => Ok(interceptor.clone()),
                InterceptorSource::Type(interceptor_type) => interceptor_type.realize(resolver),
            })
            .collect()
    }
}

impl fmt::Debug for Interception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("interceptors", &self.names())
            .field("options", &self.options)
            .finish()
    }
}

type TraitFactory<T> = Arc<dyn Fn(&ResolverContext) -> Arc<T> + Send + Sync>;
type ClassFactory<T> = Arc<dyn Fn(&ResolverContext) -> DiResult<T> + Send + Sync>;

impl ServiceCollection {
    /// Registers a pre-built trait implementation, wrapped in a proxy.
    pub fn add_intercepted_trait<T>(
        &mut self,
        lifetime: Lifetime,
        instance: Arc<T>,
        interception: Interception,
    ) -> DiResult<&mut Self>
    where
        T: ?Sized + InterfaceProxy,
    {
        let factory: TraitFactory<T> = Arc::new(move |_: &ResolverContext| instance.clone());
        self.register_intercepted_trait(key_of_trait::<T>(), lifetime, factory, interception)
    }

    /// Registers a trait factory whose results are wrapped in a proxy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_intercept::{
    ///     interceptor_fn, Interception, InterceptorChain, InterfaceProxy, Lifetime, Resolver, ServiceCollection,
    /// };
    /// use std::sync::Arc;
    ///
    /// trait Quotes: Send + Sync {
    ///     fn price(&self, symbol: &str) -> u64;
    /// }
    ///
    /// struct Exchange;
    /// impl Quotes for Exchange {
    ///     fn price(&self, _symbol: &str) -> u64 { 100 }
    /// }
    ///
    /// struct QuotesProxy { target: Option<Arc<dyn Quotes>>, chain: InterceptorChain }
    /// impl Quotes for QuotesProxy {
    ///     fn price(&self, symbol: &str) -> u64 {
    ///         let symbol = symbol.to_string();
    ///         let target = self.target.clone().map(|t| move || t.price(&symbol));
    ///         self.chain.invoke_value("price", target).unwrap_or_default()
    ///     }
    /// }
    /// impl InterfaceProxy for dyn Quotes {
    ///     fn create_proxy(target: Option<Arc<Self>>, chain: InterceptorChain) -> Arc<Self> {
    ///         Arc::new(QuotesProxy { target, chain })
    ///     }
    /// }
    ///
    /// let markup = interceptor_fn("markup", |invocation| {
    ///     invocation.proceed();
    ///     let price: u64 = invocation.take_value_or_default();
    ///     invocation.set_value(price + 5);
    /// });
    ///
    /// let mut services = ServiceCollection::new();
    /// services
    ///     .add_intercepted_trait_factory::<dyn Quotes, _>(
    ///         Lifetime::Singleton,
    ///         |_| Arc::new(Exchange),
    ///         Interception::new().with(markup),
    ///     )
    ///     .unwrap();
    ///
    /// let provider = services.build();
    /// assert_eq!(provider.get_required_trait::<dyn Quotes>().price("ACME"), 105);
    /// ```
    pub fn add_intercepted_trait_factory<T, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
        interception: Interception,
    ) -> DiResult<&mut Self>
    where
        T: ?Sized + InterfaceProxy,
        F: Fn(&ResolverContext) -> Arc<T> + Send + Sync + 'static,
    {
        self.register_intercepted_trait(key_of_trait::<T>(), lifetime, Arc::new(factory), interception)
    }

    /// Keyed form of [`add_intercepted_trait_factory`](Self::add_intercepted_trait_factory).
    /// The factory receives the service key.
    pub fn add_keyed_intercepted_trait_factory<T, F>(
        &mut self,
        service_key: &'static str,
        lifetime: Lifetime,
        factory: F,
        interception: Interception,
    ) -> DiResult<&mut Self>
    where
        T: ?Sized + InterfaceProxy,
        F: Fn(&ResolverContext, &'static str) -> Arc<T> + Send + Sync + 'static,
    {
        let factory: TraitFactory<T> = Arc::new(move |r: &ResolverContext| factory(r, service_key));
        self.register_intercepted_trait(key_of_named_trait::<T>(service_key), lifetime, factory, interception)
    }

    /// Registers a factory for a concrete type whose results are wrapped in
    /// a class proxy.
    pub fn add_intercepted_factory<T, F>(
        &mut self,
        lifetime: Lifetime,
        factory: F,
        interception: Interception,
    ) -> DiResult<&mut Self>
    where
        T: ClassProxy,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let factory: ClassFactory<T> = Arc::new(move |r: &ResolverContext| -> DiResult<T> { Ok(factory(r)) });
        self.register_intercepted_class(key_of_type::<T>(), lifetime, factory, interception)
    }

    /// Keyed form of [`add_intercepted_factory`](Self::add_intercepted_factory).
    pub fn add_keyed_intercepted_factory<T, F>(
        &mut self,
        service_key: &'static str,
        lifetime: Lifetime,
        factory: F,
        interception: Interception,
    ) -> DiResult<&mut Self>
    where
        T: ClassProxy,
        F: Fn(&ResolverContext, &'static str) -> T + Send + Sync + 'static,
    {
        let factory: ClassFactory<T> =
            Arc::new(move |r: &ResolverContext| -> DiResult<T> { Ok(factory(r, service_key)) });
        self.register_intercepted_class(key_of_named_type::<T>(service_key), lifetime, factory, interception)
    }

    /// Registers `T` by type: the container activates it, then wraps it in
    /// a class proxy.
    pub fn add_intercepted<T>(&mut self, lifetime: Lifetime, interception: Interception) -> DiResult<&mut Self>
    where
        T: Activate + ClassProxy,
    {
        let factory: ClassFactory<T> =
            Arc::new(|r: &ResolverContext| create_instance::<T>(r.as_core(), ConstructorArgs::new()));
        self.register_intercepted_class(key_of_type::<T>(), lifetime, factory, interception)
    }

    /// Wraps an existing trait registration in a proxy, keeping its lifetime.
    pub fn intercept_existing_trait<T>(&mut self, interception: Interception) -> DiResult<&mut Self>
    where
        T: ?Sized + InterfaceProxy,
    {
        let key = key_of_trait::<T>();
        let trait_name = key.display_name();
        if interception.is_empty() {
            return if self.registry.contains_key(&key) {
                Ok(self)
            } else {
                Err(DiError::NotFound(trait_name))
            };
        }
        interception.validate()?;
        self.ensure_proxy_generator();

        let registration = self.registry.get_mut(&key).ok_or(DiError::NotFound(trait_name))?;
        let original = registration.ctor.clone();
        let mut names = registration.interceptors.clone();
        names.extend(interception.names());
        registration.interceptors = names;
        let interception = Arc::new(interception);
        registration.ctor = Arc::new(move |r: &ResolverContext| -> DiResult<AnyArc> {
            let target = original(r)?
                .downcast::<Arc<T>>()
                .map_err(|_| DiError::TypeMismatch(trait_name))?;
            wrap_trait(r, (*target).clone(), &interception)
        });
        tracing::debug!(service = trait_name, "intercepting existing registration");
        Ok(self)
    }

    fn ensure_proxy_generator(&mut self) {
        if self.try_add_named_singleton(PROXY_GENERATOR_KEY, ProxyGenerator::new()) {
            tracing::debug!(key = PROXY_GENERATOR_KEY, "registered shared proxy generator");
        }
    }

    fn register_intercepted_trait<T>(
        &mut self,
        key: Key,
        lifetime: Lifetime,
        factory: TraitFactory<T>,
        interception: Interception,
    ) -> DiResult<&mut Self>
    where
        T: ?Sized + InterfaceProxy,
    {
        if interception.is_empty() {
            let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
            self.registry.insert(key, Registration::new(lifetime, Arc::new(ctor), None));
            return Ok(self);
        }
        interception.validate()?;
        self.ensure_proxy_generator();

        let names = interception.names();
        tracing::debug!(service = key.display_name(), ?lifetime, interceptors = ?names, "registered intercepted service");
        let interception = Arc::new(interception);
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { wrap_trait(r, factory(r), &interception) };
        self.registry.insert(
            key,
            Registration::new(lifetime, Arc::new(ctor), None).with_interceptors(names),
        );
        Ok(self)
    }

    fn register_intercepted_class<T>(
        &mut self,
        key: Key,
        lifetime: Lifetime,
        factory: ClassFactory<T>,
        interception: Interception,
    ) -> DiResult<&mut Self>
    where
        T: ClassProxy,
    {
        if interception.is_empty() {
            let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r)?)) };
            self.registry
                .insert(key, Registration::new(lifetime, Arc::new(ctor), Some(TypeId::of::<T>())));
            return Ok(self);
        }
        interception.validate()?;
        self.ensure_proxy_generator();

        let names = interception.names();
        tracing::debug!(service = key.display_name(), ?lifetime, interceptors = ?names, "registered intercepted service");
        let interception = Arc::new(interception);
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> {
            let target = Arc::new(factory(r)?);
            let interceptors = interception.realize(r.as_core())?;
            if interceptors.is_empty() {
                return Ok(target as AnyArc);
            }
            let generator = r.get_named::<ProxyGenerator>(PROXY_GENERATOR_KEY)?;
            let request = ProxyRequest::new()
                .options(interception.options().clone())
                .interceptors(interceptors);
            let proxy = generator.create_class_proxy_with_target(target, request, Some(r.as_core()))?;
            Ok(proxy as AnyArc)
        };
        self.registry.insert(
            key,
            Registration::new(lifetime, Arc::new(ctor), Some(TypeId::of::<T>())).with_interceptors(names),
        );
        Ok(self)
    }
}

fn wrap_trait<T>(r: &ResolverContext, target: Arc<T>, interception: &Interception) -> DiResult<AnyArc>
where
    T: ?Sized + InterfaceProxy,
{
    let interceptors = interception.realize(r.as_core())?;
    if interceptors.is_empty() {
        return Ok(Arc::new(target));
    }
    let generator = r.get_named::<ProxyGenerator>(PROXY_GENERATOR_KEY)?;
    let request = ProxyRequest::new()
        .with_target(target)
        .options(interception.options().clone())
        .interceptors(interceptors);
    let proxy = generator.create_interface_proxy(request)?.into_proxy();
    Ok(Arc::new(proxy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::interceptor_fn;

    trait Marker: Send + Sync {}

    struct Plain;

    impl Activate for Plain {
        fn activate(_: &dyn ResolverCore, _: &mut ConstructorArgs) -> DiResult<Self> {
            Ok(Plain)
        }
    }

    struct Unconstructible;

    impl Interceptor for Unconstructible {
        fn intercept(&self, invocation: &crate::intercept::Invocation) {
            invocation.proceed();
        }
    }

    fn reason_of(interceptor_type: InterceptorType) -> &'static str {
        match interceptor_type.validate() {
            Err(DiError::InvalidInterceptorType { reason, .. }) => reason,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn interceptor_type_validation_reasons() {
        assert_eq!(
            reason_of(InterceptorType::from_type(TypeRef::unbound("Retry<P>", 1))),
            "is an unbound generic type definition"
        );
        assert_eq!(
            reason_of(InterceptorType::from_type(TypeRef::interface::<dyn Marker>())),
            "is abstract (a trait object)"
        );
        assert_eq!(
            reason_of(InterceptorType::activatable::<Plain>()),
            "does not implement Interceptor"
        );
        assert_eq!(
            reason_of(InterceptorType::implementing::<Unconstructible>()),
            "has no constructor the container can call (implement Activate)"
        );
    }

    #[test]
    fn names_follow_insertion_order() {
        let interception = Interception::new()
            .with(interceptor_fn("a", |i| i.proceed()))
            .with_type(InterceptorType::implementing::<Unconstructible>());
        assert_eq!(interception.len(), 2);
        assert_eq!(interception.names()[0], "a");
        assert!(interception.names()[1].ends_with("Unconstructible"));
    }
}
