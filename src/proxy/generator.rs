//! The proxy engine: a cache of per-type blueprints.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::activation::ConstructorArgs;
use crate::error::{DiError, DiResult};
use crate::intercept::{Interceptor, InterceptorChain};
use crate::key::Key;
use crate::proxy::{
    ClassProxy, ErasedProxy, ErasedProxyRequest, InterfaceProxy, ProxyGenerationOptions, ProxyInstance, ProxyRequest,
    TypeRef,
};
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

type BuildFn = Arc<dyn Fn(BuildInput<'_>) -> DiResult<AnyArc> + Send + Sync>;

pub(crate) struct BuildInput<'a> {
    target: Option<AnyArc>,
    chain: InterceptorChain,
    options: &'a ProxyGenerationOptions,
    args: ConstructorArgs,
    resolver: &'a dyn ResolverCore,
}

/// How to build the stand-in for one proxied type.
pub(crate) struct ProxyBlueprint {
    type_ref: TypeRef,
    build: BuildFn,
}

impl ProxyBlueprint {
    pub(crate) fn interface<T: ?Sized + InterfaceProxy>() -> Self {
        let name = std::any::type_name::<T>();
        Self {
            type_ref: TypeRef::interface::<T>(),
            build: Arc::new(move |input: BuildInput<'_>| -> DiResult<AnyArc> {
                let target = match input.target {
                    Some(any) => Some(
                        any.downcast_ref::<Arc<T>>()
                            .cloned()
                            .ok_or(DiError::TypeMismatch(name))?,
                    ),
                    None => None,
                };
                let proxy: Arc<T> = T::create_proxy(target, input.chain);
                Ok(Arc::new(proxy) as AnyArc)
            }),
        }
    }

    pub(crate) fn class<T: ClassProxy>() -> Self {
        let name = std::any::type_name::<T>();
        Self {
            type_ref: TypeRef::class::<T>(),
            build: Arc::new(move |input: BuildInput<'_>| -> DiResult<AnyArc> {
                let supplied = input.args.type_names();
                let mut args = ConstructorArgs::new();
                if let Some(any) = input.target {
                    let target = any.downcast::<T>().map_err(|_| DiError::TypeMismatch(name))?;
                    args.push(target);
                }
                args.extend(input.options.mixins().iter().cloned());
                args.push(input.chain.clone());
                if let Some(selector) = input.chain.selector() {
                    args.push(selector.clone());
                }
                args.extend(input.args.into_arguments());

                let construct = |mut args: ConstructorArgs| -> DiResult<T> {
                    let instance = T::construct_proxy(input.resolver, &mut args)?;
                    args.finish()?;
                    Ok(instance)
                };
                match construct(args) {
                    Ok(instance) => Ok(Arc::new(instance) as AnyArc),
                    Err(source) if source.is_constructor_mismatch() => Err(DiError::ProxyConstruction {
                        type_name: name,
                        arguments: supplied,
                        source: Box::new(source),
                    }),
                    Err(other) => Err(other),
                }
            }),
        }
    }
}

/// Resolver used for class proxies created without a container.
struct EmptyResolver;

impl ResolverCore for EmptyResolver {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        Err(DiError::NotFound(key.display_name()))
    }

    fn is_registered(&self, _key: &Key) -> bool {
        false
    }
}

/// Creates proxies from cached blueprints.
///
/// Blueprints are registered explicitly, or on first use by the typed
/// `create_*` methods. Untyped requests only see registered types.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{interceptor_fn, InterceptorChain, InterfaceProxy, ProxyGenerator};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// trait Counter: Send + Sync {
///     fn next(&self) -> usize;
/// }
///
/// struct Sequential(AtomicUsize);
/// impl Counter for Sequential {
///     fn next(&self) -> usize { self.0.fetch_add(1, Ordering::SeqCst) }
/// }
///
/// struct CounterProxy { target: Option<Arc<dyn Counter>>, chain: InterceptorChain }
/// impl Counter for CounterProxy {
///     fn next(&self) -> usize {
///         let target = self.target.clone().map(|t| move || t.next());
///         self.chain.invoke_value("next", target).unwrap_or_default()
///     }
/// }
/// impl InterfaceProxy for dyn Counter {
///     fn create_proxy(target: Option<Arc<Self>>, chain: InterceptorChain) -> Arc<Self> {
///         Arc::new(CounterProxy { target, chain })
///     }
/// }
///
/// let seen = Arc::new(AtomicUsize::new(0));
/// let observed = seen.clone();
/// let generator = ProxyGenerator::new();
/// let proxy = generator
///     .create_interface_proxy_with_target::<dyn Counter>(
///         Arc::new(Sequential(AtomicUsize::new(10))),
///         vec![Arc::new(interceptor_fn("observe", move |invocation| {
///             observed.fetch_add(1, Ordering::SeqCst);
///             invocation.proceed();
///         }))],
///     )
///     .unwrap();
///
/// assert_eq!(proxy.next(), 10);
/// assert_eq!(proxy.next(), 11);
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
/// ```
#[derive(Default)]
pub struct ProxyGenerator {
    cache: RwLock<HashMap<TypeRef, Arc<ProxyBlueprint>>>,
}

impl ProxyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `T` was already registered.
    pub fn register_interface<T: ?Sized + InterfaceProxy>(&self) -> bool {
        self.seed(Arc::new(ProxyBlueprint::interface::<T>()))
    }

    /// Returns false when `T` was already registered.
    pub fn register_class<T: ClassProxy>(&self) -> bool {
        self.seed(Arc::new(ProxyBlueprint::class::<T>()))
    }

    pub fn is_registered(&self, type_ref: &TypeRef) -> bool {
        self.cache.read().contains_key(type_ref)
    }

    pub fn cached_types(&self) -> Vec<TypeRef> {
        self.cache.read().keys().copied().collect()
    }

    fn seed(&self, blueprint: Arc<ProxyBlueprint>) -> bool {
        let mut cache = self.cache.write();
        if cache.contains_key(&blueprint.type_ref) {
            return false;
        }
        tracing::debug!(proxied = blueprint.type_ref.name(), "registered proxy blueprint");
        cache.insert(blueprint.type_ref, blueprint);
        true
    }

    fn blueprint(&self, type_ref: &TypeRef) -> DiResult<Arc<ProxyBlueprint>> {
        self.cache
            .read()
            .get(type_ref)
            .cloned()
            .ok_or(DiError::ProxyTypeNotFound(type_ref.name()))
    }

    fn validate(request: &ErasedProxyRequest) -> DiResult<()> {
        let proxied = request.type_to_proxy;
        if proxied.is_generic_definition() {
            return Err(DiError::invalid_argument(
                "type_to_proxy",
                format!("`{}` is an unbound generic type definition", proxied.name()),
            ));
        }
        for additional in &request.additional_interfaces {
            let type_ref = additional.type_ref;
            if type_ref.is_generic_definition() {
                return Err(DiError::invalid_argument(
                    "additional_interfaces",
                    format!("`{}` is an unbound generic type definition", type_ref.name()),
                ));
            }
            if !type_ref.is_interface() {
                return Err(DiError::invalid_argument(
                    "additional_interfaces",
                    format!("`{}` is not an interface", type_ref.name()),
                ));
            }
        }
        if proxied.is_interface() && !request.constructor_args.is_empty() {
            return Err(DiError::invalid_argument(
                "constructor_args",
                format!("interface proxy `{}` takes no constructor arguments", proxied.name()),
            ));
        }
        Ok(())
    }

    /// Creates a proxy from an untyped request.
    ///
    /// Every typed `create_*` method ends up here. Class proxies resolve
    /// their container dependencies through `resolver`; without one, any
    /// dependency lookup fails with [`DiError::NotFound`].
    pub fn create_proxy(
        &self,
        request: ErasedProxyRequest,
        resolver: Option<&dyn ResolverCore>,
    ) -> DiResult<ErasedProxy> {
        Self::validate(&request)?;
        self.build(request, resolver)
    }

    fn create_seeded(
        &self,
        seed: ProxyBlueprint,
        request: ErasedProxyRequest,
        resolver: Option<&dyn ResolverCore>,
    ) -> DiResult<ErasedProxy> {
        Self::validate(&request)?;
        if !self.is_registered(&seed.type_ref) {
            self.seed(Arc::new(seed));
        }
        self.build(request, resolver)
    }

    fn build(&self, mut request: ErasedProxyRequest, resolver: Option<&dyn ResolverCore>) -> DiResult<ErasedProxy> {
        let proxied = request.type_to_proxy;
        let blueprint = self.blueprint(&proxied)?;

        let mut additional_blueprints = Vec::with_capacity(request.additional_interfaces.len());
        for additional in request.additional_interfaces.drain(..) {
            if let Some(seed) = additional.seed {
                if !self.is_registered(&additional.type_ref) {
                    self.seed(seed);
                }
            }
            additional_blueprints.push(self.blueprint(&additional.type_ref)?);
        }

        let resolver: &dyn ResolverCore = resolver.unwrap_or(&EmptyResolver);
        let chain = InterceptorChain::with_options(request.interceptors.clone(), &request.options, proxied.name());
        let instance = (blueprint.build)(BuildInput {
            target: request.target.take(),
            chain,
            options: &request.options,
            args: std::mem::take(&mut request.constructor_args),
            resolver,
        })?;

        let mut additional = Vec::with_capacity(additional_blueprints.len());
        for blueprint in additional_blueprints {
            let chain =
                InterceptorChain::with_options(request.interceptors.clone(), &request.options, blueprint.type_ref.name());
            let stand_in = (blueprint.build)(BuildInput {
                target: None,
                chain,
                options: &request.options,
                args: ConstructorArgs::new(),
                resolver,
            })?;
            additional.push((blueprint.type_ref, stand_in));
        }

        tracing::debug!(
            proxied = proxied.name(),
            interceptors = request.interceptors.len(),
            additional_interfaces = additional.len(),
            "created proxy"
        );
        Ok(ErasedProxy::new(proxied, instance, additional))
    }

    /// Creates a proxy for the trait object type `T`.
    pub fn create_interface_proxy<T: ?Sized + InterfaceProxy>(
        &self,
        mut request: ProxyRequest<T>,
    ) -> DiResult<ProxyInstance<T>> {
        let target = request.target.take().map(|t| Arc::new(t) as AnyArc);
        let erased = ErasedProxyRequest::from_typed(TypeRef::interface::<T>(), target, request);
        let proxy = self.create_seeded(ProxyBlueprint::interface::<T>(), erased, None)?;
        Ok(ProxyInstance::new(proxy.downcast_trait::<T>()?, proxy))
    }

    /// Creates a proxy for the concrete type `T`, building it with
    /// `resolver` and the request's constructor arguments.
    pub fn create_class_proxy<T: ClassProxy>(
        &self,
        mut request: ProxyRequest<T>,
        resolver: Option<&dyn ResolverCore>,
    ) -> DiResult<ProxyInstance<T>> {
        let target = request.target.take().map(|t| t as AnyArc);
        let erased = ErasedProxyRequest::from_typed(TypeRef::class::<T>(), target, request);
        let proxy = self.create_seeded(ProxyBlueprint::class::<T>(), erased, resolver)?;
        Ok(ProxyInstance::new(proxy.downcast::<T>()?, proxy))
    }

    pub fn create_interface_proxy_with_target<T: ?Sized + InterfaceProxy>(
        &self,
        target: Arc<T>,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> DiResult<Arc<T>> {
        let request = ProxyRequest::new().with_target(target).interceptors(interceptors);
        self.create_interface_proxy(request).map(ProxyInstance::into_proxy)
    }

    /// Target-less interface proxy; the interceptors must produce every
    /// result themselves.
    pub fn create_interface_proxy_without_target<T: ?Sized + InterfaceProxy>(
        &self,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> DiResult<Arc<T>> {
        let request = ProxyRequest::new().interceptors(interceptors);
        self.create_interface_proxy(request).map(ProxyInstance::into_proxy)
    }

    pub fn create_class_proxy_with_target<T: ClassProxy>(
        &self,
        target: Arc<T>,
        request: ProxyRequest<T>,
        resolver: Option<&dyn ResolverCore>,
    ) -> DiResult<Arc<T>> {
        self.create_class_proxy(request.with_target(target), resolver)
            .map(ProxyInstance::into_proxy)
    }
}

impl fmt::Debug for ProxyGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.cache.read().keys().map(|t| t.name()).collect();
        f.debug_struct("ProxyGenerator").field("cached_types", &names).finish()
    }
}
