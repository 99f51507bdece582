//! Proxy creation.
//!
//! Rust cannot emit proxy types at runtime, so each proxyable type supplies
//! its own stand-in:
//!
//! * trait objects implement [`InterfaceProxy`] for `dyn Trait`, returning a
//!   struct that forwards every member through an [`InterceptorChain`];
//! * concrete types implement [`ClassProxy`], receiving the chain (and an
//!   optional target) as constructor arguments.
//!
//! The [`ProxyGenerator`] caches a blueprint per proxied type and turns
//! [`ProxyRequest`]s into proxy instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::activation::ConstructorArgs;
use crate::error::{DiError, DiResult};
use crate::intercept::{AsyncInterceptor, Interceptor, InterceptorChain};
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

pub mod generator;
pub mod options;
pub mod type_ref;

pub use generator::ProxyGenerator;
pub use options::{InterceptorSelector, ProxyGenerationHook, ProxyGenerationOptions};
pub use type_ref::{TypeKind, TypeRef};

use generator::ProxyBlueprint;

/// Stand-in factory for a trait object type.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{InterceptorChain, InterfaceProxy};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self, name: &str) -> String;
/// }
///
/// struct GreeterProxy {
///     target: Option<Arc<dyn Greeter>>,
///     chain: InterceptorChain,
/// }
///
/// impl Greeter for GreeterProxy {
///     fn greet(&self, name: &str) -> String {
///         let name = name.to_string();
///         let target = self.target.clone().map(|t| move || t.greet(&name));
///         self.chain.invoke_value("greet", target).unwrap_or_default()
///     }
/// }
///
/// impl InterfaceProxy for dyn Greeter {
///     fn create_proxy(target: Option<Arc<Self>>, chain: InterceptorChain) -> Arc<Self> {
///         Arc::new(GreeterProxy { target, chain })
///     }
/// }
/// ```
pub trait InterfaceProxy: Send + Sync + 'static {
    fn create_proxy(target: Option<Arc<Self>>, chain: InterceptorChain) -> Arc<Self>;
}

/// Stand-in constructor for a concrete type.
///
/// `args` holds, in order: the target (`Arc<Self>`, only when proxying with
/// a target), any mixins from the generation options, the
/// [`InterceptorChain`], the interceptor selector
/// (`Arc<dyn InterceptorSelector>`, only when one is configured) and finally
/// the caller's constructor arguments. Every argument must be consumed.
pub trait ClassProxy: Sized + Send + Sync + 'static {
    fn construct_proxy(resolver: &dyn ResolverCore, args: &mut ConstructorArgs) -> DiResult<Self>;
}

pub(crate) struct AdditionalInterface {
    pub(crate) type_ref: TypeRef,
    pub(crate) seed: Option<Arc<ProxyBlueprint>>,
}

/// Typed proxy request with defaulted fields.
///
/// ```rust
/// use ferrous_intercept::{interceptor_fn, ProxyGenerationOptions, ProxyRequest};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {}
///
/// let request = ProxyRequest::<dyn Clock>::new()
///     .options(ProxyGenerationOptions::default())
///     .interceptor(Arc::new(interceptor_fn("noop", |i| i.proceed())));
/// assert_eq!(request.interceptor_count(), 1);
/// assert!(!request.has_target());
/// ```
pub struct ProxyRequest<T: ?Sized> {
    pub(crate) target: Option<Arc<T>>,
    pub(crate) additional_interfaces: Vec<AdditionalInterface>,
    pub(crate) options: ProxyGenerationOptions,
    pub(crate) constructor_args: ConstructorArgs,
    pub(crate) interceptors: Vec<Arc<dyn Interceptor>>,
}

impl<T: ?Sized> Default for ProxyRequest<T> {
    fn default() -> Self {
        Self {
            target: None,
            additional_interfaces: Vec::new(),
            options: ProxyGenerationOptions::default(),
            constructor_args: ConstructorArgs::new(),
            interceptors: Vec::new(),
        }
    }
}

impl<T: ?Sized> ProxyRequest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: Arc<T>) -> Self {
        self.target = Some(target);
        self
    }

    /// Also expose the proxy as `I`, through a target-less stand-in that
    /// shares this request's interceptors.
    pub fn additional_interface<I: ?Sized + InterfaceProxy>(mut self) -> Self {
        self.additional_interfaces.push(AdditionalInterface {
            type_ref: TypeRef::interface::<I>(),
            seed: Some(Arc::new(ProxyBlueprint::interface::<I>())),
        });
        self
    }

    /// Untyped form of [`additional_interface`](Self::additional_interface);
    /// the generator must already know the type.
    pub fn additional_interface_ref(mut self, type_ref: TypeRef) -> Self {
        self.additional_interfaces.push(AdditionalInterface { type_ref, seed: None });
        self
    }

    pub fn options(mut self, options: ProxyGenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn constructor_arg<A: Any + Send + Sync>(mut self, value: A) -> Self {
        self.constructor_args.push(value);
        self
    }

    pub fn constructor_args(mut self, args: ConstructorArgs) -> Self {
        self.constructor_args = args;
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Adds an asynchronous interceptor, wrapped in its adapter.
    pub fn async_interceptor<A: AsyncInterceptor>(mut self, interceptor: A) -> Self {
        self.interceptors.push(interceptor.into_interceptor());
        self
    }

    pub fn interceptors(mut self, interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }
}

/// Untyped proxy request, naming the proxied type by [`TypeRef`].
///
/// A target is passed the way the container stores instances: `Arc<T>` for
/// concrete types, `Arc<Arc<dyn Trait>>` for trait objects.
pub struct ErasedProxyRequest {
    pub(crate) type_to_proxy: TypeRef,
    pub(crate) target: Option<AnyArc>,
    pub(crate) additional_interfaces: Vec<AdditionalInterface>,
    pub(crate) options: ProxyGenerationOptions,
    pub(crate) constructor_args: ConstructorArgs,
    pub(crate) interceptors: Vec<Arc<dyn Interceptor>>,
}

impl ErasedProxyRequest {
    pub fn new(type_to_proxy: TypeRef) -> Self {
        Self {
            type_to_proxy,
            target: None,
            additional_interfaces: Vec::new(),
            options: ProxyGenerationOptions::default(),
            constructor_args: ConstructorArgs::new(),
            interceptors: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: AnyArc) -> Self {
        self.target = Some(target);
        self
    }

    pub fn additional_interface(mut self, type_ref: TypeRef) -> Self {
        self.additional_interfaces.push(AdditionalInterface { type_ref, seed: None });
        self
    }

    pub fn options(mut self, options: ProxyGenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn constructor_args(mut self, args: ConstructorArgs) -> Self {
        self.constructor_args = args;
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn async_interceptor<A: AsyncInterceptor>(mut self, interceptor: A) -> Self {
        self.interceptors.push(interceptor.into_interceptor());
        self
    }

    pub fn interceptors(mut self, interceptors: impl IntoIterator<Item = Arc<dyn Interceptor>>) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    pub fn type_to_proxy(&self) -> TypeRef {
        self.type_to_proxy
    }

    pub(crate) fn from_typed<T: ?Sized>(type_to_proxy: TypeRef, target: Option<AnyArc>, request: ProxyRequest<T>) -> Self {
        Self {
            type_to_proxy,
            target,
            additional_interfaces: request.additional_interfaces,
            options: request.options,
            constructor_args: request.constructor_args,
            interceptors: request.interceptors,
        }
    }
}

/// A proxy built from an [`ErasedProxyRequest`].
#[derive(Clone)]
pub struct ErasedProxy {
    type_ref: TypeRef,
    instance: AnyArc,
    additional: Vec<(TypeRef, AnyArc)>,
}

impl ErasedProxy {
    pub(crate) fn new(type_ref: TypeRef, instance: AnyArc, additional: Vec<(TypeRef, AnyArc)>) -> Self {
        Self {
            type_ref,
            instance,
            additional,
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    /// The proxy in container storage form.
    pub fn instance(&self) -> &AnyArc {
        &self.instance
    }

    /// The proxy of a concrete type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.instance
            .clone()
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// The proxy of a trait object type.
    pub fn downcast_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Stand-in for an additional interface, if one was requested.
    pub fn interface<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        let wanted = TypeRef::interface::<I>();
        self.additional
            .iter()
            .find(|(type_ref, _)| *type_ref == wanted)
            .and_then(|(_, instance)| instance.downcast_ref::<Arc<I>>().cloned())
    }

    pub fn additional_interfaces(&self) -> Vec<TypeRef> {
        self.additional.iter().map(|(type_ref, _)| *type_ref).collect()
    }
}

impl fmt::Debug for ErasedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedProxy")
            .field("type_ref", &self.type_ref)
            .field("additional", &self.additional_interfaces())
            .finish()
    }
}

/// A typed proxy plus any additional-interface stand-ins.
pub struct ProxyInstance<T: ?Sized> {
    proxy: Arc<T>,
    erased: ErasedProxy,
}

impl<T: ?Sized> ProxyInstance<T> {
    pub(crate) fn new(proxy: Arc<T>, erased: ErasedProxy) -> Self {
        Self { proxy, erased }
    }

    pub fn proxy(&self) -> &Arc<T> {
        &self.proxy
    }

    pub fn into_proxy(self) -> Arc<T> {
        self.proxy
    }

    pub fn interface<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        self.erased.interface::<I>()
    }

    pub fn erased(&self) -> &ErasedProxy {
        &self.erased
    }
}
