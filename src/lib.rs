//! # ferrous-intercept
//!
//! Method interception for Rust services, with asynchronous interceptors and
//! dependency-injection registrations that hand out proxies.
//!
//! ## Features
//!
//! - **Interceptor chains**: ordered interceptors around every call, with the
//!   ability to short-circuit or replace results
//! - **Async interceptors**: `await` around the rest of the chain for both
//!   synchronous and `async` members
//! - **Proxy generation**: stand-ins for trait objects and concrete types,
//!   with hooks, interceptor selectors and additional interfaces
//! - **Container integration**: `add_intercepted*` registrations that wrap
//!   resolved services in a proxy, honouring singleton/scoped/transient
//!   lifetimes and service keys
//! - **Fail-fast configuration**: interceptor types and proxy requests are
//!   validated when they are registered or made, not at first use
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use ferrous_intercept::{
//!     AnyValue, AsyncInterceptor, BoxError, Interception, InterceptorChain, InterfaceProxy, Invocation,
//!     Lifetime, Resolver, ServiceCollection,
//! };
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! // The service
//! trait Inventory: Send + Sync {
//!     fn stock(&self, sku: &str) -> u32;
//! }
//!
//! struct Warehouse;
//! impl Inventory for Warehouse {
//!     fn stock(&self, _sku: &str) -> u32 { 12 }
//! }
//!
//! // Its proxy stand-in
//! struct InventoryProxy {
//!     target: Option<Arc<dyn Inventory>>,
//!     chain: InterceptorChain,
//! }
//!
//! impl Inventory for InventoryProxy {
//!     fn stock(&self, sku: &str) -> u32 {
//!         let sku = sku.to_string();
//!         let target = self.target.clone().map(|t| move || t.stock(&sku));
//!         self.chain.invoke_value("stock", target).unwrap_or_default()
//!     }
//! }
//!
//! impl InterfaceProxy for dyn Inventory {
//!     fn create_proxy(target: Option<Arc<Self>>, chain: InterceptorChain) -> Arc<Self> {
//!         Arc::new(InventoryProxy { target, chain })
//!     }
//! }
//!
//! // An interceptor
//! struct CountCalls(Arc<AtomicUsize>);
//!
//! #[async_trait]
//! impl AsyncInterceptor for CountCalls {
//!     async fn intercept_async_value(&self, invocation: Invocation) -> Result<AnyValue, BoxError> {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         invocation.proceed_async_value().await
//!     }
//! }
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let mut services = ServiceCollection::new();
//! services
//!     .add_intercepted_trait_factory::<dyn Inventory, _>(
//!         Lifetime::Singleton,
//!         |_| Arc::new(Warehouse),
//!         Interception::new().with_async(CountCalls(calls.clone())),
//!     )
//!     .unwrap();
//!
//! let provider = services.build();
//! let inventory = provider.get_required_trait::<dyn Inventory>();
//! assert_eq!(inventory.stock("A-1"), 12);
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: one proxy for the whole application
//! - **Scoped**: one proxy per scope
//! - **Transient**: a fresh proxy over a fresh service on every resolution
//!
//! ## Cargo Features
//!
//! - `multi-thread`: drive pending async interceptors on synchronous members
//!   with `tokio::task::block_in_place` when running on a multi-threaded
//!   runtime. Without it, such calls made from a runtime thread fail with
//!   `DiError::BlockedRuntime`.

// Module declarations
pub mod activation;
pub mod collection;
pub mod descriptors;
pub mod error;
pub mod intercept;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod proxy;
pub mod traits;

mod internal;
mod registration;

// Re-exports
pub use activation::{create_instance, Activate, Argument, ConstructorArgs};
pub use collection::{Interception, InterceptorType, ServiceCollection, PROXY_GENERATOR_KEY};
pub use descriptors::ServiceDescriptor;
pub use error::{BoxError, DiError, DiResult};
pub use intercept::{
    interceptor_fn, AnyValue, AsyncInterceptor, AsyncInterceptorAdapter, FnInterceptor, Interceptor, InterceptorChain,
    Invocation, MethodSignature, ProceedInfo, ReturnShape, ReturnValue, UnitFuture, ValueFuture,
};
pub use key::{key_of_named_trait, key_of_named_type, key_of_trait, key_of_type, Key};
pub use lifetime::Lifetime;
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use proxy::{
    ClassProxy, ErasedProxy, ErasedProxyRequest, InterceptorSelector, InterfaceProxy, ProxyGenerationHook,
    ProxyGenerationOptions, ProxyGenerator, ProxyInstance, ProxyRequest, TypeKind, TypeRef,
};
pub use registration::AnyArc;
pub use traits::{Resolver, ResolverCore};
