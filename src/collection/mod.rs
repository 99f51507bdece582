//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type and related functionality
//! for registering services and building service providers. Registrations
//! that wrap services in interception proxies live in [`interception`].

use std::any::TypeId;
use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::key::{key_of_named_trait, key_of_named_type, key_of_trait, key_of_type, Key};
use crate::lifetime::Lifetime;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::{AnyArc, Registration, Registry};

pub mod interception;

pub use interception::{Interception, InterceptorType, PROXY_GENERATOR_KEY};

/// Mutable set of registrations, turned into a [`ServiceProvider`] by
/// [`build`](Self::build).
///
/// Registering the same key twice replaces the earlier registration; the
/// `try_add_*` variants keep the first one instead.
#[derive(Default)]
pub struct ServiceCollection {
    registry: Registry,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Concrete Type Registrations -----

    /// Registers a singleton instance that will be shared across the entire application.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_intercept::{ServiceCollection, Resolver};
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// });
    /// let provider = services.build();
    /// assert_eq!(provider.get_required::<Config>().database_url, "postgres://localhost");
    /// ```
    pub fn add_singleton<T: 'static + Send + Sync>(&mut self, value: T) -> &mut Self {
        let arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(arc.clone()) };
        self.registry.insert(
            key_of_type::<T>(),
            Registration::new(Lifetime::Singleton, Arc::new(ctor), Some(TypeId::of::<T>())),
        );
        self
    }

    /// Registers a singleton factory that creates the instance on first request.
    ///
    /// The first result to be cached is shared across all subsequent requests.
    /// The factory runs outside the cache lock, so concurrent first requests may
    /// each call it; only one result is kept and the others are dropped.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped factory that creates one instance per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient factory that creates a new instance on every request.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    /// Registers a factory for `T` with an explicit lifetime.
    pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry.insert(
            key_of_type::<T>(),
            Registration::new(lifetime, Arc::new(ctor), Some(TypeId::of::<T>())),
        );
        self
    }

    // ----- Trait Registrations -----

    /// Registers a singleton trait implementation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_intercept::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// trait Logger: Send + Sync {
    ///     fn log(&self, message: &str) -> String;
    /// }
    ///
    /// struct Console;
    /// impl Logger for Console {
    ///     fn log(&self, message: &str) -> String { format!("[console] {}", message) }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait::<dyn Logger>(Arc::new(Console));
    /// let provider = services.build();
    /// assert_eq!(provider.get_required_trait::<dyn Logger>().log("up"), "[console] up");
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + 'static + Send + Sync,
    {
        // Trait objects are stored as Arc<Arc<dyn Trait>> inside the Any slot
        let any_arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(any_arc.clone()) };
        self.registry.insert(
            key_of_trait::<T>(),
            Registration::new(Lifetime::Singleton, Arc::new(ctor), None),
        );
        self
    }

    /// Registers a singleton trait factory.
    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped trait factory.
    pub fn add_scoped_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient trait factory.
    pub fn add_transient_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Transient, factory)
    }

    /// Registers a trait factory with an explicit lifetime.
    pub fn add_trait_factory<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry
            .insert(key_of_trait::<Trait>(), Registration::new(lifetime, Arc::new(ctor), None));
        self
    }

    // ----- Named Registrations -----

    /// Registers a named singleton, resolved with
    /// [`get_named`](crate::Resolver::get_named).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_intercept::{ServiceCollection, Resolver};
    /// let mut services = ServiceCollection::new();
    /// services.add_named_singleton("primary", "postgres://primary".to_string());
    /// services.add_named_singleton("replica", "postgres://replica".to_string());
    ///
    /// let provider = services.build();
    /// assert_eq!(*provider.get_named_required::<String>("replica"), "postgres://replica");
    /// ```
    pub fn add_named_singleton<T: 'static + Send + Sync>(&mut self, name: &'static str, value: T) -> &mut Self {
        let arc: AnyArc = Arc::new(value);
        let ctor = move |_: &ResolverContext| -> DiResult<AnyArc> { Ok(arc.clone()) };
        self.registry.insert(
            key_of_named_type::<T>(name),
            Registration::new(Lifetime::Singleton, Arc::new(ctor), Some(TypeId::of::<T>())),
        );
        self
    }

    /// Registers a named factory with an explicit lifetime.
    pub fn add_named_factory<T, F>(&mut self, name: &'static str, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry.insert(
            key_of_named_type::<T>(name),
            Registration::new(lifetime, Arc::new(ctor), Some(TypeId::of::<T>())),
        );
        self
    }

    /// Registers a named trait factory with an explicit lifetime.
    pub fn add_named_trait_factory<Trait, F>(&mut self, name: &'static str, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        F: Fn(&ResolverContext) -> Arc<Trait> + Send + Sync + 'static,
    {
        let ctor = move |r: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(r))) };
        self.registry.insert(
            key_of_named_trait::<Trait>(name),
            Registration::new(lifetime, Arc::new(ctor), None),
        );
        self
    }

    // ----- Conditional Registrations -----

    /// Registers a singleton only if `T` is not registered yet.
    ///
    /// ```
    /// use ferrous_intercept::ServiceCollection;
    ///
    /// let mut services = ServiceCollection::new();
    /// assert!(services.try_add_singleton(42usize));
    /// assert!(!services.try_add_singleton(100usize));
    /// ```
    pub fn try_add_singleton<T: 'static + Send + Sync>(&mut self, value: T) -> bool {
        if self.registry.contains_key(&key_of_type::<T>()) {
            false
        } else {
            self.add_singleton(value);
            true
        }
    }

    /// Registers a singleton factory only if `T` is not registered yet.
    pub fn try_add_singleton_factory<T, F>(&mut self, factory: F) -> bool
    where
        T: 'static + Send + Sync,
        F: Fn(&ResolverContext) -> T + Send + Sync + 'static,
    {
        if self.registry.contains_key(&key_of_type::<T>()) {
            false
        } else {
            self.add_singleton_factory(factory);
            true
        }
    }

    /// Registers a named singleton only if the name is free for `T`.
    pub fn try_add_named_singleton<T: 'static + Send + Sync>(&mut self, name: &'static str, value: T) -> bool {
        if self.registry.contains_key(&key_of_named_type::<T>(name)) {
            false
        } else {
            self.add_named_singleton(name, value);
            true
        }
    }

    // ----- Service Descriptors and Introspection -----

    /// True when a registration exists for `key`.
    pub fn contains(&self, key: &Key) -> bool {
        self.registry.contains_key(key)
    }

    /// Get all service descriptors for introspection and diagnostics, in
    /// registration order.
    ///
    /// ```
    /// use ferrous_intercept::{ServiceCollection, Lifetime};
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(42usize);
    /// services.add_scoped_factory::<String, _>(|_| "hello".to_string());
    ///
    /// let descriptors = services.get_service_descriptors();
    /// assert_eq!(descriptors.len(), 2);
    /// assert_eq!(descriptors[0].lifetime, Lifetime::Singleton);
    /// assert_eq!(descriptors[1].type_name(), "alloc::string::String");
    /// ```
    pub fn get_service_descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registry
            .iter()
            .map(|(key, registration)| ServiceDescriptor {
                key: key.clone(),
                lifetime: registration.lifetime,
                impl_type_id: registration.impl_id,
                interceptors: registration.interceptors.clone(),
            })
            .collect()
    }

    /// Builds the service provider, consuming the collection.
    pub fn build(mut self) -> ServiceProvider {
        // Finalize registry by assigning scoped slot indices
        self.registry.finalize();
        ServiceProvider::new(self.registry)
    }
}
