//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::activation::{Activate, ConstructorArgs};
use crate::error::{DiError, DiResult};
use crate::key::{key_of_named_trait, key_of_named_type, key_of_trait, key_of_type, Key};
use crate::registration::AnyArc;

/// Object-safe resolution primitive implemented by providers, scopes and
/// resolver contexts.
pub trait ResolverCore: Send + Sync {
    /// Resolves the type-erased instance registered under `key`.
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc>;

    /// True when `key` has a registration. Does not construct anything.
    fn is_registered(&self, key: &Key) -> bool;
}

/// Typed resolution helpers, available on every [`ResolverCore`].
///
/// Concrete types are stored as `Arc<T>`; trait objects as `Arc<Arc<dyn Trait>>`
/// inside the type-erased slot.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct English;
/// impl Greeter for English { fn greet(&self) -> String { "hello".into() } }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_trait::<dyn Greeter>(Arc::new(English));
/// services.add_named_singleton("retries", 3u8);
///
/// let provider = services.build();
/// assert_eq!(provider.get_required_trait::<dyn Greeter>().greet(), "hello");
/// assert_eq!(*provider.get_named::<u8>("retries").unwrap(), 3);
/// ```
pub trait Resolver: ResolverCore {
    fn get<T: 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast_concrete(self.resolve_any(&key_of_type::<T>())?)
    }

    fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve_any(&key_of_trait::<T>())?)
    }

    fn get_named<T: 'static + Send + Sync>(&self, name: &'static str) -> DiResult<Arc<T>> {
        downcast_concrete(self.resolve_any(&key_of_named_type::<T>(name))?)
    }

    fn get_named_trait<T: ?Sized + 'static + Send + Sync>(&self, name: &'static str) -> DiResult<Arc<T>> {
        downcast_trait(self.resolve_any(&key_of_named_trait::<T>(name))?)
    }

    fn get_required<T: 'static + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    fn get_required_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Arc<T> {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e))
    }

    fn get_named_required<T: 'static + Send + Sync>(&self, name: &'static str) -> Arc<T> {
        self.get_named::<T>(name).unwrap_or_else(|e| {
            panic!("Failed to resolve named {} ({}): {}", std::any::type_name::<T>(), name, e)
        })
    }

    fn get_named_trait_required<T: ?Sized + 'static + Send + Sync>(&self, name: &'static str) -> Arc<T> {
        self.get_named_trait::<T>(name).unwrap_or_else(|e| {
            panic!("Failed to resolve named trait {} ({}): {}", std::any::type_name::<T>(), name, e)
        })
    }

    /// Creates an unregistered `T` from container services plus explicit
    /// arguments. Every explicit argument must be consumed.
    fn create_instance<T: Activate>(&self, args: ConstructorArgs) -> DiResult<T>
    where
        Self: Sized,
    {
        crate::activation::create_instance(self, args)
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn downcast_concrete<T: 'static + Send + Sync>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

fn downcast_trait<T: ?Sized + 'static + Send + Sync>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}
