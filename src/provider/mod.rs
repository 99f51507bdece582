//! Service provider module for dependency injection.
//!
//! This module contains the ServiceProvider type and related functionality
//! for resolving registered services from the container.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::internal::with_circular_guard;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Registration, Registry};
use crate::traits::ResolverCore;

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

/// Root provider that resolves singleton and transient services.
///
/// Scoped services must be resolved through a [`Scope`] created with
/// [`create_scope`](Self::create_scope). Cloning a provider is cheap; clones
/// share the same singleton cache.
///
/// # Examples
///
/// ```
/// use ferrous_intercept::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton_factory::<Clock, _>(|_| Clock);
///
/// let provider = services.build();
/// let a = provider.get_required::<Clock>();
/// let b = provider.get_required::<Clock>();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

pub(crate) struct ProviderInner {
    pub(crate) registry: Registry,
}

impl ServiceProvider {
    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(ProviderInner { registry }),
        }
    }

    #[inline]
    pub(crate) fn inner(&self) -> &ProviderInner {
        &self.inner
    }

    /// Creates a new scope with its own cache of scoped services.
    ///
    /// ```
    /// use ferrous_intercept::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// struct RequestId;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_scoped_factory::<RequestId, _>(|_| RequestId);
    /// let provider = services.build();
    ///
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    /// assert!(Arc::ptr_eq(&scope1.get_required::<RequestId>(), &scope1.get_required::<RequestId>()));
    /// assert!(!Arc::ptr_eq(&scope1.get_required::<RequestId>(), &scope2.get_required::<RequestId>()));
    /// ```
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// Singleton resolution; the value is cached in the registration's cell.
    pub(crate) fn resolve_singleton(&self, reg: &Registration) -> DiResult<AnyArc> {
        let ctx = ResolverContext::new(self);
        match &reg.single_runtime {
            Some(cell) => {
                if let Some(value) = cell.get() {
                    return Ok(value.clone());
                }
                // Constructed outside the cell so factories never run under its lock.
                let value = (reg.ctor)(&ctx)?;
                Ok(cell.get_or_init(|| value).clone())
            }
            None => (reg.ctor)(&ctx),
        }
    }

    fn resolve_any_impl(&self, key: &Key) -> DiResult<AnyArc> {
        let reg = self
            .inner()
            .registry
            .get(key)
            .ok_or(DiError::NotFound(key.display_name()))?;

        match reg.lifetime {
            Lifetime::Singleton => self.resolve_singleton(reg),
            Lifetime::Scoped => Err(DiError::WrongLifetime(
                "Cannot resolve scoped service from root provider",
            )),
            Lifetime::Transient => {
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx)
            }
        }
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        with_circular_guard(key, || self.resolve_any_impl(key))
    }

    fn is_registered(&self, key: &Key) -> bool {
        self.inner().registry.contains_key(key)
    }
}
