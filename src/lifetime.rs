//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior
///
/// For intercepted registrations the lifetime applies to the proxy: a
/// singleton service resolves to one proxy, a transient service to a fresh
/// proxy over a fresh implementation on every resolution.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct RequestModel { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add_transient_factory::<RequestModel, _>(|_| RequestModel { id: 7 });
///
/// let provider = services.build();
/// let a = provider.get_required::<RequestModel>();
/// let b = provider.get_required::<RequestModel>();
/// assert_eq!(a.id, b.id);
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per root provider, cached forever
    Singleton,
    /// Single instance per scope, cached for scope lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}
