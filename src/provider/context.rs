//! Resolver context handed to factories.

use crate::error::DiResult;
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// Wraps the provider or scope that is performing the resolution, so a
/// factory for a scoped service sees the scope's instances.
///
/// # Examples
///
/// ```
/// use ferrous_intercept::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_transient_factory::<UserService, _>(|resolver| UserService {
///     db: resolver.get_required::<Database>(),
/// });
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<UserService>().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(resolver: &'a dyn ResolverCore) -> Self {
        Self { resolver }
    }

    /// The underlying resolver, for APIs that take `&dyn ResolverCore`.
    pub fn as_core(&self) -> &'a dyn ResolverCore {
        self.resolver
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolver.resolve_any(key)
    }

    fn is_registered(&self, key: &Key) -> bool {
        self.resolver.is_registered(key)
    }
}
