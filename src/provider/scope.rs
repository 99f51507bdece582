//! Scoped service resolution.

use once_cell::sync::OnceCell;

use super::{ResolverContext, ServiceProvider};
use crate::error::{DiError, DiResult};
use crate::internal::with_circular_guard;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, Registration};
use crate::traits::ResolverCore;

/// A resolution scope, typically one per request.
///
/// Scoped services are cached in slot cells allocated when the scope is
/// created; singletons are delegated to the root provider.
pub struct Scope {
    root: ServiceProvider,
    scoped_cells: Box<[OnceCell<AnyArc>]>,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        let scoped_cells = (0..root.inner().registry.scoped_count)
            .map(|_| OnceCell::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { root, scoped_cells }
    }

    /// The provider this scope was created from.
    pub fn root(&self) -> &ServiceProvider {
        &self.root
    }

    fn resolve_scoped(&self, reg: &Registration) -> DiResult<AnyArc> {
        let ctx = ResolverContext::new(self);
        let cell = match reg.scoped_slot.and_then(|slot| self.scoped_cells.get(slot)) {
            Some(cell) => cell,
            // No slot assigned: behave like transient
            None => return (reg.ctor)(&ctx),
        };
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }
        let value = (reg.ctor)(&ctx)?;
        Ok(cell.get_or_init(|| value).clone())
    }

    fn resolve_any_impl(&self, key: &Key) -> DiResult<AnyArc> {
        let reg = self
            .root
            .inner()
            .registry
            .get(key)
            .ok_or(DiError::NotFound(key.display_name()))?;

        match reg.lifetime {
            Lifetime::Singleton => self.root.resolve_singleton(reg),
            Lifetime::Scoped => self.resolve_scoped(reg),
            Lifetime::Transient => {
                // Pass the scope itself so transient factories can see scoped services
                let ctx = ResolverContext::new(self);
                (reg.ctor)(&ctx)
            }
        }
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        with_circular_guard(key, || self.resolve_any_impl(key))
    }

    fn is_registered(&self, key: &Key) -> bool {
        self.root.is_registered(key)
    }
}
