//! Service registration types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;

pub(crate) use crate::provider::ResolverContext;

// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Service registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Implementation type ID for diagnostics
    pub(crate) impl_id: Option<TypeId>,
    /// Names of the interceptors wrapped around resolved instances
    pub(crate) interceptors: Vec<&'static str>,
    /// Singleton cache, present only for singletons
    pub(crate) single_runtime: Option<OnceCell<AnyArc>>,
    /// Scoped slot index, assigned by `Registry::finalize`
    pub(crate) scoped_slot: Option<usize>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: Ctor, impl_id: Option<TypeId>) -> Self {
        let single_runtime = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };

        Self {
            lifetime,
            ctor,
            impl_id,
            interceptors: Vec::new(),
            single_runtime,
            scoped_slot: None,
        }
    }

    pub(crate) fn with_interceptors(mut self, interceptors: Vec<&'static str>) -> Self {
        self.interceptors = interceptors;
        self
    }
}

/// Registration table; later registrations for the same key replace earlier ones.
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Key, Registration>,
    /// Keys in first-registration order, for stable descriptor listings
    order: Vec<Key>,
    pub(crate) scoped_count: usize,
}

impl Registry {
    pub(crate) fn insert(&mut self, key: Key, registration: Registration) {
        if self.entries.insert(key.clone(), registration).is_none() {
            self.order.push(key);
        }
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<&Registration> {
        self.entries.get(key)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, key: &Key) -> Option<&mut Registration> {
        self.entries.get_mut(key)
    }

    #[inline]
    pub(crate) fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Registration)> {
        self.order
            .iter()
            .filter_map(move |key| self.entries.get(key).map(|reg| (key, reg)))
    }

    /// Assigns scoped slot indices; called once by `ServiceCollection::build`.
    pub(crate) fn finalize(&mut self) {
        let mut next_scoped_slot = 0;
        for key in &self.order {
            if let Some(reg) = self.entries.get_mut(key) {
                if reg.lifetime == Lifetime::Scoped {
                    reg.scoped_slot = Some(next_scoped_slot);
                    next_scoped_slot += 1;
                }
            }
        }
        self.scoped_count = next_scoped_slot;
    }
}
