//! Service descriptors for introspection and diagnostics.

use std::any::TypeId;

use crate::key::Key;
use crate::lifetime::Lifetime;

/// Read-only view of one registration.
///
/// Descriptors are produced by
/// [`ServiceCollection::get_service_descriptors`](crate::ServiceCollection::get_service_descriptors)
/// and let startup code check what will be proxied before the provider is
/// built.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{ServiceCollection, Lifetime};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(42u32);
/// services.add_named_singleton("port", 8080u16);
///
/// let descriptors = services.get_service_descriptors();
/// let port = descriptors.iter().find(|d| d.is_named()).unwrap();
/// assert_eq!(port.service_name(), Some("port"));
/// assert_eq!(port.lifetime, Lifetime::Singleton);
/// assert!(!port.is_intercepted());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// The service key (type/trait name with optional service key)
    pub key: Key,
    /// Service lifetime
    pub lifetime: Lifetime,
    /// Implementation type ID (if known)
    pub impl_type_id: Option<TypeId>,
    /// Interceptors wrapped around resolved instances, in invocation order
    pub interceptors: Vec<&'static str>,
}

impl ServiceDescriptor {
    /// Service key for keyed registrations.
    pub fn service_name(&self) -> Option<&'static str> {
        self.key.service_name()
    }

    /// Type or trait name of the service.
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    pub fn is_named(&self) -> bool {
        self.service_name().is_some()
    }

    /// True when resolutions of this service are wrapped in a proxy.
    pub fn is_intercepted(&self) -> bool {
        !self.interceptors.is_empty()
    }
}
