//! Service key types for the registry.

use std::any::TypeId;

/// Key for service storage and lookup.
///
/// Concrete types are identified by `TypeId`; trait objects by their type
/// name. Keyed ("named") registrations carry an additional `&'static str`.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{key_of_type, Key};
/// use std::any::TypeId;
///
/// let key = key_of_type::<u32>();
/// assert_eq!(key, Key::Type(TypeId::of::<u32>(), "u32"));
/// assert_eq!(key.display_name(), "u32");
/// assert_eq!(key.service_name(), None);
///
/// let named = Key::TraitNamed("dyn app::Widget", "primary");
/// assert!(named.is_trait());
/// assert_eq!(named.service_name(), Some("primary"));
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Trait object key (trait objects are looked up by name)
    Trait(&'static str),
    /// Keyed concrete type: TypeId, type name, service key
    TypeNamed(TypeId, &'static str, &'static str),
    /// Keyed trait object: trait name, service key
    TraitNamed(&'static str, &'static str),
}

impl Key {
    /// Type or trait name, as produced by `std::any::type_name`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) | Key::Trait(name) => name,
            Key::TypeNamed(_, name, _) | Key::TraitNamed(name, _) => name,
        }
    }

    /// Service key for keyed registrations.
    pub fn service_name(&self) -> Option<&'static str> {
        match self {
            Key::Type(..) | Key::Trait(_) => None,
            Key::TypeNamed(_, _, name) | Key::TraitNamed(_, name) => Some(name),
        }
    }

    /// True when the key identifies a trait object rather than a concrete type.
    pub fn is_trait(&self) -> bool {
        matches!(self, Key::Trait(_) | Key::TraitNamed(..))
    }
}

// TypeId alone identifies concrete types; the name is diagnostic only.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::TypeNamed(a, _, name_a), Key::TypeNamed(b, _, name_b)) => a == b && name_a == name_b,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            (Key::TraitNamed(a, name_a), Key::TraitNamed(b, name_b)) => a == b && name_a == name_b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::TypeNamed(id, _, name) => {
                1u8.hash(state);
                id.hash(state);
                name.hash(state);
            }
            Key::Trait(name) => {
                2u8.hash(state);
                name.hash(state);
            }
            Key::TraitNamed(name, named) => {
                3u8.hash(state);
                name.hash(state);
                named.hash(state);
            }
        }
    }
}

/// Key of a concrete type.
#[inline]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// Key of a trait object such as `dyn Widget`.
#[inline]
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

/// Keyed variant of [`key_of_type`].
#[inline]
pub fn key_of_named_type<T: 'static>(name: &'static str) -> Key {
    Key::TypeNamed(TypeId::of::<T>(), std::any::type_name::<T>(), name)
}

/// Keyed variant of [`key_of_trait`].
#[inline]
pub fn key_of_named_trait<T: ?Sized + 'static>(name: &'static str) -> Key {
    Key::TraitNamed(std::any::type_name::<T>(), name)
}
