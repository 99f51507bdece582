//! Reflected type references used by untyped proxy requests.

use std::any::TypeId;
use std::fmt;

use crate::key::Key;

/// Whether a proxied type is a trait object or a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A trait object (`dyn Trait`)
    Interface,
    /// A concrete struct or enum
    Class,
}

/// A runtime reference to a type.
///
/// `Unbound` stands for a generic definition whose parameters have not been
/// filled in. Such references can be named in a request but never proxied.
///
/// ```rust
/// use ferrous_intercept::{TypeKind, TypeRef};
///
/// trait Repository: Send + Sync {}
///
/// let repo = TypeRef::of::<dyn Repository>();
/// assert_eq!(repo.kind(), Some(TypeKind::Interface));
/// assert!(!repo.is_generic_definition());
///
/// let open = TypeRef::unbound("Repository<T>", 1);
/// assert!(open.is_generic_definition());
/// assert!(open.key().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Bound {
        id: TypeId,
        name: &'static str,
        kind: TypeKind,
    },
    Unbound {
        name: &'static str,
        arity: usize,
    },
}

impl TypeRef {
    /// Reference to `T`, classified by its name: `dyn` types are interfaces.
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<T>();
        let kind = if name.starts_with("dyn ") {
            TypeKind::Interface
        } else {
            TypeKind::Class
        };
        TypeRef::Bound {
            id: TypeId::of::<T>(),
            name,
            kind,
        }
    }

    pub fn interface<T: ?Sized + 'static>() -> Self {
        TypeRef::Bound {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Interface,
        }
    }

    pub fn class<T: 'static>() -> Self {
        TypeRef::Bound {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            kind: TypeKind::Class,
        }
    }

    /// A generic definition with `arity` unfilled parameters.
    pub fn unbound(name: &'static str, arity: usize) -> Self {
        TypeRef::Unbound { name, arity }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeRef::Bound { name, .. } | TypeRef::Unbound { name, .. } => name,
        }
    }

    pub fn is_generic_definition(&self) -> bool {
        matches!(self, TypeRef::Unbound { .. })
    }

    /// `None` for generic definitions.
    pub fn kind(&self) -> Option<TypeKind> {
        match self {
            TypeRef::Bound { kind, .. } => Some(*kind),
            TypeRef::Unbound { .. } => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == Some(TypeKind::Interface)
    }

    /// Registry key of the type, for bound references.
    pub fn key(&self) -> Option<Key> {
        match *self {
            TypeRef::Bound {
                name,
                kind: TypeKind::Interface,
                ..
            } => Some(Key::Trait(name)),
            TypeRef::Bound {
                id,
                name,
                kind: TypeKind::Class,
            } => Some(Key::Type(id, name)),
            TypeRef::Unbound { .. } => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Bound { name, .. } => f.write_str(name),
            TypeRef::Unbound { name, arity } => write!(f, "{name} ({arity} unbound)"),
        }
    }
}
