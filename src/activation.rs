//! Instance creation from container services plus explicit arguments.
//!
//! [`Activate`] is the Rust counterpart of "create an instance of this type,
//! resolving what the container knows and taking the rest from an explicit
//! argument list". The proxy engine uses it to build class proxies, and the
//! registration builder uses it to construct interceptor types on demand.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::traits::ResolverCore;

/// One explicit constructor argument.
#[derive(Clone)]
pub struct Argument {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Argument {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Argument").field(&self.type_name).finish()
    }
}

/// Ordered list of explicit constructor arguments.
///
/// Constructors consume arguments front to back with [`next`](Self::next);
/// anything left over when construction finishes is an error, the same as a
/// constructor that does not accept the supplied arguments.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::ConstructorArgs;
///
/// let mut args = ConstructorArgs::new().with("orders").with(3u32);
/// assert_eq!(args.type_names(), vec!["&str", "u32"]);
///
/// let table: &str = args.next().unwrap();
/// let shards: u32 = args.next().unwrap();
/// assert_eq!((table, shards), ("orders", 3));
/// assert!(args.finish().is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConstructorArgs {
    values: VecDeque<Argument>,
}

impl ConstructorArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`push`](Self::push).
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.push_back(Argument::new(value));
    }

    pub fn push_argument(&mut self, argument: Argument) {
        self.values.push_back(argument);
    }

    pub fn extend(&mut self, arguments: impl IntoIterator<Item = Argument>) {
        self.values.extend(arguments);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_arguments(self) -> impl Iterator<Item = Argument> {
        self.values.into_iter()
    }

    /// Type names of the remaining arguments, in order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.values.iter().map(Argument::type_name).collect()
    }

    /// Takes the next argument, which must be a `T`.
    ///
    /// On mismatch the argument stays in place and
    /// [`DiError::ArgumentMismatch`] is returned.
    pub fn next<T: Any + Clone>(&mut self) -> DiResult<T> {
        let expected = std::any::type_name::<T>();
        let front = self.values.front().ok_or(DiError::ArgumentMismatch {
            expected,
            found: None,
        })?;
        let value = front
            .value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(DiError::ArgumentMismatch {
                expected,
                found: Some(front.type_name),
            })?;
        self.values.pop_front();
        Ok(value)
    }

    /// Takes the next argument only if it is a `T`.
    pub fn next_if<T: Any + Clone>(&mut self) -> Option<T> {
        let value = self.values.front()?.value.downcast_ref::<T>().cloned()?;
        self.values.pop_front();
        Some(value)
    }

    /// Succeeds only when every argument was consumed.
    pub fn finish(self) -> DiResult<()> {
        if self.values.is_empty() {
            Ok(())
        } else {
            Err(DiError::UnusedArguments(self.type_names()))
        }
    }
}

/// Types the container can construct on demand.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{Activate, ConstructorArgs, DiResult, Resolver, ResolverCore, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Settings { prefix: String }
/// struct Tagger { settings: Arc<Settings>, tag: &'static str }
///
/// impl Activate for Tagger {
///     fn activate(resolver: &dyn ResolverCore, args: &mut ConstructorArgs) -> DiResult<Self> {
///         Ok(Tagger { settings: resolver.get::<Settings>()?, tag: args.next()? })
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Settings { prefix: "app".into() });
/// let provider = services.build();
///
/// let tagger: Tagger = provider.create_instance(ConstructorArgs::new().with("v1")).unwrap();
/// assert_eq!(format!("{}-{}", tagger.settings.prefix, tagger.tag), "app-v1");
/// ```
pub trait Activate: Sized + Send + Sync + 'static {
    fn activate(resolver: &dyn ResolverCore, args: &mut ConstructorArgs) -> DiResult<Self>;
}

/// Free-function form of [`Resolver::create_instance`](crate::Resolver::create_instance)
/// for callers holding a `&dyn ResolverCore`.
pub fn create_instance<T: Activate>(resolver: &dyn ResolverCore, mut args: ConstructorArgs) -> DiResult<T> {
    let instance = T::activate(resolver, &mut args)?;
    args.finish()?;
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_leaves_argument_in_place() {
        let mut args = ConstructorArgs::new().with(1u8);
        match args.next::<String>() {
            Err(DiError::ArgumentMismatch { expected, found }) => {
                assert_eq!(expected, "alloc::string::String");
                assert_eq!(found, Some("u8"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(args.next::<u8>().unwrap(), 1);
    }

    #[test]
    fn missing_argument_reports_nothing_found() {
        let mut args = ConstructorArgs::new();
        assert!(matches!(
            args.next::<u8>(),
            Err(DiError::ArgumentMismatch { found: None, .. })
        ));
    }

    #[test]
    fn leftovers_fail_finish() {
        let args = ConstructorArgs::new().with(1u8).with("x");
        match args.finish() {
            Err(DiError::UnusedArguments(names)) => assert_eq!(names, vec!["u8", "&str"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn next_if_skips_on_mismatch() {
        let mut args = ConstructorArgs::new().with(5u32);
        assert_eq!(args.next_if::<String>(), None);
        assert_eq!(args.next_if::<u32>(), Some(5));
        assert!(args.is_empty());
    }
}
