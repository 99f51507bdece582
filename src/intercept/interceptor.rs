//! Synchronous interceptor trait.

use std::fmt;

use crate::intercept::invocation::Invocation;

/// Intercepts calls routed through a proxy.
///
/// Implementations decide whether and when to continue with
/// [`Invocation::proceed`]; not proceeding short-circuits the call, in which
/// case the interceptor is responsible for filling the return slot.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{Interceptor, Invocation};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CallCounter(AtomicUsize);
///
/// impl Interceptor for CallCounter {
///     fn intercept(&self, invocation: &Invocation) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         invocation.proceed();
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync + 'static {
    fn intercept(&self, invocation: &Invocation);

    /// Name shown in descriptors and traces.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Interceptor built from a closure.
pub struct FnInterceptor<F> {
    name: &'static str,
    f: F,
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&Invocation) + Send + Sync + 'static,
{
    fn intercept(&self, invocation: &Invocation) {
        (self.f)(invocation)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").field("name", &self.name).finish()
    }
}

/// Wraps a closure as a named [`Interceptor`].
///
/// ```rust
/// use ferrous_intercept::{interceptor_fn, Interceptor};
///
/// let passthrough = interceptor_fn("passthrough", |invocation| invocation.proceed());
/// assert_eq!(passthrough.name(), "passthrough");
/// ```
pub fn interceptor_fn<F>(name: &'static str, f: F) -> FnInterceptor<F>
where
    F: Fn(&Invocation) + Send + Sync + 'static,
{
    FnInterceptor { name, f }
}
