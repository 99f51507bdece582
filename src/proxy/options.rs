//! Proxy generation options: method filtering, interceptor selection and mixins.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::activation::Argument;
use crate::intercept::{Interceptor, MethodSignature};

/// Decides which members of a proxied type are intercepted at all.
///
/// Members the hook rejects call straight through to the target.
pub trait ProxyGenerationHook: Send + Sync + 'static {
    fn should_intercept(&self, target_type: &'static str, method: &MethodSignature) -> bool;
}

impl<F> ProxyGenerationHook for F
where
    F: Fn(&'static str, &MethodSignature) -> bool + Send + Sync + 'static,
{
    fn should_intercept(&self, target_type: &'static str, method: &MethodSignature) -> bool {
        self(target_type, method)
    }
}

/// Picks the interceptors, and their order, for one member.
pub trait InterceptorSelector: Send + Sync + 'static {
    fn select_interceptors(
        &self,
        target_type: &'static str,
        method: &MethodSignature,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Vec<Arc<dyn Interceptor>>;
}

impl<F> InterceptorSelector for F
where
    F: Fn(&'static str, &MethodSignature, &[Arc<dyn Interceptor>]) -> Vec<Arc<dyn Interceptor>>
        + Send
        + Sync
        + 'static,
{
    fn select_interceptors(
        &self,
        target_type: &'static str,
        method: &MethodSignature,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Vec<Arc<dyn Interceptor>> {
        self(target_type, method, interceptors)
    }
}

/// Options applied when generating a proxy.
///
/// The default intercepts every member with every interceptor and adds no
/// mixins.
///
/// ```rust
/// use ferrous_intercept::{MethodSignature, ProxyGenerationOptions};
///
/// let options = ProxyGenerationOptions::default()
///     .with_hook(|_: &'static str, method: &MethodSignature| method.name != "to_string");
/// assert!(options.hook().is_some());
/// assert!(options.selector().is_none());
/// ```
#[derive(Clone, Default)]
pub struct ProxyGenerationOptions {
    hook: Option<Arc<dyn ProxyGenerationHook>>,
    selector: Option<Arc<dyn InterceptorSelector>>,
    mixins: Vec<Argument>,
}

impl ProxyGenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: impl ProxyGenerationHook) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn with_selector(mut self, selector: impl InterceptorSelector) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Adds a mixin instance. Class proxies receive mixins as constructor
    /// arguments right after the target.
    pub fn with_mixin<M: Any + Send + Sync>(mut self, mixin: Arc<M>) -> Self {
        self.mixins.push(Argument::new(mixin));
        self
    }

    pub fn hook(&self) -> Option<&Arc<dyn ProxyGenerationHook>> {
        self.hook.as_ref()
    }

    pub fn selector(&self) -> Option<&Arc<dyn InterceptorSelector>> {
        self.selector.as_ref()
    }

    pub fn mixins(&self) -> &[Argument] {
        &self.mixins
    }
}

impl fmt::Debug for ProxyGenerationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyGenerationOptions")
            .field("hook", &self.hook.is_some())
            .field("selector", &self.selector.is_some())
            .field("mixins", &self.mixins)
            .finish()
    }
}
