//! Interceptor chains: the dispatch entry points proxies call into.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::{BoxError, DiError};
use crate::intercept::interceptor::Interceptor;
use crate::intercept::invocation::{Invocation, MethodSignature, ReturnValue, Target};
use crate::proxy::options::{InterceptorSelector, ProxyGenerationHook, ProxyGenerationOptions};

/// Ordered interceptors shared by every member of one proxy.
///
/// Proxy stand-ins hold a chain and route each member through one of the
/// `invoke_*` entry points, passing a closure that calls the real target.
/// Interceptors run in the order they were supplied, and the chain starts
/// running when the entry point is called: for asynchronous members the
/// interceptors have already run their synchronous part by the time the
/// returned future is first polled.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{interceptor_fn, Interceptor, InterceptorChain};
/// use std::sync::Arc;
///
/// let doubler: Arc<dyn Interceptor> = Arc::new(interceptor_fn("doubler", |invocation| {
///     invocation.proceed();
///     let value: u32 = invocation.take_value_or_default();
///     invocation.set_value(value * 2);
/// }));
///
/// let chain = InterceptorChain::new(vec![doubler]);
/// let result = chain.invoke_value("answer", Some(|| 21u32)).unwrap();
/// assert_eq!(result, 42);
/// ```
#[derive(Clone)]
pub struct InterceptorChain {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    hook: Option<Arc<dyn ProxyGenerationHook>>,
    selector: Option<Arc<dyn InterceptorSelector>>,
    target_type: &'static str,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: interceptors.into(),
            hook: None,
            selector: None,
            target_type: "unknown",
        }
    }

    pub(crate) fn with_options(
        interceptors: Vec<Arc<dyn Interceptor>>,
        options: &ProxyGenerationOptions,
        target_type: &'static str,
    ) -> Self {
        Self {
            interceptors: interceptors.into(),
            hook: options.hook().cloned(),
            selector: options.selector().cloned(),
            target_type,
        }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Name of the proxied type.
    pub fn target_type(&self) -> &'static str {
        self.target_type
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn selector(&self) -> Option<&Arc<dyn InterceptorSelector>> {
        self.selector.as_ref()
    }

    /// Interceptors that apply to `method`, after the hook and selector.
    pub fn interceptors_for(&self, method: &MethodSignature) -> Arc<[Arc<dyn Interceptor>]> {
        if let Some(hook) = &self.hook {
            if !hook.should_intercept(self.target_type, method) {
                return Arc::from(Vec::new());
            }
        }
        match &self.selector {
            Some(selector) => selector
                .select_interceptors(self.target_type, method, &self.interceptors)
                .into(),
            None => self.interceptors.clone(),
        }
    }

    /// Starts a call and runs the chain. Lower-level than the `invoke_*`
    /// helpers; the caller reads the outcome from the returned handle.
    pub fn dispatch<F>(&self, method: MethodSignature, target: Option<F>) -> Invocation
    where
        F: Fn(&Invocation) + Send + Sync + 'static,
    {
        let interceptors = self.interceptors_for(&method);
        tracing::trace!(
            target_type = self.target_type,
            method = method.name,
            interceptors = interceptors.len(),
            "dispatching intercepted call"
        );
        let target = target.map(|f| Arc::new(f) as Target);
        let invocation = Invocation::new(method, self.target_type, interceptors, target);
        invocation.proceed();
        invocation
    }

    /// Member without a result.
    pub fn invoke_unit<F>(&self, method: &'static str, target: Option<F>) -> Result<(), BoxError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let invocation = self.dispatch(
            MethodSignature::unit(method),
            target.map(|f| move |_: &Invocation| f()),
        );
        match invocation.take_failure() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Member returning a `T`.
    ///
    /// Fails with [`DiError::ReturnShapeMismatch`] when the interceptors
    /// leave anything other than a `T` in the return slot.
    pub fn invoke_value<T, F>(&self, method: &'static str, target: Option<F>) -> Result<T, BoxError>
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let invocation = self.dispatch(
            MethodSignature::value::<T>(method),
            target.map(|f| move |invocation: &Invocation| invocation.set_value(f())),
        );
        if let Some(error) = invocation.take_failure() {
            return Err(error);
        }
        let expected = std::any::type_name::<T>();
        match invocation.take_return_value() {
            ReturnValue::Value(value) => value.downcast::<T>().map_err(|value| {
                DiError::ReturnShapeMismatch {
                    expected,
                    found: value.type_name(),
                }
                .into()
            }),
            other => Err(DiError::ReturnShapeMismatch {
                expected,
                found: other.shape_name(),
            }
            .into()),
        }
    }

    /// Asynchronous member without a result.
    ///
    /// An empty slot, left by an interceptor that neither proceeded nor set a
    /// future, completes immediately.
    pub fn invoke_async<F, Fut>(&self, method: &'static str, target: Option<F>) -> BoxFuture<'static, Result<(), BoxError>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let invocation = self.dispatch(
            MethodSignature::future(method),
            target.map(|f| move |invocation: &Invocation| invocation.set_return_value(ReturnValue::future(f()))),
        );
        if let Some(error) = invocation.take_failure() {
            return future::ready(Err(error)).boxed();
        }
        match invocation.take_return_value() {
            ReturnValue::Future(fut) => fut,
            ReturnValue::FutureValue(fut) => fut.map(|result| result.map(drop)).boxed(),
            ReturnValue::Empty => future::ready(Ok(())).boxed(),
            ReturnValue::Value(value) => future::ready(Err(DiError::ReturnShapeMismatch {
                expected: "future",
                found: value.type_name(),
            }
            .into()))
            .boxed(),
        }
    }

    /// Asynchronous member resolving to a `T`.
    pub fn invoke_async_value<T, F, Fut>(
        &self,
        method: &'static str,
        target: Option<F>,
    ) -> BoxFuture<'static, Result<T, BoxError>>
    where
        T: Any + Send,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let invocation = self.dispatch(
            MethodSignature::future_value::<T>(method),
            target.map(|f| {
                move |invocation: &Invocation| invocation.set_return_value(ReturnValue::future_value(f()))
            }),
        );
        if let Some(error) = invocation.take_failure() {
            return future::ready(Err(error)).boxed();
        }
        let expected = std::any::type_name::<T>();
        match invocation.take_return_value() {
            ReturnValue::FutureValue(fut) => async move {
                let value = fut.await?;
                value.downcast::<T>().map_err(|value| {
                    DiError::ReturnShapeMismatch {
                        expected,
                        found: value.type_name(),
                    }
                    .into()
                })
            }
            .boxed(),
            ReturnValue::Value(value) => future::ready(value.downcast::<T>().map_err(|value| {
                DiError::ReturnShapeMismatch {
                    expected,
                    found: value.type_name(),
                }
                .into()
            }))
            .boxed(),
            other => future::ready(Err(DiError::ReturnShapeMismatch {
                expected,
                found: other.shape_name(),
            }
            .into()))
            .boxed(),
        }
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("target_type", &self.target_type)
            .field("interceptors", &self.names())
            .field("hook", &self.hook.is_some())
            .field("selector", &self.selector.is_some())
            .finish()
    }
}
