//! Asynchronous interceptors and their adapter onto the synchronous chain.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};

use crate::error::{BoxError, DiError};
use crate::intercept::interceptor::Interceptor;
use crate::intercept::invocation::{AnyValue, Invocation, Pending, ReturnShape, ReturnValue};

/// An interceptor that can `await` around the rest of the chain.
///
/// Both methods default to simply proceeding, so an implementation only
/// overrides the shapes it cares about. The invocation handle is owned and
/// may be held across awaits; [`Invocation::proceed_async`] continues from
/// the same chain position no matter when it is called.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use ferrous_intercept::{AnyValue, AsyncInterceptor, BoxError, Invocation};
///
/// struct Timing;
///
/// #[async_trait]
/// impl AsyncInterceptor for Timing {
///     async fn intercept_async(&self, invocation: Invocation) -> Result<(), BoxError> {
///         let started = std::time::Instant::now();
///         let result = invocation.proceed_async().await;
///         let _elapsed = started.elapsed();
///         result
///     }
///
///     async fn intercept_async_value(&self, invocation: Invocation) -> Result<AnyValue, BoxError> {
///         let started = std::time::Instant::now();
///         let result = invocation.proceed_async_value().await;
///         let _elapsed = started.elapsed();
///         result
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncInterceptor: Send + Sync + 'static {
    /// Intercepts a member that produces no result.
    async fn intercept_async(&self, invocation: Invocation) -> Result<(), BoxError> {
        invocation.proceed_async().await
    }

    /// Intercepts a member that produces a result. The returned value
    /// becomes the member's result.
    async fn intercept_async_value(&self, invocation: Invocation) -> Result<AnyValue, BoxError> {
        invocation.proceed_async_value().await
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Wraps `self` in an [`AsyncInterceptorAdapter`].
    fn into_interceptor(self) -> Arc<dyn Interceptor>
    where
        Self: Sized,
    {
        Arc::new(AsyncInterceptorAdapter::new(self))
    }
}

/// Runs an [`AsyncInterceptor`] inside the synchronous interceptor chain.
///
/// Routing follows the member's declared return shape:
///
/// * asynchronous members get the interception future placed in the return
///   slot, so nothing blocks;
/// * synchronous members poll the interception once inline, which is enough
///   whenever the interceptor does not actually suspend. Outside any tokio
///   runtime a pending interception is driven to completion with
///   `futures::executor::block_on`. On a multi-threaded runtime it goes
///   through `tokio::task::block_in_place` when the `multi-thread` feature
///   is enabled. Any other runtime thread cannot be blocked safely, so the
///   call fails with [`DiError::BlockedRuntime`].
pub struct AsyncInterceptorAdapter<A> {
    inner: Arc<A>,
}

impl<A: AsyncInterceptor> AsyncInterceptorAdapter<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn from_arc(inner: Arc<A>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<A> {
        &self.inner
    }
}

impl<A: AsyncInterceptor> Interceptor for AsyncInterceptorAdapter<A> {
    fn intercept(&self, invocation: &Invocation) {
        let shape = invocation.method().shape;
        match shape {
            ReturnShape::Future => {
                let inner = self.inner.clone();
                let handle = invocation.clone();
                invocation.set_return_value(ReturnValue::Future(
                    async move { inner.intercept_async(handle).await }.boxed(),
                ));
            }
            ReturnShape::FutureValue => {
                let inner = self.inner.clone();
                let handle = invocation.clone();
                invocation.set_return_value(ReturnValue::FutureValue(
                    async move { inner.intercept_async_value(handle).await }.boxed(),
                ));
            }
            ReturnShape::Unit => {
                if let Err(error) = drive(invocation.method().name, self.inner.intercept_async(invocation.clone())) {
                    invocation.set_failure(error);
                }
            }
            ReturnShape::Value => match drive(invocation.method().name, self.inner.intercept_async_value(invocation.clone())) {
                Ok(value) if value.is_empty() => {}
                Ok(value) => invocation.set_return_value(ReturnValue::Value(value)),
                Err(error) => invocation.set_failure(error),
            },
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

fn drive<T>(method: &'static str, mut future: BoxFuture<'_, Result<T, BoxError>>) -> Result<T, BoxError> {
    if let Some(output) = (&mut future).now_or_never() {
        return output;
    }

    // Timers and IO of a tokio runtime only progress while its threads run;
    // blocking one of them here can stall the interception forever.
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        #[cfg(feature = "multi-thread")]
        {
            if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread {
                tracing::warn!(method, "async interceptor suspended inside a synchronous member; blocking in place");
                return tokio::task::block_in_place(|| handle.block_on(future));
            }
        }
        tracing::error!(
            method,
            flavor = ?handle.runtime_flavor(),
            "async interceptor suspended inside a synchronous member on a runtime thread"
        );
        return Err(DiError::BlockedRuntime { method }.into());
    }

    tracing::warn!(method, "async interceptor suspended inside a synchronous member; blocking the calling thread");
    futures::executor::block_on(future)
}

impl Invocation {
    /// Continues the chain and waits for any asynchronous work it started.
    ///
    /// The continuation runs synchronously; if it leaves a future in the
    /// return slot, that future is awaited and its failure propagated. A
    /// future that resolves to a value is awaited and the value dropped.
    /// Plain values stay in the slot.
    pub async fn proceed_async(&self) -> Result<(), BoxError> {
        self.capture_proceed_info().invoke();
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        match self.take_pending() {
            Pending::Unit(future) => future.await,
            Pending::Value(future) => future.await.map(drop),
            Pending::None => Ok(()),
        }
    }

    /// Continues the chain and returns its result, type-erased.
    ///
    /// Empty when the rest of the chain produced no value.
    pub async fn proceed_async_value(&self) -> Result<AnyValue, BoxError> {
        self.capture_proceed_info().invoke();
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        match self.take_return_value() {
            ReturnValue::FutureValue(future) => future.await,
            ReturnValue::Value(value) => Ok(value),
            ReturnValue::Future(future) => future.await.map(|()| AnyValue::empty()),
            ReturnValue::Empty => Ok(AnyValue::empty()),
        }
    }

    /// Continues the chain and returns its result as a `T`.
    ///
    /// A result of any other type, or no result at all, yields
    /// `T::default()`. Use [`try_proceed_async_as`](Self::try_proceed_async_as)
    /// to treat that as an error instead.
    ///
    /// ```rust
    /// use ferrous_intercept::{AsyncInterceptor, AnyValue, BoxError, Invocation, InterceptorChain};
    /// use async_trait::async_trait;
    ///
    /// struct AddOne;
    ///
    /// #[async_trait]
    /// impl AsyncInterceptor for AddOne {
    ///     async fn intercept_async_value(&self, invocation: Invocation) -> Result<AnyValue, BoxError> {
    ///         let value: u32 = invocation.proceed_async_as().await?;
    ///         Ok(AnyValue::new(value + 1))
    ///     }
    /// }
    ///
    /// let chain = InterceptorChain::new(vec![AddOne.into_interceptor()]);
    /// let result = chain.invoke_async_value("load", Some(|| async { Ok::<_, BoxError>(41u32) }));
    /// assert_eq!(futures::executor::block_on(result).unwrap(), 42);
    /// ```
    pub async fn proceed_async_as<T: Any + Send + Default>(&self) -> Result<T, BoxError> {
        let value = self.proceed_async_value().await?;
        match value.downcast::<T>() {
            Ok(value) => Ok(value),
            Err(other) => {
                tracing::warn!(
                    method = self.method().name,
                    expected = std::any::type_name::<T>(),
                    found = other.type_name(),
                    "proceeded result has an unexpected type; using the default value"
                );
                Ok(T::default())
            }
        }
    }

    /// Strict form of [`proceed_async_as`](Self::proceed_async_as).
    pub async fn try_proceed_async_as<T: Any + Send>(&self) -> Result<T, BoxError> {
        let value = self.proceed_async_value().await?;
        value.downcast::<T>().map_err(|other| {
            DiError::ReturnShapeMismatch {
                expected: std::any::type_name::<T>(),
                found: other.type_name(),
            }
            .into()
        })
    }
}
