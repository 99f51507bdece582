//! Method interception: invocation handles, interceptor chains and the
//! async-to-sync interceptor adapter.
//!
//! A proxy turns every call on the proxied trait (or struct) into an
//! [`Invocation`] and hands it to the [`InterceptorChain`]. Each
//! [`Interceptor`] decides whether and when to [`proceed`](Invocation::proceed)
//! to the next interceptor, and eventually the real target.
//!
//! Interceptors that want to `await` around the call implement
//! [`AsyncInterceptor`] instead and are wrapped in an
//! [`AsyncInterceptorAdapter`].

pub mod async_interceptor;
pub mod chain;
pub mod interceptor;
pub mod invocation;

pub use async_interceptor::{AsyncInterceptor, AsyncInterceptorAdapter};
pub use chain::InterceptorChain;
pub use interceptor::{interceptor_fn, FnInterceptor, Interceptor};
pub use invocation::{AnyValue, Invocation, MethodSignature, ProceedInfo, ReturnShape, ReturnValue, UnitFuture, ValueFuture};
