//! The in-flight call handed to interceptors.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::error::{BoxError, DiError};
use crate::intercept::interceptor::Interceptor;

/// Future stored in the return slot of members that produce no result.
pub type UnitFuture = BoxFuture<'static, Result<(), BoxError>>;

/// Future stored in the return slot of members that produce a result.
pub type ValueFuture = BoxFuture<'static, Result<AnyValue, BoxError>>;

pub(crate) type Target = Arc<dyn Fn(&Invocation) + Send + Sync>;

/// A type-erased return value, possibly empty.
///
/// ```rust
/// use ferrous_intercept::AnyValue;
///
/// let value = AnyValue::new(7u32);
/// assert!(value.is::<u32>());
/// assert_eq!(value.type_name(), "u32");
/// assert_eq!(value.downcast::<u32>().ok(), Some(7));
///
/// assert!(AnyValue::empty().is_empty());
/// ```
pub struct AnyValue {
    value: Option<Box<dyn Any + Send>>,
    type_name: &'static str,
}

impl AnyValue {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Some(Box::new(value)),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn empty() -> Self {
        Self {
            value: None,
            type_name: "nothing",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Name of the contained type, or `"nothing"`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is::<T>())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref::<T>()
    }

    /// Unwraps the value, giving `self` back if it is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, AnyValue> {
        match self.value {
            Some(boxed) if boxed.is::<T>() => match boxed.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(boxed) => Err(AnyValue {
                    value: Some(boxed),
                    type_name: self.type_name,
                }),
            },
            value => Err(AnyValue {
                value,
                type_name: self.type_name,
            }),
        }
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyValue").field(&self.type_name).finish()
    }
}

/// Declared return shape of an intercepted member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// Synchronous, no result
    Unit,
    /// Synchronous, returns a value
    Value,
    /// Returns a future with no result
    Future,
    /// Returns a future that resolves to a value
    FutureValue,
}

impl ReturnShape {
    pub fn is_async(self) -> bool {
        matches!(self, ReturnShape::Future | ReturnShape::FutureValue)
    }

    pub fn produces_value(self) -> bool {
        matches!(self, ReturnShape::Value | ReturnShape::FutureValue)
    }
}

/// Name and declared return shape of an intercepted member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub name: &'static str,
    pub shape: ReturnShape,
    /// Name of the produced type (`"()"` for members without a result)
    pub return_type: &'static str,
}

impl MethodSignature {
    pub const fn unit(name: &'static str) -> Self {
        Self { name, shape: ReturnShape::Unit, return_type: "()" }
    }

    pub fn value<T: ?Sized>(name: &'static str) -> Self {
        Self {
            name,
            shape: ReturnShape::Value,
            return_type: std::any::type_name::<T>(),
        }
    }

    pub const fn future(name: &'static str) -> Self {
        Self { name, shape: ReturnShape::Future, return_type: "()" }
    }

    pub fn future_value<T: ?Sized>(name: &'static str) -> Self {
        Self {
            name,
            shape: ReturnShape::FutureValue,
            return_type: std::any::type_name::<T>(),
        }
    }
}

/// Contents of an invocation's return slot.
#[derive(Default)]
pub enum ReturnValue {
    #[default]
    Empty,
    Value(AnyValue),
    Future(UnitFuture),
    FutureValue(ValueFuture),
}

impl ReturnValue {
    pub fn value<T: Any + Send>(value: T) -> Self {
        ReturnValue::Value(AnyValue::new(value))
    }

    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        ReturnValue::Future(future.boxed())
    }

    pub fn future_value<T, F>(future: F) -> Self
    where
        T: Any + Send,
        F: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        ReturnValue::FutureValue(future.map(|result| result.map(AnyValue::new)).boxed())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ReturnValue::Empty)
    }

    /// Short description used in diagnostics.
    pub fn shape_name(&self) -> &'static str {
        match self {
            ReturnValue::Empty => "nothing",
            ReturnValue::Value(value) => value.type_name(),
            ReturnValue::Future(_) => "future",
            ReturnValue::FutureValue(_) => "future value",
        }
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnValue::Empty => f.write_str("Empty"),
            ReturnValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            ReturnValue::Future(_) => f.write_str("Future(..)"),
            ReturnValue::FutureValue(_) => f.write_str("FutureValue(..)"),
        }
    }
}

struct Shared {
    method: MethodSignature,
    target_type: &'static str,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    target: Option<Target>,
    return_value: Mutex<ReturnValue>,
    failure: Mutex<Option<BoxError>>,
}

/// Handle to one in-flight call.
///
/// Handles are cheap to clone and every clone shares the same return slot.
/// A handle also remembers its position in the interceptor chain: the
/// handle passed to interceptor `i` proceeds to interceptor `i + 1`, even
/// when [`proceed`](Self::proceed) is called after an `await`.
#[derive(Clone)]
pub struct Invocation {
    shared: Arc<Shared>,
    position: usize,
}

impl Invocation {
    pub(crate) fn new(
        method: MethodSignature,
        target_type: &'static str,
        interceptors: Arc<[Arc<dyn Interceptor>]>,
        target: Option<Target>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                method,
                target_type,
                interceptors,
                target,
                return_value: Mutex::new(ReturnValue::Empty),
                failure: Mutex::new(None),
            }),
            position: 0,
        }
    }

    pub fn method(&self) -> &MethodSignature {
        &self.shared.method
    }

    /// Name of the proxied type.
    pub fn target_type(&self) -> &'static str {
        self.shared.target_type
    }

    /// False for proxies created without a target.
    pub fn has_target(&self) -> bool {
        self.shared.target.is_some()
    }

    /// Number of interceptors selected for this call.
    pub fn interceptor_count(&self) -> usize {
        self.shared.interceptors.len()
    }

    /// Continues the call: the next interceptor, or the target once the
    /// chain is exhausted.
    pub fn proceed(&self) {
        match self.shared.interceptors.get(self.position) {
            Some(next) => {
                let handle = Invocation {
                    shared: self.shared.clone(),
                    position: self.position + 1,
                };
                tracing::trace!(
                    method = self.shared.method.name,
                    interceptor = next.name(),
                    "entering interceptor"
                );
                next.intercept(&handle);
            }
            None => match &self.shared.target {
                Some(target) => target(self),
                None => self.fail_missing_target(),
            },
        }
    }

    /// Captures the current continuation point so it can be invoked later.
    pub fn capture_proceed_info(&self) -> ProceedInfo {
        ProceedInfo {
            invocation: self.clone(),
        }
    }

    pub fn set_return_value(&self, value: ReturnValue) {
        *self.shared.return_value.lock() = value;
    }

    pub fn set_value<T: Any + Send>(&self, value: T) {
        self.set_return_value(ReturnValue::value(value));
    }

    /// Takes the slot contents, leaving it empty.
    pub fn take_return_value(&self) -> ReturnValue {
        std::mem::take(&mut *self.shared.return_value.lock())
    }

    pub fn has_return_value(&self) -> bool {
        !self.shared.return_value.lock().is_empty()
    }

    /// Diagnostic name of what the slot currently holds.
    pub fn return_value_shape(&self) -> &'static str {
        self.shared.return_value.lock().shape_name()
    }

    /// Takes a plain `T` out of the slot, or `T::default()` when the slot
    /// holds anything else. Non-matching contents are left in place.
    pub fn take_value_or_default<T: Any + Send + Default>(&self) -> T {
        let mut slot = self.shared.return_value.lock();
        match std::mem::take(&mut *slot) {
            ReturnValue::Value(value) => match value.downcast::<T>() {
                Ok(value) => value,
                Err(value) => {
                    *slot = ReturnValue::Value(value);
                    T::default()
                }
            },
            other => {
                *slot = other;
                T::default()
            }
        }
    }

    /// Records a failure of a synchronous member.
    ///
    /// Asynchronous members report failures through the future in the
    /// return slot instead.
    pub fn set_failure(&self, error: BoxError) {
        *self.shared.failure.lock() = Some(error);
    }

    pub fn take_failure(&self) -> Option<BoxError> {
        self.shared.failure.lock().take()
    }

    /// Removes a pending future from the slot; plain values stay in place.
    pub(crate) fn take_pending(&self) -> Pending {
        let mut slot = self.shared.return_value.lock();
        match std::mem::take(&mut *slot) {
            ReturnValue::Future(future) => Pending::Unit(future),
            ReturnValue::FutureValue(future) => Pending::Value(future),
            other => {
                *slot = other;
                Pending::None
            }
        }
    }

    fn fail_missing_target(&self) {
        let error = DiError::MissingTarget {
            method: self.shared.method.name,
        };
        match self.shared.method.shape {
            ReturnShape::Future => {
                self.set_return_value(ReturnValue::Future(futures::future::ready(Err(error.into())).boxed()))
            }
            ReturnShape::FutureValue => self.set_return_value(ReturnValue::FutureValue(
                futures::future::ready(Err(error.into())).boxed(),
            )),
            ReturnShape::Unit | ReturnShape::Value => self.set_failure(error.into()),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.shared.method)
            .field("target_type", &self.shared.target_type)
            .field("position", &self.position)
            .finish()
    }
}

pub(crate) enum Pending {
    Unit(UnitFuture),
    Value(ValueFuture),
    None,
}

/// A captured continuation point of an [`Invocation`].
#[derive(Clone, Debug)]
pub struct ProceedInfo {
    invocation: Invocation,
}

impl ProceedInfo {
    /// Runs the rest of the chain from the captured point.
    pub fn invoke(&self) {
        self.invocation.proceed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(method: MethodSignature, target: Option<Target>) -> Invocation {
        Invocation::new(method, "Test", Arc::from(Vec::new()), target)
    }

    #[test]
    fn proceed_without_interceptors_reaches_target() {
        let invocation = bare(
            MethodSignature::value::<u32>("answer"),
            Some(Arc::new(|inv: &Invocation| inv.set_value(42u32))),
        );
        invocation.proceed();
        match invocation.take_return_value() {
            ReturnValue::Value(value) => assert_eq!(value.downcast::<u32>().ok(), Some(42)),
            other => panic!("unexpected slot {:?}", other),
        }
    }

    #[test]
    fn missing_target_records_failure_for_sync_members() {
        let invocation = bare(MethodSignature::unit("ping"), None);
        invocation.proceed();
        let failure = invocation.take_failure().expect("failure recorded");
        assert_eq!(failure.to_string(), "No target to proceed to for method: ping");
    }

    #[test]
    fn take_pending_keeps_plain_values() {
        let invocation = bare(MethodSignature::value::<u8>("x"), None);
        invocation.set_value(1u8);
        assert!(matches!(invocation.take_pending(), Pending::None));
        assert!(invocation.has_return_value());
    }

    #[test]
    fn any_value_downcast_mismatch_returns_original() {
        let value = AnyValue::new("text");
        let value = value.downcast::<u32>().unwrap_err();
        assert_eq!(value.type_name(), "&str");
        assert_eq!(value.downcast_ref::<&str>(), Some(&"text"));
    }
}
