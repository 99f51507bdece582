//! Error types for registration, resolution and interception.

use thiserror::Error;

/// Boxed error carried by intercepted calls.
///
/// Futures placed in an [`Invocation`](crate::Invocation)'s return slot fail
/// with this type, and so do the `proceed_async*` helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependency injection and interception errors
///
/// Every configuration problem is reported synchronously by the call that
/// received the bad input: a registration call, a proxy request or a
/// resolution.
///
/// # Examples
///
/// ```rust
/// use ferrous_intercept::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_intercept::DiError;
///
/// let invalid = DiError::invalid_argument("additional_interfaces", "generic definition `Repo<_>` is not bound");
/// assert_eq!(
///     invalid.to_string(),
///     "Invalid argument `additional_interfaces`: generic definition `Repo<_>` is not bound"
/// );
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// Invalid lifetime resolution (e.g., scoped from root)
    #[error("Lifetime error: {0}")]
    WrongLifetime(&'static str),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A required argument was missing or malformed
    #[error("Invalid argument `{param}`: {reason}")]
    InvalidArgument {
        param: &'static str,
        reason: String,
    },
    /// An interceptor type cannot be constructed by the container
    #[error("Invalid interceptor type {type_name}: {reason}")]
    InvalidInterceptorType {
        type_name: &'static str,
        reason: &'static str,
    },
    /// No blueprint is known for the requested proxy type
    #[error("No proxy blueprint registered for: {0}")]
    ProxyTypeNotFound(&'static str),
    /// A constructor argument did not have the type the constructor expected
    #[error("Argument mismatch: expected {expected}, found {}", .found.unwrap_or("nothing"))]
    ArgumentMismatch {
        expected: &'static str,
        found: Option<&'static str>,
    },
    /// A constructor left explicit arguments unconsumed
    #[error("Unused constructor arguments: {}", .0.join(", "))]
    UnusedArguments(Vec<&'static str>),
    /// Building a class proxy failed because no constructor matched
    #[error("Can not instantiate proxy of class: {type_name}. {}", describe_arguments(.arguments))]
    ProxyConstruction {
        type_name: &'static str,
        arguments: Vec<&'static str>,
        #[source]
        source: Box<DiError>,
    },
    /// The call reached the end of the chain but the proxy has no target
    #[error("No target to proceed to for method: {method}")]
    MissingTarget { method: &'static str },
    /// The return slot held a different shape than the caller asked for
    #[error("Return value shape mismatch: expected {expected}, found {found}")]
    ReturnShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// An async interceptor suspended inside a synchronous member on a thread
    /// whose runtime cannot be blocked
    #[error("Async interceptor suspended in synchronous method `{method}` on a runtime thread that cannot block")]
    BlockedRuntime { method: &'static str },
}

impl DiError {
    /// Shorthand for [`DiError::InvalidArgument`].
    pub fn invalid_argument(param: &'static str, reason: impl Into<String>) -> Self {
        DiError::InvalidArgument {
            param,
            reason: reason.into(),
        }
    }

    /// True for failures caused by a constructor not matching its arguments.
    pub fn is_constructor_mismatch(&self) -> bool {
        matches!(self, DiError::ArgumentMismatch { .. } | DiError::UnusedArguments(_))
    }
}

fn describe_arguments(arguments: &[&'static str]) -> String {
    if arguments.is_empty() {
        "Could not find a parameterless constructor.".to_string()
    } else {
        format!(
            "Could not find a constructor that would match given arguments: {}",
            arguments.join(", ")
        )
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout the crate.
///
/// ```rust
/// use ferrous_intercept::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::NotFound("some_service"))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
