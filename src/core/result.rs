//! # Use Case Results
//!
//! Every use case invocation reports its progress as a [`UseCaseResult`]:
//!
//! ```text
//! Loading  ──►  Success(value)
//!          └─►  Error(cause)
//! ```
//!
//! Results are transient messages. They are produced by the executors in
//! this module tree and consumed by whoever observes the stream.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Error type business logic may return. Anything `Error + Send + Sync` converts into it with `?`.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// State of an in-flight or completed use case execution.
#[derive(Debug, Clone)]
pub enum UseCaseResult<R> {
    Loading,
    Success(R),
    Error(UseCaseError),
}

impl<R> UseCaseResult<R> {
    pub fn is_loading(&self) -> bool {
        matches!(self, UseCaseResult::Loading)
    }

    pub fn error(&self) -> Option<&UseCaseError> {
        match self {
            UseCaseResult::Error(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<R> {
        match self {
            UseCaseResult::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Converts a terminal result into a std `Result`. `Loading` yields `None`.
    pub fn into_result(self) -> Option<Result<R, UseCaseError>> {
        match self {
            UseCaseResult::Loading => None,
            UseCaseResult::Success(value) => Some(Ok(value)),
            UseCaseResult::Error(cause) => Some(Err(cause)),
        }
    }
}

impl<R: PartialEq> PartialEq for UseCaseResult<R> {
    /// Errors compare by identity of the wrapped cause.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (UseCaseResult::Loading, UseCaseResult::Loading) => true,
            (UseCaseResult::Success(a), UseCaseResult::Success(b)) => a == b,
            (UseCaseResult::Error(a), UseCaseResult::Error(b)) => a.same_cause(b),
            _ => false,
        }
    }
}

/// A business logic failure.
///
/// Wraps the original error without altering it, so it can be shown or
/// downcast by the observer. Cloning shares the same cause.
#[derive(Clone)]
pub struct UseCaseError {
    cause: Arc<dyn StdError + Send + Sync + 'static>,
}

impl UseCaseError {
    pub fn new(cause: BoxError) -> Self {
        Self {
            cause: Arc::from(cause),
        }
    }

    /// Builds an error from a panic payload caught while running business logic.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::new(Box::new(Panicked(message)))
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.cause.downcast_ref::<E>()
    }

    /// True if both errors wrap the very same cause instance.
    pub fn same_cause(&self, other: &UseCaseError) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}

impl fmt::Debug for UseCaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UseCaseError").field(&self.cause).finish()
    }
}

impl fmt::Display for UseCaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl StdError for UseCaseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Cause recorded when business logic panics instead of returning an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panicked(pub String);

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "use case panicked: {}", self.0)
    }
}

impl StdError for Panicked {}
