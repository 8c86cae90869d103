//! Error taxonomy shared by tasks and generators.
//!
//! Structural misuse ([`Error::EmptyComputation`], [`Error::ResultNotReady`],
//! [`Error::PastEndAccess`], [`Error::ForeignAwait`]) is reported the moment it
//! happens. Failures raised by a computation body are captured once and handed
//! back once, wrapped in [`Error::Failed`].

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything a task, generator or cursor operation can fail with.
///
/// Body failures arrive as [`Error::Failed`] and keep the original error for
/// [`Error::downcast_ref`]; the other variants are misuse of a handle.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation needs a frame, but the handle is default-constructed,
    /// moved-from or destroyed.
    #[error("task is empty or destroyed")]
    EmptyComputation,

    /// The result was requested before the task produced one, or after the
    /// failure that replaced it was already observed.
    #[error("task result accessed before it was set")]
    ResultNotReady,

    /// A cursor at the end of its generator was dereferenced or advanced.
    #[error("access past the end of the generator")]
    PastEndAccess,

    /// A synchronous generator body suspended without yielding a value.
    #[error("generator body awaited a computation instead of yielding")]
    ForeignAwait,

    /// The computation body failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl Error {
    /// Wraps a failure that escaped a computation body.
    ///
    /// A body that propagated an inner await with `?` hands back an error that
    /// already is one of ours; it is unwrapped so the failure surfaces verbatim
    /// no matter how many frames it crossed.
    pub(crate) fn capture(failure: anyhow::Error) -> Self {
        match failure.downcast::<Error>() {
            Ok(err) => err,
            Err(failure) => Error::Failed(failure),
        }
    }

    /// Returns `true` if the error came from a computation body.
    pub fn is_failure(&self) -> bool {
        matches!(self, Error::Failed(_))
    }

    /// Returns the body failure, if this is one.
    pub fn into_failure(self) -> Option<anyhow::Error> {
        match self {
            Error::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Downcasts the body failure to a concrete error type.
    ///
    /// ```rust
    /// use coro::Error;
    ///
    /// let err = Error::Failed(anyhow::Error::new(std::fmt::Error));
    /// assert!(err.downcast_ref::<std::fmt::Error>().is_some());
    /// assert!(Error::PastEndAccess.downcast_ref::<std::fmt::Error>().is_none());
    /// ```
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Error::Failed(failure) => failure.downcast_ref::<E>(),
            _ => None,
        }
    }
}
