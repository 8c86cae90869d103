//! Drivers that run a computation to completion on the calling thread.
//!
//! These are the entry points from ordinary code into the coroutine world: the
//! awaitable is started at once and the thread blocks until it finishes,
//! including any suspension on events completed by other threads.

use std::future::IntoFuture;

use futures::executor::block_on;
use tracing::{error, trace};

/// Runs `awaitable` to completion and returns its output.
///
/// ```rust
/// use coro::{eager::run_now, Task};
///
/// let task = Task::new(async { anyhow::Ok(2 + 2) });
/// assert_eq!(run_now(task).unwrap(), 4);
/// ```
pub fn run_now<F>(awaitable: F) -> F::Output
where
    F: IntoFuture,
{
    trace!("running awaitable eagerly");
    block_on(awaitable.into_future())
}

/// Runs `awaitable` for its effects, treating any failure as fatal.
///
/// A failure cannot reach anyone from here, so it is logged and the process
/// aborts.
///
/// ```rust
/// use coro::{eager::run_awaitable, Task};
///
/// run_awaitable(Task::new(async {
///     println!("hello");
///     anyhow::Ok(())
/// }));
/// ```
pub fn run_awaitable<F, T, E>(awaitable: F)
where
    F: IntoFuture<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    if let Err(failure) = run_now(awaitable) {
        let failure = failure.into();
        error!(error = ?failure, "eager computation failed");
        std::process::abort();
    }
}
