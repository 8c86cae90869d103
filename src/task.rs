//! Lazy single-result computations.
//!
//! A [`Task`] wraps one frame that produces exactly one value or one failure.
//! Nothing runs until the task is first resumed or awaited.
//!
//! # Example
//!
//! ```rust
//! use coro::Task;
//!
//! fn value(v: i32) -> Task<'static, i32> {
//!     Task::new(async move { anyhow::Ok(v) })
//! }
//!
//! let mut sum = Task::new(async {
//!     let a = value(123).await?;
//!     let b = value(456).await?;
//!     anyhow::Ok(a + b)
//! });
//!
//! assert!(!sum.is_ready());
//! assert!(!sum.resume());
//! assert_eq!(*sum.result_value().unwrap(), 579);
//! ```
//!
//! # Result disciplines
//!
//! - `Task<'a, T>` owns its result. Read it through [`Task::result_value`] or
//!   [`Task::result_value_mut`], or move it out with [`Task::take_result`],
//!   [`Task::into_result`] or by awaiting the task by value.
//! - `Task<'a, &'a U>` stores only the address of a `U` living outside the
//!   frame. The borrow checker keeps `U` alive for as long as the task can hand
//!   the reference out, so a result can never dangle; code that wants to move
//!   out of borrowed storage states it with `Task<'a, &'a mut U>` and
//!   `std::mem::take`.

use std::{
    cell::Cell,
    convert::Infallible,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use futures::ready;
use tracing::{debug, trace};

use crate::{
    chain::{self, Drive},
    frame::{Frame, IntoOutcome, Resumable, Step},
    Error, Result,
};

/// A lazily started computation producing one `T`.
///
/// Move-only: ownership of the frame is exclusive. [`Default`] builds an empty
/// task, which reads as ready but without a result.
#[must_use = "tasks do nothing unless resumed or awaited"]
pub struct Task<'a, T> {
    frame: Option<Box<TaskFrame<'a, T>>>,
}

struct TaskFrame<'a, T> {
    frame: Frame<'a, Infallible, T>,
    value: Option<T>,
    failure: Cell<Option<Error>>,
}

impl<T> TaskFrame<'_, T> {
    fn settle(
        &mut self,
        stepped: Poll<Option<Step<Infallible, anyhow::Result<T>>>>,
    ) -> Poll<()> {
        match stepped {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(None) => {}
            Poll::Ready(Some(Step::Yielded(never))) => match never {},
            Poll::Ready(Some(Step::Complete(Ok(value)))) => self.value = Some(value),
            Poll::Ready(Some(Step::Complete(Err(failure)))) => {
                debug!(error = %failure, "task failed");
                self.failure.set(Some(Error::capture(failure)));
            }
        }
        Poll::Ready(())
    }

    /// Runs the frame, and every task it awaits, to the next suspend point.
    fn drive_root(&mut self) -> Poll<()> {
        let stepped = self.frame.step();
        self.settle(stepped)
    }

    /// Runs the frame on behalf of the party polling it.
    ///
    /// Polled straight from a body that is itself being driven, the frame is
    /// handed to that body's driver instead of being run here.
    fn poll_complete(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.frame.is_terminal() {
            return Poll::Ready(());
        }
        if let Some(root) = chain::hand_off(cx, self) {
            self.frame.set_poller(&root);
            return Poll::Pending;
        }
        self.frame.set_poller(cx.waker());
        self.drive_root()
    }

    fn failure(&self) -> Result<()> {
        match self.failure.take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn result(&self) -> Result<&T> {
        self.failure()?;
        self.value.as_ref().ok_or(Error::ResultNotReady)
    }

    fn result_mut(&mut self) -> Result<&mut T> {
        self.failure()?;
        self.value.as_mut().ok_or(Error::ResultNotReady)
    }

    fn take_result(&mut self) -> Result<T> {
        self.failure()?;
        self.value.take().ok_or(Error::ResultNotReady)
    }
}

impl<T> Drive for TaskFrame<'_, T> {
    fn waker(&self) -> Waker {
        self.frame.waker()
    }

    fn drive(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let stepped = self.frame.poll_body(cx);
        self.settle(stepped)
    }
}

impl<T> Drop for TaskFrame<'_, T> {
    fn drop(&mut self) {
        chain::withdraw(self as *const Self as *const ());
    }
}

impl<'a, T> Task<'a, T> {
    /// Wraps `future` in a task without running any of it.
    ///
    /// The future finishes with a `Result` whose error converts into
    /// [`anyhow::Error`]; that error becomes the task's failure.
    pub fn new<Fut>(future: Fut) -> Self
    where
        Fut: Future + 'a,
        Fut::Output: IntoOutcome<T>,
        T: 'a,
    {
        Self {
            frame: Some(Box::new(TaskFrame {
                frame: Frame::from_future(future),
                value: None,
                failure: Cell::new(None),
            })),
        }
    }

    /// `true` if the task is empty or has finished.
    pub fn is_ready(&self) -> bool {
        self.frame
            .as_ref()
            .map_or(true, |frame| frame.frame.is_terminal())
    }

    /// Runs the task until its next suspend point.
    ///
    /// Returns `true` while the task is still not ready. Resuming a ready or
    /// empty task does nothing and returns `false`. When this call finishes the
    /// task, control passes to whoever is waiting on it.
    pub fn resume(&mut self) -> bool {
        let Some(frame) = self.frame.as_mut() else {
            return false;
        };
        if frame.frame.is_terminal() {
            return false;
        }

        if frame.drive_root().is_ready() {
            frame.frame.transfer();
            false
        } else {
            true
        }
    }

    /// Returns a reference to the result.
    ///
    /// Fails with [`Error::EmptyComputation`] for an empty task and with
    /// [`Error::ResultNotReady`] before completion. If the body failed, the first
    /// call returns that failure; later calls report [`Error::ResultNotReady`].
    pub fn result_value(&self) -> Result<&T> {
        self.frame()?.result()
    }

    /// Mutable counterpart of [`Task::result_value`].
    pub fn result_value_mut(&mut self) -> Result<&mut T> {
        self.frame_mut()?.result_mut()
    }

    /// Moves the result out, leaving the task finished but resultless.
    pub fn take_result(&mut self) -> Result<T> {
        self.frame_mut()?.take_result()
    }

    /// Consumes the task and returns its result.
    pub fn into_result(mut self) -> Result<T> {
        self.take_result()
    }

    /// Releases the frame early. Returns whether there was one.
    ///
    /// An unfinished body is abandoned without running any further.
    pub fn destroy(&mut self) -> bool {
        match self.frame.take() {
            Some(_) => {
                trace!("task destroyed");
                true
            }
            None => false,
        }
    }

    /// Awaits the task without giving up ownership.
    ///
    /// Resolves to a reference to the result; may be awaited again after the
    /// task finished.
    ///
    /// ```rust
    /// use coro::{eager::run_now, Task};
    ///
    /// let total = run_now(async {
    ///     let mut one = Task::new(async { anyhow::Ok(1) });
    ///     let mut total = 0;
    ///     for _ in 0..3 {
    ///         total += *one.wait().await?;
    ///     }
    ///     anyhow::Ok(total)
    /// });
    /// assert_eq!(total.unwrap(), 3);
    /// ```
    pub fn wait(&mut self) -> Wait<'_, 'a, T> {
        Wait { task: Some(self) }
    }

    fn frame(&self) -> Result<&TaskFrame<'a, T>> {
        self.frame.as_deref().ok_or(Error::EmptyComputation)
    }

    fn frame_mut(&mut self) -> Result<&mut TaskFrame<'a, T>> {
        self.frame.as_deref_mut().ok_or(Error::EmptyComputation)
    }
}

impl<T> Default for Task<'_, T> {
    fn default() -> Self {
        Self { frame: None }
    }
}

impl<T> fmt::Debug for Task<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("lifecycle", &self.frame.as_ref().map(|f| f.frame.lifecycle()))
            .finish()
    }
}

impl<T> Future for Task<'_, T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(frame) = self.get_mut().frame.as_deref_mut() else {
            return Poll::Ready(Err(Error::EmptyComputation));
        };
        ready!(frame.poll_complete(cx));
        Poll::Ready(frame.take_result())
    }
}

impl<T> Resumable for Task<'_, T> {
    fn is_ready(&self) -> bool {
        Task::is_ready(self)
    }

    fn resume(&mut self) -> Result<bool> {
        Ok(Task::resume(self))
    }

    fn set_continuation(&self, continuation: &Waker) {
        if let Some(frame) = &self.frame {
            frame.frame.set_continuation(continuation);
        }
    }
}

/// Future returned by [`Task::wait`].
#[must_use = "futures do nothing unless awaited"]
pub struct Wait<'t, 'a, T> {
    task: Option<&'t mut Task<'a, T>>,
}

impl<'t, 'a, T> Future for Wait<'t, 'a, T> {
    type Output = Result<&'t T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(task) = self.task.take() else {
            return Poll::Ready(Err(Error::EmptyComputation));
        };
        if let Some(frame) = task.frame.as_deref_mut() {
            if frame.poll_complete(cx).is_pending() {
                self.task = Some(task);
                return Poll::Pending;
            }
        }
        let task: &'t Task<'a, T> = task;
        Poll::Ready(task.result_value())
    }
}
