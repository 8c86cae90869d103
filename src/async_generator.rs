//! Lazy asynchronous sequences.
//!
//! An [`AsyncGenerator`] body may both yield values and await other
//! computations between yields. Advancing is itself awaitable: the consumer
//! polls the producer frame and gets control back as soon as a value is
//! yielded or the body finishes. Producers driven by hand through
//! [`Resumable`] resume their registered continuation at the same points.
//!
//! ```rust
//! use coro::{eager::run_now, AsyncGenerator, Task};
//!
//! fn next_value(n: i32) -> Task<'static, i32> {
//!     Task::new(async move { anyhow::Ok(n + 1) })
//! }
//!
//! let first_n = AsyncGenerator::new(|co| async move {
//!     let mut v = 0;
//!     for _ in 0..5 {
//!         co.yield_(v).await;
//!         v = next_value(v).await?;
//!     }
//!     anyhow::Ok(())
//! });
//!
//! let actual = run_now(async {
//!     let mut actual = Vec::new();
//!     let mut it = first_n.begin().await?;
//!     while it != first_n.end() {
//!         actual.push(*it.get()?);
//!         it = it.advance()?.await?;
//!     }
//!     Ok::<_, coro::Error>(actual)
//! });
//! assert_eq!(actual.unwrap(), [0, 1, 2, 3, 4]);
//! ```

use std::{
    cell::{Ref, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    ptr,
    task::{Context, Poll, Waker},
};

use futures::{ready, stream::FusedStream, Stream};
use tracing::{debug, trace};

use crate::{
    frame::{Co, Frame, IntoOutcome, Resumable, Step},
    Error, Result,
};

/// A lazily started sequence of `T` values whose producer may await.
#[must_use = "generators do nothing unless advanced"]
pub struct AsyncGenerator<'a, T> {
    frame: Option<Box<RefCell<AsyncGenFrame<'a, T>>>>,
}

struct AsyncGenFrame<'a, T> {
    frame: Frame<'a, T, ()>,
    current: Option<T>,
}

impl<T> AsyncGenFrame<'_, T> {
    fn is_end(&self) -> bool {
        self.frame.is_terminal()
    }

    /// Runs the producer to its next yield, completion or suspension.
    fn step(&mut self) -> Poll<Result<()>> {
        self.current = None;
        match self.frame.step() {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => Poll::Ready(Ok(())),
            Poll::Ready(Some(Step::Yielded(value))) => {
                self.current = Some(value);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Some(Step::Complete(outcome))) => {
                Poll::Ready(outcome.map_err(|failure| {
                    debug!(error = %failure, "async generator failed");
                    Error::capture(failure)
                }))
            }
        }
    }

    /// Advances on behalf of a consumer that awaits the result.
    fn poll_advance(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        if self.is_end() {
            self.current = None;
            return Poll::Ready(Ok(()));
        }
        self.frame.set_poller(cx.waker());
        self.step()
    }

    /// Advances on behalf of whoever registered as continuation.
    fn resume(&mut self) -> Result<()> {
        match self.step() {
            Poll::Pending => Ok(()),
            Poll::Ready(outcome) => {
                self.frame.transfer();
                outcome
            }
        }
    }
}

impl<'a, T> AsyncGenerator<'a, T> {
    /// Creates an asynchronous generator from `body`, which receives the yield
    /// handle. Nothing runs until the first advance.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Co<T>) -> Fut,
        Fut: Future + 'a,
        Fut::Output: IntoOutcome<()>,
    {
        Self {
            frame: Some(Box::new(RefCell::new(AsyncGenFrame {
                frame: Frame::with_co(body),
                current: None,
            }))),
        }
    }

    /// Starts the producer, or moves it on if it already started.
    ///
    /// Resolves to a cursor at the produced value, or to the end cursor. An
    /// empty or finished generator resolves immediately without suspending.
    pub fn begin(&self) -> Advance<'_, 'a, T> {
        Advance {
            frame: self.frame.as_deref(),
        }
    }

    /// The cursor every exhausted cursor compares equal to.
    pub fn end(&self) -> AsyncCursor<'_, 'a, T> {
        AsyncCursor { frame: None }
    }

    /// `true` if the generator is empty or has finished.
    pub fn is_ready(&self) -> bool {
        self.frame
            .as_deref()
            .map_or(true, |cell| cell.borrow().is_end())
    }

    /// Releases the frame early. Returns whether there was one.
    pub fn destroy(&mut self) -> bool {
        match self.frame.take() {
            Some(_) => {
                trace!("async generator destroyed");
                true
            }
            None => false,
        }
    }
}

impl<T> Default for AsyncGenerator<'_, T> {
    fn default() -> Self {
        Self { frame: None }
    }
}

impl<T> fmt::Debug for AsyncGenerator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncGenerator")
            .field(
                "lifecycle",
                &self.frame.as_deref().map(|cell| cell.borrow().frame.lifecycle()),
            )
            .finish()
    }
}

impl<T> Resumable for AsyncGenerator<'_, T> {
    fn is_ready(&self) -> bool {
        AsyncGenerator::is_ready(self)
    }

    fn resume(&mut self) -> Result<bool> {
        let Some(frame) = self.frame.as_deref_mut().map(RefCell::get_mut) else {
            return Ok(false);
        };
        frame.resume()?;
        Ok(!frame.is_end())
    }

    fn set_continuation(&self, continuation: &Waker) {
        if let Some(cell) = self.frame.as_deref() {
            cell.borrow().frame.set_continuation(continuation);
        }
    }
}

impl<T> Stream for AsyncGenerator<'_, T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(frame) = self.get_mut().frame.as_deref_mut().map(RefCell::get_mut) else {
            return Poll::Ready(None);
        };
        if frame.is_end() {
            return Poll::Ready(None);
        }
        match ready!(frame.poll_advance(cx)) {
            Ok(()) => Poll::Ready(frame.current.take().map(Ok)),
            Err(err) => Poll::Ready(Some(Err(err))),
        }
    }
}

impl<T> FusedStream for AsyncGenerator<'_, T> {
    fn is_terminated(&self) -> bool {
        self.is_ready()
    }
}

/// Future that moves an [`AsyncGenerator`] to its next value.
#[must_use = "futures do nothing unless awaited"]
pub struct Advance<'g, 'a, T> {
    frame: Option<&'g RefCell<AsyncGenFrame<'a, T>>>,
}

impl<'g, 'a, T> Future for Advance<'g, 'a, T> {
    type Output = Result<AsyncCursor<'g, 'a, T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(cell) = self.frame else {
            return Poll::Ready(Ok(AsyncCursor { frame: None }));
        };
        ready!(cell.borrow_mut().poll_advance(cx))?;
        Poll::Ready(Ok(AsyncCursor { frame: Some(cell) }))
    }
}

/// Position in an [`AsyncGenerator`]: the live value, or the end.
pub struct AsyncCursor<'g, 'a, T> {
    frame: Option<&'g RefCell<AsyncGenFrame<'a, T>>>,
}

impl<'g, 'a, T> AsyncCursor<'g, 'a, T> {
    /// `true` once the generator finished or the cursor was built by `end`.
    pub fn is_end(&self) -> bool {
        self.frame.map_or(true, |cell| cell.borrow().is_end())
    }

    /// Borrows the current value.
    pub fn get(&self) -> Result<Ref<'g, T>> {
        let cell = self.frame.ok_or(Error::PastEndAccess)?;
        Ref::filter_map(cell.borrow(), |frame| frame.current.as_ref())
            .map_err(|_| Error::PastEndAccess)
    }

    /// Returns the future that moves the generator on.
    ///
    /// Fails right away with [`Error::PastEndAccess`] at the end.
    pub fn advance(&self) -> Result<Advance<'g, 'a, T>> {
        if self.is_end() {
            return Err(Error::PastEndAccess);
        }
        Ok(Advance { frame: self.frame })
    }
}

impl<T> Clone for AsyncCursor<'_, '_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AsyncCursor<'_, '_, T> {}

impl<T> PartialEq for AsyncCursor<'_, '_, T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_end(), other.is_end()) {
            (true, true) => true,
            (false, false) => match (self.frame, other.frame) {
                (Some(a), Some(b)) => ptr::eq(a, b),
                _ => false,
            },
            _ => false,
        }
    }
}

impl<T> Eq for AsyncCursor<'_, '_, T> {}

impl<T> fmt::Debug for AsyncCursor<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame {
            Some(cell) if !self.is_end() => {
                f.debug_tuple("AsyncCursor").field(&(cell as *const _)).finish()
            }
            _ => f.write_str("AsyncCursor(end)"),
        }
    }
}
