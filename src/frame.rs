//! The suspended computation frame shared by every primitive.
//!
//! A [`Frame`] owns a pinned, boxed body (the compiler-generated state machine of
//! an `async` block), a single-value slot the body yields into, and a [`Link`]
//! naming two parties: the poller, woken whenever the body wants another poll,
//! and the continuation, resumed only when the frame yields or finishes. The
//! body is always polled with a waker built from the link, so intermediate
//! wake-ups never reach the continuation.
//!
//! Tasks, generators and asynchronous generators wrap a frame each and differ only
//! in how they react to the three outcomes of [`Frame::step`]: a yielded value, a
//! bare suspension, or completion.

use std::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    rc::Rc,
    sync::Arc,
    task::{Context, Poll, Waker},
};

use futures::task::{self, ArcWake, AtomicWaker};
use tracing::trace;

use crate::{chain, Result};

pub(crate) type Body<'a, R> = Pin<Box<dyn Future<Output = anyhow::Result<R>> + 'a>>;

/// Outcome of running a frame up to its next suspend point that is not a bare
/// suspension.
#[derive(Debug)]
pub(crate) enum Step<Y, D> {
    /// The frame produced a value and is suspended at a yield point.
    Yielded(Y),
    /// The frame finished; it will never be resumed again.
    Complete(D),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    NotStarted,
    Suspended,
    Finished,
}

#[derive(Default)]
struct Link {
    poller: AtomicWaker,
    continuation: AtomicWaker,
}

impl ArcWake for Link {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.poller.wake();
    }
}

pub(crate) struct Frame<'a, Y, R> {
    body: Option<Body<'a, R>>,
    slot: Rc<RefCell<Option<Y>>>,
    link: Arc<Link>,
    lifecycle: Lifecycle,
}

impl<'a, Y, R> Frame<'a, Y, R> {
    /// Builds a frame whose body receives a [`Co`] handle to yield through.
    pub(crate) fn with_co<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Co<Y>) -> Fut,
        Fut: Future + 'a,
        Fut::Output: IntoOutcome<R>,
        R: 'a,
    {
        let slot = Rc::new(RefCell::new(None));
        let future = body(Co {
            slot: Rc::clone(&slot),
        });
        Self::assemble(future, slot)
    }

    /// Builds a frame whose body never yields.
    pub(crate) fn from_future<Fut>(future: Fut) -> Self
    where
        Fut: Future + 'a,
        Fut::Output: IntoOutcome<R>,
        R: 'a,
    {
        Self::assemble(future, Rc::new(RefCell::new(None)))
    }

    fn assemble<Fut>(future: Fut, slot: Rc<RefCell<Option<Y>>>) -> Self
    where
        Fut: Future + 'a,
        Fut::Output: IntoOutcome<R>,
        R: 'a,
    {
        Self {
            body: Some(Box::pin(async move { future.await.into_outcome() })),
            slot,
            link: Arc::default(),
            lifecycle: Lifecycle::NotStarted,
        }
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.lifecycle == Lifecycle::Finished
    }

    /// The waker the body is polled with. Waking it wakes the poller.
    pub(crate) fn waker(&self) -> Waker {
        task::waker(Arc::clone(&self.link))
    }

    /// Polls the body once with `cx`.
    ///
    /// `Ready(None)` if the frame had already finished, `Pending` if the body
    /// suspended without yielding, and otherwise the yielded value or the final
    /// outcome.
    pub(crate) fn poll_body(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Step<Y, anyhow::Result<R>>>> {
        let Some(body) = self.body.as_mut() else {
            return Poll::Ready(None);
        };
        if self.lifecycle == Lifecycle::NotStarted {
            trace!("frame started");
        }
        self.lifecycle = Lifecycle::Suspended;

        match body.as_mut().poll(cx) {
            Poll::Ready(outcome) => {
                trace!(failed = outcome.is_err(), "frame finished");
                self.release();
                Poll::Ready(Some(Step::Complete(outcome)))
            }
            Poll::Pending => match self.slot.borrow_mut().take() {
                Some(value) => {
                    trace!("frame yielded");
                    Poll::Ready(Some(Step::Yielded(value)))
                }
                None => Poll::Pending,
            },
        }
    }

    /// Runs the body until its next suspend point, driving every task it awaits
    /// on the way without growing the stack.
    pub(crate) fn step(&mut self) -> Poll<Option<Step<Y, anyhow::Result<R>>>> {
        let waker = self.waker();
        chain::run(&waker, |cx| self.poll_body(cx))
    }

    /// Drops the body without running it any further.
    pub(crate) fn abandon(&mut self) {
        if !self.is_terminal() {
            trace!(lifecycle = ?self.lifecycle, "frame abandoned");
        }
        self.release();
    }

    fn release(&mut self) {
        self.body = None;
        self.slot.borrow_mut().take();
        self.lifecycle = Lifecycle::Finished;
    }

    /// Records the party to wake when the body asks to be polled again.
    pub(crate) fn set_poller(&self, poller: &Waker) {
        self.link.poller.register(poller);
    }

    /// Records the party to resume when this frame yields or finishes.
    /// A second registration replaces the first.
    pub(crate) fn set_continuation(&self, continuation: &Waker) {
        self.link.continuation.register(continuation);
    }

    /// Hands control to the continuation, if one was recorded.
    pub(crate) fn transfer(&self) {
        self.link.continuation.wake();
    }
}

impl<Y, R> Drop for Frame<'_, Y, R> {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Suspended {
            trace!("suspended frame destroyed");
        }
    }
}

/// Handle a generator body yields its values through.
pub struct Co<Y> {
    slot: Rc<RefCell<Option<Y>>>,
}

impl<Y> Co<Y> {
    /// Hands `value` to the consumer and suspends until the next advance.
    ///
    /// The value is moved into the frame, never copied; the previous value is
    /// gone by the time this one is stored.
    pub fn yield_(&self, value: Y) -> Yield<'_, Y> {
        Yield {
            slot: &self.slot,
            value: Some(value),
        }
    }
}

/// Future returned by [`Co::yield_`].
#[must_use = "values are only yielded when awaited"]
pub struct Yield<'c, Y> {
    slot: &'c RefCell<Option<Y>>,
    value: Option<Y>,
}

// The value is moved, never pinned.
impl<Y> Unpin for Yield<'_, Y> {}

impl<Y> Future for Yield<'_, Y> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        match self.value.take() {
            Some(value) => {
                *self.slot.borrow_mut() = Some(value);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

/// What a computation body may finish with.
///
/// Bodies return either `()` or a `Result` whose error converts into
/// [`anyhow::Error`].
pub trait IntoOutcome<R> {
    fn into_outcome(self) -> anyhow::Result<R>;
}

impl IntoOutcome<()> for () {
    fn into_outcome(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<R, E> IntoOutcome<R> for std::result::Result<R, E>
where
    E: Into<anyhow::Error>,
{
    fn into_outcome(self) -> anyhow::Result<R> {
        self.map_err(Into::into)
    }
}

/// The continuation-link capability shared by [`Task`](crate::Task),
/// [`Generator`](crate::Generator) and [`AsyncGenerator`](crate::AsyncGenerator).
pub trait Resumable {
    /// `true` once the frame is absent or terminal.
    fn is_ready(&self) -> bool;

    /// Runs the frame to its next suspend point and reports whether it is still
    /// not ready. Generators report body failures here, once; tasks keep them
    /// for result access.
    fn resume(&mut self) -> Result<bool>;

    /// Records the party to wake when the frame yields or finishes.
    fn set_continuation(&self, continuation: &Waker);
}

/// Resumes `frame` until it is ready, returning how many resumptions it took.
///
/// Never returns if the frame waits on something that only another party can
/// complete.
///
/// ```rust
/// use coro::{drain, suspend, Task};
///
/// let mut task = Task::new(async {
///     suspend().await;
///     anyhow::Ok(7)
/// });
/// assert_eq!(drain(&mut task).unwrap(), 2);
/// assert_eq!(*task.result_value().unwrap(), 7);
/// ```
pub fn drain<R>(frame: &mut R) -> Result<usize>
where
    R: Resumable + ?Sized,
{
    let mut resumptions = 0;
    while !frame.is_ready() {
        frame.resume()?;
        resumptions += 1;
    }
    Ok(resumptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl CountingWaker {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_frame_does_not_start_until_stepped() {
        let started = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&started);
        let mut frame: Frame<'_, i32, ()> = Frame::with_co(move |co| async move {
            *flag.borrow_mut() = true;
            co.yield_(1).await;
        });

        assert_eq!(frame.lifecycle(), Lifecycle::NotStarted);
        assert!(!*started.borrow());

        assert!(matches!(frame.step(), Poll::Ready(Some(Step::Yielded(1)))));
        assert!(*started.borrow());
        assert_eq!(frame.lifecycle(), Lifecycle::Suspended);
    }

    #[test]
    fn test_frame_yields_then_completes() {
        let mut frame: Frame<'_, i32, i32> = Frame::with_co(|co| async move {
            co.yield_(1).await;
            co.yield_(2).await;
            anyhow::Ok(3)
        });

        assert!(matches!(frame.step(), Poll::Ready(Some(Step::Yielded(1)))));
        assert!(matches!(frame.step(), Poll::Ready(Some(Step::Yielded(2)))));
        match frame.step() {
            Poll::Ready(Some(Step::Complete(Ok(3)))) => {}
            _ => panic!("expected completion with 3"),
        }
        assert!(frame.is_terminal());
        assert!(matches!(frame.step(), Poll::Ready(None)));
    }

    #[test]
    fn test_frame_reports_bare_suspension() {
        let mut frame: Frame<'_, i32, ()> =
            Frame::from_future(async { crate::suspend().await });

        assert!(frame.step().is_pending());
        assert!(!frame.is_terminal());
        assert!(matches!(frame.step(), Poll::Ready(Some(Step::Complete(Ok(()))))));
    }

    #[test]
    fn test_abandon_drops_captured_locals() {
        let witness = Rc::new(());
        let captured = Rc::clone(&witness);
        let mut frame: Frame<'_, i32, ()> = Frame::with_co(move |co| async move {
            let _held = captured;
            co.yield_(1).await;
        });

        assert!(frame.step().is_ready());
        assert_eq!(Rc::strong_count(&witness), 2);
        frame.abandon();
        assert_eq!(Rc::strong_count(&witness), 1);
        assert!(frame.is_terminal());
    }

    #[test]
    fn test_transfer_wakes_continuation_once() {
        let frame: Frame<'_, (), ()> = Frame::from_future(async {});
        let counter = Arc::new(CountingWaker::default());
        let waker = futures::task::waker(Arc::clone(&counter));

        frame.transfer();
        assert_eq!(counter.count(), 0);

        frame.set_continuation(&waker);
        frame.transfer();
        frame.transfer();
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_second_continuation_replaces_first() {
        let frame: Frame<'_, (), ()> = Frame::from_future(async {});
        let first = Arc::new(CountingWaker::default());
        let second = Arc::new(CountingWaker::default());

        frame.set_continuation(&futures::task::waker(Arc::clone(&first)));
        frame.set_continuation(&futures::task::waker(Arc::clone(&second)));
        frame.transfer();

        assert_eq!(first.count(), 0);
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn test_suspending_body_wakes_its_poller_only() {
        let mut frame: Frame<'_, (), ()> =
            Frame::from_future(async { crate::suspend().await });
        let poller = Arc::new(CountingWaker::default());
        let continuation = Arc::new(CountingWaker::default());

        frame.set_poller(&futures::task::waker(Arc::clone(&poller)));
        frame.set_continuation(&futures::task::waker(Arc::clone(&continuation)));
        assert!(frame.step().is_pending());
        assert_eq!(poller.count(), 1);
        assert_eq!(continuation.count(), 0);

        frame.transfer();
        assert_eq!(continuation.count(), 1);
    }

    #[test]
    fn test_awaited_tasks_do_not_grow_the_stack() {
        fn nest(depth: usize) -> crate::Task<'static, usize> {
            crate::Task::new(async move {
                if depth == 0 {
                    anyhow::Ok(0)
                } else {
                    Ok(nest(depth - 1).await? + 1)
                }
            })
        }

        let mut frame: Frame<'_, (), usize> = Frame::from_future(nest(100_000));
        match frame.step() {
            Poll::Ready(Some(Step::Complete(Ok(depth)))) => assert_eq!(depth, 100_000),
            _ => panic!("expected the chain to complete"),
        }
    }
}
