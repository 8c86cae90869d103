//! Lazy synchronous sequences.
//!
//! A [`Generator`] body yields values through its [`Co`] handle. Each
//! advance runs the body until the next yield; the consumer holds at most one
//! live value at a time, borrowed from the frame through a [`Cursor`].
//!
//! ```rust
//! use coro::Generator;
//!
//! fn fibonacci(n: usize) -> Generator<'static, u64> {
//!     Generator::new(move |co| async move {
//!         let (mut a, mut b) = (0, 1);
//!         for _ in 0..n {
//!             co.yield_(a).await;
//!             (a, b) = (b, a + b);
//!         }
//!     })
//! }
//!
//! let values: Vec<u64> = fibonacci(10)
//!     .into_iter()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(values, [0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
//! ```
//!
//! A synchronous body may await computations that finish without suspending,
//! but suspending on anything other than a yield abandons the frame with
//! [`Error::ForeignAwait`].

use std::{
    cell::{Ref, RefCell},
    fmt,
    future::Future,
    ptr,
    task::{Poll, Waker},
};

use tracing::{debug, trace};

use crate::{
    frame::{Co, Frame, IntoOutcome, Resumable, Step},
    Error, Result,
};

/// A lazily started sequence of `T` values.
#[must_use = "generators do nothing unless advanced"]
pub struct Generator<'a, T> {
    frame: Option<Box<RefCell<GenFrame<'a, T>>>>,
}

struct GenFrame<'a, T> {
    frame: Frame<'a, T, ()>,
    current: Option<T>,
}

impl<T> GenFrame<'_, T> {
    /// Drops the current value and runs the body to its next yield.
    fn advance(&mut self) -> Result<()> {
        self.current = None;
        match self.frame.step() {
            Poll::Ready(None) => return Ok(()),
            Poll::Ready(Some(Step::Yielded(value))) => self.current = Some(value),
            Poll::Ready(Some(Step::Complete(outcome))) => {
                self.frame.transfer();
                return outcome.map_err(|failure| {
                    debug!(error = %failure, "generator failed");
                    Error::capture(failure)
                });
            }
            Poll::Pending => {
                debug!("generator body suspended without yielding");
                self.frame.abandon();
                return Err(Error::ForeignAwait);
            }
        }
        self.frame.transfer();
        Ok(())
    }

    fn is_end(&self) -> bool {
        self.frame.is_terminal()
    }
}

impl<'a, T> Generator<'a, T> {
    /// Creates a generator from `body`, which receives the yield handle.
    ///
    /// The body does not start until [`begin`](Generator::begin) or the first
    /// iteration.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Co<T>) -> Fut,
        Fut: Future + 'a,
        Fut::Output: IntoOutcome<()>,
    {
        Self {
            frame: Some(Box::new(RefCell::new(GenFrame {
                frame: Frame::with_co(body),
                current: None,
            }))),
        }
    }

    /// Starts the body, or moves it on if it already started, and returns a
    /// cursor at the produced value.
    ///
    /// A failure raised before the first yield is returned here. An empty or
    /// finished generator yields the end cursor.
    pub fn begin(&self) -> Result<Cursor<'_, 'a, T>> {
        let Some(cell) = self.frame.as_deref() else {
            return Ok(Cursor { frame: None });
        };
        cell.borrow_mut().advance()?;
        Ok(Cursor { frame: Some(cell) })
    }

    /// The cursor every exhausted cursor compares equal to.
    pub fn end(&self) -> Cursor<'_, 'a, T> {
        Cursor { frame: None }
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
                trace!("generator destroyed");
                true
            }
            None => false,
        }
    }
}

impl<T> Default for Generator<'_, T> {
    fn default() -> Self {
        Self { frame: None }
    }
}

impl<T> fmt::Debug for Generator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field(
                "lifecycle",
                &self.frame.as_deref().map(|cell| cell.borrow().frame.lifecycle()),
            )
            .finish()
    }
}

impl<T> Resumable for Generator<'_, T> {
    fn is_ready(&self) -> bool {
        Generator::is_ready(self)
    }

    fn resume(&mut self) -> Result<bool> {
        let Some(frame) = self.frame.as_deref_mut().map(RefCell::get_mut) else {
            return Ok(false);
        };
        frame.advance()?;
        Ok(!frame.is_end())
    }

    fn set_continuation(&self, continuation: &Waker) {
        if let Some(cell) = self.frame.as_deref() {
            cell.borrow().frame.set_continuation(continuation);
        }
    }
}

/// Position in a [`Generator`]: the live value, or the end.
///
/// # Panics
///
/// Advancing while a value obtained from [`Cursor::get`] is still held panics,
/// the same way a [`RefCell`] does.
pub struct Cursor<'g, 'a, T> {
    frame: Option<&'g RefCell<GenFrame<'a, T>>>,
}

impl<'g, T> Cursor<'g, '_, T> {
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

    /// Moves the generator to its next value.
    ///
    /// Returns a failure raised by the body, once. Advancing the end cursor is
    /// [`Error::PastEndAccess`].
    pub fn advance(&mut self) -> Result<()> {
        match self.frame {
            Some(cell) if !self.is_end() => cell.borrow_mut().advance(),
            _ => Err(Error::PastEndAccess),
        }
    }
}

impl<T> Clone for Cursor<'_, '_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, '_, T> {}

impl<T> PartialEq for Cursor<'_, '_, T> {
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

impl<T> Eq for Cursor<'_, '_, T> {}

impl<T> fmt::Debug for Cursor<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame {
            Some(cell) if !self.is_end() => {
                f.debug_tuple("Cursor").field(&(cell as *const _)).finish()
            }
            _ => f.write_str("Cursor(end)"),
        }
    }
}

/// Owning iterator over a [`Generator`], moving each value out.
///
/// A body failure is produced as one `Err` item, after which the iterator is
/// exhausted.
pub struct Iter<'a, T> {
    generator: Generator<'a, T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.generator.frame.as_deref_mut()?.get_mut();
        if frame.is_end() {
            return None;
        }
        match frame.advance() {
            Ok(()) => frame.current.take().map(Ok),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a, T> IntoIterator for Generator<'a, T> {
    type Item = Result<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        Iter { generator: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{drain, suspend, Task};
    use futures::task::ArcWake;
    use std::{
        rc::Rc,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    fn fibonacci(n: usize) -> Generator<'static, u64> {
        Generator::new(move |co| async move {
            let (mut a, mut b) = (0, 1);
            for _ in 0..n {
                co.yield_(a).await;
                (a, b) = (b, a + b);
            }
        })
    }

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn iota(n: i32) -> Generator<'static, i32> {
        Generator::new(move |co| async move {
            for i in 0..n {
                co.yield_(i).await;
            }
        })
    }

    #[test]
    fn test_fibonacci() {
        let gen = fibonacci(10);
        let mut actual = Vec::new();
        let mut it = gen.begin().unwrap();
        while it != gen.end() {
            actual.push(*it.get().unwrap());
            it.advance().unwrap();
        }
        assert_eq!(actual, [0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    }

    #[test]
    fn test_sum() {
        let sum: i32 = iota(11).into_iter().map(Result::unwrap).sum();
        assert_eq!(sum, 55);
    }

    #[test]
    fn test_advance_with_begin() {
        let gen = iota(5);
        let mut actual = Vec::new();
        loop {
            let it = gen.begin().unwrap();
            if it == gen.end() {
                break;
            }
            actual.push(*it.get().unwrap());
        }
        assert_eq!(actual, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_all_things_end() {
        let gen: Generator<'_, i32> = Generator::new(|_co| async {});
        assert!(!gen.is_ready());
        assert_eq!(gen.begin().unwrap(), gen.end());
        assert!(gen.is_ready());
        assert_eq!(gen.begin().unwrap(), gen.end());
    }

    #[test]
    fn test_does_not_start_until_begin() {
        let started = Rc::new(std::cell::Cell::new(false));
        let flag = Rc::clone(&started);
        let gen = Generator::new(move |co| async move {
            flag.set(true);
            co.yield_(1).await;
        });

        assert!(!started.get());
        let it = gen.begin().unwrap();
        assert!(started.get());
        assert_eq!(*it.get().unwrap(), 1);
    }

    #[test]
    fn test_failure_before_yield() {
        let gen: Generator<'_, i32> = Generator::new(|_co| async { Err::<(), _>(TestError) });
        let err = gen.begin().unwrap_err();
        assert!(err.downcast_ref::<TestError>().is_some());
        assert!(gen.is_ready());
        assert_eq!(gen.begin().unwrap(), gen.end());
    }

    #[test]
    fn test_failure_after_yield() {
        let gen = Generator::new(|co| async move {
            co.yield_(1).await;
            Err::<(), _>(TestError)
        });
        let mut it = gen.begin().unwrap();
        assert_eq!(*it.get().unwrap(), 1);

        let err = it.advance().unwrap_err();
        assert!(err.downcast_ref::<TestError>().is_some());
        assert_eq!(it, gen.end());
        assert!(matches!(it.advance(), Err(Error::PastEndAccess)));
    }

    #[test]
    fn test_iterate_past_end() {
        let gen = iota(1);
        let mut it = gen.begin().unwrap();
        assert_eq!(*it.get().unwrap(), 0);
        it.advance().unwrap();
        assert_eq!(it, gen.end());

        assert!(matches!(it.get(), Err(Error::PastEndAccess)));
        assert!(matches!(it.advance(), Err(Error::PastEndAccess)));

        let mut end = gen.end();
        assert!(matches!(end.get(), Err(Error::PastEndAccess)));
        assert!(matches!(end.advance(), Err(Error::PastEndAccess)));
    }

    #[test]
    fn test_compare_cursors() {
        let gen = iota(3);
        let first = gen.begin().unwrap();
        let copy = first;
        assert_eq!(first, copy);
        assert_ne!(first, gen.end());

        let second = gen.begin().unwrap();
        assert_eq!(first, second);
        assert_eq!(*first.get().unwrap(), 1);
    }

    #[test]
    fn test_compare_cursors_of_different_generators() {
        let a = iota(3);
        let b = iota(3);
        assert_ne!(a.begin().unwrap(), b.begin().unwrap());
        assert_eq!(a.end(), b.end());
    }

    #[test]
    fn test_values_are_moved_out() {
        let gen = Generator::new(|co| async move {
            co.yield_(String::from("first")).await;
            co.yield_(String::from("second")).await;
        });
        let values: Vec<String> = gen.into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(values, ["first", "second"]);
    }

    #[test]
    fn test_iterator_stops_after_failure() {
        let gen = Generator::new(|co| async move {
            co.yield_(1).await;
            Err::<(), _>(TestError)
        });
        let mut iter = gen.into_iter();
        assert_eq!(iter.next().unwrap().unwrap(), 1);
        assert!(iter.next().unwrap().unwrap_err().is_failure());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_awaiting_ready_computation_is_allowed() {
        let gen = Generator::new(|co| async move {
            let v = Task::new(async { anyhow::Ok(41) }).await?;
            co.yield_(v + 1).await;
            anyhow::Ok(())
        });
        let it = gen.begin().unwrap();
        assert_eq!(*it.get().unwrap(), 42);
    }

    #[test]
    fn test_awaiting_nested_tasks_is_allowed() {
        fn depth(n: usize) -> Task<'static, usize> {
            Task::new(async move {
                if n == 0 {
                    anyhow::Ok(0)
                } else {
                    Ok(depth(n - 1).await? + 1)
                }
            })
        }

        let gen = Generator::new(|co| async move {
            co.yield_(depth(10_000).await?).await;
            anyhow::Ok(())
        });
        let values: Vec<usize> = gen.into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(values, [10_000]);
    }

    #[test]
    fn test_foreign_await_is_rejected() {
        let witness = Rc::new(());
        let held = Rc::clone(&witness);
        let gen: Generator<'_, i32> = Generator::new(move |co| async move {
            let _held = held;
            co.yield_(1).await;
            suspend().await;
            co.yield_(2).await;
        });

        let mut it = gen.begin().unwrap();
        assert!(matches!(it.advance(), Err(Error::ForeignAwait)));
        assert!(gen.is_ready());
        assert_eq!(Rc::strong_count(&witness), 1);
        assert_eq!(it, gen.end());
    }

    #[test]
    fn test_destroy() {
        let mut gen = iota(3);
        assert!(gen.destroy());
        assert!(!gen.destroy());
        assert!(gen.is_ready());
        assert_eq!(gen.begin().unwrap(), gen.end());
    }

    #[test]
    fn test_destroy_midway_drops_locals() {
        let witness = Rc::new(());
        let held = Rc::clone(&witness);
        let mut gen = Generator::new(move |co| async move {
            let _held = held;
            co.yield_(1).await;
            co.yield_(2).await;
        });

        assert_eq!(*gen.begin().unwrap().get().unwrap(), 1);
        assert_eq!(Rc::strong_count(&witness), 2);
        assert!(gen.destroy());
        assert_eq!(Rc::strong_count(&witness), 1);
    }

    #[test]
    fn test_default_construct() {
        let gen: Generator<'_, i32> = Generator::default();
        assert!(gen.is_ready());
        assert_eq!(gen.begin().unwrap(), gen.end());
        assert_eq!(gen.into_iter().count(), 0);
    }

    #[test]
    fn test_move_leaves_source_empty() {
        let mut gen = iota(2);
        let moved = std::mem::take(&mut gen);
        assert!(gen.is_ready());
        assert_eq!(moved.into_iter().count(), 2);
    }

    #[test]
    fn test_drain() {
        let mut gen = iota(4);
        // Four yields, then completion.
        assert_eq!(drain(&mut gen).unwrap(), 5);
        assert!(gen.is_ready());
    }

    #[test]
    fn test_continuation_resumed_on_every_yield_and_completion() {
        let mut gen = iota(2);
        let counter = Arc::new(CountingWaker::default());
        let waker = futures::task::waker(Arc::clone(&counter));
        let count = || counter.0.load(Ordering::SeqCst);

        for expected in 1..=2 {
            Resumable::set_continuation(&gen, &waker);
            assert!(gen.resume().unwrap());
            assert_eq!(count(), expected);
        }

        Resumable::set_continuation(&gen, &waker);
        assert!(!gen.resume().unwrap());
        assert_eq!(count(), 3);

        assert!(!gen.resume().unwrap());
        assert_eq!(count(), 3);
    }
}
