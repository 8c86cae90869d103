//! Synchronous iteration over asynchronous generators.

use futures::StreamExt;

use crate::{eager::run_now, AsyncGenerator, Result};

/// Iterates an [`AsyncGenerator`] from ordinary code, blocking the thread for
/// each advance.
///
/// Failures of the producer are returned as an `Err` item, after which the
/// adapter is exhausted.
///
/// ```rust
/// use coro::{AsyncGenerator, SyncAdapter};
///
/// let iota = AsyncGenerator::new(|co| async move {
///     for i in 10.. {
///         co.yield_(i).await;
///     }
/// });
///
/// let first: Vec<i32> = SyncAdapter::new(iota)
///     .take(5)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(first, [10, 11, 12, 13, 14]);
/// ```
#[derive(Debug)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct SyncAdapter<'a, T> {
    generator: AsyncGenerator<'a, T>,
}

impl<'a, T> SyncAdapter<'a, T> {
    pub fn new(generator: AsyncGenerator<'a, T>) -> Self {
        Self { generator }
    }

    /// Gives the generator back, positioned after the last produced value.
    pub fn into_inner(self) -> AsyncGenerator<'a, T> {
        self.generator
    }
}

impl<T> Default for SyncAdapter<'_, T> {
    fn default() -> Self {
        Self::new(AsyncGenerator::default())
    }
}

impl<'a, T> From<AsyncGenerator<'a, T>> for SyncAdapter<'a, T> {
    fn from(generator: AsyncGenerator<'a, T>) -> Self {
        Self::new(generator)
    }
}

impl<T> Iterator for SyncAdapter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        run_now(self.generator.next())
    }
}
