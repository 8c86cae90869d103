use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// Suspends the enclosing task body once.
///
/// The first poll wakes whoever polls the body and returns `Pending`; the next
/// one completes. A continuation registered on the task is not resumed. Inside a [`Task`](crate::Task) driven by
/// [`resume`](crate::Task::resume), each `suspend().await` costs exactly one
/// extra resumption. Awaiting it inside a [`Generator`](crate::Generator) body
/// is rejected with [`Error::ForeignAwait`](crate::Error::ForeignAwait).
///
/// ```rust
/// use coro::{suspend, Task};
///
/// let mut task = Task::new(async {
///     suspend().await;
///     anyhow::Ok("done")
/// });
/// assert!(task.resume());
/// assert!(!task.resume());
/// assert_eq!(*task.result_value().unwrap(), "done");
/// ```
pub fn suspend() -> Suspend {
    Suspend { suspended: false }
}

/// Future returned by [`suspend`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Suspend {
    suspended: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.suspended {
            return Poll::Ready(());
        }
        self.suspended = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
