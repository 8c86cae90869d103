//! Trampoline for chains of awaited tasks.
//!
//! A body that awaits an unfinished [`Task`](crate::Task) does not run it on
//! its own stack. The awaited frame is handed to the loop that is polling the
//! body, the body returns `Pending`, and the loop polls the handed-off frame
//! instead. When that frame finishes the loop pops it and polls its parent
//! again, which now finds the result ready. Stack use therefore stays flat no
//! matter how deep the chain of awaits gets.
//!
//! A scope is installed around every body poll: it names the waker of the frame
//! being polled, so an awaited task can tell whether it is polled directly by
//! that body, and the waker of the frame at the bottom of the chain, so handed
//! off frames know whom to wake when something outside the chain completes.

use std::{
    cell::RefCell,
    mem,
    ptr::NonNull,
    task::{Context, Poll, Waker},
};

/// A frame the trampoline can poll on behalf of its parent.
pub(crate) trait Drive {
    /// The waker the frame's body is polled with.
    fn waker(&self) -> Waker;

    /// Polls the body once. `Ready` once the frame is terminal.
    fn drive(&mut self, cx: &mut Context<'_>) -> Poll<()>;
}

type Handoff = NonNull<dyn Drive>;

struct Scope {
    current: Waker,
    root: Waker,
    handoff: Option<Handoff>,
}

thread_local! {
    static SCOPE: RefCell<Option<Scope>> = const { RefCell::new(None) };
}

/// Puts the outer scope back when a body poll ends, unwinding included.
struct Restore(Option<Scope>);

impl Drop for Restore {
    fn drop(&mut self) {
        let outer = self.0.take();
        let _ = SCOPE.try_with(|scope| scope.replace(outer));
    }
}

fn poll_in_scope<T>(
    current: &Waker,
    root: &Waker,
    poll: impl FnOnce(&mut Context<'_>) -> T,
) -> (T, Option<Handoff>) {
    let outer = SCOPE.with(|scope| {
        scope.replace(Some(Scope {
            current: current.clone(),
            root: root.clone(),
            handoff: None,
        }))
    });
    let _restore = Restore(outer);

    let mut cx = Context::from_waker(current);
    let polled = poll(&mut cx);
    let handoff = SCOPE.with(|scope| scope.borrow_mut().as_mut().and_then(|s| s.handoff.take()));
    (polled, handoff)
}

/// Polls the root frame, and every frame handed off beneath it, until the root
/// is ready or the chain waits on something outside it.
pub(crate) fn run<T>(
    root: &Waker,
    mut poll_root: impl FnMut(&mut Context<'_>) -> Poll<T>,
) -> Poll<T> {
    let mut stack: Vec<Handoff> = Vec::new();
    loop {
        let Some(mut top) = stack.last().copied() else {
            match poll_in_scope(root, root, |cx| poll_root(cx)) {
                (Poll::Pending, Some(child)) => stack.push(child),
                (polled, _) => return polled,
            }
            continue;
        };

        // SAFETY: `top` was handed off by a body further down the stack and is
        // owned by that body's state. Only the topmost entry is ever polled, so
        // its owner stays untouched until `top` is popped, and a frame dropped
        // before the handoff is collected withdraws itself first.
        let frame = unsafe { top.as_mut() };
        let current = frame.waker();
        match poll_in_scope(&current, root, |cx| frame.drive(cx)) {
            (Poll::Ready(()), _) => {
                stack.pop();
            }
            (Poll::Pending, Some(child)) => stack.push(child),
            (Poll::Pending, None) => return Poll::Pending,
        }
    }
}

/// Offers `frame` to the loop polling the current body.
///
/// Returns the waker that reaches the bottom of the chain, or `None` when the
/// poll does not come straight from a driven body and the caller has to drive
/// `frame` itself.
pub(crate) fn hand_off<'f>(cx: &Context<'_>, frame: &'f mut (dyn Drive + 'f)) -> Option<Waker> {
    SCOPE.with(|scope| {
        let mut scope = scope.borrow_mut();
        let scope = scope.as_mut()?;
        // Frame wakers differ only by the link they point at.
        if scope.handoff.is_some() || cx.waker().data() != scope.current.data() {
            return None;
        }
        let frame = NonNull::from(frame);
        // SAFETY: only the trait object lifetime is erased. `run` dereferences
        // the pointer while its owner is parked behind it; see `withdraw`.
        let frame = unsafe { mem::transmute::<NonNull<dyn Drive + 'f>, Handoff>(frame) };
        scope.handoff = Some(frame);
        Some(scope.root.clone())
    })
}

/// Forgets a pending handoff of the frame at `addr`, which is being dropped.
pub(crate) fn withdraw(addr: *const ()) {
    let _ = SCOPE.try_with(|scope| {
        if let Ok(mut scope) = scope.try_borrow_mut() {
            if let Some(scope) = scope.as_mut() {
                if scope
                    .handoff
                    .is_some_and(|frame| frame.as_ptr() as *const () == addr)
                {
                    scope.handoff = None;
                }
            }
        }
    });
}
