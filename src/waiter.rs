use crate::Promise;
use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// Awaits a [`Promise`]. Each waiter yields its own copy of the outcome, so
/// a promise may have any number of them.
///
/// The waiter only observes; something still has to drive the promise's
/// scheduler for it to settle.
///
/// # Examples
///
/// ```
/// use promise_plus::Promise;
/// use futures::executor::block_on;
/// let (promise, resolve, _reject) = Promise::<String, ()>::pending();
/// let waiter = promise.wait();
/// resolve.resolve(String::from("🍓"));
/// assert_eq!(block_on(waiter), Ok(String::from("🍓")));
/// ```
pub struct Waiter<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Waiter<T, E> {
    pub(crate) fn new(promise: Promise<T, E>) -> Self {
        Self { promise }
    }
}

impl<T, E> Clone for Waiter<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Waiter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Waiter").field(&self.promise).finish()
    }
}

impl<T, E> Future for Waiter<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.promise.settled() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                self.promise.register_waker(cx.waker());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{EventLoop, Promise, Resolution};
    use futures::{
        executor::block_on,
        task::{waker_ref, ArcWake},
    };
    use std::{
        future::Future,
        pin::pin,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        task::{Context, Poll},
    };

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_waiter_wakes_on_settle() {
        let event_loop = EventLoop::new();
        let (promise, resolve, _) = Promise::<String, ()>::pending_in(event_loop.scheduler());
        let counter = Arc::new(CountingWaker::default());
        let waker = waker_ref(&counter);
        let mut cx = Context::from_waker(&waker);
        let mut waiter = pin!(promise.wait());

        assert_eq!(waiter.as_mut().poll(&mut cx), Poll::Pending);
        // Same waker twice is only kept once.
        assert_eq!(waiter.as_mut().poll(&mut cx), Poll::Pending);
        resolve.resolve(String::from("🍓"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(waiter.as_mut().poll(&mut cx), Poll::Ready(Ok(String::from("🍓"))));
    }

    #[test]
    fn test_two_waiters_both_see_rejection() {
        let event_loop = EventLoop::new();
        let promise = Promise::<(), String>::rejected_in(event_loop.scheduler(), "reject!!".into());
        let a = promise.wait();
        let b = a.clone();
        assert_eq!(block_on(a), Err(String::from("reject!!")));
        assert_eq!(block_on(b), Err(String::from("reject!!")));
    }

    #[test]
    fn test_waiter_after_chain_driven() {
        let event_loop = EventLoop::new();
        let promise = Promise::<i32, ()>::resolved_in(event_loop.scheduler(), 2)
            .and_then(|x| Ok(Resolution::Value(x * 21)));
        event_loop.run().unwrap();
        assert_eq!(block_on(promise.wait()), Ok(42));
    }
}
