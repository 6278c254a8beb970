use crate::{
    event_loop::{EventLoop, Scheduler},
    resolver::round,
    thenable::get_then,
    Handler, Rejecter, Resolution, Resolver, Thenable, Waiter,
};
use std::{cell::RefCell, fmt, mem, rc::Rc, task::Waker};

/// Where a promise is in its life. Only ever moves out of `Pending`, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

/// The eventual result of an asynchronous operation.
///
/// A `Promise` is a handle: clones observe and settle the same state. It
/// settles at most once, to a value `T` or a reason `E`, and every
/// continuation registered on it runs on a later turn of its scheduler,
/// never inside the call that registered it.
///
/// # Examples
///
/// ```
/// use promise_plus::{EventLoop, Promise, Resolution};
///
/// let event_loop = EventLoop::current();
/// let promise = Promise::<i32, String>::new(|resolve, _reject| {
///     resolve.resolve(5);
///     Ok(())
/// })
/// .and_then(|x| Ok(Resolution::Value(x + 1)));
///
/// assert_eq!(event_loop.run_until(&promise).unwrap(), Ok(6));
/// ```
pub struct Promise<T, E> {
    shared: Rc<Shared<T, E>>,
}

struct Shared<T, E> {
    inner: RefCell<Inner<T, E>>,
    scheduler: Rc<dyn Scheduler>,
}

struct Inner<T, E> {
    state: State<T, E>,
    wakers: Vec<Waker>,
}

enum State<T, E> {
    Pending(Vec<Handler<T, E>>),
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.borrow();
        let mut out = f.debug_struct("Promise");
        match &inner.state {
            State::Pending(handlers) => out
                .field("state", &"pending")
                .field("handlers", &handlers.len()),
            State::Fulfilled(value) => out.field("state", &"fulfilled").field("value", value),
            State::Rejected(reason) => out.field("state", &"rejected").field("reason", reason),
        }
        .finish()
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Runs `task` right away on this thread's [`EventLoop`].
    ///
    /// Returning `Err` from the task rejects the promise, unless the task
    /// already resolved or rejected it.
    pub fn new<F>(task: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        Self::new_in(EventLoop::current().scheduler(), task)
    }

    /// Like [`Promise::new`], delivering continuations through `scheduler`.
    pub fn new_in<F>(scheduler: Rc<dyn Scheduler>, task: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        let promise = Self::unsettled(scheduler);
        promise.run_round(task);
        promise
    }

    /// A promise settled from the outside, through the returned handles.
    pub fn pending() -> (Self, Resolver<T, E>, Rejecter<T, E>) {
        Self::pending_in(EventLoop::current().scheduler())
    }

    pub fn pending_in(scheduler: Rc<dyn Scheduler>) -> (Self, Resolver<T, E>, Rejecter<T, E>) {
        let promise = Self::unsettled(scheduler);
        let (resolve, reject, _) = round(&promise);
        (promise, resolve, reject)
    }

    /// Resolves with `value`, adopting its outcome if it is a thenable.
    pub fn resolved(value: impl Into<Resolution<T, E>>) -> Self {
        Self::resolved_in(EventLoop::current().scheduler(), value)
    }

    pub fn resolved_in(scheduler: Rc<dyn Scheduler>, value: impl Into<Resolution<T, E>>) -> Self {
        Self::new_in(scheduler, |resolve, _| {
            resolve.resolve(value);
            Ok(())
        })
    }

    /// Rejects with `reason`, as is.
    pub fn rejected(reason: E) -> Self {
        Self::rejected_in(EventLoop::current().scheduler(), reason)
    }

    pub fn rejected_in(scheduler: Rc<dyn Scheduler>, reason: E) -> Self {
        Self::new_in(scheduler, |_, reject| {
            reject.reject(reason);
            Ok(())
        })
    }

    /// Subscribes a [`Handler`]. The record is looked at on a later turn:
    /// queued if the promise is still pending then, run at once otherwise.
    pub fn subscribe(&self, handler: Handler<T, E>) {
        let this = self.clone();
        self.shared
            .scheduler
            .defer(Box::new(move || this.handle(handler)));
    }

    /// Fire-and-forget subscription to both outcomes.
    pub fn done(
        &self,
        on_fulfilled: impl FnOnce(T) + 'static,
        on_rejected: impl FnOnce(E) + 'static,
    ) {
        self.subscribe(Handler::new(on_fulfilled, on_rejected));
    }

    /// Chains a new promise onto this one.
    ///
    /// Whichever continuation runs decides the new promise: `Ok` resolves it
    /// (adopting a returned thenable), `Err` rejects it.
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + 'static,
    {
        let source = self.clone();
        Promise::<U, E>::new_in(self.scheduler(), move |resolve, reject| {
            let (resolve_caught, reject_caught) = (resolve.clone(), reject.clone());
            source.done(
                move |value| match on_fulfilled(value) {
                    Ok(next) => resolve.resolve(next),
                    Err(err) => reject.reject(err),
                },
                move |reason| match on_rejected(reason) {
                    Ok(next) => resolve_caught.resolve(next),
                    Err(err) => reject_caught.reject(err),
                },
            );
            Ok(())
        })
    }

    /// `then` without a rejection continuation: rejections pass through.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.then(on_fulfilled, Err)
    }

    /// `then` without a fulfillment continuation: values pass through.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + 'static,
    {
        self.then(|value| Ok(Resolution::Value(value)), on_rejected)
    }

    /// The settled outcome, or `None` while pending.
    pub fn settled(&self) -> Option<Result<T, E>> {
        match &self.shared.inner.borrow().state {
            State::Pending(_) => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    /// A future over the outcome. Polling it does not drive the scheduler.
    pub fn wait(&self) -> Waiter<T, E> {
        Waiter::new(self.clone())
    }

    pub(crate) fn resolve_with(&self, resolution: Resolution<T, E>) {
        if let Some(then) = get_then(&resolution) {
            log::trace!("adopting thenable");
            self.run_round(move |resolve, reject| then.call(resolve, reject));
        } else if let Resolution::Value(value) = resolution {
            self.settle(State::Fulfilled(value));
        }
    }

    pub(crate) fn reject_now(&self, reason: E) {
        self.settle(State::Rejected(reason));
    }

    pub(crate) fn register_waker(&self, waker: &Waker) {
        let mut inner = self.shared.inner.borrow_mut();
        if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
    }

    fn unsettled(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            shared: Rc::new(Shared {
                inner: RefCell::new(Inner {
                    state: State::Pending(vec![]),
                    wakers: vec![],
                }),
                scheduler,
            }),
        }
    }

    /// Hands a fresh resolver/rejecter pair to `task`. An `Err` from the task
    /// counts as a rejection, subject to the round's latch.
    fn run_round<F>(&self, task: F)
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        let (resolve, reject, latch) = round(self);
        if let Err(reason) = task(resolve, reject) {
            if latch.trip() {
                self.reject_now(reason);
            } else {
                log::trace!("task failed after settling, error dropped");
            }
        }
    }

    fn settle(&self, settled: State<T, E>) {
        let (handlers, wakers) = {
            let mut inner = self.shared.inner.borrow_mut();
            let handlers = match &mut inner.state {
                State::Pending(handlers) => mem::take(handlers),
                _ => {
                    log::trace!("promise already settled");
                    return;
                }
            };
            inner.state = settled;
            (handlers, mem::take(&mut inner.wakers))
        };
        log::trace!(
            "promise {:?}, notifying {} handler(s)",
            self.state(),
            handlers.len()
        );
        for waker in wakers {
            waker.wake()
        }
        // Each handler may settle the next promise in a chain; going through
        // the queue keeps long chains flat.
        for handler in handlers {
            let this = self.clone();
            self.shared
                .scheduler
                .defer(Box::new(move || this.handle(handler)));
        }
    }

    fn handle(&self, handler: Handler<T, E>) {
        let outcome = {
            let mut inner = self.shared.inner.borrow_mut();
            match &mut inner.state {
                State::Pending(handlers) => {
                    handlers.push(handler);
                    return;
                }
                State::Fulfilled(value) => Ok(value.clone()),
                State::Rejected(reason) => Err(reason.clone()),
            }
        };
        handler.invoke(outcome);
    }
}

impl<T, E> Promise<T, E> {
    pub fn state(&self) -> PromiseState {
        match self.shared.inner.borrow().state {
            State::Pending(_) => PromiseState::Pending,
            State::Fulfilled(_) => PromiseState::Fulfilled,
            State::Rejected(_) => PromiseState::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// The scheduler continuations of this promise, and of promises chained
    /// from it, are delivered through.
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.shared.scheduler.clone()
    }
}

impl<T, E> Thenable<T, E> for Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn then(&self, resolve: Resolver<T, E>, reject: Rejecter<T, E>) -> Result<(), E> {
        self.done(move |value| resolve.resolve(value), move |reason| reject.reject(reason));
        Ok(())
    }
}

/// A promise fulfilled with `value`, or following it if it is a thenable.
pub fn resolved<T, E>(value: impl Into<Resolution<T, E>>) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Promise::resolved(value)
}

/// A promise rejected with `reason`.
pub fn rejected<T, E>(reason: E) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Promise::rejected(reason)
}
