//! A single-threaded FIFO task queue standing in for the host's "run this
//! later" primitive.
//!
//! Every continuation a [`Promise`] delivers goes through a [`Scheduler`], so
//! nothing registered with `done` or `then` ever runs inside the call that
//! registered it. The queue only advances when someone drives it with
//! [`EventLoop::tick`], [`EventLoop::run`] or [`EventLoop::run_until`].
//!
//! # Examples
//!
//! ```
//! use promise_plus::{EventLoop, Promise, Resolution};
//! let event_loop = EventLoop::new();
//! let promise = Promise::<i32, String>::resolved_in(event_loop.scheduler(), 5)
//!     .and_then(|x| Ok(Resolution::Value(x + 1)));
//! assert_eq!(event_loop.run_until(&promise).unwrap(), Ok(6));
//! ```
use crate::{Error, Promise};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::Rc,
};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Anything that can run a task on a later turn.
///
/// Implementations must run tasks in the order they were deferred and must
/// never run a task synchronously inside `defer`.
pub trait Scheduler {
    fn defer(&self, task: Task);
}

/// Limits for one drive of the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Most tasks a single `run` or `run_until` call may execute.
    /// `None` means run until idle.
    pub max_ticks: Option<usize>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_ticks(mut self, limit: usize) -> Self {
        self.max_ticks = Some(limit);
        self
    }
}

thread_local! {
    static CURRENT: EventLoop = EventLoop::new();
}

/// Handle onto a task queue. Clones share the same queue.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<Inner>,
}

struct Inner {
    queue: RefCell<VecDeque<Task>>,
    config: Config,
    ticks: Cell<u64>,
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("queued", &self.len())
            .field("ticks", &self.inner.ticks.get())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Rc::new(Inner {
                queue: RefCell::new(VecDeque::new()),
                config,
                ticks: Cell::new(0),
            }),
        }
    }

    /// The loop used by [`Promise::new`] on this thread.
    pub fn current() -> Self {
        CURRENT.with(|event_loop| event_loop.clone())
    }

    /// This loop as a shareable scheduler, for the `*_in` constructors.
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::new(self.clone())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Total tasks this loop has executed.
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.get()
    }

    /// Runs the task at the front of the queue. Returns `false` when there
    /// was nothing to run.
    pub fn tick(&self) -> bool {
        // The borrow ends before the task runs; tasks defer more tasks.
        let task = self.inner.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                self.inner.ticks.set(self.inner.ticks.get() + 1);
                task();
                true
            }
            None => false,
        }
    }

    /// Runs tasks until the queue is empty, including tasks queued along
    /// the way. Returns how many ran.
    pub fn run(&self) -> Result<usize, Error> {
        let mut ran = 0;
        loop {
            if self.is_empty() {
                log::debug!("event loop idle after {ran} task(s)");
                return Ok(ran);
            }
            self.check_budget(ran)?;
            self.tick();
            ran += 1;
        }
    }

    /// Runs tasks until `promise` settles and returns its outcome.
    ///
    /// Fails with [`Error::Stalled`] if the queue drains first: nothing left
    /// on this loop can settle the promise.
    pub fn run_until<T, E>(&self, promise: &Promise<T, E>) -> Result<Result<T, E>, Error>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        let mut ran = 0;
        loop {
            if let Some(outcome) = promise.settled() {
                log::debug!("promise settled after {ran} task(s)");
                return Ok(outcome);
            }
            self.check_budget(ran)?;
            if !self.tick() {
                log::warn!("event loop drained with promise still pending");
                return Err(Error::Stalled);
            }
            ran += 1;
        }
    }

    fn check_budget(&self, ran: usize) -> Result<(), Error> {
        match self.inner.config.max_ticks {
            Some(limit) if ran >= limit => {
                log::warn!(
                    "event loop tick budget of {limit} exhausted, {} task(s) left queued",
                    self.len()
                );
                Err(Error::TickBudgetExceeded { limit })
            }
            _ => Ok(()),
        }
    }
}

impl Scheduler for EventLoop {
    fn defer(&self, task: Task) {
        self.inner.queue.borrow_mut().push_back(task);
    }
}
