//! Promises/A+ style deferred values.
//!
//! A [`Promise`] runs its task immediately, settles at most once, and hands
//! its outcome to continuations on a later turn of an [`EventLoop`]. Chains
//! built with [`Promise::then`], [`Promise::and_then`] and [`Promise::catch`]
//! carry values and rejections forward, flattening any [`Thenable`] they are
//! resolved with.
//!
//! # Examples
//!
//! ```
//! use promise_plus::{rejected, EventLoop, Resolution};
//!
//! let event_loop = EventLoop::current();
//! let recovered = rejected::<String, String>("boom".into())
//!     .catch(|e| Ok(Resolution::Value(format!("recovered:{e}"))));
//!
//! assert_eq!(
//!     event_loop.run_until(&recovered).unwrap(),
//!     Ok(String::from("recovered:boom"))
//! );
//! ```
mod event_loop;
mod handler;
mod promise;
mod resolver;
mod thenable;
mod waiter;

pub use event_loop::{Config, EventLoop, Scheduler, Task};
pub use handler::Handler;
pub use promise::{rejected, resolved, Promise, PromiseState};
pub use resolver::{Rejecter, Resolver};
pub use thenable::{get_then, is_thenable, Resolution, Then, Thenable};
pub use waiter::Waiter;

use thiserror::Error;

/// Failures driving an [`EventLoop`]. Rejection reasons are never wrapped in
/// this type; they stay the promise's own `E`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("the event loop went idle before the promise settled")]
    Stalled,
    #[error("the event loop ran {limit} task(s) without finishing")]
    TickBudgetExceeded { limit: usize },
}
