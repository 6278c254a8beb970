//! The `resolve`/`reject` callbacks handed to a task.
//!
//! Every resolution round (the construction task, or one nested thenable's
//! `then`) gets its own [`Latch`]. The resolver and rejecter of a round share
//! it, so whichever is called first wins and every later call in that round
//! is a no-op. A fresh round never re-arms an earlier round's latch.
use crate::{Promise, Resolution};
use std::{cell::Cell, fmt, rc::Rc};

/// One-shot guard for a resolution round.
#[derive(Debug, Default)]
pub(crate) struct Latch(Cell<bool>);

impl Latch {
    /// Returns `true` for the first caller only.
    pub(crate) fn trip(&self) -> bool {
        !self.0.replace(true)
    }

    pub(crate) fn is_tripped(&self) -> bool {
        self.0.get()
    }
}

/// Settles its promise with a value, adopting the state of thenables.
pub struct Resolver<T, E> {
    promise: Promise<T, E>,
    latch: Rc<Latch>,
}

/// Rejects its promise with a reason, as is.
pub struct Rejecter<T, E> {
    promise: Promise<T, E>,
    latch: Rc<Latch>,
}

pub(crate) fn round<T, E>(promise: &Promise<T, E>) -> (Resolver<T, E>, Rejecter<T, E>, Rc<Latch>) {
    let latch = Rc::new(Latch::default());
    (
        Resolver {
            promise: promise.clone(),
            latch: latch.clone(),
        },
        Rejecter {
            promise: promise.clone(),
            latch: latch.clone(),
        },
        latch,
    )
}

impl<T, E> Resolver<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Accepts a plain value, a [`Promise`], or any [`Resolution`].
    pub fn resolve(&self, value: impl Into<Resolution<T, E>>) {
        if self.latch.trip() {
            self.promise.resolve_with(value.into());
        } else {
            log::trace!("resolve ignored, round already settled");
        }
    }

    /// Has this round already resolved or rejected?
    pub fn is_spent(&self) -> bool {
        self.latch.is_tripped()
    }
}

impl<T, E> Rejecter<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Never unwraps `reason`, even if it is itself promise-like.
    pub fn reject(&self, reason: E) {
        if self.latch.trip() {
            self.promise.reject_now(reason);
        } else {
            log::trace!("reject ignored, round already settled");
        }
    }

    pub fn is_spent(&self) -> bool {
        self.latch.is_tripped()
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            latch: self.latch.clone(),
        }
    }
}

impl<T, E> Clone for Rejecter<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            latch: self.latch.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("spent", &self.latch.is_tripped())
            .finish()
    }
}

impl<T, E> fmt::Debug for Rejecter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejecter")
            .field("spent", &self.latch.is_tripped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventLoop, PromiseState};

    #[test]
    fn test_latch_trips_once() {
        let latch = Latch::default();
        assert!(!latch.is_tripped());
        assert!(latch.trip());
        assert!(!latch.trip());
        assert!(latch.is_tripped());
    }

    #[test]
    fn test_first_call_wins() {
        let event_loop = EventLoop::new();
        let (promise, resolve, reject) = Promise::<i32, String>::pending_in(event_loop.scheduler());
        resolve.resolve(1);
        resolve.resolve(2);
        reject.reject("late".into());
        assert!(resolve.is_spent());
        assert!(reject.clone().is_spent());
        assert_eq!(promise.settled(), Some(Ok(1)));
    }

    #[test]
    fn test_reject_first_blocks_resolve() {
        let event_loop = EventLoop::new();
        let (promise, resolve, reject) = Promise::<i32, String>::pending_in(event_loop.scheduler());
        reject.reject("boom".into());
        resolve.resolve(2);
        assert_eq!(promise.state(), PromiseState::Rejected);
        assert_eq!(promise.settled(), Some(Err("boom".to_string())));
    }

    #[test]
    fn test_spent_round_stays_spent_while_adopting() {
        let event_loop = EventLoop::new();
        let (inner, inner_resolve, _) = Promise::<i32, String>::pending_in(event_loop.scheduler());
        let (outer, resolve, _) = Promise::<i32, String>::pending_in(event_loop.scheduler());
        resolve.resolve(inner);
        // The outer round is spent even though a nested round is now open.
        resolve.resolve(99);
        assert!(outer.is_pending());
        inner_resolve.resolve(5);
        assert_eq!(event_loop.run_until(&outer), Ok(Ok(5)));
    }
}
