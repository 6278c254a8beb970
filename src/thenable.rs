//! Interop with promise-like values.
//!
//! A value counts as a thenable when it exposes a callable `then`, nothing
//! more. [`Resolution`] is what `resolve` accepts: either a plain value, or a
//! thenable whose eventual outcome the target promise adopts. Foreign types
//! opt in by implementing [`Thenable`]; [`Promise`] implements it too, so
//! native and foreign values flatten through the same path.
use crate::{Promise, Rejecter, Resolver};
use std::{fmt, rc::Rc};

/// Anything with a `then` that eventually calls `resolve` or `reject`.
///
/// Returning `Err` means `then` itself failed; the adopting promise rejects
/// with that error unless `resolve` or `reject` already took effect.
///
/// # Examples
///
/// ```
/// use promise_plus::{EventLoop, Promise, Rejecter, Resolution, Resolver, Thenable};
///
/// struct Answer;
///
/// impl Thenable<i32, String> for Answer {
///     fn then(
///         &self,
///         resolve: Resolver<i32, String>,
///         _reject: Rejecter<i32, String>,
///     ) -> Result<(), String> {
///         resolve.resolve(42);
///         Ok(())
///     }
/// }
///
/// let event_loop = EventLoop::current();
/// let promise = Promise::<i32, String>::resolved(Resolution::thenable(Answer));
/// assert_eq!(event_loop.run_until(&promise).unwrap(), Ok(42));
/// ```
pub trait Thenable<T, E> {
    fn then(&self, resolve: Resolver<T, E>, reject: Rejecter<T, E>) -> Result<(), E>;
}

/// The argument to `resolve`.
pub enum Resolution<T, E> {
    Value(T),
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Resolution::Thenable(Rc::new(thenable))
    }
}

impl<T, E> From<T> for Resolution<T, E> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Thenable(Rc::new(promise))
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// A `then` bound to the value it was read from.
pub struct Then<T, E>(Rc<dyn Thenable<T, E>>);

impl<T, E> Then<T, E> {
    pub fn call(&self, resolve: Resolver<T, E>, reject: Rejecter<T, E>) -> Result<(), E> {
        self.0.then(resolve, reject)
    }
}

impl<T, E> fmt::Debug for Then<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Then(..)")
    }
}

/// Does `value` expose a callable `then`?
pub fn is_thenable<T, E>(value: &Resolution<T, E>) -> bool {
    matches!(value, Resolution::Thenable(_))
}

/// The bound `then` of `value`, if it has one.
pub fn get_then<T, E>(value: &Resolution<T, E>) -> Option<Then<T, E>> {
    match value {
        Resolution::Thenable(thenable) => Some(Then(thenable.clone())),
        Resolution::Value(_) => None,
    }
}
