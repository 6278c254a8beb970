use std::fmt;

/// A pair of continuations waiting on a promise. Either side may be absent,
/// in which case that outcome is simply not observed.
pub struct Handler<T, E> {
    on_fulfilled: Option<Box<dyn FnOnce(T)>>,
    on_rejected: Option<Box<dyn FnOnce(E)>>,
}

impl<T, E> Handler<T, E> {
    pub fn new(
        on_fulfilled: impl FnOnce(T) + 'static,
        on_rejected: impl FnOnce(E) + 'static,
    ) -> Self {
        Self::default()
            .on_fulfilled(on_fulfilled)
            .on_rejected(on_rejected)
    }

    pub fn on_fulfilled(mut self, f: impl FnOnce(T) + 'static) -> Self {
        self.on_fulfilled = Some(Box::new(f));
        self
    }

    pub fn on_rejected(mut self, f: impl FnOnce(E) + 'static) -> Self {
        self.on_rejected = Some(Box::new(f));
        self
    }

    /// Consumes the record, running the continuation matching `outcome`.
    pub(crate) fn invoke(self, outcome: Result<T, E>) {
        match outcome {
            Ok(value) => {
                if let Some(f) = self.on_fulfilled {
                    f(value)
                }
            }
            Err(reason) => {
                if let Some(f) = self.on_rejected {
                    f(reason)
                }
            }
        }
    }
}

impl<T, E> Default for Handler<T, E> {
    fn default() -> Self {
        Self {
            on_fulfilled: None,
            on_rejected: None,
        }
    }
}

impl<T, E> fmt::Debug for Handler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("on_fulfilled", &self.on_fulfilled.is_some())
            .field("on_rejected", &self.on_rejected.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Handler;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_invoke_matches_outcome() {
        let seen = Rc::new(RefCell::new(vec![]));
        let (a, b) = (seen.clone(), seen.clone());
        Handler::<i32, i32>::new(move |v| a.borrow_mut().push(v), move |e| b.borrow_mut().push(-e))
            .invoke(Err(3));
        assert_eq!(*seen.borrow(), vec![-3]);
    }

    #[test]
    fn test_absent_side_is_skipped() {
        let seen = Rc::new(RefCell::new(vec![]));
        let a = seen.clone();
        let handler = Handler::<i32, i32>::default().on_fulfilled(move |v| a.borrow_mut().push(v));
        assert_eq!(
            format!("{handler:?}"),
            "Handler { on_fulfilled: true, on_rejected: false }"
        );
        handler.invoke(Err(1));
        assert!(seen.borrow().is_empty());
    }
}
