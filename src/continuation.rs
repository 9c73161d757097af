use crate::state::Outcome;
use crate::Cause;

/// A downstream action registered on a cell. Exactly one of the two paths
/// runs, once, with the settled outcome.
pub(crate) struct Continuation<T> {
    on_success: Box<dyn FnOnce(&T) + Send>,
    on_failure: Box<dyn FnOnce(&Cause) + Send>,
}

impl<T> Continuation<T> {
    pub(crate) fn new<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: FnOnce(&T) + Send + 'static,
        F: FnOnce(&Cause) + Send + 'static,
    {
        Self {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
        }
    }

    pub(crate) fn fire(self, outcome: &Outcome<T>) {
        match outcome {
            Ok(value) => (self.on_success)(value),
            Err(cause) => (self.on_failure)(cause),
        }
    }
}

impl<T> std::fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fire_success_path() {
        let seen = Arc::new(Mutex::new(vec![]));
        let (ok, err) = (seen.clone(), seen.clone());
        let continuation = Continuation::<i32>::new(
            move |v| ok.lock().unwrap().push(format!("ok {v}")),
            move |c| err.lock().unwrap().push(format!("err {c}")),
        );
        continuation.fire(&Ok(7));
        assert_eq!(*seen.lock().unwrap(), vec!["ok 7".to_string()]);
    }

    #[test]
    fn test_fire_failure_path() {
        let seen = Arc::new(Mutex::new(vec![]));
        let (ok, err) = (seen.clone(), seen.clone());
        let continuation = Continuation::<i32>::new(
            move |v| ok.lock().unwrap().push(format!("ok {v}")),
            move |c| err.lock().unwrap().push(format!("err {c}")),
        );
        let cause: Cause = Arc::new(io::Error::other("nope"));
        continuation.fire(&Err(cause));
        assert_eq!(*seen.lock().unwrap(), vec!["err nope".to_string()]);
    }
}
