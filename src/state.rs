use std::sync::Arc;
use std::task::Waker;

use crate::continuation::Continuation;
use crate::{Cause, MissingCause};

/// What a cell settled with.
pub(crate) type Outcome<T> = Result<T, Cause>;

/// Everything waiting on a pending cell. Each waker is keyed by the slot of
/// the waiter that registered it.
pub(crate) struct Pending<T> {
    pub(crate) continuations: Vec<Continuation<T>>,
    pub(crate) wakers: Vec<(usize, Waker)>,
    next_slot: usize,
}

impl<T> Default for Pending<T> {
    fn default() -> Self {
        Self {
            continuations: vec![],
            wakers: vec![],
            next_slot: 0,
        }
    }
}

impl<T> Pending<T> {
    /// Stores `waker` under `slot`, allocating a slot on first use. Returns
    /// the waker it replaced, if any, so the caller can drop it unlocked.
    pub(crate) fn register_waker(&mut self, slot: &mut Option<usize>, waker: &Waker) -> Option<Waker> {
        let id = *slot.get_or_insert_with(|| {
            self.next_slot += 1;
            self.next_slot
        });
        match self.wakers.iter_mut().find(|(s, _)| *s == id) {
            Some((_, w)) if w.will_wake(waker) => None,
            Some((_, w)) => Some(std::mem::replace(w, waker.clone())),
            None => {
                self.wakers.push((id, waker.clone()));
                None
            }
        }
    }

    pub(crate) fn remove_waker(&mut self, slot: usize) -> Option<Waker> {
        let index = self.wakers.iter().position(|(s, _)| *s == slot)?;
        Some(self.wakers.swap_remove(index).1)
    }
}

/// `Pending -> Settled` is the only transition.
pub(crate) enum Status<T> {
    Pending(Pending<T>),
    Settled(Arc<Outcome<T>>),
}

impl<T> Default for Status<T> {
    fn default() -> Self {
        Status::Pending(Pending::default())
    }
}

impl<T> Status<T> {
    pub(crate) fn settled(outcome: Outcome<T>) -> Self {
        Status::Settled(Arc::new(outcome))
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, Status::Pending(_))
    }

    pub(crate) fn outcome(&self) -> Option<&Arc<Outcome<T>>> {
        match self {
            Status::Pending(_) => None,
            Status::Settled(outcome) => Some(outcome),
        }
    }

    /// Moves a pending status to `outcome`, handing back whatever was waiting
    /// on it. A settled status is left untouched and the rejected `outcome`
    /// is returned, so it can be dropped after the lock is released.
    pub(crate) fn settle(
        &mut self,
        outcome: Outcome<T>,
    ) -> Result<(Arc<Outcome<T>>, Pending<T>), Outcome<T>> {
        match self {
            Status::Settled(_) => Err(outcome),
            Status::Pending(waiting) => {
                let waiting = std::mem::take(waiting);
                let outcome = Arc::new(outcome);
                *self = Status::Settled(outcome.clone());
                Ok((outcome, waiting))
            }
        }
    }
}

/// The cause a failure settles with when none was supplied.
pub(crate) fn cause_or_missing(cause: Option<Cause>) -> Cause {
    cause.unwrap_or_else(|| Arc::new(MissingCause) as Cause)
}
