use std::fmt::Debug;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::continuation::Continuation;
use crate::state::{cause_or_missing, Outcome, Status};
use crate::{Cause, Error, Promise};

/// A cell that is settled at most once, with either a value or a [`Cause`].
///
/// Clones share the same cell, so a producer can hand one clone to another
/// thread and keep observing through the rest.
///
/// # Examples
///
/// ```
/// use future_cell::{Error, FutureCell};
/// use std::{io, sync::Arc, time::Duration};
///
/// let cell = FutureCell::<String>::new();
/// assert!(matches!(cell.get_timeout(Duration::from_millis(10)), Err(Error::Timeout(_))));
///
/// assert!(cell.fail(Arc::new(io::Error::other("💥"))));
/// assert!(!cell.succeed("🍓".into()));
/// assert_eq!(cell.get().unwrap_err().cause().unwrap().to_string(), "💥");
/// ```
pub struct FutureCell<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    status: Mutex<Status<T>>,
    settled: Condvar,
}

impl<T> Clone for FutureCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for FutureCell<T> {
    fn default() -> Self {
        Self::with_status(Status::default())
    }
}

impl<T> FutureCell<T> {
    /// A pending cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cell that has already succeeded with `value`.
    pub fn succeeded(value: T) -> Self {
        Self::with_status(Status::settled(Ok(value)))
    }

    /// A cell that has already failed with `cause`.
    pub fn failed(cause: Cause) -> Self {
        Self::with_status(Status::settled(Err(cause)))
    }

    fn with_status(status: Status<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                status: Mutex::new(status),
                settled: Condvar::new(),
            }),
        }
    }

    // Values are cloned and dropped, and continuations and wakers run,
    // only after the guard is released, so a poisoned guard still protects
    // a consistent status.
    fn lock(&self) -> MutexGuard<'_, Status<T>> {
        self.inner.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settles the cell with `value`.
    ///
    /// Returns true if this call settled the cell, false if it was already
    /// settled, in which case nothing changes. Blocked getters are woken and
    /// every registered continuation runs on this thread, in registration
    /// order, before this returns.
    pub fn succeed(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settles the cell as failed. Same contract as [`FutureCell::succeed`].
    pub fn fail(&self, cause: Cause) -> bool {
        self.settle(Err(cause))
    }

    /// Like [`FutureCell::fail`], but a missing cause is replaced by
    /// [`MissingCause`](crate::MissingCause).
    pub fn fail_with(&self, cause: Option<Cause>) -> bool {
        self.settle(Err(cause_or_missing(cause)))
    }

    fn settle(&self, outcome: Outcome<T>) -> bool {
        let settled = self.lock().settle(outcome);
        let Ok((outcome, waiting)) = settled else {
            return false;
        };
        self.inner.settled.notify_all();

        log::trace!(
            "future {}, waking {} tasks and firing {} continuations",
            if outcome.is_ok() { "succeeded" } else { "failed" },
            waiting.wakers.len(),
            waiting.continuations.len()
        );
        for (_, waker) in waiting.wakers {
            waker.wake()
        }
        // A panicking continuation unwinds out of here and the rest are dropped.
        for continuation in waiting.continuations {
            continuation.fire(&outcome)
        }
        true
    }

    /// Blocks until the cell settles, then returns its value, or
    /// [`Error::Execution`] carrying the failure.
    pub fn get(&self) -> Result<T, Error>
    where
        T: Clone,
    {
        let outcome = {
            let mut status = self.lock();
            loop {
                if let Some(outcome) = status.outcome() {
                    break outcome.clone();
                }
                status = self
                    .inner
                    .settled
                    .wait(status)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        read(&outcome)
    }

    /// Like [`FutureCell::get`], but gives up with [`Error::Timeout`] once
    /// `timeout` has elapsed without the cell settling. Expiry only ends this
    /// wait; the cell and other waiters are unaffected.
    pub fn get_timeout(&self, timeout: Duration) -> Result<T, Error>
    where
        T: Clone,
    {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.get();
        };
        let outcome = {
            let mut status = self.lock();
            loop {
                if let Some(outcome) = status.outcome() {
                    break outcome.clone();
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(Error::Timeout(timeout));
                }
                status = match self.inner.settled.wait_timeout(status, remaining) {
                    Ok((status, _)) => status,
                    Err(poisoned) => poisoned.into_inner().0,
                };
            }
        };
        read(&outcome)
    }

    /// The settled result, or `None` while pending. Never blocks on the cell
    /// settling.
    pub fn try_get(&self) -> Option<Result<T, Error>>
    where
        T: Clone,
    {
        let outcome = self.lock().outcome().cloned();
        outcome.map(|outcome| read(&outcome))
    }

    pub fn is_done(&self) -> bool {
        !self.lock().is_pending()
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.lock().outcome().map(|o| o.is_ok()), Some(true))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.lock().outcome().map(|o| o.is_err()), Some(true))
    }

    /// Cancellation is not supported: always returns false and leaves the
    /// cell untouched.
    pub fn cancel(&self, _may_interrupt: bool) -> bool {
        false
    }

    pub fn is_cancelled(&self) -> bool {
        false
    }

    /// A future that resolves once this cell settles.
    ///
    /// While pending, each polled waiter keeps one waker in the cell; it is
    /// removed when the waiter is dropped.
    pub fn waiter(&self) -> Waiter<T> {
        Waiter {
            cell: self.clone(),
            slot: None,
        }
    }

    /// Returns a new cell that settles with `transform` applied to this
    /// cell's value, or with this cell's failure. `transform` never runs if
    /// this cell fails.
    ///
    /// The transform runs on whichever thread settles this cell. If this cell
    /// has already settled it runs here, before `derive` returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use future_cell::FutureCell;
    ///
    /// let cell = FutureCell::new();
    /// let len = cell.derive(|s: &String| s.len());
    /// let even = len.derive(|n| n % 2 == 0);
    ///
    /// cell.succeed("four".to_string());
    /// assert_eq!(len.get().unwrap(), 4);
    /// assert!(even.get().unwrap());
    /// ```
    pub fn derive<U, F>(&self, transform: F) -> FutureCell<U>
    where
        T: 'static,
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        self.try_derive(move |value| Ok(transform(value)))
    }

    /// Like [`FutureCell::derive`], but an `Err` from `transform` fails the
    /// derived cell.
    pub fn try_derive<U, F>(&self, transform: F) -> FutureCell<U>
    where
        T: 'static,
        U: Send + Sync + 'static,
        F: FnOnce(&T) -> Result<U, Cause> + Send + 'static,
    {
        let derived = FutureCell::<U>::new();
        let (ok_target, err_target) = (derived.clone(), derived.clone());
        self.register(Continuation::<T>::new(
            move |value| {
                match transform(value) {
                    Ok(value) => ok_target.succeed(value),
                    Err(cause) => ok_target.fail(cause),
                };
            },
            move |cause| {
                err_target.fail(cause.clone());
            },
        ));
        derived
    }

    fn register(&self, continuation: Continuation<T>) {
        let outcome = match &mut *self.lock() {
            Status::Pending(waiting) => {
                waiting.continuations.push(continuation);
                return;
            }
            Status::Settled(outcome) => outcome.clone(),
        };
        log::trace!("future already settled, firing continuation on registration");
        continuation.fire(&outcome);
    }
}

fn read<T: Clone>(outcome: &Outcome<T>) -> Result<T, Error> {
    match outcome {
        Ok(value) => Ok(value.clone()),
        Err(cause) => Err(Error::Execution(cause.clone())),
    }
}

impl<T: Debug> Debug for FutureCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settled = match &*self.lock() {
            Status::Pending(waiting) => Err(waiting.continuations.len()),
            Status::Settled(outcome) => Ok(outcome.clone()),
        };
        let mut out = f.debug_struct("FutureCell");
        match &settled {
            Err(continuations) => out
                .field("status", &"Pending")
                .field("continuations", continuations),
            Ok(outcome) => out.field("status", outcome),
        };
        out.finish()
    }
}

impl<T> Promise<T> for FutureCell<T> {
    type Waiter = Waiter<T>;

    fn new() -> (Self, Self::Waiter) {
        let cell = FutureCell::default();
        let waiter = cell.waiter();
        (cell, waiter)
    }

    fn resolve(&self, value: T) -> bool {
        self.succeed(value)
    }

    fn reject(&self, error: Cause) -> bool {
        self.fail(error)
    }
}

/// Resolves with the settled result of a [`FutureCell`].
///
/// # Examples
///
/// ```
/// use future_cell::{FutureCell, Promise};
/// use futures::executor::block_on;
/// use std::thread;
///
/// let (promise, waiter) = <FutureCell<String> as Promise<String>>::new();
/// let task = thread::spawn(move || block_on(waiter));
/// promise.resolve("Hi".into());
/// assert_eq!(task.join().expect("The waiting thread has panicked").unwrap(), "Hi");
/// ```
#[derive(Debug)]
pub struct Waiter<T> {
    cell: FutureCell<T>,
    slot: Option<usize>,
}

impl<T: Clone> Future for Waiter<T> {
    type Output = Result<T, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut status = this.cell.lock();
        match &mut *status {
            Status::Settled(outcome) => {
                let outcome = outcome.clone();
                drop(status);
                Poll::Ready(read(&outcome))
            }
            Status::Pending(waiting) => {
                let replaced = waiting.register_waker(&mut this.slot, cx.waker());
                drop(status);
                drop(replaced);
                Poll::Pending
            }
        }
    }
}

impl<T> Drop for Waiter<T> {
    fn drop(&mut self) {
        let Some(slot) = self.slot else { return };
        let removed = match &mut *self.cell.lock() {
            Status::Pending(waiting) => waiting.remove_waker(slot),
            Status::Settled(_) => None,
        };
        drop(removed);
    }
}

impl<T: Clone> IntoFuture for FutureCell<T> {
    type Output = Result<T, Error>;
    type IntoFuture = Waiter<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.waiter()
    }
}
