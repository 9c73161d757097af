//! A single-assignment result cell.
//!
//! A [`FutureCell`] starts pending, is settled exactly once with either a
//! value or a failure, and can be observed by any number of consumers: by
//! blocking in [`FutureCell::get`], by awaiting a [`Waiter`], or by deriving a
//! new cell whose value is computed from this one.
//!
//! # Examples
//!
//! ```
//! use future_cell::FutureCell;
//! use std::thread;
//!
//! let cell = FutureCell::<u32>::new();
//! let doubled = cell.derive(|v| v * 2);
//!
//! let producer = cell.clone();
//! let task = thread::spawn(move || producer.succeed(21));
//!
//! assert_eq!(doubled.get().unwrap(), 42);
//! assert!(task.join().expect("The producer thread has panicked"));
//! ```
use std::sync::Arc;
use std::time::Duration;

mod continuation;
mod future_cell;
mod state;

pub use future_cell::{FutureCell, Waiter};

/// The failure a cell settles with. Shared between every consumer and every
/// derived cell.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cell settled as failed.
    #[error("future completed with an error: {0}")]
    Execution(#[source] Cause),
    #[error("future did not complete within {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// The failure carried by an execution error.
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Error::Execution(cause) => Some(cause),
            Error::Timeout(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Substituted when a cell is failed without a cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("future failed, but no error was provided")]
pub struct MissingCause;

/// The producer side of a cell.
pub trait Promise<T> {
    type Waiter;

    fn new() -> (Self, Self::Waiter)
    where
        Self: Sized;

    /// Settles with `value`. Returns false if already settled.
    fn resolve(&self, value: T) -> bool;

    /// Settles with `error`. Returns false if already settled.
    fn reject(&self, error: Cause) -> bool;
}
