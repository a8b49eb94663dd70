//! Single-assignment asynchronous result container with chaining.
//!
//! A [`Promise`] completes at most once, with either a value or a
//! [`ClusterError`]. Registered continuations are invoked exactly once,
//! in registration order, on whichever context completes the promise:
//! the calling task for the manager-local shortcut, the frame-processing
//! task for a remote response. Continuations must therefore be cheap and
//! must not block; callers that need their own execution context should
//! `.await` the promise from a task instead of chaining closures.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::error::ClusterError;

#[cfg(test)]
mod tests;

/// Outcome a promise completes with.
pub type Outcome<T> = Result<T, ClusterError>;

type Continuation<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

enum State<T> {
    Pending {
        continuations: Vec<Continuation<T>>,
        wakers: Vec<Waker>,
    },
    Complete(Outcome<T>),
}

/// Asynchronous single-assignment result container.
///
/// Cloning yields another handle to the same underlying completion; the
/// handle is cheap to clone and safe to share across tasks.
pub struct Promise<T> {
    shared: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.shared.lock().expect("promise state poisoned") {
            State::Pending { continuations, .. } => {
                format!("Pending({} continuations)", continuations.len())
            }
            State::Complete(Ok(_)) => "Resolved".to_string(),
            State::Complete(Err(e)) => format!("Rejected({e})"),
        };
        write!(f, "Promise<{state}>")
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Create an unresolved promise.
    pub fn pending() -> Self {
        Self {
            shared: Arc::new(Mutex::new(State::Pending {
                continuations: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Create an already-resolved promise.
    ///
    /// Used for the manager's local-execution shortcut: no continuation
    /// is queued, a chained mapper runs immediately on the caller.
    pub fn of(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(State::Complete(Ok(value)))),
        }
    }

    /// Create an already-rejected promise.
    pub fn rejected(error: ClusterError) -> Self {
        Self {
            shared: Arc::new(Mutex::new(State::Complete(Err(error)))),
        }
    }

    /// Complete the promise with the given outcome.
    ///
    /// Returns `false` without touching the state if the promise was
    /// already complete; the first outcome remains observable. The
    /// drained continuations and wakers run on the calling context,
    /// outside the state lock.
    pub fn complete(&self, outcome: Outcome<T>) -> bool {
        let (continuations, wakers) = {
            let mut state = self.shared.lock().expect("promise state poisoned");
            match &mut *state {
                State::Complete(_) => return false,
                State::Pending {
                    continuations,
                    wakers,
                } => {
                    let continuations = std::mem::take(continuations);
                    let wakers = std::mem::take(wakers);
                    *state = State::Complete(outcome.clone());
                    (continuations, wakers)
                }
            }
        };
        for continuation in continuations {
            continuation(&outcome);
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Complete with a value. No-op (returning `false`) if already complete.
    pub fn resolve(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Complete with a failure. No-op (returning `false`) if already complete.
    pub fn reject(&self, error: ClusterError) -> bool {
        self.complete(Err(error))
    }

    /// Whether the promise has completed.
    pub fn is_complete(&self) -> bool {
        matches!(
            &*self.shared.lock().expect("promise state poisoned"),
            State::Complete(_)
        )
    }

    /// The outcome, if the promise has completed.
    pub fn try_outcome(&self) -> Option<Outcome<T>> {
        match &*self.shared.lock().expect("promise state poisoned") {
            State::Complete(outcome) => Some(outcome.clone()),
            State::Pending { .. } => None,
        }
    }

    /// Register a continuation.
    ///
    /// If the promise is still pending the continuation is queued and
    /// later invoked exactly once by the completing context. If it has
    /// already completed the continuation runs immediately on the
    /// calling context.
    pub fn on_complete(&self, continuation: impl FnOnce(&Outcome<T>) + Send + 'static) {
        let outcome = {
            let mut state = self.shared.lock().expect("promise state poisoned");
            match &mut *state {
                State::Pending { continuations, .. } => {
                    continuations.push(Box::new(continuation));
                    return;
                }
                State::Complete(outcome) => outcome.clone(),
            }
        };
        continuation(&outcome);
    }

    /// Derive a promise by mapping the resolved value.
    ///
    /// If this promise rejects, the derived promise rejects with the
    /// same error and the mapper is never invoked. The mapper runs on
    /// the completing context.
    pub fn then<U, F>(&self, mapper: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let derived = Promise::pending();
        let completer = derived.clone();
        self.on_complete(move |outcome| match outcome {
            Ok(value) => {
                completer.resolve(mapper(value.clone()));
            }
            Err(error) => {
                completer.reject(error.clone());
            }
        });
        derived
    }

    /// Derive a promise by mapping the resolved value fallibly.
    ///
    /// A mapper failure rejects the derived promise with that failure;
    /// it never escapes as an unhandled fault. Parent rejection skips
    /// the mapper, as with [`Promise::then`].
    pub fn then_result<U, F>(&self, mapper: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Outcome<U> + Send + 'static,
    {
        let derived = Promise::pending();
        let completer = derived.clone();
        self.on_complete(move |outcome| match outcome {
            Ok(value) => {
                completer.complete(mapper(value.clone()));
            }
            Err(error) => {
                completer.reject(error.clone());
            }
        });
        derived
    }
}

impl<T: Clone + Send + 'static> Future for Promise<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.lock().expect("promise state poisoned");
        match &mut *state {
            State::Complete(outcome) => Poll::Ready(outcome.clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
