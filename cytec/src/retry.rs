//! Bounded retry over transient errors.
//!
//! Every I/O loop in the session layer has the same shape: try an action, on
//! a transient error run a recovery step (reconnect) and try again, give up
//! after a fixed number of attempts. [`RetryPolicy::run`] owns that shape so
//! attempt counting never mixes with the protocol logic.

/// Result of one attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// The loop is finished with a value.
    Done(T),
    /// The attempt made progress but the loop must go on.
    Continue,
}

/// Final result of a bounded retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    /// An attempt returned [`Step::Done`].
    Success(T),
    /// Every attempt was consumed without reaching [`Step::Done`].
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Attempt budget for a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, recovery included.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` attempts.
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Run `action` until it is done, a fatal error occurs, or the budget is spent.
    ///
    /// - `Ok(Step::Done(v))` ends the loop with [`RetryOutcome::Success`].
    /// - `Ok(Step::Continue)` consumes the attempt and loops.
    /// - `Err(e)` with `is_transient(&e)` runs `recover` and consumes the attempt.
    ///   An error from `recover` is fatal.
    /// - Any other `Err(e)` is returned immediately.
    ///
    /// `state` is handed to both closures so they can share mutable access
    /// to the same resource.
    pub fn run<S, T, E, A, P, R>(
        &self,
        state: &mut S,
        mut action: A,
        is_transient: P,
        mut recover: R,
    ) -> Result<RetryOutcome<T>, E>
    where
        A: FnMut(&mut S, u32) -> Result<Step<T>, E>,
        P: Fn(&E) -> bool,
        R: FnMut(&mut S, E) -> Result<(), E>,
    {
        for attempt in 1..=self.max_attempts {
            match action(state, attempt) {
                Ok(Step::Done(value)) => return Ok(RetryOutcome::Success(value)),
                Ok(Step::Continue) => {}
                Err(error) if is_transient(&error) => recover(state, error)?,
                Err(error) => return Err(error),
            }
        }
        Ok(RetryOutcome::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
