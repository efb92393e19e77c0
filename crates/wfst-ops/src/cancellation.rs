// Cooperative cancellation for long-running operators.

use std::time::Instant;

use crate::error::OpError;

/// How a long-running operator (determinize, minimize, grammar
/// compilation, lookup on cyclic input) should be interrupted.
pub enum Cancellation<'a> {
    None,
    Deadline(Instant),
    Predicate(&'a mut dyn FnMut() -> bool),
}

impl<'a> Cancellation<'a> {
    /// Check whether the operation should stop now. Call this at each
    /// agenda-pop / DFS-expansion point in a long-running operator.
    pub fn check(&mut self) -> Result<(), OpError> {
        let tripped = match self {
            Cancellation::None => false,
            Cancellation::Deadline(at) => Instant::now() >= *at,
            Cancellation::Predicate(f) => f(),
        };
        if tripped { Err(OpError::Cancelled) } else { Ok(()) }
    }
}

impl Default for Cancellation<'_> {
    fn default() -> Self {
        Cancellation::None
    }
}
