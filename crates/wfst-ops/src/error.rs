// Error taxonomy for the operator kernel.

use wfst_core::CoreError;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OpError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Lookup ran out of epsilon-cycle budget without a resolution and no
    /// cycle limit was configured to cap it.
    #[error("infinitely ambiguous: {0}")]
    InfiniteAmbiguity(String),

    /// Path extraction was asked to assume acyclicity but the graph has a
    /// cycle reachable from the initial state.
    #[error("transducer is cyclic")]
    TransducerIsCyclic,

    /// A binary operator's precondition was violated (e.g. intersect/
    /// compose called on non-arc-sorted or non-deterministic input).
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// A long-running operation was cancelled via `Cancellation`.
    #[error("operation cancelled")]
    Cancelled,
}
