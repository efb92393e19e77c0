// Error taxonomy for the symbol table and transition graph.

/// Errors raised by [`crate::symbol::SymbolTable`] and [`crate::graph::Graph`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// `intern("")` was attempted.
    #[error("cannot intern an empty symbol")]
    EmptySymbolError,

    /// A state index was used that does not exist in the graph.
    #[error("state index {state} out of bounds (graph has {len} states)")]
    StateIndexOutOfBounds { state: u32, len: u32 },

    /// A candidate flag diacritic symbol did not match `@[PNDRCU]\.FEATURE(\.VALUE)?@`.
    #[error("invalid flag diacritic: {0}")]
    InvalidFlagDiacritic(String),
}
