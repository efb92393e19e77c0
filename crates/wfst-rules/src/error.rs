// Error taxonomy for the rule compiler.

use wfst_core::symbol::SymbolId;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RuleCompileError {
    #[error(transparent)]
    Core(#[from] wfst_core::CoreError),

    #[error(transparent)]
    Op(#[from] wfst_ops::OpError),

    /// A rule's center referenced a pair not declared in the grammar's
    /// alphabet section. Fatal.
    #[error("rule {rule:?}: pair {input}:{output} is not declared in the alphabet")]
    SymbolNotInAlphabet {
        rule: String,
        input: SymbolId,
        output: SymbolId,
    },

    /// Two same-operator-class rules license or require the center at
    /// overlapping positions with different outputs, and conflict
    /// resolution was disabled (or could not determine which context
    /// subsumes the other).
    #[error("rule {rule_a:?} conflicts with rule {rule_b:?} on input {witness:?}")]
    RuleConflict {
        rule_a: String,
        rule_b: String,
        witness: String,
    },
}

/// Non-fatal outcomes surfaced alongside a successfully compiled grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// `rule` was fully subsumed by a sibling rule during conflict
    /// resolution and contributed nothing to the compiled grammar.
    RuleDropped { rule: String },
    /// The compiled grammar's path language is empty. Not an error -- an
    /// empty transducer is a legitimate result -- but worth surfacing.
    EmptyGrammar,
}
