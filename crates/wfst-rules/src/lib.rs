//! The two-level rule grammar compiler (C5), built entirely out of the
//! operator kernel (`wfst_ops`): a rule's licensed-context language is
//! expressed as an ordinary transducer, spliced around a diamond-bracketed
//! center via [`wfst_ops::substitute::substitute_pair_with_graph`], and
//! compiled per operator with `complement`/`subtract`/`intersect`.
//!
//! # Architecture
//!
//! - [`source`] -- the construction-API grammar types (`GrammarSource`,
//!   `RuleSource`, `CenterSpec`, `RuleOp`); a `ContextSpec` is just a
//!   [`wfst_core::Graph`] the caller builds.
//! - [`compile`] -- per-rule compilation: Σ*/Σ, center and context-occasion
//!   construction, and the four operator formulas.
//! - [`conflict`] -- conflict detection and resolution between same-class
//!   rules sharing a center-input symbol.
//! - [`pairs`] -- the composite "feasible pair" symbol encoding the whole
//!   pipeline runs over, since `complement` is defined on acceptors.
//! - [`error`] -- this crate's error and warning types.

pub mod compile;
pub mod conflict;
pub mod error;
pub mod pairs;
pub mod source;

use wfst_core::graph::Graph;
use wfst_core::symbol::SymbolTable;

use wfst_ops::cancellation::Cancellation;

use compile::{compile_rule, composite_sigma_one, composite_sigma_star, intersect_sorted, merged_occasion, sigma_star};
use conflict::resolve_conflicts_for_op;
use error::{CompileWarning, RuleCompileError};
use pairs::{PairTable, decode_composite};
use source::{GrammarSource, RuleOp};

/// Compile a grammar into a single transducer: the intersection of every
/// rule, each rule itself compiled from its center and contexts per its
/// operator. `resolve_conflicts` governs whether same-class rules sharing
/// a center-input symbol are automatically narrowed (see [`conflict`]) or
/// surfaced as a fatal [`RuleCompileError::RuleConflict`].
///
/// A grammar with no rules compiles to Σ* (every declared pair, freely).
pub fn compile_grammar(
    grammar: &GrammarSource,
    symtab: &mut SymbolTable,
    resolve_conflicts: bool,
    cancel: &mut Cancellation,
) -> Result<(Graph, Vec<CompileWarning>), RuleCompileError> {
    for rule in &grammar.rules {
        for (input, output) in rule.center.pairs() {
            let declared = |sym| grammar.alphabet.iter().any(|&(i, o)| i == sym || o == sym) || grammar.diacritics.contains(&sym);
            if !declared(input) || !declared(output) {
                return Err(RuleCompileError::SymbolNotInAlphabet {
                    rule: rule.name.clone(),
                    input,
                    output,
                });
            }
        }
    }

    let sigma_star_g = sigma_star(&grammar.alphabet, &grammar.diacritics);
    if grammar.rules.is_empty() {
        return Ok((sigma_star_g, Vec::new()));
    }

    let mut table = PairTable::new();
    let sigma_star_c = composite_sigma_star(&grammar.alphabet, &grammar.diacritics, &mut table, symtab);
    let sigma_one_c = composite_sigma_one(&grammar.alphabet, &mut table, symtab);

    let diamond = symtab.intern("@_RULE_DIAMOND_@")?;
    let gap = symtab.intern("@_RULE_GAP_@")?;

    let mut occasions: Vec<Graph> = Vec::with_capacity(grammar.rules.len());
    for rule in &grammar.rules {
        occasions.push(merged_occasion(&rule.contexts, gap, &sigma_star_c, &mut table, symtab));
    }
    let mut dropped = vec![false; grammar.rules.len()];
    let mut warnings = Vec::new();

    resolve_conflicts_for_op(grammar, RuleOp::RightArrow, &mut occasions, &mut dropped, resolve_conflicts, &table, symtab, &mut warnings, cancel)?;
    resolve_conflicts_for_op(grammar, RuleOp::LeftArrow, &mut occasions, &mut dropped, resolve_conflicts, &table, symtab, &mut warnings, cancel)?;

    let mut compiled: Vec<Graph> = Vec::new();
    for (idx, rule) in grammar.rules.iter().enumerate() {
        if dropped[idx] {
            continue;
        }
        compiled.push(compile_rule(rule, &occasions[idx], &sigma_star_c, &sigma_one_c, diamond, gap, &mut table, symtab, cancel)?);
    }

    let mut iter = compiled.into_iter();
    let grammar_graph_c = match iter.next() {
        Some(first) => iter.fold(first, |acc, g| intersect_sorted(&acc, &g)),
        None => sigma_star_c,
    };
    let grammar_graph = decode_composite(&grammar_graph_c, &table);

    if compile::is_empty_language(&grammar_graph) {
        warnings.push(CompileWarning::EmptyGrammar);
    }
    Ok((grammar_graph, warnings))
}
