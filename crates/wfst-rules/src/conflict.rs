// Conflict detection and resolution between same-operator-class rules that
// share a center-input-symbol but disagree on output.

use wfst_core::graph::Graph;
use wfst_core::symbol::SymbolTable;

use wfst_ops::cancellation::Cancellation;
use wfst_ops::product::intersect;
use wfst_ops::setops::subtract;

use crate::compile::{is_empty_language, shortest_accepting_string};
use crate::error::{CompileWarning, RuleCompileError};
use crate::pairs::{PairTable, decode_composite};
use crate::source::{GrammarSource, RuleOp};

/// Check every pair of same-class (`op`) rules sharing a center-input
/// symbol with differing outputs. `occasions[i]` is rule `i`'s current
/// (possibly already-narrowed) context-occasion graph; conflicts narrow the
/// more general rule's entry in place, dropping it (and recording a
/// [`CompileWarning::RuleDropped`]) if narrowing empties it out.
pub fn resolve_conflicts_for_op(
    grammar: &GrammarSource,
    op: RuleOp,
    occasions: &mut [Graph],
    dropped: &mut [bool],
    resolve: bool,
    table: &PairTable,
    symtab: &SymbolTable,
    warnings: &mut Vec<CompileWarning>,
    cancel: &mut Cancellation,
) -> Result<(), RuleCompileError> {
    let indices: Vec<usize> = grammar
        .rules
        .iter()
        .enumerate()
        .filter(|(_, r)| r.op == op)
        .map(|(i, _)| i)
        .collect();

    for a in 0..indices.len() {
        for b in (a + 1)..indices.len() {
            let i = indices[a];
            let j = indices[b];
            if dropped[i] || dropped[j] {
                continue;
            }
            let ri = &grammar.rules[i];
            let rj = &grammar.rules[j];
            let Some(shared) = ri.center.input_symbols().into_iter().find(|s| rj.center.input_symbols().contains(s)) else {
                continue;
            };
            if ri.center.output_for(shared) == rj.center.output_for(shared) {
                continue;
            }

            let overlap = intersect_sorted_pair(&occasions[i], &occasions[j]);
            if is_empty_language(&overlap) {
                continue;
            }

            let j_subset_of_i = is_empty_language(&subtract(&occasions[j], &occasions[i], cancel)?);
            let i_subset_of_j = is_empty_language(&subtract(&occasions[i], &occasions[j], cancel)?);

            if !resolve || (j_subset_of_i == i_subset_of_j) {
                // Either resolution is off, or neither rule's context
                // subsumes the other's -- an irreconcilable conflict.
                let witness = shortest_accepting_string(&decode_composite(&overlap, table), symtab).unwrap_or_default();
                return Err(RuleCompileError::RuleConflict {
                    rule_a: ri.name.clone(),
                    rule_b: rj.name.clone(),
                    witness,
                });
            }

            if j_subset_of_i {
                occasions[i] = subtract(&occasions[i], &occasions[j], cancel)?;
                if is_empty_language(&occasions[i]) {
                    dropped[i] = true;
                    warnings.push(CompileWarning::RuleDropped { rule: ri.name.clone() });
                }
            } else {
                occasions[j] = subtract(&occasions[j], &occasions[i], cancel)?;
                if is_empty_language(&occasions[j]) {
                    dropped[j] = true;
                    warnings.push(CompileWarning::RuleDropped { rule: rj.name.clone() });
                }
            }
        }
    }
    Ok(())
}

fn intersect_sorted_pair(a: &Graph, b: &Graph) -> Graph {
    let mut a2 = a.clone();
    let mut b2 = b.clone();
    a2.sort_arcs();
    b2.sort_arcs();
    intersect(&a2, &b2)
}
