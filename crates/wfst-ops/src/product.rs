// Intersection and composition: product constructions over harmonized pairs
// of graphs.

use hashbrown::HashMap;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::{EPSILON_ID, SymbolId};
use wfst_core::weight::Weight;

use crate::harmonize::harmonize_copy;

/// Options governing [`compose`].
#[derive(Debug, Clone, Copy)]
pub struct ComposeConfig {
    /// Treat flag diacritics as epsilons on both tapes while composing, so
    /// that a flag diacritic on one side can pass through a transition on
    /// the other side that doesn't itself carry a matching flag. A per-call
    /// field rather than global state.
    pub flag_is_epsilon: bool,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        ComposeConfig { flag_is_epsilon: false }
    }
}

/// Intersection: the product automaton accepting only paths both `a` and
/// `b` accept with matching `(input, output)` labels, weight `a ⊗ b`.
/// Requires both inputs arc-sorted; callers must call
/// `Graph::sort_arcs` beforehand.
pub fn intersect(a: &Graph, b: &Graph) -> Graph {
    let (mut a, mut b) = harmonize_copy(a, b);
    // Harmonization appends wildcard-expansion arcs to the end of each
    // state's transition list without re-sorting; the merge-walk below
    // requires both lists arc-sorted.
    a.sort_arcs();
    b.sort_arcs();
    let mut out = Graph::with_name(format!("({}&{})", a.name, b.name));
    let mut state_of_pair: HashMap<(StateId, StateId), StateId> = HashMap::new();
    let mut agenda = Vec::new();

    let start = (StateId(0), StateId(0));
    state_of_pair.insert(start, StateId(0));
    agenda.push(start);
    if let (Some(wa), Some(wb)) = (a.final_weight(StateId(0)), b.final_weight(StateId(0))) {
        out.set_final(StateId(0), wa.otimes(wb));
    }

    while let Some((sa, sb)) = agenda.pop() {
        let out_state = state_of_pair[&(sa, sb)];
        let ta = a.transitions(sa).expect("sa came from the agenda");
        let tb = b.transitions(sb).expect("sb came from the agenda");
        // merge-walk two arc-sorted lists for matching (input, output)
        let mut i = 0;
        let mut j = 0;
        while i < ta.len() && j < tb.len() {
            let (x, y) = (ta[i], tb[j]);
            match (x.input, x.output).cmp(&(y.input, y.output)) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    // advance over every run sharing this (input, output) pair on each side
                    let i_start = i;
                    while i < ta.len() && (ta[i].input, ta[i].output) == (x.input, x.output) {
                        i += 1;
                    }
                    let j_start = j;
                    while j < tb.len() && (tb[j].input, tb[j].output) == (x.input, x.output) {
                        j += 1;
                    }
                    for xi in &ta[i_start..i] {
                        for yj in &tb[j_start..j] {
                            let pair = (xi.target, yj.target);
                            let target = *state_of_pair.entry(pair).or_insert_with(|| {
                                let s = out.add_state();
                                agenda.push(pair);
                                s
                            });
                            out.add_transition(
                                out_state,
                                Transition::new(target, xi.input, xi.output, xi.weight.otimes(yj.weight)),
                                true,
                            );
                            if let (Some(wa), Some(wb)) = (a.final_weight(pair.0), b.final_weight(pair.1)) {
                                out.set_final(target, wa.otimes(wb));
                            }
                        }
                    }
                }
            }
        }
    }
    out
}

/// Composition: `A ∘ B`, matching `A`'s output tape against `B`'s input
/// tape. Handles epsilons on either tape with the standard 3-state filter
/// so that an epsilon-epsilon loop between the two machines
/// cannot be traversed in more than one order, avoiding spurious duplicate
/// paths.
pub fn compose(a: &Graph, b: &Graph, cfg: ComposeConfig) -> Graph {
    compose_with_flags(a, b, cfg, None)
}

/// As [`compose`], but with `cfg.flag_is_epsilon` additionally treating any
/// symbol in `flag_symbols` (typically [`Graph::get_flags`] on whichever
/// side carries diacritics) as if it were `EPSILON_ID` when matching `A`'s
/// output tape against `B`'s input tape.
pub fn compose_with_flags(a: &Graph, b: &Graph, cfg: ComposeConfig, flag_symbols: Option<&hashbrown::HashSet<SymbolId>>) -> Graph {
    let (a, b) = harmonize_copy(a, b);
    let is_flag_epsilon = |sym: SymbolId| cfg.flag_is_epsilon && flag_symbols.is_some_and(|fs| fs.contains(&sym));
    let mut out = Graph::with_name(format!("({}.o.{})", a.name, b.name));
    // filter_state in {0, 1, 2}: 0 = both tapes may emit epsilon freely,
    // 1 = only A's epsilon-on-output may fire (A is "ahead"), 2 = only B's
    // epsilon-on-input may fire (B is "ahead"). Standard epsilon filter.
    let mut state_of: HashMap<(StateId, StateId, u8), StateId> = HashMap::new();
    let mut agenda = Vec::new();

    let start = (StateId(0), StateId(0), 0u8);
    state_of.insert(start, StateId(0));
    agenda.push(start);
    if let (Some(wa), Some(wb)) = (a.final_weight(StateId(0)), b.final_weight(StateId(0))) {
        out.set_final(StateId(0), wa.otimes(wb));
    }

    while let Some((sa, sb, filter)) = agenda.pop() {
        let out_state = state_of[&(sa, sb, filter)];
        let ta = a.transitions(sa).expect("sa came from the agenda");
        let tb = b.transitions(sb).expect("sb came from the agenda");

        for x in ta {
            let x_epsilon_like = x.output == EPSILON_ID || is_flag_epsilon(x.output);
            // A emits epsilon (or an epsilon-treated flag) on its output
            // tape: only allowed to continue "in A" when B hasn't just
            // taken a matching real transition (filter != 2).
            if x_epsilon_like && filter != 2 {
                let pair = (x.target, sb, 1u8);
                add_compose_transition(&mut out, &mut state_of, &mut agenda, out_state, pair, x.input, EPSILON_ID, x.weight, &a, &b);
            }
            for y in tb {
                let y_epsilon_like = y.input == EPSILON_ID || is_flag_epsilon(y.input);
                if y_epsilon_like && filter != 1 {
                    let pair = (sa, y.target, 2u8);
                    add_compose_transition(&mut out, &mut state_of, &mut agenda, out_state, pair, EPSILON_ID, y.output, y.weight, &a, &b);
                    continue;
                }
                if !x_epsilon_like && x.output == y.input {
                    let pair = (x.target, y.target, 0u8);
                    add_compose_transition(&mut out, &mut state_of, &mut agenda, out_state, pair, x.input, y.output, x.weight.otimes(y.weight), &a, &b);
                }
            }
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn add_compose_transition(
    out: &mut Graph,
    state_of: &mut HashMap<(StateId, StateId, u8), StateId>,
    agenda: &mut Vec<(StateId, StateId, u8)>,
    src: StateId,
    pair: (StateId, StateId, u8),
    input: SymbolId,
    output: SymbolId,
    weight: Weight,
    a: &Graph,
    b: &Graph,
) {
    let target = *state_of.entry(pair).or_insert_with(|| {
        let s = out.add_state();
        agenda.push(pair);
        s
    });
    out.add_transition(src, Transition::new(target, input, output, weight), true);
    if let (Some(wa), Some(wb)) = (a.final_weight(pair.0), b.final_weight(pair.1)) {
        out.set_final(target, wa.otimes(wb));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::SymbolTable;

    #[test]
    fn intersect_keeps_only_shared_labeled_paths() {
        let mut symtab = SymbolTable::new();
        let a_sym = symtab.intern("a").unwrap();
        let b_sym = symtab.intern("b").unwrap();

        let mut g1 = Graph::new();
        g1.add_transition(StateId(0), Transition::new(StateId(1), a_sym, a_sym, Weight(1.0)), true);
        g1.set_final(StateId(1), Weight::ONE);
        g1.sort_arcs();

        let mut g2 = Graph::new();
        g2.add_transition(StateId(0), Transition::new(StateId(1), a_sym, a_sym, Weight(2.0)), true);
        g2.add_transition(StateId(0), Transition::new(StateId(1), b_sym, b_sym, Weight(1.0)), true);
        g2.set_final(StateId(1), Weight::ONE);
        g2.sort_arcs();

        let i = intersect(&g1, &g2);
        let ts = i.transitions(StateId(0)).unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].input, a_sym);
        assert_eq!(ts[0].weight, Weight(3.0));
    }

    #[test]
    fn compose_chains_matching_tapes() {
        let mut symtab = SymbolTable::new();
        let a_sym = symtab.intern("a").unwrap();
        let b_sym = symtab.intern("b").unwrap();
        let c_sym = symtab.intern("c").unwrap();

        let mut g1 = Graph::new();
        g1.add_transition(StateId(0), Transition::new(StateId(1), a_sym, b_sym, Weight(1.0)), true);
        g1.set_final(StateId(1), Weight::ONE);

        let mut g2 = Graph::new();
        g2.add_transition(StateId(0), Transition::new(StateId(1), b_sym, c_sym, Weight(2.0)), true);
        g2.set_final(StateId(1), Weight::ONE);

        let comp = compose(&g1, &g2, ComposeConfig::default());
        let ts = comp.transitions(StateId(0)).unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].input, a_sym);
        assert_eq!(ts[0].output, c_sym);
        assert_eq!(ts[0].weight, Weight(3.0));
        assert!(comp.is_final(ts[0].target));
    }

    #[test]
    fn compose_with_no_matching_output_input_is_empty() {
        let mut symtab = SymbolTable::new();
        let a_sym = symtab.intern("a").unwrap();
        let b_sym = symtab.intern("b").unwrap();

        let mut g1 = Graph::new();
        g1.add_transition(StateId(0), Transition::new(StateId(1), a_sym, a_sym, Weight::ONE), true);
        g1.set_final(StateId(1), Weight::ONE);

        let mut g2 = Graph::new();
        g2.add_transition(StateId(0), Transition::new(StateId(1), b_sym, b_sym, Weight::ONE), true);
        g2.set_final(StateId(1), Weight::ONE);

        let comp = compose(&g1, &g2, ComposeConfig::default());
        assert!(comp.transitions(StateId(0)).unwrap().is_empty());
    }

    #[test]
    fn compose_with_flags_lets_a_flag_on_a_pass_through_b() {
        let mut symtab = SymbolTable::new();
        let flag = symtab.intern("@P.CASE.NOM@").unwrap();
        let a_sym = symtab.intern("a").unwrap();
        let c_sym = symtab.intern("c").unwrap();

        let mut g1 = Graph::new();
        g1.add_transition(StateId(0), Transition::new(StateId(1), a_sym, flag, Weight::ONE), true);
        g1.add_transition(StateId(1), Transition::new(StateId(2), a_sym, c_sym, Weight::ONE), true);
        g1.set_final(StateId(2), Weight::ONE);

        let mut g2 = Graph::new();
        g2.add_transition(StateId(0), Transition::new(StateId(1), c_sym, c_sym, Weight::ONE), true);
        g2.set_final(StateId(1), Weight::ONE);

        let mut flags = hashbrown::HashSet::new();
        flags.insert(flag);
        let cfg = ComposeConfig { flag_is_epsilon: true };
        let comp = compose_with_flags(&g1, &g2, cfg, Some(&flags));
        // Without flag_is_epsilon, g2 (whose alphabet has no `flag` symbol)
        // would never match g1's first transition and the whole path dies.
        let without_flags = compose(&g1, &g2, ComposeConfig::default());
        assert!(without_flags.transitions(StateId(0)).unwrap().is_empty());
        assert!(!comp.transitions(StateId(0)).unwrap().is_empty());
    }
}
