// Substitution: symbol-for-symbol, pair-for-pair, pair-for-pair-set, and
// pair-for-graph splicing, plus free insertion.

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::SymbolId;

/// Which side(s) of a transition [`substitute_symbol`] rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
    Both,
}

/// Rewrite every occurrence of `old` with `new` on the given `side` of every
/// transition in `g`. O(E).
pub fn substitute_symbol(g: &Graph, old: SymbolId, new: SymbolId, side: Side) -> Graph {
    let mut out = g.clone();
    for idx in 0..out.num_states() {
        if let Ok(ts) = out.transitions_mut(StateId(idx as u32)) {
            for t in ts.iter_mut() {
                if (side == Side::Input || side == Side::Both) && t.input == old {
                    t.input = new;
                }
                if (side == Side::Output || side == Side::Both) && t.output == old {
                    t.output = new;
                }
            }
        }
    }
    out.insert_symbol(new);
    out.prune_alphabet(false);
    out
}

/// Rewrite every transition labeled `(old_in, old_out)` to `(new_in, new_out)`.
pub fn substitute_pair(g: &Graph, old: (SymbolId, SymbolId), new: (SymbolId, SymbolId)) -> Graph {
    let mut out = g.clone();
    for idx in 0..out.num_states() {
        if let Ok(ts) = out.transitions_mut(StateId(idx as u32)) {
            for t in ts.iter_mut() {
                if (t.input, t.output) == old {
                    t.input = new.0;
                    t.output = new.1;
                }
            }
        }
    }
    out.insert_symbol(new.0);
    out.insert_symbol(new.1);
    out.prune_alphabet(false);
    out
}

/// Replace every transition labeled `old` with one transition per pair in
/// `replacements`, all sharing the original source/target/weight. When
/// `replacements` is empty, matching transitions are simply removed. New
/// pairs are added to the alphabet.
pub fn substitute_pair_with_pair_set(g: &Graph, old: (SymbolId, SymbolId), replacements: &[(SymbolId, SymbolId)]) -> Graph {
    let mut out = Graph::with_name(g.name.clone());
    for &sym in g.alphabet() {
        out.insert_symbol(sym);
    }
    for &(a, b) in replacements {
        out.insert_symbol(a);
        out.insert_symbol(b);
    }
    for _ in 1..g.num_states() {
        out.add_state();
    }
    for idx in 0..g.num_states() {
        let s = StateId(idx as u32);
        for t in g.transitions(s).expect("idx ranges over g's own states") {
            if (t.input, t.output) == old {
                for &(a, b) in replacements {
                    out.add_transition(s, Transition::new(t.target, a, b, t.weight), false);
                }
            } else {
                out.add_transition(s, *t, false);
            }
        }
        if let Some(w) = g.final_weight(s) {
            out.set_final(s, w);
        }
    }
    out.prune_alphabet(false);
    out
}

/// The hard case: splice a fresh copy of `replacement` into `g` wherever a
/// transition labeled `old` occurs. For each such transition `(src, old_in,
/// old_out, w)`, add an epsilon from `src` to the offset initial state of a
/// fresh copy of `replacement` (weight `w`), and from every final state of
/// that copy an epsilon to the transition's original target (weight =
/// that copy's final weight). The original transition is removed.
/// Alphabets are unioned.
pub fn substitute_pair_with_graph(g: &Graph, old: (SymbolId, SymbolId), replacement: &Graph) -> Graph {
    use wfst_core::symbol::EPSILON_ID;

    let mut out = Graph::with_name(g.name.clone());
    for &sym in g.alphabet() {
        out.insert_symbol(sym);
    }
    for &sym in replacement.alphabet() {
        out.insert_symbol(sym);
    }
    for _ in 1..g.num_states() {
        out.add_state();
    }
    for idx in 0..g.num_states() {
        let s = StateId(idx as u32);
        for t in g.transitions(s).expect("idx ranges over g's own states") {
            if (t.input, t.output) == old {
                let offset = out.num_states() as u32;
                for _ in 0..replacement.num_states() {
                    out.add_state();
                }
                for ridx in 0..replacement.num_states() {
                    let rs = StateId(ridx as u32);
                    for rt in replacement.transitions(rs).expect("ridx ranges over replacement's own states") {
                        out.add_transition(
                            StateId(offset + ridx as u32),
                            Transition::new(StateId(offset + rt.target.0), rt.input, rt.output, rt.weight),
                            true,
                        );
                    }
                }
                out.add_transition(s, Transition::new(StateId(offset), EPSILON_ID, EPSILON_ID, t.weight), false);
                for (rfinal, rweight) in replacement.final_weights() {
                    out.add_transition(
                        StateId(offset + rfinal.0),
                        Transition::new(t.target, EPSILON_ID, EPSILON_ID, rweight),
                        false,
                    );
                }
            } else {
                out.add_transition(s, Transition::new(t.target, t.input, t.output, t.weight), false);
            }
        }
        if let Some(w) = g.final_weight(s) {
            out.set_final(s, w);
        }
    }
    out
}

/// Add a self-loop transition `(sym_in, sym_out, weight)` at every state.
pub fn insert_freely(g: &Graph, pair: (SymbolId, SymbolId), weight: wfst_core::weight::Weight) -> Graph {
    let mut out = g.clone();
    for idx in 0..out.num_states() {
        out.add_transition(StateId(idx as u32), Transition::new(StateId(idx as u32), pair.0, pair.1, weight), true);
    }
    out
}

/// Insert a whole graph freely at every state: equivalent to substituting a
/// fresh marker pair `M:M` for `replacement` and then freely inserting
/// `M:M` everywhere.
pub fn insert_graph_freely(g: &Graph, marker: (SymbolId, SymbolId), replacement: &Graph) -> Graph {
    let looped = insert_freely(g, marker, wfst_core::weight::Weight::ONE);
    substitute_pair_with_graph(&looped, marker, replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::{SymbolTable, Weight};

    #[test]
    fn substitute_symbol_rewrites_matching_side() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let b = symtab.intern("b").unwrap();
        let c = symtab.intern("c").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, b, Weight::ONE), true);
        let out = substitute_symbol(&g, a, c, Side::Input);
        let t = &out.transitions(StateId(0)).unwrap()[0];
        assert_eq!(t.input, c);
        assert_eq!(t.output, b);
    }

    #[test]
    fn substitute_pair_rewrites_exact_pair() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let b = symtab.intern("b").unwrap();
        let c = symtab.intern("c").unwrap();
        let d = symtab.intern("d").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, b, Weight::ONE), true);
        let out = substitute_pair(&g, (a, b), (c, d));
        let t = &out.transitions(StateId(0)).unwrap()[0];
        assert_eq!((t.input, t.output), (c, d));
    }

    #[test]
    fn substitute_pair_with_pair_set_fans_out_transitions() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let b = symtab.intern("b").unwrap();
        let c = symtab.intern("c").unwrap();
        let d = symtab.intern("d").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);
        let out = substitute_pair_with_pair_set(&g, (a, a), &[(b, b), (c, d)]);
        assert_eq!(out.transitions(StateId(0)).unwrap().len(), 2);
    }

    #[test]
    fn substitute_pair_with_pair_set_empty_removes_transition() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight::ONE), true);
        let out = substitute_pair_with_pair_set(&g, (a, a), &[]);
        assert!(out.transitions(StateId(0)).unwrap().is_empty());
    }

    #[test]
    fn substitute_pair_with_graph_splices_replacement() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let x = symtab.intern("x").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);

        let mut rep = Graph::new();
        rep.add_transition(StateId(0), Transition::new(StateId(1), x, x, Weight(2.0)), true);
        rep.set_final(StateId(1), Weight::ONE);

        let out = substitute_pair_with_graph(&g, (a, a), &rep);
        // state 0 should now only have an epsilon bridge into the spliced copy
        let ts = out.transitions(StateId(0)).unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].input, wfst_core::symbol::EPSILON_ID);
    }

    #[test]
    fn insert_freely_adds_self_loop_at_every_state() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let m = symtab.intern("m").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight::ONE), true);
        let out = insert_freely(&g, (m, m), Weight::ONE);
        assert!(out.transitions(StateId(0)).unwrap().iter().any(|t| t.input == m && t.target == StateId(0)));
        assert!(out.transitions(StateId(1)).unwrap().iter().any(|t| t.input == m && t.target == StateId(1)));
    }
}
