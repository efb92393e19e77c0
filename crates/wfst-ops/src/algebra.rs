// Basic regular operations over weighted transducers: union, concatenation,
// Kleene star/plus, reverse, invert.

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::EPSILON_ID;
use wfst_core::weight::Weight;

use crate::harmonize::harmonize_copy;

/// Offset every `StateId` referenced by `g`'s transitions and final weights
/// by `offset`, and append the shifted states onto `into`. Returns the
/// id `g`'s old state 0 now has in `into`.
fn splice_in(into: &mut Graph, g: &Graph) -> StateId {
    let offset = into.num_states() as u32;
    for idx in 0..g.num_states() {
        let new_id = into.add_state();
        debug_assert_eq!(new_id.0, offset + idx as u32);
    }
    for idx in 0..g.num_states() {
        let src = StateId(idx as u32);
        for t in g.transitions(src).expect("idx ranges over g's own states") {
            into.add_transition(
                StateId(offset + src.0),
                Transition::new(StateId(offset + t.target.0), t.input, t.output, t.weight),
                true,
            );
        }
        if let Some(w) = g.final_weight(src) {
            into.set_final(StateId(offset + src.0), w);
        }
    }
    StateId(offset)
}

/// `a ∪ b`: a new initial state epsilon-transitions into (shifted copies of)
/// both `a`'s and `b`'s initial states.
pub fn union(a: &Graph, b: &Graph) -> Graph {
    let (a, b) = harmonize_copy(a, b);
    let mut out = Graph::with_name(format!("({}|{})", a.name, b.name));
    out.add_state(); // replaces the default state 0 as the shared initial state
    let a0 = splice_in(&mut out, &a);
    let b0 = splice_in(&mut out, &b);
    out.add_transition(StateId(0), Transition::new(a0, EPSILON_ID, EPSILON_ID, Weight::ONE), false);
    out.add_transition(StateId(0), Transition::new(b0, EPSILON_ID, EPSILON_ID, Weight::ONE), false);
    out
}

/// `a · b`: every final state of (a shifted copy of) `a` gets an
/// epsilon-transition into `b`'s initial state, with `a`'s final weight
/// carried onto that transition and `a`'s finality cleared.
pub fn concat(a: &Graph, b: &Graph) -> Graph {
    let (a, b) = harmonize_copy(a, b);
    let mut out = Graph::with_name(format!("({}{})", a.name, b.name));
    out.add_state();
    let a0 = splice_in(&mut out, &a);
    let b0 = splice_in(&mut out, &b);
    let a_finals: Vec<(StateId, Weight)> = a
        .final_weights()
        .map(|(s, w)| (StateId(a0.0 + s.0), w))
        .collect();
    for (s, w) in a_finals {
        out.unset_final(s);
        out.add_transition(s, Transition::new(b0, EPSILON_ID, EPSILON_ID, w), false);
    }
    out.add_transition(StateId(0), Transition::new(a0, EPSILON_ID, EPSILON_ID, Weight::ONE), false);
    out
}

/// `a*`: Kleene star. A new initial/final state epsilon-transitions into a
/// shifted copy of `a`, and every final state of that copy loops back to the
/// new initial state.
pub fn star(a: &Graph) -> Graph {
    let mut out = Graph::with_name(format!("({})*", a.name));
    out.set_final(StateId(0), Weight::ONE);
    let a0 = splice_in(&mut out, a);
    out.add_transition(StateId(0), Transition::new(a0, EPSILON_ID, EPSILON_ID, Weight::ONE), false);
    let a_finals: Vec<(StateId, Weight)> = a
        .final_weights()
        .map(|(s, w)| (StateId(a0.0 + s.0), w))
        .collect();
    for (s, w) in a_finals {
        out.add_transition(s, Transition::new(StateId(0), EPSILON_ID, EPSILON_ID, w), false);
    }
    out
}

/// `a+`: one or more repetitions. `concat(a, star(a))`, matching the
/// identity `a+ = a · a*` used throughout the rest of this module rather
/// than a separate bespoke construction.
pub fn plus(a: &Graph) -> Graph {
    concat(a, &star(a))
}

/// Reverse every transition and swap the role of the initial and final
/// states: a new single initial state epsilon-transitions (carrying the
/// old final weight) into (shifted) copies of every old final state, every
/// transition runs backwards, and the (shifted) old initial state becomes
/// the sole new final state (with `Weight::ONE`).
pub fn reverse(a: &Graph) -> Graph {
    let mut out = Graph::with_name(format!("reverse({})", a.name));
    // Old state `i` is shifted to `i + 1`; state 0 is a brand new initial
    // state distinct from every shifted old state.
    for _ in 0..a.num_states() {
        out.add_state();
    }
    let shift = |s: StateId| StateId(s.0 + 1);

    out.set_final(shift(StateId(0)), Weight::ONE);
    for idx in 0..a.num_states() {
        let src = StateId(idx as u32);
        for t in a.transitions(src).expect("idx ranges over a's own states") {
            out.add_transition(shift(t.target), Transition::new(shift(src), t.input, t.output, t.weight), true);
        }
    }
    for (s, w) in a.final_weights() {
        out.add_transition(StateId(0), Transition::new(shift(s), EPSILON_ID, EPSILON_ID, w), false);
    }
    out
}

/// Swap input and output on every transition.
pub fn invert(a: &Graph) -> Graph {
    let mut out = a.clone();
    for idx in 0..out.num_states() {
        let s = StateId(idx as u32);
        if let Ok(ts) = out.transitions_mut(s) {
            for t in ts.iter_mut() {
                std::mem::swap(&mut t.input, &mut t.output);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::SymbolTable;

    fn single_symbol_graph(symtab: &mut SymbolTable, s: &str) -> Graph {
        let sym = symtab.intern(s).unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), sym, sym, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);
        g
    }

    fn accepts(g: &Graph, symtab: &SymbolTable, word: &[&str]) -> bool {
        fn walk(g: &Graph, symtab: &SymbolTable, s: StateId, word: &[&str]) -> bool {
            if word.is_empty() {
                if g.is_final(s) {
                    return true;
                }
            }
            for t in g.transitions(s).unwrap() {
                if t.input == EPSILON_ID && t.output == EPSILON_ID {
                    if walk(g, symtab, t.target, word) {
                        return true;
                    }
                } else if let Some((first, rest)) = word.split_first() {
                    if symtab.lookup(t.input) == Some(*first) && walk(g, symtab, t.target, rest) {
                        return true;
                    }
                }
            }
            false
        }
        walk(g, symtab, StateId(0), word)
    }

    #[test]
    fn union_accepts_either_branch() {
        let mut symtab = SymbolTable::new();
        let a = single_symbol_graph(&mut symtab, "a");
        let b = single_symbol_graph(&mut symtab, "b");
        let u = union(&a, &b);
        assert!(accepts(&u, &symtab, &["a"]));
        assert!(accepts(&u, &symtab, &["b"]));
        assert!(!accepts(&u, &symtab, &["c"]));
    }

    #[test]
    fn concat_accepts_sequence() {
        let mut symtab = SymbolTable::new();
        let a = single_symbol_graph(&mut symtab, "a");
        let b = single_symbol_graph(&mut symtab, "b");
        let c = concat(&a, &b);
        assert!(accepts(&c, &symtab, &["a", "b"]));
        assert!(!accepts(&c, &symtab, &["a"]));
        assert!(!accepts(&c, &symtab, &["b", "a"]));
    }

    #[test]
    fn star_accepts_empty_and_repetitions() {
        let mut symtab = SymbolTable::new();
        let a = single_symbol_graph(&mut symtab, "a");
        let s = star(&a);
        assert!(accepts(&s, &symtab, &[]));
        assert!(accepts(&s, &symtab, &["a"]));
        assert!(accepts(&s, &symtab, &["a", "a", "a"]));
    }

    #[test]
    fn plus_rejects_empty_but_accepts_repetitions() {
        let mut symtab = SymbolTable::new();
        let a = single_symbol_graph(&mut symtab, "a");
        let p = plus(&a);
        assert!(!accepts(&p, &symtab, &[]));
        assert!(accepts(&p, &symtab, &["a"]));
        assert!(accepts(&p, &symtab, &["a", "a"]));
    }

    #[test]
    fn invert_swaps_input_and_output() {
        let mut symtab = SymbolTable::new();
        let a_sym = symtab.intern("a").unwrap();
        let b_sym = symtab.intern("b").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a_sym, b_sym, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);
        let inv = invert(&g);
        let t = &inv.transitions(StateId(0)).unwrap()[0];
        assert_eq!(t.input, b_sym);
        assert_eq!(t.output, a_sym);
    }

    #[test]
    fn reverse_accepts_reversed_word() {
        let mut symtab = SymbolTable::new();
        let a_sym = symtab.intern("a").unwrap();
        let b_sym = symtab.intern("b").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a_sym, a_sym, Weight::ONE), true);
        g.add_transition(StateId(1), Transition::new(StateId(2), b_sym, b_sym, Weight::ONE), true);
        g.set_final(StateId(2), Weight::ONE);
        let r = reverse(&g);
        assert!(accepts(&r, &symtab, &["b", "a"]));
        assert!(!accepts(&r, &symtab, &["a", "b"]));
        assert!(!accepts(&r, &symtab, &[]));
    }
}
