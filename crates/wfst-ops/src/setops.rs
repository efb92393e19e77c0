// Projection, complement, and subtraction over acceptor languages.

use hashbrown::HashSet;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::{DEFAULT_ID, EPSILON_ID, SymbolId};
use wfst_core::weight::Weight;

use crate::cancellation::Cancellation;
use crate::determinize::determinize;
use crate::error::OpError;
use crate::harmonize::harmonize_copy;

/// Which tape [`project`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionSide {
    Input,
    Output,
}

/// Turn `g` into an acceptor over the chosen tape: every transition's other
/// side is overwritten with the kept side's symbol (so input == output on
/// every transition of the result, as an acceptor requires).
pub fn project(g: &Graph, side: ProjectionSide) -> Graph {
    let mut out = g.clone();
    for idx in 0..out.num_states() {
        if let Ok(ts) = out.transitions_mut(StateId(idx as u32)) {
            for t in ts.iter_mut() {
                match side {
                    ProjectionSide::Input => t.output = t.input,
                    ProjectionSide::Output => t.input = t.output,
                }
            }
        }
    }
    out
}

/// The declared (non-reserved) alphabet of `g`, plus `EPSILON` (complement
/// construction needs epsilon available as a symbol even though it never
/// participates in the completed transition function below).
fn sigma(g: &Graph) -> HashSet<SymbolId> {
    g.alphabet().iter().copied().filter(|&s| s > DEFAULT_ID || s == EPSILON_ID).collect()
}

/// Complement of the acceptor language of `g` over `g`'s own declared
/// alphabet: determinizes `g`, completes it with a non-final trap state for
/// every `(state, symbol)` pair with no outgoing transition, then flips
/// finality (final states become non-final and vice versa, all with
/// `Weight::ONE`). `g` is treated as an acceptor: only the input side of
/// each transition is consulted, matching the rule compiler's use of
/// complement over a *language* (the `¬[Σ* · ...]` forms in context
/// compilation).
pub fn complement(g: &Graph, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let det = determinize(g, cancel)?;
    let alphabet = sigma(&det);
    let mut out = Graph::with_name(format!("~({})", det.name));
    for &sym in &alphabet {
        out.insert_symbol(sym);
    }
    for _ in 1..det.num_states() {
        out.add_state();
    }
    let trap = out.add_state();
    for &sym in &alphabet {
        if sym == EPSILON_ID {
            continue;
        }
        out.add_transition(trap, Transition::new(trap, sym, sym, Weight::ONE), false);
    }

    for idx in 0..det.num_states() {
        let s = StateId(idx as u32);
        cancel.check()?;
        let mut covered: HashSet<SymbolId> = HashSet::new();
        for t in det.transitions(s).expect("idx ranges over det's own states") {
            if t.input == EPSILON_ID {
                continue;
            }
            covered.insert(t.input);
            out.add_transition(s, Transition::new(t.target, t.input, t.input, t.weight), false);
        }
        for &sym in &alphabet {
            if sym != EPSILON_ID && !covered.contains(&sym) {
                out.add_transition(s, Transition::new(trap, sym, sym, Weight::ONE), false);
            }
        }
        if !det.is_final(s) {
            out.set_final(s, Weight::ONE);
        }
    }
    Ok(out)
}

/// `a \ b`: the paths `a` accepts that `b` does not. Implemented as
/// `intersect(a, complement(b))` after harmonization.
pub fn subtract(a: &Graph, b: &Graph, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let (a, b) = harmonize_copy(a, b);
    let not_b = complement(&b, cancel)?;
    let mut a_sorted = a;
    let mut not_b_sorted = not_b;
    a_sorted.sort_arcs();
    not_b_sorted.sort_arcs();
    Ok(crate::product::intersect(&a_sorted, &not_b_sorted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::SymbolTable;

    fn acceptor(symtab: &mut SymbolTable, word: &str) -> Graph {
        let mut g = Graph::new();
        let mut s = StateId(0);
        for ch in word.chars() {
            let sym = symtab.intern(&ch.to_string()).unwrap();
            let next = g.add_state();
            g.add_transition(s, Transition::new(next, sym, sym, Weight::ONE), true);
            s = next;
        }
        g.set_final(s, Weight::ONE);
        g
    }

    fn accepts(g: &Graph, symtab: &SymbolTable, word: &[&str]) -> bool {
        let mut state = StateId(0);
        for tok in word {
            let sym = symtab.find(tok);
            let Some(sym) = sym else { return false };
            let Some(t) = g.transitions(state).unwrap().iter().find(|t| t.input == sym) else {
                return false;
            };
            state = t.target;
        }
        g.is_final(state)
    }

    #[test]
    fn project_input_makes_acceptor_over_input_tape() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let b = symtab.intern("b").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, b, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);
        let p = project(&g, ProjectionSide::Input);
        let t = &p.transitions(StateId(0)).unwrap()[0];
        assert_eq!(t.input, a);
        assert_eq!(t.output, a);
    }

    #[test]
    fn complement_rejects_what_the_original_accepted() {
        let mut symtab = SymbolTable::new();
        let a = acceptor(&mut symtab, "ab");
        let mut cancel = Cancellation::None;
        let comp = complement(&a, &mut cancel).unwrap();
        assert!(!accepts(&comp, &symtab, &["a", "b"]));
    }

    #[test]
    fn complement_accepts_an_alternative_string() {
        let mut symtab = SymbolTable::new();
        let a_sym = symtab.intern("a").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a_sym, a_sym, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);
        let mut cancel = Cancellation::None;
        let comp = complement(&g, &mut cancel).unwrap();
        // the empty string is not accepted by g, so it must be in the complement
        assert!(comp.is_final(StateId(0)));
    }

    #[test]
    fn subtract_removes_shared_strings() {
        let mut symtab = SymbolTable::new();
        let a = acceptor(&mut symtab, "a");
        let b = acceptor(&mut symtab, "a");
        let mut cancel = Cancellation::None;
        let diff = subtract(&a, &b, &mut cancel).unwrap();
        assert!(!accepts(&diff, &symtab, &["a"]));
    }
}
