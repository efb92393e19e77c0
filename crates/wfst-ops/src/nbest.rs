// n-best path extraction: Dijkstra-style shortest-path search over the
// tropical semiring.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::EPSILON_ID;
use wfst_core::weight::Weight;

use crate::cancellation::Cancellation;
use crate::error::OpError;

/// A partial or completed path: the transitions taken so far and the
/// current state.
#[derive(Clone)]
struct Candidate {
    weight: Weight,
    state: StateId,
    path: Vec<Transition>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.weight.cmp(&other.weight)
    }
}

/// A single `n_best` result path: the transitions taken, in order.
pub type NBestPath = (Vec<Transition>, Weight);

/// Extract the `n` lowest-weight accepting paths through `g`, best-first.
/// A `max_expansions` cutoff bounds the search on cyclic inputs where a
/// zero-weight cycle could otherwise re-enqueue candidates forever before
/// `n` accepting paths are found.
pub fn n_best(g: &Graph, n: usize, max_expansions: usize, cancel: &mut Cancellation) -> Result<Vec<NBestPath>, OpError> {
    let mut results: Vec<NBestPath> = Vec::new();
    if n == 0 {
        return Ok(results);
    }

    let mut heap = BinaryHeap::new();
    heap.push(Reverse(Candidate { weight: Weight::ONE, state: StateId(0), path: Vec::new() }));

    let mut expansions = 0;
    while let Some(Reverse(candidate)) = heap.pop() {
        cancel.check()?;
        expansions += 1;
        if expansions > max_expansions {
            break;
        }

        if let Some(fw) = g.final_weight(candidate.state) {
            results.push((candidate.path.clone(), candidate.weight.otimes(fw)));
            if results.len() >= n {
                break;
            }
        }

        for t in g.transitions(candidate.state).expect("candidate.state is always a valid state") {
            let mut path = candidate.path.clone();
            path.push(*t);
            heap.push(Reverse(Candidate {
                weight: candidate.weight.otimes(t.weight),
                state: t.target,
                path,
            }));
        }
    }
    Ok(results)
}

/// The `(input, output)` symbol sequence an [`n_best`] path spells out,
/// skipping `EPSILON:EPSILON` hops.
pub fn path_to_symbols(path: &[Transition]) -> Vec<(wfst_core::symbol::SymbolId, wfst_core::symbol::SymbolId)> {
    path.iter()
        .filter(|t| !(t.input == EPSILON_ID && t.output == EPSILON_ID))
        .map(|t| (t.input, t.output))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::SymbolTable;

    #[test]
    fn n_best_orders_by_weight() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let b = symtab.intern("b").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight(2.0)), true);
        g.add_transition(StateId(0), Transition::new(StateId(2), b, b, Weight(1.0)), true);
        g.set_final(StateId(1), Weight::ONE);
        g.set_final(StateId(2), Weight::ONE);

        let mut cancel = Cancellation::None;
        let results = n_best(&g, 2, 1000, &mut cancel).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1, Weight(1.0));
        assert_eq!(results[1].1, Weight(2.0));
    }

    #[test]
    fn n_best_respects_requested_count() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);
        g.set_final(StateId(0), Weight(5.0));

        let mut cancel = Cancellation::None;
        let results = n_best(&g, 1, 1000, &mut cancel).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1, Weight(5.0));
    }
}
