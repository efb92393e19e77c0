// Determinization and minimization: subset construction, weight pushing,
// and Hopcroft-style and Brzozowski minimization.

use hashbrown::HashMap;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::SymbolId;
use wfst_core::weight::Weight;

use crate::cancellation::Cancellation;
use crate::error::OpError;

/// A determinized state: the set of `(original_state, residual_weight)`
/// pairs it subsumes, sorted by state id with duplicates merged by taking
/// the minimum residual. Two subsets that canonicalize to the same
/// `DetState` are the same output state.
type DetState = Vec<(StateId, Weight)>;

fn canonicalize(mut members: Vec<(StateId, Weight)>) -> DetState {
    members.sort_by_key(|(s, _)| *s);
    let mut out: DetState = Vec::with_capacity(members.len());
    for (s, w) in members {
        match out.last_mut() {
            Some((last_s, last_w)) if *last_s == s => {
                if w < *last_w {
                    *last_w = w;
                }
            }
            _ => out.push((s, w)),
        }
    }
    out
}

/// Subset-construct a deterministic transducer equivalent to `g`, where
/// determinism means: at most one outgoing transition per `(input, output)`
/// label at each state. Weighted: each output transition's weight is the minimum
/// over all contributing paths, with the difference carried forward as a
/// residual on the successor subset, so that `lookup` on the result yields
/// the same accumulated weights as on `g`.
pub fn determinize(g: &Graph, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let mut out = Graph::with_name(format!("det({})", g.name));
    for &sym in g.alphabet() {
        out.insert_symbol(sym);
    }

    let start: DetState = canonicalize(vec![(StateId(0), Weight::ONE)]);
    let mut id_of: HashMap<DetState, StateId> = HashMap::new();
    id_of.insert(start.clone(), StateId(0));
    let mut agenda = vec![start];

    while let Some(subset) = agenda.pop() {
        cancel.check()?;
        let out_state = id_of[&subset];

        let mut final_weight: Option<Weight> = None;
        for &(s, residual) in &subset {
            if let Some(fw) = g.final_weight(s) {
                let candidate = residual.otimes(fw);
                final_weight = Some(match final_weight {
                    Some(existing) => existing.oplus(candidate),
                    None => candidate,
                });
            }
        }
        if let Some(fw) = final_weight {
            out.set_final(out_state, fw);
        }

        // group every member's outgoing transitions by (input, output)
        let mut by_label: HashMap<(SymbolId, SymbolId), Vec<(StateId, Weight)>> = HashMap::new();
        for &(s, residual) in &subset {
            for t in g.transitions(s).expect("subset members are valid states") {
                by_label
                    .entry((t.input, t.output))
                    .or_default()
                    .push((t.target, residual.otimes(t.weight)));
            }
        }

        for (label, targets) in by_label {
            let group_min = targets.iter().map(|(_, w)| *w).min().unwrap_or(Weight::ZERO);
            let next_subset = canonicalize(
                targets
                    .into_iter()
                    .map(|(s, w)| (s, Weight(w.0 - group_min.0)))
                    .collect(),
            );
            let target_id = *id_of.entry(next_subset.clone()).or_insert_with(|| {
                let id = out.add_state();
                agenda.push(next_subset);
                id
            });
            out.add_transition(out_state, Transition::new(target_id, label.0, label.1, group_min), true);
        }
    }
    Ok(out)
}

/// Push weights so that, for every state, the sum of outgoing-transition
/// weights (and final weight, if any) "uses up" as much weight as possible
/// as early (`ToInitial`) or as late (`ToFinal`) as possible along every
/// path -- a precondition for weighted minimization. Here:
/// for each state compute the minimum weight among its outgoing transitions
/// and its final weight (if final), subtract that minimum from every
/// outgoing transition leaving the state (`ToInitial`) and fold it into the
/// weight carried on transitions *into* the state instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDirection {
    ToInitial,
    ToFinal,
}

pub fn push_weights(g: &Graph, to: PushDirection) -> Graph {
    match to {
        PushDirection::ToInitial => push_weights_to_initial(g),
        PushDirection::ToFinal => {
            let r = super::algebra::reverse(g);
            let pushed = push_weights_to_initial(&r);
            super::algebra::reverse(&pushed)
        }
    }
}

fn push_weights_to_initial(g: &Graph) -> Graph {
    let mut out = g.clone();
    // The potential at a state is the minimum weight of any path from it to
    // a final state (including the empty path, if the state is itself
    // final). Computed by a relaxation pass from final states backward over
    // the reverse graph -- equivalent to shortest-distance-to-a-final-state
    // in the tropical semiring, iterated to a fixed point (Bellman-Ford
    // style, since arbitrary cycles are allowed).
    let n = g.num_states();
    let mut potential: Vec<Weight> = vec![Weight::ZERO; n];
    for (s, w) in g.final_weights() {
        potential[s.index()] = w;
    }
    let mut changed = true;
    while changed {
        changed = false;
        for idx in 0..n {
            let s = StateId(idx as u32);
            for t in g.transitions(s).expect("idx ranges over g's own states") {
                let candidate = t.weight.otimes(potential[t.target.index()]);
                if candidate < potential[idx] {
                    potential[idx] = candidate;
                    changed = true;
                }
            }
        }
    }

    // Rebalance: new_weight(t) = w(t) ⊗ d(target) ⊖ d(src) for every state
    // except the graph's own initial state (index 0), whose outgoing
    // weights keep the full `d(dst)` factor uncorrected. This model has no
    // separate initial-weight field the way a Mohri-style FST does; leaving
    // state 0's potential un-subtracted is what plays that field's role, so
    // the accumulated weight along any complete path is unchanged overall
    // even though it is now concentrated towards the start of the path.
    for idx in 0..n {
        let s = StateId(idx as u32);
        if let Ok(ts) = out.transitions_mut(s) {
            for t in ts.iter_mut() {
                let tgt_potential = potential[t.target.index()];
                if tgt_potential.is_infinite() {
                    continue;
                }
                let src_potential = if idx == 0 { Weight::ONE } else { potential[idx] };
                if !src_potential.is_infinite() {
                    t.weight = Weight(t.weight.0 + tgt_potential.0 - src_potential.0);
                }
            }
        }
        if let Some(fw) = g.final_weight(s) {
            if idx == 0 {
                out.set_final(s, fw);
            } else if !potential[idx].is_infinite() {
                out.set_final(s, Weight(fw.0 - potential[idx].0));
            }
        }
    }
    out
}

/// Hopcroft-style minimization: determinize, push weights to the initial
/// state, then merge states with identical outgoing-transition signatures
/// and final status (a simpler, direct partition refinement rather than
/// Hopcroft's O(E log V) bucket-splitting algorithm, since the workspace
/// targets correctness on the small-to-medium grammars typical of
/// morphological rule cascades rather than million-state lexicons).
pub fn minimize(g: &Graph, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let det = determinize(g, cancel)?;
    let pushed = push_weights(&det, PushDirection::ToInitial);
    merge_equivalent_states(&pushed, cancel)
}

/// Brzozowski's alternative: `determinize(reverse(determinize(reverse(g))))`.
/// Always produces a minimal deterministic automaton for the *unweighted*
/// language; offered as a selectable alternative to
/// Hopcroft partitioning (weights are not separately minimized by this
/// route beyond what `determinize`'s residual-weight bookkeeping already
/// produces).
pub fn minimize_brzozowski(g: &Graph, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let r1 = super::algebra::reverse(g);
    let d1 = determinize(&r1, cancel)?;
    let r2 = super::algebra::reverse(&d1);
    determinize(&r2, cancel)
}

fn merge_equivalent_states(g: &Graph, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    // Partition refinement: start with two blocks (final / non-final), then
    // repeatedly split any block whose members disagree on the block-id
    // their transitions for some label lead to, until no split occurs.
    let n = g.num_states();
    let mut block_of: Vec<usize> = (0..n)
        .map(|i| if g.is_final(StateId(i as u32)) { 1 } else { 0 })
        .collect();
    let mut num_blocks = 2;

    loop {
        cancel.check()?;
        let mut signature: HashMap<(usize, Vec<(SymbolId, SymbolId, usize, Weight)>, Option<Weight>), usize> = HashMap::new();
        let mut new_block_of = vec![0usize; n];
        for idx in 0..n {
            let s = StateId(idx as u32);
            let mut sig: Vec<(SymbolId, SymbolId, usize, Weight)> = g
                .transitions(s)
                .expect("idx ranges over g's own states")
                .iter()
                .map(|t| (t.input, t.output, block_of[t.target.index()], t.weight))
                .collect();
            sig.sort();
            let key = (block_of[idx], sig, g.final_weight(s));
            let next_id = signature.len();
            let block_id = *signature.entry(key).or_insert(next_id);
            new_block_of[idx] = block_id;
        }
        let new_num_blocks = signature.len();
        if new_num_blocks == num_blocks {
            block_of = new_block_of;
            break;
        }
        block_of = new_block_of;
        num_blocks = new_num_blocks;
    }

    let mut out = Graph::with_name(format!("min({})", g.name));
    for &sym in g.alphabet() {
        out.insert_symbol(sym);
    }
    for _ in 1..num_blocks {
        out.add_state();
    }
    let initial_block = block_of[0];
    // Ensure the initial state's block maps to output state 0: swap labels
    // if some other block already claimed id 0.
    let remap = |b: usize| -> u32 {
        if b == initial_block {
            0
        } else if b == 0 {
            initial_block as u32
        } else {
            b as u32
        }
    };

    let mut seen_transitions: hashbrown::HashSet<(u32, SymbolId, SymbolId, u32)> = hashbrown::HashSet::new();
    for idx in 0..n {
        let s = StateId(idx as u32);
        let src_block = remap(block_of[idx]);
        for t in g.transitions(s).expect("idx ranges over g's own states") {
            let tgt_block = remap(block_of[t.target.index()]);
            let key = (src_block, t.input, t.output, tgt_block);
            if seen_transitions.insert(key) {
                out.add_transition(StateId(src_block), Transition::new(StateId(tgt_block), t.input, t.output, t.weight), false);
            }
        }
        if let Some(fw) = g.final_weight(s) {
            out.set_final(StateId(src_block), fw);
        }
    }
    Ok(out)
}
