// Epsilon removal: fold input-epsilon/output-epsilon transitions into direct
// transitions via per-state epsilon-closure.

use hashbrown::HashMap;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::EPSILON_ID;
use wfst_core::weight::Weight;

/// The epsilon-closure of `s`: every state reachable from `s` using only
/// `EPSILON:EPSILON` transitions, mapped to the minimum accumulated weight
/// of reaching it (`s` itself included, at `Weight::ONE`). Dijkstra-style
/// relaxation since multiple epsilon paths to the same state may exist with
/// different weights.
fn epsilon_closure(g: &Graph, s: StateId) -> HashMap<StateId, Weight> {
    let mut best: HashMap<StateId, Weight> = HashMap::new();
    best.insert(s, Weight::ONE);
    let mut agenda = vec![s];
    while let Some(cur) = agenda.pop() {
        let cur_weight = best[&cur];
        if let Ok(ts) = g.transitions(cur) {
            for t in ts {
                if t.input == EPSILON_ID && t.output == EPSILON_ID {
                    let candidate = cur_weight.otimes(t.weight);
                    let better = match best.get(&t.target) {
                        Some(&existing) => candidate < existing,
                        None => true,
                    };
                    if better {
                        best.insert(t.target, candidate);
                        agenda.push(t.target);
                    }
                }
            }
        }
    }
    best
}

/// Remove every `EPSILON:EPSILON` transition from `g`, replacing the paths
/// they made possible with direct transitions carrying the folded weight.
/// For each state `s`, every non-epsilon transition reachable from some
/// member of `s`'s epsilon-closure becomes a direct transition out of `s`;
/// `s`'s final weight absorbs the minimum final weight reachable within its
/// closure.
pub fn epsilon_remove(g: &Graph) -> Graph {
    let mut out = Graph::with_name(format!("rmeps({})", g.name));
    for &sym in g.alphabet() {
        out.insert_symbol(sym);
    }
    for _ in 1..g.num_states() {
        out.add_state();
    }

    for idx in 0..g.num_states() {
        let s = StateId(idx as u32);
        let closure = epsilon_closure(g, s);

        let mut final_weight: Option<Weight> = None;
        for (&member, &cw) in &closure {
            if let Some(fw) = g.final_weight(member) {
                let candidate = cw.otimes(fw);
                final_weight = Some(match final_weight {
                    Some(existing) => existing.oplus(candidate),
                    None => candidate,
                });
            }
        }
        if let Some(fw) = final_weight {
            out.set_final(s, fw);
        }

        for (&member, &cw) in &closure {
            if let Ok(ts) = g.transitions(member) {
                for t in ts {
                    if t.input == EPSILON_ID && t.output == EPSILON_ID {
                        continue;
                    }
                    out.add_transition(s, Transition::new(t.target, t.input, t.output, cw.otimes(t.weight)), false);
                }
            }
        }
    }
    out
}
