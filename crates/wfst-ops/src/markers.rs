// Weight-as-marker adapter: encode every transition's weight as a dedicated
// `@<weight>@:EPSILON` marker symbol pair so an unweighted-only subroutine
// can pass a graph through unchanged, then decode the markers back into
// weights afterwards. An optional adapter, not part of the core operator set.

use hashbrown::HashMap;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::{EPSILON_ID, SymbolTable};
use wfst_core::weight::Weight;

fn marker_symbol(w: Weight) -> String {
    format!("@{}@", w.0)
}

/// Replace every transition's weight with `Weight::ONE`, instead emitting a
/// same-source, same-target `marker:EPSILON` transition carrying the
/// original weight in its symbol string (interned fresh per distinct
/// weight value). The result has the same path language as `g` but is
/// weight-inert for any subroutine that only reasons about symbols.
pub fn encode_weights_as_markers(g: &Graph, symtab: &mut SymbolTable) -> Graph {
    let mut out = Graph::with_name(g.name.clone());
    for &sym in g.alphabet() {
        out.insert_symbol(sym);
    }
    for _ in 1..g.num_states() {
        out.add_state();
    }
    for idx in 0..g.num_states() {
        let s = StateId(idx as u32);
        for t in g.transitions(s).expect("idx ranges over g's own states") {
            out.add_transition(s, Transition::new(t.target, t.input, t.output, Weight::ONE), false);
            if t.weight != Weight::ONE {
                let marker = symtab.intern(&marker_symbol(t.weight)).expect("marker symbols are never empty");
                out.add_transition(s, Transition::new(t.target, marker, EPSILON_ID, Weight::ONE), true);
            }
        }
        if let Some(w) = g.final_weight(s) {
            out.set_final(s, w);
        }
    }
    out
}

/// Inverse of [`encode_weights_as_markers`]: fold every `marker:EPSILON`
/// self-adjacent transition's encoded weight back onto the sibling
/// transition it was emitted alongside, then drop the marker transitions.
/// Assumes `g` was produced by `encode_weights_as_markers` (markers always
/// appear as an extra parallel arc between the same two states as the
/// transition they annotate).
pub fn decode_weight_markers(g: &Graph, symtab: &SymbolTable) -> Graph {
    let mut out = Graph::with_name(g.name.clone());
    for &sym in g.alphabet() {
        out.insert_symbol(sym);
    }
    for _ in 1..g.num_states() {
        out.add_state();
    }
    for idx in 0..g.num_states() {
        let s = StateId(idx as u32);
        let transitions = g.transitions(s).expect("idx ranges over g's own states");
        let mut marker_weight: HashMap<StateId, Weight> = HashMap::new();
        for t in transitions {
            if t.output == EPSILON_ID {
                if let Some(sym) = symtab.lookup(t.input) {
                    if let Some(w) = parse_marker(sym) {
                        marker_weight.insert(t.target, w);
                        continue;
                    }
                }
            }
        }
        for t in transitions {
            let is_marker = symtab.lookup(t.input).map(|s| parse_marker(s).is_some()).unwrap_or(false) && t.output == EPSILON_ID;
            if is_marker {
                continue;
            }
            let w = marker_weight.get(&t.target).copied().unwrap_or(Weight::ONE);
            out.add_transition(s, Transition::new(t.target, t.input, t.output, t.weight.otimes(w)), true);
        }
        if let Some(w) = g.final_weight(s) {
            out.set_final(s, w);
        }
    }
    out
}

fn parse_marker(sym: &str) -> Option<Weight> {
    let inner = sym.strip_prefix('@')?.strip_suffix('@')?;
    inner.parse::<f64>().ok().map(Weight)
}
