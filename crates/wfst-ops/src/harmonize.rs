// Alphabet harmonization: expand UNKNOWN/IDENTITY wildcards when combining
// two transducers with disjoint alphabets, before any binary operator runs.

use hashbrown::HashSet;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::{DEFAULT_ID, IDENTITY_ID, SymbolId, UNKNOWN_ID};

/// Symbols in `g`'s alphabet excluding the four reserved wildcards.
fn declared_alphabet(g: &Graph) -> HashSet<SymbolId> {
    g.alphabet()
        .iter()
        .copied()
        .filter(|&s| s > DEFAULT_ID)
        .collect()
}

/// Expand `g`'s `IDENTITY:IDENTITY` and `UNKNOWN:*` transitions to also
/// cover the symbols in `new_peer_symbols` (the symbols the peer graph has
/// that `g` doesn't), and add those symbols to `g`'s alphabet.
///
/// `own_declared_alphabet` is `g`'s declared (non-reserved) alphabet as it
/// stood *before* this expansion -- passed in rather than recomputed after
/// mutation, since step 3's `UNKNOWN:UNKNOWN` case needs `Σ_A` as it was
/// prior to harmonization.
fn harmonize_one(g: &mut Graph, new_peer_symbols: &HashSet<SymbolId>, own_declared_alphabet: &HashSet<SymbolId>) {
    for &x in new_peer_symbols {
        g.insert_symbol(x);
    }
    if new_peer_symbols.is_empty() {
        return;
    }

    let mut additions: Vec<(StateId, Transition)> = Vec::new();
    for idx in 0..g.num_states() {
        let s = StateId(idx as u32);
        for t in g.transitions(s).expect("idx ranges over valid states") {
            if t.input == IDENTITY_ID && t.output == IDENTITY_ID {
                for &x in new_peer_symbols {
                    additions.push((s, Transition::new(t.target, x, x, t.weight)));
                }
            } else if t.input == UNKNOWN_ID && t.output != UNKNOWN_ID {
                let c = t.output;
                for &x in new_peer_symbols {
                    additions.push((s, Transition::new(t.target, x, c, t.weight)));
                }
            } else if t.output == UNKNOWN_ID && t.input != UNKNOWN_ID {
                let c = t.input;
                for &x in new_peer_symbols {
                    additions.push((s, Transition::new(t.target, c, x, t.weight)));
                }
            } else if t.input == UNKNOWN_ID && t.output == UNKNOWN_ID {
                for &x in new_peer_symbols {
                    for &y in new_peer_symbols {
                        if x != y {
                            additions.push((s, Transition::new(t.target, x, y, t.weight)));
                        }
                    }
                    for &c in own_declared_alphabet {
                        additions.push((s, Transition::new(t.target, x, c, t.weight)));
                        additions.push((s, Transition::new(t.target, c, x, t.weight)));
                    }
                }
            }
        }
    }
    for (s, t) in additions {
        g.add_transition(s, t, true);
    }
}

/// Reconcile `a` and `b`'s alphabets in place, expanding `UNKNOWN`/`IDENTITY`
/// transitions on each side to cover the symbols newly visible from the
/// peer. Mutates both graphs; does not change the language either one
/// recognizes.
pub fn harmonize(a: &mut Graph, b: &mut Graph) {
    let alphabet_a = declared_alphabet(a);
    let alphabet_b = declared_alphabet(b);
    let new_in_b: HashSet<SymbolId> = alphabet_b.difference(&alphabet_a).copied().collect();
    let new_in_a: HashSet<SymbolId> = alphabet_a.difference(&alphabet_b).copied().collect();
    harmonize_one(a, &new_in_b, &alphabet_a);
    harmonize_one(b, &new_in_a, &alphabet_b);
}

/// Non-mutating variant: clones both inputs, harmonizes the clones, and
/// returns them. Most binary operators in [`crate`] call the mutating
/// [`harmonize`] directly on owned working copies instead, since they
/// already need to offset/merge state spaces.
pub fn harmonize_copy(a: &Graph, b: &Graph) -> (Graph, Graph) {
    let mut a = a.clone();
    let mut b = b.clone();
    harmonize(&mut a, &mut b);
    (a, b)
}
