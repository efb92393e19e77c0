// Per-rule compilation: center/context construction, diamond-bracketed
// occasion transducers, and the four rule-operator formulas.

use std::collections::VecDeque;

use hashbrown::HashSet;

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::{EPSILON_ID, SymbolId, SymbolTable};
use wfst_core::weight::Weight;

use wfst_ops::algebra::{concat, union};
use wfst_ops::cancellation::Cancellation;
use wfst_ops::error::OpError;
use wfst_ops::product::intersect;
use wfst_ops::setops::{complement, subtract};
use wfst_ops::substitute::{Side, substitute_pair_with_graph, substitute_symbol};

use crate::pairs::{PairTable, encode_as_composite};
use crate::source::{CenterSpec, ContextSpec, RuleOp, RuleSource};

fn single_symbol_graph(sym: SymbolId) -> Graph {
    let mut g = Graph::new();
    let f = g.add_state();
    g.add_transition(StateId(0), Transition::new(f, sym, sym, Weight::ONE), true);
    g.set_final(f, Weight::ONE);
    g
}

fn pair_acceptor(pair: (SymbolId, SymbolId)) -> Graph {
    let mut g = Graph::new();
    let f = g.add_state();
    g.add_transition(StateId(0), Transition::new(f, pair.0, pair.1, Weight::ONE), true);
    g.set_final(f, Weight::ONE);
    g
}

/// Σ*: a single state, final, with a self-loop per declared alphabet pair
/// and per diacritic (as an identity pair). Built over real `(input,
/// output)` pairs; the rule-compilation pipeline itself runs over the
/// composite-symbol encoding from [`crate::pairs`] (see
/// [`composite_sigma_star`]), since `complement`/`subtract` require an
/// acceptor.
pub fn sigma_star(alphabet: &[(SymbolId, SymbolId)], diacritics: &[SymbolId]) -> Graph {
    let mut g = Graph::new();
    g.set_final(StateId(0), Weight::ONE);
    for &(i, o) in alphabet {
        g.add_transition(StateId(0), Transition::new(StateId(0), i, o, Weight::ONE), true);
    }
    for &d in diacritics {
        g.add_transition(StateId(0), Transition::new(StateId(0), d, d, Weight::ONE), true);
    }
    g
}

/// A language accepting exactly one step over the declared alphabet: the
/// Σ that `Σ \ C` is computed against for `<=`'s dual formula.
pub fn sigma_one(alphabet: &[(SymbolId, SymbolId)]) -> Graph {
    let mut g = Graph::new();
    let f = g.add_state();
    for &(i, o) in alphabet {
        g.add_transition(StateId(0), Transition::new(f, i, o, Weight::ONE), true);
    }
    g.set_final(f, Weight::ONE);
    g
}

/// [`sigma_star`]/[`sigma_one`], re-expressed over composite pair symbols
/// for use inside the complement-based compilation pipeline.
pub fn composite_sigma_star(alphabet: &[(SymbolId, SymbolId)], diacritics: &[SymbolId], table: &mut PairTable, symtab: &mut SymbolTable) -> Graph {
    encode_as_composite(&sigma_star(alphabet, diacritics), table, symtab)
}

pub fn composite_sigma_one(alphabet: &[(SymbolId, SymbolId)], table: &mut PairTable, symtab: &mut SymbolTable) -> Graph {
    encode_as_composite(&sigma_one(alphabet), table, symtab)
}

/// A rule's center language, over composite pair symbols: union of its
/// pair(s).
fn center_acceptor(center: &CenterSpec, table: &mut PairTable, symtab: &mut SymbolTable) -> Graph {
    let mut pairs = center.pairs().into_iter();
    let first = pairs.next().expect("a center always names at least one pair");
    let mut g = encode_as_composite(&pair_acceptor(first), table, symtab);
    for p in pairs {
        g = union(&g, &encode_as_composite(&pair_acceptor(p), table, symtab));
    }
    g
}

/// `◇ · center · ◇`.
fn bracket_with_diamond(center: &Graph, diamond: SymbolId) -> Graph {
    let d = single_symbol_graph(diamond);
    concat(&concat(&d, center), &d)
}

/// `Σ* · L · GAP · R · Σ*`: the positions where context `(L, R)` holds,
/// with `GAP` standing in for the not-yet-spliced center. `L`/`R` are
/// caller-supplied transducers over real symbol pairs; encoded into
/// composite space here so they compose with the rest of the pipeline.
fn context_occasion(l: &ContextSpec, gap: SymbolId, r: &ContextSpec, sigma_star_g: &Graph, table: &mut PairTable, symtab: &mut SymbolTable) -> Graph {
    let l_c = encode_as_composite(l, table, symtab);
    let r_c = encode_as_composite(r, table, symtab);
    let gap_g = single_symbol_graph(gap);
    let core = concat(&concat(&l_c, &gap_g), &r_c);
    concat(&concat(sigma_star_g, &core), sigma_star_g)
}

/// The union, over every `(L_i, R_i)` a rule names, of that context's
/// occasion language -- the set of positions the rule's context licenses
/// or requires, independent of what the center itself is. Kept as its own
/// graph so conflict resolution can narrow it before the center is spliced
/// in. `sigma_star_g` must already be in composite space (see
/// [`composite_sigma_star`]).
pub fn merged_occasion(contexts: &[(ContextSpec, ContextSpec)], gap: SymbolId, sigma_star_g: &Graph, table: &mut PairTable, symtab: &mut SymbolTable) -> Graph {
    let mut iter = contexts.iter();
    let (l0, r0) = iter.next().expect("a rule always names at least one context");
    let mut g = context_occasion(l0, gap, r0, sigma_star_g, table, symtab);
    for (l, r) in iter {
        g = union(&g, &context_occasion(l, gap, r, sigma_star_g, table, symtab));
    }
    g
}

/// `Σ* · GAP · Σ*`: every position at all, used as the universal backdrop
/// against which `=>` subtracts the licensed occasions.
fn universal_occasion(gap: SymbolId, sigma_star_g: &Graph) -> Graph {
    let gap_g = single_symbol_graph(gap);
    concat(&concat(sigma_star_g, &gap_g), sigma_star_g)
}

/// Replace every `GAP:GAP` transition in `occasion` with a fresh copy of
/// `bracketed_center`, realizing `Σ* · L · ◇ · C · ◇ · R · Σ*` from the
/// gapped `Σ* · L · GAP · R · Σ*` template.
fn splice_center(occasion: &Graph, gap: SymbolId, bracketed_center: &Graph) -> Graph {
    substitute_pair_with_graph(occasion, (gap, gap), bracketed_center)
}

/// Diamonds have done their job once a rule is fully compiled; project
/// them away by folding to epsilon.
fn remove_diamonds(g: &Graph, diamond: SymbolId) -> Graph {
    substitute_symbol(g, diamond, EPSILON_ID, Side::Both)
}

pub fn intersect_sorted(a: &Graph, b: &Graph) -> Graph {
    let mut a2 = a.clone();
    let mut b2 = b.clone();
    a2.sort_arcs();
    b2.sort_arcs();
    intersect(&a2, &b2)
}

/// `true` if no final state is reachable from the initial state.
pub fn is_empty_language(g: &Graph) -> bool {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(StateId(0));
    visited.insert(StateId(0));
    while let Some(s) = queue.pop_front() {
        if g.is_final(s) {
            return false;
        }
        if let Ok(ts) = g.transitions(s) {
            for t in ts {
                if visited.insert(t.target) {
                    queue.push_back(t.target);
                }
            }
        }
    }
    true
}

/// A shortest input string accepted by `g`, rendered via `symtab`, for use
/// as a conflict witness. Best-effort: ties are broken by transition order.
pub fn shortest_accepting_string(g: &Graph, symtab: &SymbolTable) -> Option<String> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((StateId(0), Vec::<SymbolId>::new()));
    visited.insert(StateId(0));
    while let Some((s, path)) = queue.pop_front() {
        if g.is_final(s) {
            return Some(path.iter().filter_map(|&sym| symtab.lookup(sym)).collect());
        }
        if let Ok(ts) = g.transitions(s) {
            for t in ts {
                if visited.insert(t.target) {
                    let mut next_path = path.clone();
                    if t.input != EPSILON_ID {
                        next_path.push(t.input);
                    }
                    queue.push_back((t.target, next_path));
                }
            }
        }
    }
    None
}

/// `=>`: `¬(U \ Licensed)`, where `U` marks every position and `Licensed`
/// marks only the positions the rule's contexts license.
fn compile_right_arrow(occasion: &Graph, sigma_star_g: &Graph, bracketed_c: &Graph, gap: SymbolId, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let licensed = splice_center(occasion, gap, bracketed_c);
    let universal = universal_occasion(gap, sigma_star_g);
    let marked_u = splice_center(&universal, gap, bracketed_c);
    let bad = subtract(&marked_u, &licensed, cancel)?;
    complement(&bad, cancel)
}

/// `<=`: `¬(∪_i Σ* L_i ◇ (Σ\C) ◇ R_i Σ*)` -- by De Morgan, the intersection
/// of per-context complements collapses to the complement of the union,
/// which is exactly the merged occasion spliced with `Σ\C`.
fn compile_left_arrow(occasion: &Graph, bracketed_not_c: &Graph, gap: SymbolId, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let forbidden = splice_center(occasion, gap, bracketed_not_c);
    complement(&forbidden, cancel)
}

/// `/<=`: same shape as `<=`, but the forbidden occasions are the ones
/// where the center itself (not its complement) appears.
fn compile_exclusion(occasion: &Graph, bracketed_c: &Graph, gap: SymbolId, cancel: &mut Cancellation) -> Result<Graph, OpError> {
    let forbidden = splice_center(occasion, gap, bracketed_c);
    complement(&forbidden, cancel)
}

/// Compile one rule's (possibly conflict-narrowed) `occasion` graph into
/// its raw rule transducer, diamonds already projected away. `occasion`,
/// `sigma_star_g`, and `sigma_one_g` must already be in composite space
/// (see [`composite_sigma_star`]/[`composite_sigma_one`]); the result is
/// composite-space too, decoded back to real symbol pairs once by the
/// caller after every rule has been intersected together.
pub fn compile_rule(
    rule: &RuleSource,
    occasion: &Graph,
    sigma_star_g: &Graph,
    sigma_one_g: &Graph,
    diamond: SymbolId,
    gap: SymbolId,
    table: &mut PairTable,
    symtab: &mut SymbolTable,
    cancel: &mut Cancellation,
) -> Result<Graph, OpError> {
    let center = center_acceptor(&rule.center, table, symtab);
    let bracketed_c = bracket_with_diamond(&center, diamond);

    match rule.op {
        RuleOp::RightArrow => {
            let raw = compile_right_arrow(occasion, sigma_star_g, &bracketed_c, gap, cancel)?;
            Ok(remove_diamonds(&raw, diamond))
        }
        RuleOp::LeftArrow => {
            let not_c = subtract(sigma_one_g, &center, cancel)?;
            let bracketed_not_c = bracket_with_diamond(&not_c, diamond);
            let raw = compile_left_arrow(occasion, &bracketed_not_c, gap, cancel)?;
            Ok(remove_diamonds(&raw, diamond))
        }
        RuleOp::Both => {
            let right_raw = compile_right_arrow(occasion, sigma_star_g, &bracketed_c, gap, cancel)?;
            let right = remove_diamonds(&right_raw, diamond);

            let not_c = subtract(sigma_one_g, &center, cancel)?;
            let bracketed_not_c = bracket_with_diamond(&not_c, diamond);
            let left_raw = compile_left_arrow(occasion, &bracketed_not_c, gap, cancel)?;
            let left = remove_diamonds(&left_raw, diamond);

            Ok(intersect_sorted(&right, &left))
        }
        RuleOp::Exclusion => {
            let raw = compile_exclusion(occasion, &bracketed_c, gap, cancel)?;
            Ok(remove_diamonds(&raw, diamond))
        }
    }
}
