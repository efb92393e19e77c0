// Mutable weighted transition graph: states, transitions, final weights,
// and the declared alphabet.

use hashbrown::{HashMap, HashSet};

use crate::error::CoreError;
use crate::flags::looks_like_flag_diacritic;
use crate::symbol::{DEFAULT_ID, EPSILON_ID, IDENTITY_ID, SymbolId, SymbolTable, UNKNOWN_ID};
use crate::weight::Weight;

/// Index of a state in a [`Graph`]'s state vector. State `0` is always the
/// unique initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u32);

impl StateId {
    pub const INITIAL: StateId = StateId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for StateId {
    fn from(v: u32) -> Self {
        StateId(v)
    }
}

/// One outgoing arc: `(target_state, input_symbol, output_symbol, weight)`.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub target: StateId,
    pub input: SymbolId,
    pub output: SymbolId,
    pub weight: Weight,
}

impl Transition {
    pub fn new(target: StateId, input: SymbolId, output: SymbolId, weight: Weight) -> Self {
        Transition {
            target,
            input,
            output,
            weight,
        }
    }

    /// Equality ignoring weight, used by [`Graph::remove_transition`] which
    /// removes all transitions with the same target and symbol pair
    /// regardless of weight.
    fn same_shape(&self, other: &Transition) -> bool {
        self.target == other.target && self.input == other.input && self.output == other.output
    }
}

/// A mutable weighted finite-state transducer.
///
/// Invariants (checked by construction, restorable by every operator):
/// - every transition's input/output symbol is a member of `alphabet`, or
///   one of the four reserved symbols;
/// - `final_weights` keys are valid state indices;
/// - no transition targets a state outside the state vector.
#[derive(Debug, Clone)]
pub struct Graph {
    states: Vec<Vec<Transition>>,
    final_weights: HashMap<StateId, Weight>,
    alphabet: HashSet<SymbolId>,
    pub name: String,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// A graph with one non-final state (state 0) and the four reserved
    /// symbols already in its alphabet.
    pub fn new() -> Self {
        Graph {
            states: vec![Vec::new()],
            final_weights: HashMap::new(),
            alphabet: HashSet::from_iter([EPSILON_ID, UNKNOWN_ID, IDENTITY_ID, DEFAULT_ID]),
            name: String::new(),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let mut g = Self::new();
        g.name = name.into();
        g
    }

    fn check_state(&self, s: StateId) -> Result<(), CoreError> {
        if s.index() >= self.states.len() {
            Err(CoreError::StateIndexOutOfBounds {
                state: s.0,
                len: self.states.len() as u32,
            })
        } else {
            Ok(())
        }
    }

    /// Append a new, non-final state and return its id.
    pub fn add_state(&mut self) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(Vec::new());
        id
    }

    /// Grow the state vector, if needed, so that `s` is a valid index.
    pub fn ensure_state(&mut self, s: StateId) {
        if s.index() >= self.states.len() {
            self.states.resize_with(s.index() + 1, Vec::new);
        }
    }

    /// Append `t` to `src`'s transition list, growing the state vector to
    /// cover both `src` and `t.target`. When `update_alphabet` is set (the
    /// default a caller should use), `t.input`/`t.output` are added to the
    /// alphabet.
    pub fn add_transition(&mut self, src: StateId, t: Transition, update_alphabet: bool) {
        self.ensure_state(src);
        self.ensure_state(t.target);
        if update_alphabet {
            self.alphabet.insert(t.input);
            self.alphabet.insert(t.output);
        }
        self.states[src.index()].push(t);
    }

    /// Remove every transition out of `src` that has the same target and
    /// symbol pair as `t` (weight is ignored for the match). Returns the
    /// number of transitions removed.
    pub fn remove_transition(&mut self, src: StateId, t: Transition, prune_alphabet: bool) -> Result<usize, CoreError> {
        self.check_state(src)?;
        let before = self.states[src.index()].len();
        self.states[src.index()].retain(|existing| !existing.same_shape(&t));
        let removed = before - self.states[src.index()].len();
        if prune_alphabet {
            self.prune_alphabet(false);
        }
        Ok(removed)
    }

    pub fn set_final(&mut self, s: StateId, weight: Weight) {
        self.ensure_state(s);
        self.final_weights.insert(s, weight);
    }

    pub fn unset_final(&mut self, s: StateId) {
        self.final_weights.remove(&s);
    }

    pub fn final_weight(&self, s: StateId) -> Option<Weight> {
        self.final_weights.get(&s).copied()
    }

    pub fn is_final(&self, s: StateId) -> bool {
        self.final_weights.contains_key(&s)
    }

    pub fn transitions(&self, s: StateId) -> Result<&[Transition], CoreError> {
        self.check_state(s)?;
        Ok(&self.states[s.index()])
    }

    pub fn transitions_mut(&mut self, s: StateId) -> Result<&mut Vec<Transition>, CoreError> {
        self.check_state(s)?;
        Ok(&mut self.states[s.index()])
    }

    pub fn alphabet(&self) -> &HashSet<SymbolId> {
        &self.alphabet
    }

    pub fn insert_symbol(&mut self, sym: SymbolId) {
        self.alphabet.insert(sym);
    }

    /// Remove symbols from the alphabet that occur in no transition's input
    /// or output. A no-op when `UNKNOWN`/`IDENTITY` occur in any transition
    /// and `force` is false, since their meaning depends on the alphabet.
    pub fn prune_alphabet(&mut self, force: bool) {
        let mut used: HashSet<SymbolId> = HashSet::from_iter([EPSILON_ID, UNKNOWN_ID, IDENTITY_ID, DEFAULT_ID]);
        let mut wildcard_present = false;
        for state in &self.states {
            for t in state {
                used.insert(t.input);
                used.insert(t.output);
                if t.input == UNKNOWN_ID
                    || t.output == UNKNOWN_ID
                    || t.input == IDENTITY_ID
                    || t.output == IDENTITY_ID
                {
                    wildcard_present = true;
                }
            }
        }
        if wildcard_present && !force {
            return;
        }
        self.alphabet.retain(|s| used.contains(s));
    }

    /// Sort each state's transitions by `(input, output, target, weight)`.
    /// Required before [`crate`]-external intersection/composition
    /// implementations can merge-walk two graphs' arc lists in linear time.
    pub fn sort_arcs(&mut self) {
        for state in &mut self.states {
            state.sort_by(|a, b| {
                (a.input, a.output, a.target, a.weight).cmp(&(b.input, b.output, b.target, b.weight))
            });
        }
    }

    pub fn get_max_state(&self) -> StateId {
        StateId(self.states.len() as u32 - 1)
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn final_weights(&self) -> impl Iterator<Item = (StateId, Weight)> + '_ {
        self.final_weights.iter().map(|(&s, &w)| (s, w))
    }

    /// The subset of the alphabet whose symbol strings have the surface
    /// shape of a flag diacritic (`@...@`).
    pub fn get_flags(&self, symtab: &SymbolTable) -> HashSet<SymbolId> {
        self.alphabet
            .iter()
            .copied()
            .filter(|&id| {
                symtab
                    .lookup(id)
                    .map(looks_like_flag_diacritic)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Replace every transition on a flag diacritic belonging to
    /// `feature_name` (or every flag diacritic, when `feature_name` is
    /// empty) with `EPSILON:EPSILON`, and drop those flag symbols from the
    /// alphabet.
    pub fn purge_flag(&mut self, feature_name: &str, symtab: &mut SymbolTable) {
        let mut to_purge: HashSet<SymbolId> = HashSet::new();
        for &id in &self.alphabet {
            if let Some(fd) = symtab.decode_flag(id) {
                if feature_name.is_empty() || fd.feature == feature_name {
                    to_purge.insert(id);
                }
            }
        }
        if to_purge.is_empty() {
            return;
        }
        for state in &mut self.states {
            for t in state.iter_mut() {
                if to_purge.contains(&t.input) {
                    t.input = EPSILON_ID;
                }
                if to_purge.contains(&t.output) {
                    t.output = EPSILON_ID;
                }
            }
        }
        self.alphabet.retain(|s| !to_purge.contains(s));
    }

    /// For each non-negative distance `d` from state 0, the set of states
    /// whose distance is exactly `d`. When `max_distance` is false, the
    /// first (shortest) distance at which a state is reached is kept; when
    /// true, later (longer) distances overwrite earlier ones.
    pub fn topological_distances(&self, max_distance: bool) -> Vec<Vec<StateId>> {
        let mut distance: HashMap<StateId, u32> = HashMap::new();
        let mut queue = std::collections::VecDeque::new();
        distance.insert(StateId::INITIAL, 0);
        queue.push_back(StateId::INITIAL);
        while let Some(s) = queue.pop_front() {
            let d = distance[&s];
            if let Ok(ts) = self.transitions(s) {
                for t in ts {
                    let candidate = d + 1;
                    let update = match distance.get(&t.target) {
                        None => true,
                        Some(&existing) => {
                            if max_distance {
                                candidate > existing
                            } else {
                                false
                            }
                        }
                    };
                    if update {
                        distance.insert(t.target, candidate);
                        queue.push_back(t.target);
                    }
                }
            }
        }
        let max_d = distance.values().copied().max().unwrap_or(0);
        let mut buckets: Vec<Vec<StateId>> = vec![Vec::new(); max_d as usize + 1];
        for (s, d) in distance {
            buckets[d as usize].push(s);
        }
        for bucket in &mut buckets {
            bucket.sort();
        }
        buckets
    }

    /// Every symbol id appearing as the input or output of any transition
    /// in the graph is a member of `alphabet()` or one of the four reserved
    /// symbols.
    pub fn check_alphabet_invariant(&self) -> bool {
        for state in &self.states {
            for t in state {
                for sym in [t.input, t.output] {
                    if sym > DEFAULT_ID && !self.alphabet.contains(&sym) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tr(target: u32, input: SymbolId, output: SymbolId, w: f64) -> Transition {
        Transition::new(StateId(target), input, output, Weight(w))
    }

    #[test]
    fn new_graph_has_one_nonfinal_state() {
        let g = Graph::new();
        assert_eq!(g.num_states(), 1);
        assert!(!g.is_final(StateId(0)));
        assert!(g.alphabet().contains(&EPSILON_ID));
        assert!(g.alphabet().contains(&UNKNOWN_ID));
        assert!(g.alphabet().contains(&IDENTITY_ID));
        assert!(g.alphabet().contains(&DEFAULT_ID));
    }

    #[test]
    fn add_state_returns_sequential_ids() {
        let mut g = Graph::new();
        let s1 = g.add_state();
        let s2 = g.add_state();
        assert_eq!(s1, StateId(1));
        assert_eq!(s2, StateId(2));
        assert_eq!(g.num_states(), 3);
    }

    #[test]
    fn ensure_state_grows_vector() {
        let mut g = Graph::new();
        g.ensure_state(StateId(5));
        assert_eq!(g.num_states(), 6);
    }

    #[test]
    fn add_transition_grows_both_endpoints_and_alphabet() {
        let mut g = Graph::new();
        g.add_transition(StateId(0), tr(3, 10, 11, 0.0), true);
        assert_eq!(g.num_states(), 4);
        assert!(g.alphabet().contains(&10));
        assert!(g.alphabet().contains(&11));
        assert_eq!(g.transitions(StateId(0)).unwrap().len(), 1);
    }

    #[test]
    fn add_transition_without_alphabet_update() {
        let mut g = Graph::new();
        g.add_transition(StateId(0), tr(1, 10, 11, 0.0), false);
        assert!(!g.alphabet().contains(&10));
    }

    #[test]
    fn remove_transition_ignores_weight() {
        let mut g = Graph::new();
        g.add_transition(StateId(0), tr(1, 10, 11, 0.5), true);
        let removed = g
            .remove_transition(StateId(0), tr(1, 10, 11, 99.0), false)
            .unwrap();
        assert_eq!(removed, 1);
        assert!(g.transitions(StateId(0)).unwrap().is_empty());
    }

    #[test]
    fn final_weight_roundtrip() {
        let mut g = Graph::new();
        g.set_final(StateId(0), Weight(1.5));
        assert_eq!(g.final_weight(StateId(0)), Some(Weight(1.5)));
        g.unset_final(StateId(0));
        assert_eq!(g.final_weight(StateId(0)), None);
    }

    #[test]
    fn transitions_out_of_bounds_errors() {
        let g = Graph::new();
        assert!(matches!(
            g.transitions(StateId(5)),
            Err(CoreError::StateIndexOutOfBounds { state: 5, len: 1 })
        ));
    }

    #[test]
    fn prune_alphabet_removes_unused_symbols() {
        let mut g = Graph::new();
        g.insert_symbol(42);
        g.prune_alphabet(true);
        assert!(!g.alphabet().contains(&42));
    }

    #[test]
    fn prune_alphabet_is_noop_with_wildcard_unless_forced() {
        let mut g = Graph::new();
        g.add_transition(StateId(0), tr(1, UNKNOWN_ID, UNKNOWN_ID, 0.0), true);
        g.insert_symbol(42);
        g.prune_alphabet(false);
        assert!(g.alphabet().contains(&42));
        g.prune_alphabet(true);
        assert!(!g.alphabet().contains(&42));
    }

    #[test]
    fn sort_arcs_orders_by_input_output_target_weight() {
        let mut g = Graph::new();
        g.add_transition(StateId(0), tr(2, 5, 5, 0.0), true);
        g.add_transition(StateId(0), tr(1, 1, 1, 0.0), true);
        g.sort_arcs();
        let ts = g.transitions(StateId(0)).unwrap();
        assert_eq!(ts[0].input, 1);
        assert_eq!(ts[1].input, 5);
    }

    #[test]
    fn topological_distances_min_semantics() {
        let mut g = Graph::new();
        // 0 -> 1 -> 2, and 0 -> 2 directly: state 2 reached at distance 1 (min)
        g.add_transition(StateId(0), tr(1, 1, 1, 0.0), true);
        g.add_transition(StateId(1), tr(2, 1, 1, 0.0), true);
        g.add_transition(StateId(0), tr(2, 1, 1, 0.0), true);
        let buckets = g.topological_distances(false);
        assert!(buckets[1].contains(&StateId(2)));
        assert!(!buckets.get(2).map(|b| b.contains(&StateId(2))).unwrap_or(false));
    }

    #[test]
    fn topological_distances_max_semantics() {
        let mut g = Graph::new();
        g.add_transition(StateId(0), tr(1, 1, 1, 0.0), true);
        g.add_transition(StateId(1), tr(2, 1, 1, 0.0), true);
        g.add_transition(StateId(0), tr(2, 1, 1, 0.0), true);
        let buckets = g.topological_distances(true);
        assert!(buckets[2].contains(&StateId(2)));
    }

    #[test]
    fn check_alphabet_invariant_detects_violation() {
        let mut g = Graph::new();
        g.add_transition(StateId(0), tr(1, 99, 99, 0.0), false);
        assert!(!g.check_alphabet_invariant());
        g.insert_symbol(99);
        assert!(g.check_alphabet_invariant());
    }

    #[test]
    fn purge_flag_replaces_matching_transitions_with_epsilon() {
        let mut symtab = SymbolTable::new();
        let mut g = Graph::new();
        let flag = symtab.intern("@P.CASE.NOM@").unwrap();
        let other_flag = symtab.intern("@P.NUM.SG@").unwrap();
        g.add_transition(StateId(0), tr(1, flag, flag, 0.0), true);
        g.add_transition(StateId(0), tr(1, other_flag, other_flag, 0.0), true);
        g.purge_flag("CASE", &mut symtab);
        let ts = g.transitions(StateId(0)).unwrap();
        assert_eq!(ts[0].input, EPSILON_ID);
        assert_eq!(ts[0].output, EPSILON_ID);
        assert_eq!(ts[1].input, other_flag);
        assert!(!g.alphabet().contains(&flag));
        assert!(g.alphabet().contains(&other_flag));
    }

    #[test]
    fn purge_flag_empty_name_purges_all() {
        let mut symtab = SymbolTable::new();
        let mut g = Graph::new();
        let flag = symtab.intern("@P.CASE.NOM@").unwrap();
        g.add_transition(StateId(0), tr(1, flag, flag, 0.0), true);
        g.purge_flag("", &mut symtab);
        assert!(!g.alphabet().contains(&flag));
    }

    #[test]
    fn get_flags_returns_only_diacritic_symbols() {
        let mut symtab = SymbolTable::new();
        let mut g = Graph::new();
        let flag = symtab.intern("@P.CASE.NOM@").unwrap();
        let normal = symtab.intern("a").unwrap();
        g.add_transition(StateId(0), tr(1, flag, normal, 0.0), true);
        let flags = g.get_flags(&symtab);
        assert!(flags.contains(&flag));
        assert!(!flags.contains(&normal));
    }
}
