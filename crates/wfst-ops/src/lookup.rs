// Weighted lookup: DFS over a transducer with cycle control, flag-diacritic
// path constraints, and UNKNOWN/IDENTITY wildcard matching against the
// declared alphabet.

use hashbrown::HashMap;

use wfst_core::flags::FlagOp;
use wfst_core::graph::{Graph, StateId};
use wfst_core::symbol::{IDENTITY_ID, SymbolId, SymbolTable, UNKNOWN_ID};
use wfst_core::weight::Weight;

use crate::cancellation::Cancellation;
use crate::error::OpError;

/// Governs a single [`lookup`] call. All three cutoffs can be disabled
/// (`None`/`usize::MAX`).
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Stop collecting once this many accepting paths have been found.
    pub max_results: Option<usize>,
    /// How many times a state may be revisited via consecutive
    /// input-epsilon transitions before that branch is abandoned. Default 5.
    pub max_epsilon_cycles: usize,
    /// Prune any path whose accumulated weight already exceeds this bound.
    pub max_weight: Option<Weight>,
    /// When true, flag diacritics are evaluated as path constraints; when
    /// false, every flag diacritic transition is taken unconditionally, as
    /// if it were an epsilon on the input side.
    pub obey_flags: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            max_results: None,
            max_epsilon_cycles: 5,
            max_weight: None,
            obey_flags: true,
        }
    }
}

/// Tracks the stack of states reached by consecutive input-epsilon
/// transitions during a single DFS branch, so cyclic epsilon loops
/// terminate after `max_cycles` revisits of the same state rather than
/// diverging.
struct EpsilonHandler {
    path: Vec<StateId>,
    max_cycles: usize,
}

impl EpsilonHandler {
    fn new(max_cycles: usize) -> Self {
        EpsilonHandler { path: Vec::new(), max_cycles }
    }

    /// Would pushing `s` exceed the revisit budget?
    fn can_continue(&self, s: StateId) -> bool {
        self.path.iter().filter(|&&x| x == s).count() < self.max_cycles
    }

    fn push_back(&mut self, s: StateId) {
        self.path.push(s);
    }

    fn pop_back(&mut self) {
        self.path.pop();
    }
}

/// Per-branch flag-diacritic state: the current value set for each feature
/// (by `P`/`U`) and the set of values `N` has marked disallowed for a later
/// `R` on that feature. Cloned on recursion rather than a single
/// push/undo stack, since lookup here branches over a `Vec` of candidate
/// outputs at every state rather than following a single path.
#[derive(Debug, Clone, Default)]
struct FlagState {
    positive: HashMap<SymbolId, SymbolId>,
    negative: HashMap<SymbolId, hashbrown::HashSet<SymbolId>>,
}

/// Evaluate a flag diacritic against the current path's flag state.
/// Returns `None` if the transition must be rejected, `Some(next_state)`
/// otherwise (identical to `current` when the flag does not mutate state,
/// e.g. `R`/`D`).
fn check_flag(state: &FlagState, op: FlagOp, feature: SymbolId, value: SymbolId, any: SymbolId) -> Option<FlagState> {
    let mut next = state.clone();
    match op {
        FlagOp::P => {
            next.positive.insert(feature, value);
            Some(next)
        }
        FlagOp::N => {
            next.negative.entry(feature).or_default().insert(value);
            Some(next)
        }
        FlagOp::C => {
            next.positive.remove(&feature);
            Some(next)
        }
        FlagOp::U => match state.positive.get(&feature) {
            None => {
                next.positive.insert(feature, value);
                Some(next)
            }
            Some(&current) if current == value => Some(next),
            Some(_) => None,
        },
        FlagOp::R => {
            let ok = if value == any {
                state.positive.contains_key(&feature)
            } else {
                state.positive.get(&feature) == Some(&value)
                    && !state.negative.get(&feature).is_some_and(|s| s.contains(&value))
            };
            ok.then_some(next)
        }
        FlagOp::D => {
            let ok = if value == any {
                !state.positive.contains_key(&feature)
            } else {
                state.positive.get(&feature) != Some(&value)
            };
            ok.then_some(next)
        }
    }
}

/// One accepted lookup result: the `(input, output)` symbol pairs traversed
/// and the accumulated weight.
pub type LookupPath = (Vec<(SymbolId, SymbolId)>, Weight);

struct LookupCtx<'a> {
    graph: &'a Graph,
    symtab: &'a mut SymbolTable,
    input: &'a [SymbolId],
    cfg: &'a LookupConfig,
    results: Vec<LookupPath>,
    any_value: SymbolId,
}

/// Run `input` through `g`, returning every accepting `(output, weight)`
/// path within the configured cutoffs. Ties are broken depth-first, in
/// transition order; callers wanting best-first results
/// should sort `g`'s transitions by weight beforehand.
pub fn lookup(
    g: &Graph,
    symtab: &mut SymbolTable,
    input: &[SymbolId],
    cfg: &LookupConfig,
    cancel: &mut Cancellation,
) -> Result<Vec<LookupPath>, OpError> {
    let any_value = symtab.intern_value(wfst_core::flags::FLAG_VALUE_ANY);
    let mut ctx = LookupCtx {
        graph: g,
        symtab,
        input,
        cfg,
        results: Vec::new(),
        any_value,
    };
    let mut epsilons = EpsilonHandler::new(cfg.max_epsilon_cycles);
    dfs(
        &mut ctx,
        StateId::INITIAL,
        0,
        Weight::ONE,
        Vec::new(),
        &mut epsilons,
        FlagState::default(),
        cancel,
    )?;
    Ok(ctx.results)
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    ctx: &mut LookupCtx,
    state: StateId,
    pos: usize,
    weight: Weight,
    path: Vec<(SymbolId, SymbolId)>,
    epsilons: &mut EpsilonHandler,
    flags: FlagState,
    cancel: &mut Cancellation,
) -> Result<(), OpError> {
    cancel.check()?;
    if let Some(max_results) = ctx.cfg.max_results {
        if ctx.results.len() >= max_results {
            return Ok(());
        }
    }
    if let Some(max_weight) = ctx.cfg.max_weight {
        if weight > max_weight {
            return Ok(());
        }
    }

    if pos == ctx.input.len() {
        if let Some(fw) = ctx.graph.final_weight(state) {
            ctx.results.push((path.clone(), weight.otimes(fw)));
        }
    }

    let transitions = ctx.graph.transitions(state)?.to_vec();
    for t in transitions {
        if let Some(max_results) = ctx.cfg.max_results {
            if ctx.results.len() >= max_results {
                return Ok(());
            }
        }

        let decoded = ctx.symtab.decode_flag(t.input);
        if let Some(fd) = decoded {
            if ctx.cfg.obey_flags {
                let feature = ctx.symtab.intern_feature(&fd.feature);
                let value = ctx.symtab.intern_value(&fd.value);
                let Some(next_flags) = check_flag(&flags, fd.op, feature, value, ctx.any_value) else {
                    continue;
                };
                if !epsilons.can_continue(state) {
                    continue;
                }
                epsilons.push_back(state);
                dfs(ctx, t.target, pos, weight.otimes(t.weight), path.clone(), epsilons, next_flags, cancel)?;
                epsilons.pop_back();
                continue;
            }
            // obey_flags == false: treat exactly like an epsilon, below.
        }

        if t.input == wfst_core::symbol::EPSILON_ID || decoded.is_some() {
            if !epsilons.can_continue(state) {
                continue;
            }
            epsilons.push_back(state);
            dfs(ctx, t.target, pos, weight.otimes(t.weight), path.clone(), epsilons, flags.clone(), cancel)?;
            epsilons.pop_back();
            continue;
        }

        if pos >= ctx.input.len() {
            continue;
        }
        let next_token = ctx.input[pos];
        let in_alphabet = ctx.graph.alphabet().contains(&next_token);

        if t.input == next_token {
            let mut next_path = path.clone();
            next_path.push((t.input, t.output));
            dfs(ctx, t.target, pos + 1, weight.otimes(t.weight), next_path, epsilons, flags.clone(), cancel)?;
        } else if (t.input == UNKNOWN_ID || t.input == IDENTITY_ID) && !in_alphabet {
            let produced = if t.input == IDENTITY_ID { next_token } else { t.output };
            let mut next_path = path.clone();
            next_path.push((next_token, produced));
            dfs(ctx, t.target, pos + 1, weight.otimes(t.weight), next_path, epsilons, flags.clone(), cancel)?;
        }
    }
    Ok(())
}

/// True iff some state is reachable from `g`'s initial state, while reading
/// `input`, by an unbounded cycle of epsilon and flag-diacritic transitions
/// (a path that never advances the input index yet revisits a state). Used
/// to short-circuit callers that would otherwise diverge on `lookup` with
/// cycle limits disabled.
pub fn is_infinitely_ambiguous(g: &Graph, symtab: &mut SymbolTable, input: &[SymbolId]) -> bool {
    fn walk(
        g: &Graph,
        symtab: &mut SymbolTable,
        state: StateId,
        pos: usize,
        visiting: &mut hashbrown::HashSet<StateId>,
    ) -> bool {
        if !visiting.insert(state) {
            return true;
        }
        let mut found = false;
        if let Ok(transitions) = g.transitions(state) {
            let transitions = transitions.to_vec();
            for t in transitions {
                let is_epsilon_like = t.input == wfst_core::symbol::EPSILON_ID || symtab.decode_flag(t.input).is_some();
                if is_epsilon_like && walk(g, symtab, t.target, pos, visiting) {
                    found = true;
                    break;
                }
            }
        }
        visiting.remove(&state);
        found
    }
    let _ = input;
    let mut visiting = hashbrown::HashSet::new();
    walk(g, symtab, StateId::INITIAL, 0, &mut visiting)
}
