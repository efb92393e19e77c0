// Grammar source types: the construction-API surface a caller (or a future
// textual-grammar parser, out of scope here) builds and hands to
// `compile_grammar`.

use hashbrown::HashMap;

use wfst_core::graph::Graph;
use wfst_core::symbol::SymbolId;

/// A rule's center: the pair (or disjunction of pairs) that the rule's
/// context constrains. A disjunction lets several input symbols share one
/// rule ("a:b, e:f => ...").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CenterSpec {
    Pair(SymbolId, SymbolId),
    Disjunction(Vec<(SymbolId, SymbolId)>),
}

impl CenterSpec {
    pub fn pairs(&self) -> Vec<(SymbolId, SymbolId)> {
        match self {
            CenterSpec::Pair(i, o) => vec![(*i, *o)],
            CenterSpec::Disjunction(pairs) => pairs.clone(),
        }
    }

    /// Distinct input symbols appearing in this center, in first-seen order.
    pub fn input_symbols(&self) -> Vec<SymbolId> {
        let mut seen = Vec::new();
        for (i, _) in self.pairs() {
            if !seen.contains(&i) {
                seen.push(i);
            }
        }
        seen
    }

    /// The output symbol this center assigns to `input`, if any (the first
    /// matching pair when a disjunction maps one input to several outputs).
    pub fn output_for(&self, input: SymbolId) -> Option<SymbolId> {
        self.pairs().into_iter().find(|(i, _)| *i == input).map(|(_, o)| o)
    }
}

/// One side of a rule's context: a language-accepting transducer, built by
/// the caller via the construction API exactly as the rule's center and
/// alphabet are.
pub type ContextSpec = Graph;

/// Which direction(s) a rule constrains the relationship between center and
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOp {
    /// `=>` : the center may only occur in the given contexts.
    RightArrow,
    /// `<=` : the center must occur in the given contexts.
    LeftArrow,
    /// `<=>` : both directions.
    Both,
    /// `/<=` : the center must not occur in the given contexts.
    Exclusion,
}

/// A single two-level rule: a name (used in conflict reports), a center, an
/// operator, and one or more (left, right) context pairs -- a rule with
/// several contexts applies disjunctively over them.
#[derive(Debug, Clone)]
pub struct RuleSource {
    pub name: String,
    pub center: CenterSpec,
    pub op: RuleOp,
    pub contexts: Vec<(ContextSpec, ContextSpec)>,
}

/// A full two-level grammar: the declared alphabet (the only pairs legal in
/// rule transitions), diacritics (freely insertable into any context),
/// named symbol sets (available to callers composing `ContextSpec` graphs,
/// not otherwise interpreted by the compiler), and the rule list.
#[derive(Debug, Clone)]
pub struct GrammarSource {
    pub alphabet: Vec<(SymbolId, SymbolId)>,
    pub diacritics: Vec<SymbolId>,
    pub sets: HashMap<String, Vec<SymbolId>>,
    pub rules: Vec<RuleSource>,
}

impl GrammarSource {
    pub fn new(alphabet: Vec<(SymbolId, SymbolId)>) -> Self {
        GrammarSource {
            alphabet,
            diacritics: Vec::new(),
            sets: HashMap::new(),
            rules: Vec::new(),
        }
    }
}
