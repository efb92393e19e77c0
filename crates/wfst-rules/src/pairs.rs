// Feasible-pair flattening: every rule-compiler internal graph (Σ*, Σ,
// centers, occasions) is built as an ACCEPTOR over composite "feasible
// pair" symbols rather than as a genuine two-tape transducer, because the
// operator kernel's `complement`/`subtract` (wfst_ops::setops) are defined
// over acceptor languages. Each declared `(input, output)` pair gets one
// fresh composite symbol; the grammar's real input/output tapes are
// restored by a single decoding pass over the fully compiled grammar.
//
// This is the standard technique two-level rule compilers use internally
// (a "feasible pairs" alphabet), not specific to this crate's operator
// kernel.

use hashbrown::HashMap;

use wfst_core::graph::{Graph, StateId};
use wfst_core::symbol::{EPSILON_ID, SymbolId, SymbolTable};

#[derive(Debug, Default)]
pub struct PairTable {
    composite_of: HashMap<(SymbolId, SymbolId), SymbolId>,
    pair_of: HashMap<SymbolId, (SymbolId, SymbolId)>,
}

impl PairTable {
    pub fn new() -> Self {
        PairTable::default()
    }

    /// The composite symbol standing in for `pair`, interning a fresh one
    /// on first use.
    pub fn composite_of(&mut self, symtab: &mut SymbolTable, pair: (SymbolId, SymbolId)) -> SymbolId {
        if let Some(&sym) = self.composite_of.get(&pair) {
            return sym;
        }
        let name = format!("@_PAIR_{}:{}_@", pair.0, pair.1);
        let sym = symtab.intern(&name).expect("generated pair-symbol names are never empty");
        self.composite_of.insert(pair, sym);
        self.pair_of.insert(sym, pair);
        sym
    }

    /// The `(input, output)` pair a composite symbol stands for, if `sym`
    /// is one.
    pub fn decode(&self, sym: SymbolId) -> Option<(SymbolId, SymbolId)> {
        self.pair_of.get(&sym).copied()
    }
}

/// Rewrite `g` into an acceptor over composite pair symbols: every
/// transition's `(input, output)` becomes `(composite, composite)`, except
/// epsilon transitions, which pass through unchanged.
pub fn encode_as_composite(g: &Graph, table: &mut PairTable, symtab: &mut SymbolTable) -> Graph {
    let mut out = g.clone();
    for idx in 0..out.num_states() {
        if let Ok(ts) = out.transitions_mut(StateId(idx as u32)) {
            for t in ts.iter_mut() {
                if t.input == EPSILON_ID && t.output == EPSILON_ID {
                    continue;
                }
                let composite = table.composite_of(symtab, (t.input, t.output));
                t.input = composite;
                t.output = composite;
            }
        }
    }
    out.prune_alphabet(false);
    for &sym in table.pair_of.keys() {
        out.insert_symbol(sym);
    }
    out
}

/// Inverse of [`encode_as_composite`]: every `(composite, composite)`
/// transition is restored to the real `(input, output)` pair it stands
/// for; everything else (epsilon, any symbol `table` doesn't know) is
/// left alone.
pub fn decode_composite(g: &Graph, table: &PairTable) -> Graph {
    let mut out = g.clone();
    for idx in 0..out.num_states() {
        if let Ok(ts) = out.transitions_mut(StateId(idx as u32)) {
            for t in ts.iter_mut() {
                if t.input == t.output {
                    if let Some((real_in, real_out)) = table.decode(t.input) {
                        t.input = real_in;
                        t.output = real_out;
                    }
                }
            }
        }
    }
    out.prune_alphabet(false);
    out
}
