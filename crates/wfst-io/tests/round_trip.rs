//! Cross-crate round trip: build a graph with `wfst-ops` (not just a
//! hand-assembled `wfst-core::Graph`), serialize it through each of the
//! three interchange formats, and check that lookup on the re-read graph
//! still yields the same accepted paths as the original.

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::SymbolTable;
use wfst_core::weight::Weight;

use wfst_ops::algebra::union;
use wfst_ops::cancellation::Cancellation;
use wfst_ops::lookup::{LookupConfig, lookup};

use wfst_io::{att, binary, prolog};

fn build_ab_or_cd(symtab: &mut SymbolTable) -> Graph {
    let a = symtab.intern("a").unwrap();
    let b = symtab.intern("b").unwrap();
    let c = symtab.intern("c").unwrap();
    let d = symtab.intern("d").unwrap();

    let mut left = Graph::new();
    left.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight(0.5)), true);
    left.set_final(StateId(1), Weight(0.1));

    let mut right = Graph::new();
    right.add_transition(StateId(0), Transition::new(StateId(1), c, d, Weight(1.0)), true);
    right.set_final(StateId(1), Weight::ONE);

    union(&left, &right)
}

fn lookup_one(g: &Graph, symtab: &mut SymbolTable, input: &[wfst_core::symbol::SymbolId]) -> Vec<(Vec<(wfst_core::symbol::SymbolId, wfst_core::symbol::SymbolId)>, f64)> {
    let cfg = LookupConfig::default();
    let mut cancel = Cancellation::None;
    lookup(g, symtab, input, &cfg, &mut cancel)
        .unwrap()
        .into_iter()
        .map(|(p, w)| (p, w.0))
        .collect()
}

#[test]
fn att_round_trip_preserves_lookup_behavior() {
    let mut symtab = SymbolTable::new();
    let g = build_ab_or_cd(&mut symtab);
    let a = symtab.intern("a").unwrap();
    let c = symtab.intern("c").unwrap();

    let text = att::write(&[g.clone()], &symtab);
    let mut reread_symtab = SymbolTable::new();
    let graphs = att::read(&text, &mut reread_symtab).unwrap();
    assert_eq!(graphs.len(), 1);
    let reread_a = reread_symtab.intern("a").unwrap();
    let reread_c = reread_symtab.intern("c").unwrap();

    let before = lookup_one(&g, &mut symtab, &[a]);
    let after = lookup_one(&graphs[0], &mut reread_symtab, &[reread_a]);
    assert_eq!(before.len(), 1);
    assert_eq!(after.len(), 1);
    assert!((before[0].1 - after[0].1).abs() < 1e-9);

    let before_c = lookup_one(&g, &mut symtab, &[c]);
    let after_c = lookup_one(&graphs[0], &mut reread_symtab, &[reread_c]);
    assert_eq!(before_c.len(), after_c.len());
}

#[test]
fn prolog_round_trip_preserves_transition_count() {
    let mut symtab = SymbolTable::new();
    let g = build_ab_or_cd(&mut symtab);

    let text = prolog::write(&[g.clone()], &symtab, &["n0"]);
    let mut reread_symtab = SymbolTable::new();
    let graphs = prolog::read(&text, &mut reread_symtab).unwrap();
    assert_eq!(graphs.len(), 1);

    let total_before: usize = (0..g.num_states()).map(|i| g.transitions(StateId(i as u32)).unwrap().len()).sum();
    let total_after: usize = (0..graphs[0].num_states()).map(|i| graphs[0].transitions(StateId(i as u32)).unwrap().len()).sum();
    assert_eq!(total_before, total_after);
}

#[test]
fn binary_round_trip_preserves_lookup_behavior() {
    let mut symtab = SymbolTable::new();
    let g = build_ab_or_cd(&mut symtab);
    let a = symtab.intern("a").unwrap();

    let bytes = binary::write(&g, &symtab);
    let mut reread_symtab = SymbolTable::new();
    let reread = binary::read(&bytes, &mut reread_symtab).unwrap();
    let reread_a = reread_symtab.intern("a").unwrap();

    let before = lookup_one(&g, &mut symtab, &[a]);
    let after = lookup_one(&reread, &mut reread_symtab, &[reread_a]);
    assert_eq!(before.len(), 1);
    assert_eq!(after.len(), 1);
    assert!((before[0].1 - after[0].1).abs() < 1e-9);
}
