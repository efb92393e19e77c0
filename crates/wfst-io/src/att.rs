// AT&T text format: wire-exact
//
// <src>\t<tgt>\t<input>\t<output>\t<weight>   (transition line)
// <src>\t<weight>                             (final state line)
// --                                          (transducer separator)
//

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::{EPSILON, SymbolTable};
use wfst_core::weight::Weight;

use crate::error::IoError;

fn decode_symbol(raw: &str) -> &str {
    match raw {
        "@0@" => EPSILON,
        "@_SPACE_@" => " ",
        "@_TAB_@" => "\t",
        "@_COLON_@" => ":",
        other => other,
    }
}

fn encode_symbol(sym: &str) -> String {
    match sym {
        s if s == EPSILON => "@_EPSILON_SYMBOL_@".to_string(),
        " " => "@_SPACE_@".to_string(),
        "\t" => "@_TAB_@".to_string(),
        ":" => "@_COLON_@".to_string(),
        other => other.to_string(),
    }
}

/// Parse one or more AT&T transducers, separated by a `--` line, into
/// `Graph` values, interning every symbol encountered into `symtab`.
pub fn read(text: &str, symtab: &mut SymbolTable) -> Result<Vec<Graph>, IoError> {
    let mut graphs = Vec::new();
    let mut current = Graph::new();
    let mut has_any_line = false;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if line == "--" {
            graphs.push(std::mem::replace(&mut current, Graph::new()));
            has_any_line = false;
            continue;
        }
        has_any_line = true;
        let fields: Vec<&str> = line.split('\t').collect();
        match fields.len() {
            1 => {
                let src = parse_state(fields[0], lineno)?;
                current.set_final(src, Weight::ONE);
            }
            2 => {
                let src = parse_state(fields[0], lineno)?;
                let weight = parse_weight(fields[1], lineno)?;
                current.set_final(src, weight);
            }
            4 | 5 => {
                let src = parse_state(fields[0], lineno)?;
                let tgt = parse_state(fields[1], lineno)?;
                let input = symtab
                    .intern(decode_symbol(fields[2]))
                    .map_err(IoError::Core)?;
                let output = symtab
                    .intern(decode_symbol(fields[3]))
                    .map_err(IoError::Core)?;
                let weight = if fields.len() == 5 {
                    parse_weight(fields[4], lineno)?
                } else {
                    Weight::ONE
                };
                current.add_transition(src, Transition::new(tgt, input, output, weight), true);
            }
            n => {
                return Err(IoError::NotValidAttFormat {
                    line: lineno + 1,
                    message: format!("expected 1, 2, 4, or 5 tab-separated fields, got {n}"),
                });
            }
        }
    }
    if has_any_line || graphs.is_empty() {
        graphs.push(current);
    }
    Ok(graphs)
}

fn parse_state(field: &str, lineno: usize) -> Result<StateId, IoError> {
    field
        .parse::<u32>()
        .map(StateId)
        .map_err(|_| IoError::NotValidAttFormat {
            line: lineno + 1,
            message: format!("not a valid state index: {field:?}"),
        })
}

fn parse_weight(field: &str, lineno: usize) -> Result<Weight, IoError> {
    field
        .parse::<f64>()
        .map(Weight)
        .map_err(|_| IoError::NotValidAttFormat {
            line: lineno + 1,
            message: format!("not a valid weight: {field:?}"),
        })
}

/// Write `graphs` as AT&T text, one transducer per block separated by `--`.
/// Transitions are emitted before final-state lines, each state in
/// ascending order, matching the order `sort_arcs` would present them in
/// once called.
pub fn write(graphs: &[Graph], symtab: &SymbolTable) -> String {
    let mut out = String::new();
    for (i, g) in graphs.iter().enumerate() {
        if i > 0 {
            out.push_str("--\n");
        }
        for idx in 0..g.num_states() {
            let s = StateId(idx as u32);
            if let Ok(ts) = g.transitions(s) {
                for t in ts {
                    let input = symtab.lookup(t.input).unwrap_or("");
                    let output = symtab.lookup(t.output).unwrap_or("");
                    out.push_str(&format!(
                        "{}\t{}\t{}\t{}\t{}\n",
                        s.0,
                        t.target.0,
                        encode_symbol(input),
                        encode_symbol(output),
                        t.weight.0
                    ));
                }
            }
        }
        for idx in 0..g.num_states() {
            let s = StateId(idx as u32);
            if let Some(w) = g.final_weight(s) {
                out.push_str(&format!("{}\t{}\n", s.0, w.0));
            }
        }
    }
    out
}
