// Prolog text format: one fact per line, blank line or EOF terminates the
// current transducer.
//
//   network(NAME).
//   arc(NAME,Src,Tgt,"In":"Out",Weight).
//   arc(NAME,Src,Tgt,"Sym",Weight).        (identity shorthand: In == Out)
//   final(NAME,State,Weight).
//   symbol(NAME,"sym").
//
// `"` and `\` inside a quoted atom are backslash-escaped.
//

use wfst_core::graph::{Graph, StateId, Transition};
use wfst_core::symbol::SymbolTable;
use wfst_core::weight::Weight;

use crate::error::IoError;

/// Parse one or more Prolog-format transducers. A blank line ends the
/// transducer currently being built; a new `network(...)` fact starts the
/// next one. EOF ends whatever transducer is in progress.
pub fn read(text: &str, symtab: &mut SymbolTable) -> Result<Vec<Graph>, IoError> {
    let mut graphs = Vec::new();
    let mut current: Option<Graph> = None;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            if let Some(g) = current.take() {
                graphs.push(g);
            }
            continue;
        }
        let fact = parse_fact(line, lineno)?;
        match fact {
            Fact::Network(_name) => {
                if let Some(g) = current.take() {
                    graphs.push(g);
                }
                current = Some(Graph::new());
            }
            Fact::Arc { src, tgt, input, output, weight } => {
                let g = current.get_or_insert_with(Graph::new);
                let input_id = symtab.intern(&input).map_err(IoError::Core)?;
                let output_id = symtab.intern(&output).map_err(IoError::Core)?;
                g.add_transition(
                    StateId(src),
                    Transition::new(StateId(tgt), input_id, output_id, weight),
                    true,
                );
            }
            Fact::Final { state, weight } => {
                let g = current.get_or_insert_with(Graph::new);
                g.set_final(StateId(state), weight);
            }
            Fact::Symbol(sym) => {
                let g = current.get_or_insert_with(Graph::new);
                let id = symtab.intern(&sym).map_err(IoError::Core)?;
                g.insert_symbol(id);
            }
        }
    }
    if let Some(g) = current.take() {
        graphs.push(g);
    }
    Ok(graphs)
}

enum Fact {
    Network(String),
    Arc { src: u32, tgt: u32, input: String, output: String, weight: Weight },
    Final { state: u32, weight: Weight },
    Symbol(String),
}

fn parse_fact(line: &str, lineno: usize) -> Result<Fact, IoError> {
    let line = line.strip_suffix('.').ok_or_else(|| IoError::NotValidPrologFormat {
        line: lineno + 1,
        message: "clause does not end with '.'".to_string(),
    })?;
    let open = line.find('(').ok_or_else(|| IoError::NotValidPrologFormat {
        line: lineno + 1,
        message: "missing '(' after functor".to_string(),
    })?;
    let functor = &line[..open];
    let close = line.rfind(')').ok_or_else(|| IoError::NotValidPrologFormat {
        line: lineno + 1,
        message: "missing closing ')'".to_string(),
    })?;
    let args = split_args(&line[open + 1..close], lineno)?;

    match functor {
        "network" => {
            let name = args.first().cloned().unwrap_or_default();
            Ok(Fact::Network(unquote(&name)))
        }
        "arc" => {
            if args.len() != 5 {
                return Err(IoError::NotValidPrologFormat {
                    line: lineno + 1,
                    message: format!("arc/{} expected arc/5", args.len()),
                });
            }
            let src = parse_index(&args[1], lineno)?;
            let tgt = parse_index(&args[2], lineno)?;
            let weight = parse_weight(&args[4], lineno)?;
            let (input, output) = if let Some((a, b)) = args[3].split_once(':') {
                (unquote(a), unquote(b))
            } else {
                let sym = unquote(&args[3]);
                (sym.clone(), sym)
            };
            Ok(Fact::Arc { src, tgt, input, output, weight })
        }
        "final" => {
            if args.len() != 3 {
                return Err(IoError::NotValidPrologFormat {
                    line: lineno + 1,
                    message: format!("final/{} expected final/3", args.len()),
                });
            }
            let state = parse_index(&args[1], lineno)?;
            let weight = parse_weight(&args[2], lineno)?;
            Ok(Fact::Final { state, weight })
        }
        "symbol" => {
            if args.len() != 2 {
                return Err(IoError::NotValidPrologFormat {
                    line: lineno + 1,
                    message: format!("symbol/{} expected symbol/2", args.len()),
                });
            }
            Ok(Fact::Symbol(unquote(&args[1])))
        }
        other => Err(IoError::NotValidPrologFormat {
            line: lineno + 1,
            message: format!("unknown functor: {other:?}"),
        }),
    }
}

/// Split a Prolog argument list on top-level commas, respecting quoted
/// atoms (commas and colons inside `"..."` do not split).
fn split_args(s: &str, lineno: usize) -> Result<Vec<String>, IoError> {
    let mut args = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                cur.push(c);
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                cur.push(c);
            }
            ',' if !in_quotes => {
                args.push(std::mem::take(&mut cur));
            }
            _ => cur.push(c),
        }
    }
    if in_quotes {
        return Err(IoError::NotValidPrologFormat {
            line: lineno + 1,
            message: "unterminated quoted atom".to_string(),
        });
    }
    args.push(cur);
    Ok(args.iter().map(|a| a.trim().to_string()).collect())
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let Some(inner) = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn parse_index(s: &str, lineno: usize) -> Result<u32, IoError> {
    s.trim().parse::<u32>().map_err(|_| IoError::NotValidPrologFormat {
        line: lineno + 1,
        message: format!("not a valid state index: {s:?}"),
    })
}

fn parse_weight(s: &str, lineno: usize) -> Result<Weight, IoError> {
    s.trim().parse::<f64>().map(Weight).map_err(|_| IoError::NotValidPrologFormat {
        line: lineno + 1,
        message: format!("not a valid weight: {s:?}"),
    })
}

/// Write `graphs` as Prolog-format text, one fact per line, blank-line
/// separated.
pub fn write(graphs: &[Graph], symtab: &SymbolTable, names: &[&str]) -> String {
    let mut out = String::new();
    for (i, g) in graphs.iter().enumerate() {
        let name = names.get(i).copied().unwrap_or("network");
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("network({name}).\n"));
        for idx in 0..g.num_states() {
            let s = StateId(idx as u32);
            if let Ok(ts) = g.transitions(s) {
                for t in ts {
                    let input = symtab.lookup(t.input).unwrap_or("");
                    let output = symtab.lookup(t.output).unwrap_or("");
                    if input == output {
                        out.push_str(&format!(
                            "arc({name},{},{},\"{}\",{}).\n",
                            s.0,
                            t.target.0,
                            escape(input),
                            t.weight.0
                        ));
                    } else {
                        out.push_str(&format!(
                            "arc({name},{},{},\"{}\":\"{}\",{}).\n",
                            s.0,
                            t.target.0,
                            escape(input),
                            escape(output),
                            t.weight.0
                        ));
                    }
                }
            }
        }
        for idx in 0..g.num_states() {
            let s = StateId(idx as u32);
            if let Some(w) = g.final_weight(s) {
                out.push_str(&format!("final({name},{},{}).\n", s.0, w.0));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_single_network() {
        let text = "network(n0).\narc(n0,0,1,\"a\":\"b\",0.5).\nfinal(n0,1,0.0).\n";
        let mut symtab = SymbolTable::new();
        let graphs = read(text, &mut symtab).unwrap();
        assert_eq!(graphs.len(), 1);
        let g = &graphs[0];
        assert_eq!(g.transitions(StateId(0)).unwrap().len(), 1);
        assert_eq!(g.final_weight(StateId(1)), Some(Weight::ONE));
    }

    #[test]
    fn identity_shorthand_sets_input_equals_output() {
        let text = "network(n0).\narc(n0,0,1,\"a\",0.0).\n";
        let mut symtab = SymbolTable::new();
        let graphs = read(text, &mut symtab).unwrap();
        let t = &graphs[0].transitions(StateId(0)).unwrap()[0];
        assert_eq!(t.input, t.output);
        assert_eq!(symtab.lookup(t.input), Some("a"));
    }

    #[test]
    fn blank_line_ends_one_transducer_eof_ends_the_other() {
        let text = "network(n0).\narc(n0,0,1,\"a\",0.0).\n\nnetwork(n1).\narc(n1,0,1,\"b\",0.0).\n";
        let mut symtab = SymbolTable::new();
        let graphs = read(text, &mut symtab).unwrap();
        assert_eq!(graphs.len(), 2);
    }

    #[test]
    fn escaped_quotes_round_trip() {
        let text = "network(n0).\narc(n0,0,1,\"a\\\"b\",0.0).\n";
        let mut symtab = SymbolTable::new();
        let graphs = read(text, &mut symtab).unwrap();
        let t = &graphs[0].transitions(StateId(0)).unwrap()[0];
        assert_eq!(symtab.lookup(t.input), Some("a\"b"));
    }

    #[test]
    fn rejects_wrong_arity() {
        let text = "network(n0).\narc(n0,0,1,\"a\").\n";
        let mut symtab = SymbolTable::new();
        assert!(read(text, &mut symtab).is_err());
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let b = symtab.intern("b").unwrap();
        let mut g = Graph::new();
        g.add_transition(StateId(0), Transition::new(StateId(1), a, b, Weight(1.5)), true);
        g.set_final(StateId(1), Weight::ONE);

        let text = write(&[g], &symtab, &["n0"]);
        let parsed = read(&text, &mut symtab).unwrap();
        let t = &parsed[0].transitions(StateId(0)).unwrap()[0];
        assert_eq!(t.weight, Weight(1.5));
    }
}
