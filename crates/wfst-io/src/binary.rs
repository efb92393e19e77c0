// Self-contained binary stream framing.
//
// Layout:
//   magic:          u32 le  (b"WFS1" as a little-endian integer)
//   version:        u16 le  (currently 1)
//   header_len:     u32 le  (byte length of the header payload that follows)
//   header payload: header_len bytes of UTF-8, newline-separated `key=value`
//                   pairs (name=..., number_of_states=..., number_of_arcs=...,
//                   number_of_symbols=...)
//   symbol table:   number_of_symbols entries, each a u32-le byte length
//                   followed by that many UTF-8 bytes (index == SymbolId
//                   within this stream, independent of any live process's
//                   `SymbolTable` numbering)
//   transitions:    number_of_arcs `TransitionRecord`s
//   finals:         a u32-le count followed by that many `FinalRecord`s
//

use bytemuck::{Pod, Zeroable};

use wfst_core::graph::{Graph, StateId, Transition as GraphTransition};
use wfst_core::symbol::{SymbolId, SymbolTable};
use wfst_core::weight::Weight;

use crate::error::IoError;

const MAGIC: u32 = 0x3153_4657; // "WFS1" little-endian
const VERSION: u16 = 1;

/// One arc: 24 bytes, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransitionRecord {
    pub src: u32,
    pub target: u32,
    pub input: u32,
    pub output: u32,
    pub weight: f64,
}

const _: () = assert!(size_of::<TransitionRecord>() == 24);

/// One final-state weight: 16 bytes, explicit padding field to keep the
/// layout portable across targets with different default alignment for
/// `f64` after a `u32` pair.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FinalRecord {
    pub state: u32,
    pub _pad: u32,
    pub weight: f64,
}

const _: () = assert!(size_of::<FinalRecord>() == 16);

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32, IoError> {
    let slice = bytes.get(*pos..*pos + 4).ok_or(IoError::EndOfStream)?;
    *pos += 4;
    Ok(u32::from_le_bytes(slice.try_into().expect("slice is exactly 4 bytes")))
}

fn read_u16(bytes: &[u8], pos: &mut usize) -> Result<u16, IoError> {
    let slice = bytes.get(*pos..*pos + 2).ok_or(IoError::EndOfStream)?;
    *pos += 2;
    Ok(u16::from_le_bytes(slice.try_into().expect("slice is exactly 2 bytes")))
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Serialize `g` into the framed binary format. `g`'s alphabet is written
/// out as a self-contained string table local to this stream; the ids used
/// in the written records are renumbered densely starting at 0 and do not
/// need to match `symtab`'s ids.
pub fn write(g: &Graph, symtab: &SymbolTable) -> Vec<u8> {
    let mut local_ids: hashbrown::HashMap<SymbolId, u32> = hashbrown::HashMap::new();
    let mut symbols: Vec<&str> = Vec::new();
    let mut intern_local = |id: SymbolId| -> u32 {
        *local_ids.entry(id).or_insert_with(|| {
            symbols.push(symtab.lookup(id).unwrap_or(""));
            (symbols.len() - 1) as u32
        })
    };

    let mut transition_records = Vec::new();
    for idx in 0..g.num_states() {
        let s = StateId(idx as u32);
        for t in g.transitions(s).expect("idx ranges over g's own states") {
            transition_records.push(TransitionRecord {
                src: idx as u32,
                target: t.target.0,
                input: intern_local(t.input),
                output: intern_local(t.output),
                weight: t.weight.0,
            });
        }
    }
    let mut final_records: Vec<FinalRecord> = g
        .final_weights()
        .map(|(s, w)| FinalRecord { state: s.0, _pad: 0, weight: w.0 })
        .collect();
    final_records.sort_by_key(|r| r.state);

    let header = format!(
        "name={}\nnumber_of_states={}\nnumber_of_arcs={}\nnumber_of_symbols={}\n",
        g.name,
        g.num_states(),
        transition_records.len(),
        symbols.len(),
    );

    let mut out = Vec::new();
    write_u32(&mut out, MAGIC);
    write_u16(&mut out, VERSION);
    write_u32(&mut out, header.len() as u32);
    out.extend_from_slice(header.as_bytes());

    for sym in &symbols {
        write_u32(&mut out, sym.len() as u32);
        out.extend_from_slice(sym.as_bytes());
    }
    for rec in &transition_records {
        out.extend_from_slice(bytemuck::bytes_of(rec));
    }
    write_u32(&mut out, final_records.len() as u32);
    for rec in &final_records {
        out.extend_from_slice(bytemuck::bytes_of(rec));
    }
    out
}

/// Parse a stream written by [`write`], interning its local symbol table
/// into `symtab`.
pub fn read(bytes: &[u8], symtab: &mut SymbolTable) -> Result<Graph, IoError> {
    let mut pos = 0;
    let magic = read_u32(bytes, &mut pos)?;
    if magic != MAGIC {
        return Err(IoError::UnsupportedFormat(format!("unrecognized magic 0x{magic:08x}")));
    }
    let version = read_u16(bytes, &mut pos)?;
    if version != VERSION {
        return Err(IoError::UnsupportedFormat(format!("unsupported version {version}")));
    }
    let header_len = read_u32(bytes, &mut pos)? as usize;
    let header_bytes = bytes.get(pos..pos + header_len).ok_or(IoError::EndOfStream)?;
    pos += header_len;
    let header = std::str::from_utf8(header_bytes)
        .map_err(|_| IoError::UnsupportedFormat("header is not valid UTF-8".to_string()))?;

    let mut name = String::new();
    let mut number_of_states = 0usize;
    let mut number_of_arcs = 0usize;
    let mut number_of_symbols = 0usize;
    for line in header.lines() {
        if let Some((key, value)) = line.split_once('=') {
            match key {
                "name" => name = value.to_string(),
                "number_of_states" => number_of_states = value.parse().unwrap_or(0),
                "number_of_arcs" => number_of_arcs = value.parse().unwrap_or(0),
                "number_of_symbols" => number_of_symbols = value.parse().unwrap_or(0),
                _ => {}
            }
        }
    }

    let mut local_symbols: Vec<SymbolId> = Vec::with_capacity(number_of_symbols);
    for _ in 0..number_of_symbols {
        let len = read_u32(bytes, &mut pos)? as usize;
        let raw = bytes.get(pos..pos + len).ok_or(IoError::EndOfStream)?;
        pos += len;
        let s = std::str::from_utf8(raw)
            .map_err(|_| IoError::UnsupportedFormat("symbol entry is not valid UTF-8".to_string()))?;
        local_symbols.push(symtab.intern(s).map_err(IoError::Core)?);
    }

    let mut g = Graph::with_name(name);
    if number_of_states > 0 {
        g.ensure_state(StateId((number_of_states - 1) as u32));
    }
    for _ in 0..number_of_arcs {
        let rec_bytes = bytes.get(pos..pos + size_of::<TransitionRecord>()).ok_or(IoError::EndOfStream)?;
        pos += size_of::<TransitionRecord>();
        let rec: TransitionRecord = *bytemuck::from_bytes(rec_bytes);
        let input = *local_symbols.get(rec.input as usize).ok_or(IoError::EndOfStream)?;
        let output = *local_symbols.get(rec.output as usize).ok_or(IoError::EndOfStream)?;
        g.add_transition(
            StateId(rec.src),
            GraphTransition::new(StateId(rec.target), input, output, Weight(rec.weight)),
            true,
        );
    }

    let final_count = read_u32(bytes, &mut pos)? as usize;
    for _ in 0..final_count {
        let rec_bytes = bytes.get(pos..pos + size_of::<FinalRecord>()).ok_or(IoError::EndOfStream)?;
        pos += size_of::<FinalRecord>();
        let rec: FinalRecord = *bytemuck::from_bytes(rec_bytes);
        g.set_final(StateId(rec.state), Weight(rec.weight));
    }

    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfst_core::graph::Transition;

    #[test]
    fn round_trips_a_small_graph() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let b = symtab.intern("b").unwrap();
        let mut g = Graph::with_name("t0");
        g.add_transition(StateId(0), Transition::new(StateId(1), a, b, Weight(1.5)), true);
        g.set_final(StateId(1), Weight(0.25));

        let bytes = write(&g, &symtab);
        let mut symtab2 = SymbolTable::new();
        let parsed = read(&bytes, &mut symtab2).unwrap();

        assert_eq!(parsed.name, "t0");
        assert_eq!(parsed.num_states(), 2);
        let t = &parsed.transitions(StateId(0)).unwrap()[0];
        assert_eq!(t.weight, Weight(1.5));
        assert_eq!(symtab2.lookup(t.input), Some("a"));
        assert_eq!(symtab2.lookup(t.output), Some("b"));
        assert_eq!(parsed.final_weight(StateId(1)), Some(Weight(0.25)));
    }

    #[test]
    fn round_trips_a_trailing_dangling_state() {
        let mut symtab = SymbolTable::new();
        let a = symtab.intern("a").unwrap();
        let mut g = Graph::with_name("t1");
        g.add_transition(StateId(0), Transition::new(StateId(1), a, a, Weight::ONE), true);
        g.set_final(StateId(1), Weight::ONE);
        // state 2 has no transitions and is not final, but must still
        // round-trip as a real state.
        g.ensure_state(StateId(2));

        let bytes = write(&g, &symtab);
        let mut symtab2 = SymbolTable::new();
        let parsed = read(&bytes, &mut symtab2).unwrap();
        assert_eq!(parsed.num_states(), 3);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut symtab = SymbolTable::new();
        let bytes = vec![0u8; 16];
        assert!(matches!(read(&bytes, &mut symtab), Err(IoError::UnsupportedFormat(_))));
    }

    #[test]
    fn rejects_truncated_stream() {
        let mut symtab = SymbolTable::new();
        let g = Graph::new();
        let mut bytes = write(&g, &symtab);
        bytes.truncate(bytes.len() - 1);
        let mut symtab2 = SymbolTable::new();
        assert!(matches!(read(&bytes, &mut symtab2), Err(IoError::EndOfStream)));
    }
}
