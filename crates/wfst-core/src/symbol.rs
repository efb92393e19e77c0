// Symbol table: bidirectional string <-> id mapping, plus flag diacritic
// decoding.

use std::sync::{OnceLock, RwLock};

use hashbrown::HashMap;

use crate::error::CoreError;
use crate::flags::{FlagDiacritic, looks_like_flag_diacritic, parse_flag_diacritic};

pub type SymbolId = u32;

/// `EPSILON` -- empty input/output.
pub const EPSILON: &str = "@_EPSILON_SYMBOL_@";
/// `UNKNOWN` -- matches any symbol outside the declared alphabet.
pub const UNKNOWN: &str = "@_UNKNOWN_SYMBOL_@";
/// `IDENTITY` -- matches any out-of-alphabet symbol, input == output.
pub const IDENTITY: &str = "@_IDENTITY_SYMBOL_@";
/// `DEFAULT` -- reserved, currently inert (treated as `UNKNOWN`).
pub const DEFAULT: &str = "@_DEFAULT_SYMBOL_@";

pub const EPSILON_ID: SymbolId = 0;
pub const UNKNOWN_ID: SymbolId = 1;
pub const IDENTITY_ID: SymbolId = 2;
pub const DEFAULT_ID: SymbolId = 3;

/// Process-wide (or graph-local) append-only symbol registry.
///
/// Four reserved ids (`EPSILON_ID`..`DEFAULT_ID`) are established by `new()`.
/// Every other symbol is assigned the next sequential id on first `intern`.
/// Once assigned, an id is never reused or reassigned.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbol_of_id: Vec<String>,
    id_of_symbol: HashMap<String, SymbolId>,
    diacritic_cache: HashMap<SymbolId, Option<FlagDiacritic>>,
    feature_ids: HashMap<String, SymbolId>,
    value_ids: HashMap<String, SymbolId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            symbol_of_id: Vec::new(),
            id_of_symbol: HashMap::new(),
            diacritic_cache: HashMap::new(),
            feature_ids: HashMap::new(),
            value_ids: HashMap::new(),
        };
        for reserved in [EPSILON, UNKNOWN, IDENTITY, DEFAULT] {
            let id = table.symbol_of_id.len() as SymbolId;
            table.symbol_of_id.push(reserved.to_string());
            table.id_of_symbol.insert(reserved.to_string(), id);
        }
        // Preseed the sentinel values every flag diacritic's value resolves
        // against: "" is the neutral (unset) value, `@` is `FLAG_VALUE_ANY`.
        table.value_ids.insert(String::new(), 0);
        table.value_ids.insert(crate::flags::FLAG_VALUE_ANY.to_string(), 1);
        table
    }

    /// Insert `symbol` if absent and return its id; return the existing id
    /// otherwise. Fails on the empty string (`intern("")` fails with
    /// `EmptySymbolError`).
    pub fn intern(&mut self, symbol: &str) -> Result<SymbolId, CoreError> {
        if symbol.is_empty() {
            return Err(CoreError::EmptySymbolError);
        }
        if let Some(&id) = self.id_of_symbol.get(symbol) {
            return Ok(id);
        }
        let id = self.symbol_of_id.len() as SymbolId;
        self.symbol_of_id.push(symbol.to_string());
        self.id_of_symbol.insert(symbol.to_string(), id);
        Ok(id)
    }

    pub fn lookup(&self, id: SymbolId) -> Option<&str> {
        self.symbol_of_id.get(id as usize).map(String::as_str)
    }

    /// The id of `symbol`, if it has already been interned.
    pub fn find(&self, symbol: &str) -> Option<SymbolId> {
        self.id_of_symbol.get(symbol).copied()
    }

    pub fn max_id(&self) -> SymbolId {
        self.symbol_of_id.len() as SymbolId - 1
    }

    pub fn is_reserved(&self, id: SymbolId) -> bool {
        id <= DEFAULT_ID
    }

    /// `true` if `id` is a flag diacritic symbol. O(1) after first parse,
    /// since the result is memoized in `diacritic_cache`.
    pub fn is_diacritic(&mut self, id: SymbolId) -> bool {
        self.decode_flag(id).is_some()
    }

    /// Parse `id`'s symbol string into `(operator, feature_id, value_id)`,
    /// caching the result. Returns `None` for symbols that are not flag
    /// diacritics (including the four reserved symbols).
    pub fn decode_flag(&mut self, id: SymbolId) -> Option<FlagDiacritic> {
        if let Some(cached) = self.diacritic_cache.get(&id) {
            return cached.clone();
        }
        let parsed = self.lookup(id).and_then(|s| {
            if !looks_like_flag_diacritic(s) {
                return None;
            }
            parse_flag_diacritic(s).ok()
        });
        self.diacritic_cache.insert(id, parsed.clone());
        parsed
    }

    /// Interned id for a flag diacritic's feature name, assigning a fresh id
    /// on first use, keyed into this same symbol table's id space.
    pub fn intern_feature(&mut self, feature: &str) -> SymbolId {
        if let Some(&id) = self.feature_ids.get(feature) {
            return id;
        }
        let id = self.feature_ids.len() as SymbolId;
        self.feature_ids.insert(feature.to_string(), id);
        id
    }

    pub fn intern_value(&mut self, value: &str) -> SymbolId {
        if let Some(&id) = self.value_ids.get(value) {
            return id;
        }
        let id = self.value_ids.len() as SymbolId;
        self.value_ids.insert(value.to_string(), id);
        id
    }
}

static GLOBAL_TABLE: OnceLock<RwLock<SymbolTable>> = OnceLock::new();

impl SymbolTable {
    /// The process-wide symbol table, lazily created on first access and
    /// guarded by a single-writer/many-readers lock. Most callers want a
    /// graph-local, owned `SymbolTable::new()` instead; this exists for
    /// callers that genuinely need one shared id space across graphs built
    /// in different places.
    pub fn global() -> &'static RwLock<SymbolTable> {
        GLOBAL_TABLE.get_or_init(|| RwLock::new(SymbolTable::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_are_preassigned() {
        let t = SymbolTable::new();
        assert_eq!(t.lookup(EPSILON_ID), Some(EPSILON));
        assert_eq!(t.lookup(UNKNOWN_ID), Some(UNKNOWN));
        assert_eq!(t.lookup(IDENTITY_ID), Some(IDENTITY));
        assert_eq!(t.lookup(DEFAULT_ID), Some(DEFAULT));
        assert!(t.is_reserved(EPSILON_ID));
        assert!(!t.is_reserved(4));
    }

    #[test]
    fn intern_is_idempotent() {
        let mut t = SymbolTable::new();
        let a1 = t.intern("a").unwrap();
        let a2 = t.intern("a").unwrap();
        assert_eq!(a1, a2);
        assert_eq!(t.lookup(a1), Some("a"));
    }

    #[test]
    fn intern_empty_fails() {
        let mut t = SymbolTable::new();
        assert_eq!(t.intern(""), Err(CoreError::EmptySymbolError));
    }

    #[test]
    fn find_without_interning() {
        let mut t = SymbolTable::new();
        assert_eq!(t.find("a"), None);
        let id = t.intern("a").unwrap();
        assert_eq!(t.find("a"), Some(id));
    }

    #[test]
    fn max_id_tracks_interning() {
        let mut t = SymbolTable::new();
        assert_eq!(t.max_id(), DEFAULT_ID);
        t.intern("a").unwrap();
        assert_eq!(t.max_id(), DEFAULT_ID + 1);
    }

    #[test]
    fn decode_flag_recognizes_diacritics_and_caches() {
        let mut t = SymbolTable::new();
        let id = t.intern("@P.CASE.NOM@").unwrap();
        let fd = t.decode_flag(id).unwrap();
        assert_eq!(fd.feature, "CASE");
        // second call hits the cache path
        assert!(t.is_diacritic(id));
    }

    #[test]
    fn decode_flag_rejects_normal_symbols() {
        let mut t = SymbolTable::new();
        let id = t.intern("a").unwrap();
        assert_eq!(t.decode_flag(id), None);
        assert!(!t.is_diacritic(id));
    }

    #[test]
    fn feature_and_value_ids_are_stable_and_shared_across_features() {
        let mut t = SymbolTable::new();
        let f1 = t.intern_feature("CASE");
        let f2 = t.intern_feature("NUM");
        let f3 = t.intern_feature("CASE");
        assert_eq!(f1, f3);
        assert_ne!(f1, f2);
    }

    #[test]
    fn value_ids_preseed_neutral_and_any() {
        let mut t = SymbolTable::new();
        assert_eq!(t.intern_value(""), 0);
        assert_eq!(t.intern_value(crate::flags::FLAG_VALUE_ANY), 1);
        assert_eq!(t.intern_value("NOM"), 2);
    }

    #[test]
    fn global_table_is_shared_and_lazily_initialized() {
        let id = {
            let mut guard = SymbolTable::global().write().unwrap();
            guard.intern("shared-symbol").unwrap()
        };
        let guard = SymbolTable::global().read().unwrap();
        assert_eq!(guard.lookup(id), Some("shared-symbol"));
    }
}
