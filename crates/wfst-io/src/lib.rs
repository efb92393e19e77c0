//! Serialization formats for [`wfst_core::Graph`]: AT&T text, Prolog text,
//! and a self-contained binary stream framing.
//!
//! - [`att`] -- tab-separated AT&T transducer text, the format most
//!   interoperable tools read and write.
//! - [`prolog`] -- `network(...)`/`arc(...)`/`final(...)`/`symbol(...)`
//!   clause text.
//! - [`binary`] -- framed binary records for fast load/save round-trips,
//!   independent of any process's live `SymbolTable` numbering.
//! - [`error`] -- this crate's error type.

pub mod att;
pub mod binary;
pub mod error;
pub mod prolog;

pub use error::IoError;
