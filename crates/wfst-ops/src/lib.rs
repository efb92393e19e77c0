//! The algebraic operator kernel (C3) and alphabet harmonizer (C4) over
//! [`wfst_core::Graph`].
//!
//! # Architecture
//!
//! - [`harmonize`] -- C4: alphabet reconciliation, invoked by every binary
//!   operator before it runs.
//! - [`algebra`] -- union, concatenation, Kleene star/plus, reverse, invert.
//! - [`product`] -- intersection and composition (product constructions).
//! - [`setops`] -- projection, complement, subtraction.
//! - [`determinize`] -- subset construction, weight pushing, Hopcroft-style
//!   and Brzozowski minimization.
//! - [`epsilon`] -- epsilon removal via per-state epsilon-closure.
//! - [`substitute`] -- symbol/pair/pair-set/graph substitution and free
//!   insertion.
//! - [`lookup`] -- weighted lookup with epsilon-cycle and flag-diacritic
//!   control, plus infinite-ambiguity detection.
//! - [`nbest`] -- n-best path extraction.
//! - [`markers`] -- the optional weight-as-marker adapter.
//! - [`cancellation`] -- cooperative cancellation for long-running
//!   operators.
//! - [`error`] -- this crate's error type.

pub mod algebra;
pub mod cancellation;
pub mod determinize;
pub mod epsilon;
pub mod error;
pub mod harmonize;
pub mod lookup;
pub mod markers;
pub mod nbest;
pub mod product;
pub mod setops;
pub mod substitute;

pub use cancellation::Cancellation;
pub use error::OpError;
pub use lookup::{LookupConfig, LookupPath};
