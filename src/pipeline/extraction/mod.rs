//! Deterministic pattern-matching extraction of clinical notes.

pub mod rules;
pub mod sections;

pub use rules::*;
pub use sections::*;
