//! Structural layer: grammar rules, boundary detection, error recovery.
//!
//! - [`Grammar`] and [`Rule`] - declarative header patterns per language
//! - [`StructuralParser`] - single-pass boundary detection over a token
//!   stream, never aborting on malformed input
//! - [`ParseBoundary`] / [`ErrorRegion`] - its outputs
//!
//! Depends on `base`, `fact` and `lexer`.

mod boundary;
pub mod grammar;
mod parser;

pub use boundary::{BoundaryKind, ErrorRegion, ParseBoundary};
pub use grammar::{Grammar, MatchOutcome, MatcherSet, Rule, TokenPattern};
pub use parser::{StructuralParser, StructuralResult};
