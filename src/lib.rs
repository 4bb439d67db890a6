//! # factum
//!
//! Incremental fact-extraction engine: a streaming lexer, structural
//! boundary detection with error recovery, cached per-boundary fact
//! generation, and a small query engine over the resulting fact store.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! engine    → DetailedParser orchestration, fact generation, LRU cache,
//!   ↓         viewport scheduling
//! query     → QueryIndex, Query/QueryExecutor
//!   ↓
//! structure → Grammar rules, StructuralParser, boundaries, recovery
//!   ↓
//! lexer     → Logos-based streaming lexer, incremental retokenization
//!   ↓
//! fact      → 24-byte Fact records, Value payloads, FactStore
//!   ↓
//! base      → Span/PackedSpan, atom interning
//! ```

// ============================================================================
// MODULES (dependency order: base → fact → lexer → structure → query → engine)
// ============================================================================

/// Foundation types: Span, PackedSpan, atom interning
pub mod base;

/// Facts: fixed-size records, payloads, the generation-tagged store
pub mod fact;

/// Streaming lexer: tokenization, chunked input, minimal edit re-scans
pub mod lexer;

/// Structural layer: grammar rules, boundary detection, error recovery
pub mod structure;

/// Query layer: secondary indices and declarative query execution
pub mod query;

/// Incremental engine: orchestration, fact generation, cache, viewport
pub mod engine;

/// Engine tuning knobs
pub mod config;

/// Error types
pub mod error;

// Re-export the types most callers need
pub use base::{AtomId, AtomTable, PackedSpan, Span};
pub use config::EngineConfig;
pub use engine::{DetailedParser, FactDelta, FactStream, ParseResult};
pub use error::{EngineError, Result};
pub use fact::{Confidence, Fact, FactId, FactStore, Predicate, Value};
pub use lexer::{Edit, LanguageSpec, StreamingLexer, Token, TokenDelta, TokenKind};
pub use query::{Query, QueryExecutor, QueryIndex, QueryResult};
pub use structure::{BoundaryKind, ErrorRegion, ParseBoundary, StructuralParser};
