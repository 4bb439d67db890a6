//! Incremental engine: fact generation, caching, viewport scheduling
//! and the orchestrating [`DetailedParser`].
//!
//! - [`FactGenerator`] - boundary + tokens to facts
//! - [`BoundaryCache`] - span-keyed LRU of generated facts
//! - [`ViewportManager`] - visible-range tracking and parse priority
//! - [`DetailedParser`] - full parse, edit-driven re-parse, viewport
//!   serving, queries
//!
//! Depends on `base`, `fact`, `lexer`, `structure` and `query`.

mod cache;
mod generator;
mod parser;
mod viewport;

pub use cache::{BoundaryCache, CacheStats};
pub use generator::FactGenerator;
pub use parser::{BoundaryUpdate, DetailedParser, FactDelta, FactStream, ParseResult};
pub use viewport::ViewportManager;
