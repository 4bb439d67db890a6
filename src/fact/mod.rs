//! Facts: fixed-size immutable assertions about spans of source text.
//!
//! - [`Fact`] - the 24-byte record: packed subject span, 8-byte payload,
//!   id, predicate code, confidence score
//! - [`Value`] - the context-tagged payload
//! - [`FactStore`] - append-only storage with generation tagging
//!
//! Depends only on `base`.

mod record;
mod store;
mod value;

pub use record::{Confidence, Fact, FactId, Predicate};
pub use store::{FactStore, IdAllocator};
pub use value::Value;
