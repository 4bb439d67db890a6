//! Query layer: secondary indices and a small declarative query model.
//!
//! - [`QueryIndex`] - span, predicate and confidence-bucket indices
//!   rebuilt from a store snapshot
//! - [`Query`] / [`QueryExecutor`] - SELECT / WHERE / ORDER BY / LIMIT
//!   evaluation with per-execution [`QueryStats`]
//!
//! Depends on `base` and `fact`.

mod executor;
mod index;

pub use executor::{
    CmpOp, Condition, Direction, Field, FieldValue, Query, QueryExecutor, QueryResult, QueryStats,
    Select,
};
pub use index::{QueryIndex, DEFAULT_BUCKETS};
