//! Foundation types for the fact engine.
//!
//! This module provides the primitives used throughout the engine:
//! - [`Span`], [`PackedSpan`] - half-open byte ranges and their 8-byte form
//! - [`AtomTable`], [`AtomId`] - interning for text referenced by facts
//!
//! This module has NO dependencies on other factum modules.

mod intern;
mod span;

pub use intern::{AtomId, AtomTable};
pub use span::{PackedSpan, Span};
