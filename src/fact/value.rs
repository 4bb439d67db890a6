//! The 8-byte fact payload.
//!
//! `Value` carries no discriminant of its own: the fact's predicate decides
//! how the 64 bits are read. This keeps the payload at exactly 8 bytes
//! where a Rust enum would spend another word on its tag.

use crate::base::{AtomId, PackedSpan, Span};
use crate::fact::FactId;

/// Context-tagged 8-byte payload of a fact.
///
/// Constructors and accessors come in matched pairs; it is the caller's
/// responsibility (enforced by predicate convention) to read a value with
/// the accessor matching how it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    /// The absent payload, used by predicates that assert by presence alone.
    pub fn none() -> Self {
        Self(0)
    }

    pub fn integer(v: i64) -> Self {
        Self(v as u64)
    }

    pub fn float(v: f64) -> Self {
        Self(v.to_bits())
    }

    pub fn atom(id: AtomId) -> Self {
        Self(id.to_u32() as u64)
    }

    pub fn fact(id: FactId) -> Self {
        Self(id.to_u32() as u64)
    }

    pub fn span(span: Span) -> Self {
        Self(PackedSpan::pack(span).to_bits())
    }

    pub fn boolean(v: bool) -> Self {
        Self(v as u64)
    }

    pub fn as_integer(self) -> i64 {
        self.0 as i64
    }

    pub fn as_float(self) -> f64 {
        f64::from_bits(self.0)
    }

    pub fn as_atom(self) -> AtomId {
        AtomId::from_u32(self.0 as u32)
    }

    pub fn as_fact(self) -> FactId {
        FactId::from_u32(self.0 as u32)
    }

    pub fn as_span(self) -> Span {
        PackedSpan::from_bits(self.0).unpack()
    }

    pub fn as_boolean(self) -> bool {
        self.0 != 0
    }

    /// Raw bits, for index comparisons that do not care about context.
    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(bits: u64) -> Self {
        Self(bits)
    }
}

const _: () = assert!(std::mem::size_of::<Value>() == 8);
