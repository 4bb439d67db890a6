//! The fact record itself: a 24-byte immutable assertion about a span.

use crate::base::{PackedSpan, Span};
use crate::fact::Value;

/// Identifier of a fact, unique within a fact store generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FactId(u32);

impl FactId {
    pub fn to_u32(self) -> u32 {
        self.0
    }

    pub fn from_u32(raw: u32) -> Self {
        Self(raw)
    }
}

/// What kind of assertion a fact makes.
///
/// The predicate also fixes how the fact's [`Value`] payload is read:
/// `HasName` carries an atom id, `HasNestingDepth` an integer,
/// `ChildOf` a packed parent span, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Predicate {
    /// Subject span is a function boundary. Payload: none.
    IsFunction = 0,
    /// Subject span is a struct boundary. Payload: none.
    IsStruct = 1,
    /// Subject span is a plain block boundary. Payload: none.
    IsBlock = 2,
    /// Subject span is a module boundary. Payload: none.
    IsModule = 3,
    /// Subject has a name. Payload: atom id of the name text.
    HasName = 4,
    /// Subject has an explicit visibility. Payload: atom id.
    HasVisibility = 5,
    /// Subject declares a return type. Payload: atom id of the type text.
    HasReturnType = 6,
    /// Boundary nesting level of the subject. Payload: integer.
    HasNestingDepth = 7,
    /// Subject spans a matched open/close delimiter pair.
    /// Payload: integer delimiter depth of the pair.
    DelimiterPair = 8,
    /// Subject overlaps at least one error region.
    /// Payload: integer count of recovery points.
    HasErrors = 9,
    /// Subject is directly nested in another boundary.
    /// Payload: packed span of the parent boundary.
    ChildOf = 10,
    /// Length of the subject span in bytes. Payload: integer.
    SpanLength = 11,
}

impl Predicate {
    /// Number of predicate codes, for index sizing.
    pub const COUNT: u16 = 12;

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(raw: u16) -> Option<Self> {
        Some(match raw {
            0 => Self::IsFunction,
            1 => Self::IsStruct,
            2 => Self::IsBlock,
            3 => Self::IsModule,
            4 => Self::HasName,
            5 => Self::HasVisibility,
            6 => Self::HasReturnType,
            7 => Self::HasNestingDepth,
            8 => Self::DelimiterPair,
            9 => Self::HasErrors,
            10 => Self::ChildOf,
            11 => Self::SpanLength,
            _ => return None,
        })
    }
}

/// Confidence score in `[0, 1]`, stored as u16 fixed point.
///
/// `0` maps to 0.0 and `0xFFFF` to 1.0, so the endpoints are exact and
/// comparison is plain integer ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Confidence(u16);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);
    pub const FULL: Confidence = Confidence(u16::MAX);

    /// Convert from a float, clamping to `[0, 1]`.
    pub fn from_f32(v: f32) -> Self {
        let clamped = v.clamp(0.0, 1.0);
        Self((clamped * u16::MAX as f32).round() as u16)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / u16::MAX as f32
    }

    pub fn to_u16(self) -> u16 {
        self.0
    }
}

/// A fixed-size immutable assertion: `predicate(subject) = object`,
/// held with some confidence.
///
/// Exactly 24 bytes; the layout is asserted at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Fact {
    subject: PackedSpan,
    object: Value,
    id: FactId,
    predicate: Predicate,
    confidence: Confidence,
}

impl Fact {
    pub fn new(
        id: FactId,
        subject: Span,
        predicate: Predicate,
        object: Value,
        confidence: Confidence,
    ) -> Self {
        Self {
            subject: PackedSpan::pack(subject),
            object,
            id,
            predicate,
            confidence,
        }
    }

    pub fn id(&self) -> FactId {
        self.id
    }

    pub fn subject(&self) -> Span {
        self.subject.unpack()
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    pub fn object(&self) -> Value {
        self.object
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }
}

const _: () = assert!(std::mem::size_of::<Fact>() == 24);
const _: () = assert!(std::mem::align_of::<Fact>() == 8);
