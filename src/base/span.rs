//! Half-open byte ranges over source text, and their 8-byte packed form.
//!
//! `Span` is the universal coordinate type of the engine: tokens,
//! boundaries, facts, cache keys, and queries all speak spans. The packed
//! form exists so a span fits in a fixed-size record without carrying two
//! full words.

/// A half-open `[start, end)` range of byte offsets, `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a span. Debug-asserts `end >= start`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(end >= start, "span end {end} before start {start}");
        Self { start, end }
    }

    /// Empty span at a single offset.
    pub fn empty(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Span covering `len` bytes starting at `start`.
    pub fn at(start: u32, len: u32) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if a byte offset falls within this span.
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Check if `other` lies entirely within this span.
    pub fn contains_span(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Strict overlap: the spans share at least one byte.
    ///
    /// Touching at a boundary does not count; `[0,5)` and `[5,9)` do not
    /// intersect. Empty spans intersect nothing.
    pub fn intersects(&self, other: Span) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }

    /// Widen by `margin` bytes on both sides, saturating at zero.
    pub fn expand(&self, margin: u32) -> Span {
        Span {
            start: self.start.saturating_sub(margin),
            end: self.end.saturating_add(margin),
        }
    }

    /// Smallest span covering both.
    pub fn union(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both endpoints by a signed byte delta.
    ///
    /// Saturates at zero; callers only shift spans that lie entirely on
    /// one side of an edit, so saturation never fires in practice.
    pub fn shifted(&self, delta: i64) -> Span {
        let start = (self.start as i64 + delta).max(0) as u32;
        let end = (self.end as i64 + delta).max(0) as u32;
        Span { start, end }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A span packed into 8 bytes as `start` (low 32 bits) + `length`
/// (high 32 bits).
///
/// Unpacking reproduces the original span exactly for every length
/// representable in 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct PackedSpan(u64);

impl PackedSpan {
    pub fn pack(span: Span) -> Self {
        Self(((span.len() as u64) << 32) | span.start as u64)
    }

    pub fn unpack(self) -> Span {
        let start = self.0 as u32;
        let len = (self.0 >> 32) as u32;
        Span {
            start,
            end: start + len,
        }
    }

    /// Raw 64-bit encoding, for embedding in a fact payload.
    pub fn to_bits(self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl From<Span> for PackedSpan {
    fn from(span: Span) -> Self {
        Self::pack(span)
    }
}

impl From<PackedSpan> for Span {
    fn from(packed: PackedSpan) -> Self {
        packed.unpack()
    }
}

const _: () = assert!(std::mem::size_of::<PackedSpan>() == 8);
