//! Boundary and error-region types produced by the structural parser.

use crate::base::Span;

/// What kind of region a boundary delimits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Function,
    Struct,
    Module,
    /// A brace-delimited region with no recognized header.
    Block,
}

/// A syntactically recognized region of source text.
///
/// Boundaries nest: a boundary's span strictly contains any child's span,
/// and siblings at the same depth never overlap. `depth` is the nesting
/// level among boundaries, not the token bracket depth.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseBoundary {
    pub span: Span,
    pub kind: BoundaryKind,
    pub depth: u16,
    /// 1.0 for unambiguous matches, lower for heuristic ones.
    pub confidence: f32,
    pub has_errors: bool,
    /// Token indices where parsing could resume inside this boundary.
    /// Empty for cleanly parsed boundaries.
    pub recovery_points: Vec<usize>,
}

impl ParseBoundary {
    pub fn new(span: Span, kind: BoundaryKind, depth: u16, confidence: f32) -> Self {
        Self {
            span,
            kind,
            depth,
            confidence,
            has_errors: false,
            recovery_points: Vec::new(),
        }
    }
}

/// A region of malformed input the parser skipped over.
///
/// `recovery_points` are the token indices scanning resumed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRegion {
    pub span: Span,
    pub recovery_points: Vec<usize>,
}

impl ErrorRegion {
    pub fn new(span: Span, recovery_points: Vec<usize>) -> Self {
        Self {
            span,
            recovery_points,
        }
    }
}
