//! Per-language tables the engine is parameterized over.
//!
//! The engine itself is language-agnostic: a [`LanguageSpec`] supplies the
//! keyword table, which keywords open which boundary kinds, and the
//! resynchronization policy used to bound incremental re-scans. Concrete
//! language adapters live outside this crate; the `c_like` spec here is
//! the contract's reference instance and what the test-suite exercises.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::Span;
use crate::structure::{BoundaryKind, Grammar};

/// Picks the stable points an incremental re-scan may start and stop at.
///
/// Line boundaries are a safe default for statement-per-line languages;
/// languages with multi-line string or comment syntax that lines cannot
/// bound should supply their own policy. Whatever the policy, the lexer
/// still falls back to re-scanning to end of buffer when the expanded
/// range turns out not to be self-delimiting.
pub trait ResyncStrategy: std::fmt::Debug {
    /// Expand a damaged range outward to the nearest safe scan points
    /// in `text`. The result must contain `damaged`.
    fn expand(&self, text: &str, damaged: Span) -> Span;
}

/// Default policy: expand to the enclosing line(s).
#[derive(Debug, Default, Clone, Copy)]
pub struct LineBoundaryResync;

impl ResyncStrategy for LineBoundaryResync {
    fn expand(&self, text: &str, damaged: Span) -> Span {
        let bytes = text.as_bytes();
        let len = bytes.len() as u32;
        let start = damaged.start.min(len);
        let end = damaged.end.min(len);

        // Walk back to the byte after the previous newline.
        let mut line_start = start;
        while line_start > 0 && bytes[line_start as usize - 1] != b'\n' {
            line_start -= 1;
        }
        // Walk forward through the newline ending the last damaged line.
        let mut line_end = end;
        while line_end < len && bytes[line_end as usize] != b'\n' {
            line_end += 1;
        }
        if line_end < len {
            line_end += 1; // include the terminator itself
        }
        Span::new(line_start, line_end)
    }
}

/// Minimal policy: expand only to the nearest points that cannot fall
/// inside an identifier, a number, or a comment/string opener.
///
/// The lexer's own widening (to the start of any overlapped token, and
/// onward whenever the window turns out not to be self-delimiting) does
/// the rest, so this keeps per-edit damage close to the edited token
/// where line-based expansion would re-scan whole lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenBoundaryResync;

impl ResyncStrategy for TokenBoundaryResync {
    fn expand(&self, text: &str, damaged: Span) -> Span {
        fn sticky(b: u8) -> bool {
            // Word bytes merge with adjacent words/numbers; slash, star
            // and quote can pair with an edited byte into a comment or
            // string opener.
            b.is_ascii_alphanumeric() || matches!(b, b'_' | b'/' | b'*' | b'"')
        }
        let bytes = text.as_bytes();
        let len = bytes.len() as u32;
        let mut start = damaged.start.min(len);
        let mut end = damaged.end.min(len);
        while start > 0 && sticky(bytes[start as usize - 1]) {
            start -= 1;
        }
        while end < len && sticky(bytes[end as usize]) {
            end += 1;
        }
        Span::new(start, end)
    }
}

/// Policy that always re-scans the whole buffer. Useful as an explicit
/// opt-out for languages with no safe resync points.
#[derive(Debug, Default, Clone, Copy)]
pub struct WholeBufferResync;

impl ResyncStrategy for WholeBufferResync {
    fn expand(&self, text: &str, _damaged: Span) -> Span {
        Span::new(0, text.len() as u32)
    }
}

/// Tables describing one language to the engine.
#[derive(Debug)]
pub struct LanguageSpec {
    name: SmolStr,
    keywords: FxHashSet<SmolStr>,
    boundary_keywords: FxHashMap<SmolStr, BoundaryKind>,
    visibility_keywords: FxHashSet<SmolStr>,
    grammar: Grammar,
    resync: Box<dyn ResyncStrategy>,
}

impl LanguageSpec {
    pub fn new(name: impl Into<SmolStr>, grammar: Grammar) -> Self {
        Self {
            name: name.into(),
            keywords: FxHashSet::default(),
            boundary_keywords: FxHashMap::default(),
            visibility_keywords: FxHashSet::default(),
            grammar,
            resync: Box::new(LineBoundaryResync),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Register a keyword that opens a boundary of the given kind.
    /// Implies membership in the keyword table.
    pub fn with_boundary_keyword(mut self, keyword: &str, kind: BoundaryKind) -> Self {
        let kw = SmolStr::new(keyword);
        self.keywords.insert(kw.clone());
        self.boundary_keywords.insert(kw, kind);
        self
    }

    pub fn with_visibility_keyword(mut self, keyword: &str) -> Self {
        let kw = SmolStr::new(keyword);
        self.keywords.insert(kw.clone());
        self.visibility_keywords.insert(kw);
        self
    }

    pub fn with_resync(mut self, resync: Box<dyn ResyncStrategy>) -> Self {
        self.resync = resync;
        self
    }

    /// Table-driven identifier classification.
    pub fn is_keyword(&self, text: &str) -> bool {
        self.keywords.contains(text)
    }

    pub fn boundary_kind(&self, keyword: &str) -> Option<BoundaryKind> {
        self.boundary_keywords.get(keyword).copied()
    }

    pub fn is_visibility_keyword(&self, text: &str) -> bool {
        self.visibility_keywords.contains(text)
    }

    /// Keywords that can start a top-level boundary; the recovery set.
    pub fn boundary_keywords(&self) -> impl Iterator<Item = &str> {
        self.boundary_keywords.keys().map(|k| k.as_str())
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn resync(&self) -> &dyn ResyncStrategy {
        &*self.resync
    }

    /// Reference language: a small C-like syntax with `fn`, `struct` and
    /// `mod` boundaries. This is the instance the engine's tests run on.
    pub fn c_like() -> Self {
        Self::new("c-like", Grammar::c_like())
            .with_resync(Box::new(TokenBoundaryResync))
            .with_boundary_keyword("fn", BoundaryKind::Function)
            .with_boundary_keyword("struct", BoundaryKind::Struct)
            .with_boundary_keyword("mod", BoundaryKind::Module)
            .with_visibility_keyword("pub")
            .with_keywords(["let", "if", "else", "while", "for", "return", "match"])
    }
}
