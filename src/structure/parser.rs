//! Single-pass boundary detection with error recovery.
//!
//! The parser walks the token sequence once. Matcher-recognized headers
//! open boundaries; an open brace with no header opens a plain block; a
//! close brace closes the innermost boundary. Malformed input produces an
//! [`ErrorRegion`] and scanning resumes at the next boundary-starting
//! keyword, so later well-formed boundaries are still found. Parsing
//! never aborts.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::base::Span;
use crate::error::Result;
use crate::fact::{Confidence, Fact, IdAllocator, Predicate, Value};
use crate::lexer::{LanguageSpec, Token, TokenKind};
use crate::structure::grammar::MatcherSet;
use crate::structure::{BoundaryKind, ErrorRegion, ParseBoundary};

/// Confidence assigned to `ident {` with no recognized keyword header.
const HEURISTIC_CONFIDENCE: f32 = 0.6;

/// Result of one structural pass.
#[derive(Debug, Clone)]
pub struct StructuralResult {
    /// Parents precede children; siblings are in document order.
    pub boundaries: Vec<ParseBoundary>,
    /// Facts the structural pass itself asserts (one per error region).
    pub facts: Vec<Fact>,
    pub error_regions: Vec<ErrorRegion>,
    /// False iff at least one error region exists. Parsing always runs
    /// to the end of input either way.
    pub success: bool,
}

/// An opened, not yet closed boundary.
struct OpenBoundary {
    kind: BoundaryKind,
    start: u32,
    depth: u16,
    confidence: f32,
}

pub struct StructuralParser {
    language: Rc<LanguageSpec>,
    matchers: MatcherSet,
}

impl StructuralParser {
    pub fn new(language: Rc<LanguageSpec>) -> Result<Self> {
        let matchers = language.grammar().compile()?;
        Ok(Self { language, matchers })
    }

    /// Walk `tokens` once and group them into nested boundaries.
    ///
    /// `text` backs keyword/identifier comparisons (tokens carry only
    /// spans); `ids` numbers the error-region facts.
    pub fn parse(&self, tokens: &[Token], text: &str, ids: &mut IdAllocator) -> StructuralResult {
        let mut boundaries: Vec<ParseBoundary> = Vec::new();
        let mut error_regions: Vec<ErrorRegion> = Vec::new();
        let mut stack: Vec<OpenBoundary> = Vec::new();
        let text_end = text.len() as u32;

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            if token.kind.is_trivia() {
                i += 1;
                continue;
            }

            if let Some(m) = self.matchers.match_at(tokens, text, i) {
                trace!(kind = ?m.kind, at = %token.span, "boundary header");
                stack.push(OpenBoundary {
                    kind: m.kind,
                    start: token.span.start,
                    depth: stack.len() as u16,
                    confidence: 1.0,
                });
                i = m.end;
                continue;
            }

            match token.kind {
                // A boundary keyword whose header failed to match:
                // malformed input. Skip to the next recovery point.
                TokenKind::Keyword if self.is_boundary_keyword(token, text) => {
                    let recovery = self.find_recovery_point(tokens, text, i + 1);
                    let region_end = tokens
                        .get(recovery)
                        .map(|t| t.span.start)
                        .unwrap_or(text_end);
                    debug!(
                        from = %token.span,
                        to = region_end,
                        "malformed boundary header, recovering"
                    );
                    error_regions.push(ErrorRegion::new(
                        Span::new(token.span.start, region_end),
                        vec![recovery],
                    ));
                    i = recovery;
                }
                // Heuristic: a bare identifier directly before an open
                // brace names a block-like region.
                TokenKind::Ident if self.next_opens_brace(tokens, i + 1) => {
                    stack.push(OpenBoundary {
                        kind: BoundaryKind::Block,
                        start: token.span.start,
                        depth: stack.len() as u16,
                        confidence: HEURISTIC_CONFIDENCE,
                    });
                    // Consume the ident and its brace.
                    i = self.skip_to_after_brace(tokens, i + 1);
                }
                TokenKind::OpenBrace => {
                    stack.push(OpenBoundary {
                        kind: BoundaryKind::Block,
                        start: token.span.start,
                        depth: stack.len() as u16,
                        confidence: 1.0,
                    });
                    i += 1;
                }
                TokenKind::CloseBrace => {
                    match stack.pop() {
                        Some(open) => boundaries.push(ParseBoundary::new(
                            Span::new(open.start, token.span.end),
                            open.kind,
                            open.depth,
                            open.confidence,
                        )),
                        // Unmatched close brace at the top level.
                        None => {
                            error_regions.push(ErrorRegion::new(token.span, vec![i + 1]));
                        }
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }

        // Unclosed boundaries at end of input: report the region and keep
        // the partial boundary visible at reduced confidence.
        while let Some(open) = stack.pop() {
            let span = Span::new(open.start, text_end);
            debug!(%span, kind = ?open.kind, "boundary unclosed at end of input");
            error_regions.push(ErrorRegion::new(span, vec![tokens.len()]));
            let mut boundary =
                ParseBoundary::new(span, open.kind, open.depth, open.confidence * 0.5);
            boundary.has_errors = true;
            boundary.recovery_points = vec![tokens.len()];
            boundaries.push(boundary);
        }

        // Mark boundaries crossed by error regions.
        for boundary in &mut boundaries {
            for region in &error_regions {
                if boundary.span.intersects(region.span) {
                    boundary.has_errors = true;
                    for &p in &region.recovery_points {
                        if !boundary.recovery_points.contains(&p) {
                            boundary.recovery_points.push(p);
                        }
                    }
                }
            }
        }

        // Document order, parents before children.
        boundaries.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.end.cmp(&a.span.end))
        });

        let facts = error_regions
            .iter()
            .map(|region| {
                Fact::new(
                    ids.allocate(),
                    region.span,
                    Predicate::HasErrors,
                    Value::integer(region.recovery_points.len() as i64),
                    Confidence::FULL,
                )
            })
            .collect();

        let success = error_regions.is_empty();
        StructuralResult {
            boundaries,
            facts,
            error_regions,
            success,
        }
    }

    fn is_boundary_keyword(&self, token: &Token, text: &str) -> bool {
        let t = &text[token.span.start as usize..token.span.end as usize];
        self.language.boundary_kind(t).is_some()
    }

    /// Next raw index of a boundary-starting keyword, or end of tokens.
    fn find_recovery_point(&self, tokens: &[Token], text: &str, from: usize) -> usize {
        (from..tokens.len())
            .find(|&j| tokens[j].kind == TokenKind::Keyword && self.is_boundary_keyword(&tokens[j], text))
            .unwrap_or(tokens.len())
    }

    /// True if the next non-trivia token at/after `pos` is an open brace.
    fn next_opens_brace(&self, tokens: &[Token], pos: usize) -> bool {
        tokens[pos..]
            .iter()
            .find(|t| !t.kind.is_trivia())
            .is_some_and(|t| t.kind == TokenKind::OpenBrace)
    }

    /// Raw index just past the next open brace.
    fn skip_to_after_brace(&self, tokens: &[Token], pos: usize) -> usize {
        (pos..tokens.len())
            .find(|&j| tokens[j].kind == TokenKind::OpenBrace)
            .map(|j| j + 1)
            .unwrap_or(tokens.len())
    }
}
