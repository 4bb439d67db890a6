//! Turns a parsed boundary and its tokens into facts.
//!
//! Generation is deterministic: the same boundary over the same tokens
//! always yields the same facts, id assignment aside. Variable-length
//! text (names, type spellings) is interned into the atom table and
//! referenced by id so every fact stays fixed-size.

use std::rc::Rc;

use crate::base::{AtomTable, Span};
use crate::fact::{Confidence, Fact, IdAllocator, Predicate, Value};
use crate::lexer::{LanguageSpec, Token, TokenKind};
use crate::structure::{BoundaryKind, ParseBoundary};

pub struct FactGenerator {
    language: Rc<LanguageSpec>,
}

impl FactGenerator {
    pub fn new(language: Rc<LanguageSpec>) -> Self {
        Self { language }
    }

    /// Generate the facts describing one boundary.
    ///
    /// Emits the kind fact, nesting depth, span length, one fact per
    /// matched delimiter pair, header attributes (name, visibility,
    /// return type) where present, and an error marker for boundaries
    /// carrying recovery points.
    pub fn from_boundary(
        &self,
        boundary: &ParseBoundary,
        tokens: &[Token],
        text: &str,
        atoms: &mut AtomTable,
        ids: &mut IdAllocator,
    ) -> Vec<Fact> {
        let span = boundary.span;
        let confidence = Confidence::from_f32(boundary.confidence);
        let mut facts = Vec::new();

        facts.push(Fact::new(
            ids.allocate(),
            span,
            kind_predicate(boundary.kind),
            Value::none(),
            confidence,
        ));
        facts.push(Fact::new(
            ids.allocate(),
            span,
            Predicate::HasNestingDepth,
            Value::integer(boundary.depth as i64),
            Confidence::FULL,
        ));
        facts.push(Fact::new(
            ids.allocate(),
            span,
            Predicate::SpanLength,
            Value::integer(span.len() as i64),
            Confidence::FULL,
        ));
        if boundary.has_errors {
            facts.push(Fact::new(
                ids.allocate(),
                span,
                Predicate::HasErrors,
                Value::integer(boundary.recovery_points.len() as i64),
                Confidence::FULL,
            ));
        }

        let inside: Vec<&Token> = tokens
            .iter()
            .filter(|t| span.contains_span(t.span) && !t.kind.is_trivia())
            .collect();
        let header_end = inside
            .iter()
            .position(|t| t.kind == TokenKind::OpenBrace)
            .unwrap_or(inside.len());
        let header = &inside[..header_end];

        self.header_facts(header, span, text, confidence, atoms, ids, &mut facts);
        delimiter_pair_facts(&inside, ids, &mut facts);

        facts
    }

    /// Attribute facts read straight off the header tokens.
    #[allow(clippy::too_many_arguments)]
    fn header_facts(
        &self,
        header: &[&Token],
        subject: Span,
        text: &str,
        confidence: Confidence,
        atoms: &mut AtomTable,
        ids: &mut IdAllocator,
        facts: &mut Vec<Fact>,
    ) {
        let slice = |t: &Token| &text[t.span.start as usize..t.span.end as usize];

        if let Some(vis) = header
            .iter()
            .find(|t| t.kind == TokenKind::Keyword && self.language.is_visibility_keyword(slice(t)))
        {
            let atom = atoms.intern(slice(vis));
            facts.push(Fact::new(
                ids.allocate(),
                subject,
                Predicate::HasVisibility,
                Value::atom(atom),
                confidence,
            ));
        }

        if let Some(name) = header.iter().find(|t| t.kind == TokenKind::Ident) {
            let atom = atoms.intern(slice(name));
            facts.push(Fact::new(
                ids.allocate(),
                subject,
                Predicate::HasName,
                Value::atom(atom),
                confidence,
            ));
        }

        // `-` `>` punct pair, then the type identifier.
        for window_start in 0..header.len().saturating_sub(2) {
            let a = header[window_start];
            let b = header[window_start + 1];
            if a.kind == TokenKind::Punct
                && slice(a) == "-"
                && b.kind == TokenKind::Punct
                && slice(b) == ">"
                && a.span.end == b.span.start
            {
                if let Some(ty) = header[window_start + 2..]
                    .iter()
                    .find(|t| t.kind == TokenKind::Ident)
                {
                    let atom = atoms.intern(slice(ty));
                    facts.push(Fact::new(
                        ids.allocate(),
                        subject,
                        Predicate::HasReturnType,
                        Value::atom(atom),
                        confidence,
                    ));
                }
                break;
            }
        }
    }
}

fn kind_predicate(kind: BoundaryKind) -> Predicate {
    match kind {
        BoundaryKind::Function => Predicate::IsFunction,
        BoundaryKind::Struct => Predicate::IsStruct,
        BoundaryKind::Module => Predicate::IsModule,
        BoundaryKind::Block => Predicate::IsBlock,
    }
}

/// One fact per matched open/close pair inside the boundary, recording
/// the pair's delimiter depth. Unmatched delimiters produce nothing.
fn delimiter_pair_facts(tokens: &[&Token], ids: &mut IdAllocator, facts: &mut Vec<Fact>) {
    let mut stack: Vec<(u32, u8, TokenKind)> = Vec::new();
    for token in tokens {
        if token.kind.is_open_delimiter() {
            if let Some(close) = token.kind.matching_close() {
                stack.push((token.span.start, token.depth, close));
            }
        } else if token.kind.is_close_delimiter() {
            match stack.last() {
                Some(&(start, depth, expected)) if expected == token.kind => {
                    stack.pop();
                    facts.push(Fact::new(
                        ids.allocate(),
                        Span::new(start, token.span.end),
                        Predicate::DelimiterPair,
                        Value::integer(depth as i64),
                        Confidence::FULL,
                    ));
                }
                _ => {}
            }
        }
    }
}
