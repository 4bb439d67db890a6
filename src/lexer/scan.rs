//! Streaming, incrementally re-scannable lexer.
//!
//! The raw recognizer is a logos-generated state machine; this module
//! wraps it with three capabilities the engine needs:
//!
//! - **full tokenization** with delimiter-depth tracking and table-driven
//!   keyword classification ([`StreamingLexer::tokenize`]);
//! - **chunked input** ([`StreamingLexer::feed`] / [`finish`]): a token
//!   that may continue past the end of the current chunk is held back in
//!   an explicit [`ScanState`] and re-scanned when more input arrives;
//! - **minimal-range retokenization** after an edit
//!   ([`StreamingLexer::process_edit`]): only the damaged range, expanded
//!   by the language's resync policy and widened to real token
//!   boundaries, is re-scanned. If the re-scan ends inside a construct
//!   that is not closed before the resync point (unterminated string or
//!   block comment, a comment swallowing the seam), the lexer widens the
//!   scan, up to end of buffer, rather than produce wrong depths.

use std::rc::Rc;

use logos::Logos;
use tracing::{debug, trace, warn};

use crate::base::Span;
use crate::error::{EngineError, Result};
use crate::lexer::language::LanguageSpec;
use crate::lexer::token::{Token, TokenDelta, TokenFlags, TokenId, TokenKind};

/// One text edit: replace `range` of the current buffer with `new_text`.
#[derive(Debug, Clone)]
pub struct Edit {
    pub range: Span,
    pub new_text: String,
    /// Generation the caller believes is current; checked if present.
    pub expected_generation: Option<u32>,
}

impl Edit {
    pub fn new(range: Span, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
            expected_generation: None,
        }
    }

    pub fn with_generation(mut self, generation: u32) -> Self {
        self.expected_generation = Some(generation);
        self
    }

    /// Signed size change this edit causes.
    pub fn size_delta(&self) -> i64 {
        self.new_text.len() as i64 - self.range.len() as i64
    }
}

/// Resumable scanner state for chunked input.
///
/// When a chunk ends inside a token that more input could extend, the
/// lexer records where that token started and re-scans from there once
/// the next chunk arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Ready,
    InWord {
        start: u32,
    },
    InNumber {
        start: u32,
    },
    InString {
        start: u32,
    },
    InBlockComment {
        start: u32,
    },
    InLineComment {
        start: u32,
    },
}

impl ScanState {
    fn resume_offset(self) -> Option<u32> {
        match self {
            Self::Ready => None,
            Self::InWord { start }
            | Self::InNumber { start }
            | Self::InString { start }
            | Self::InBlockComment { start }
            | Self::InLineComment { start } => Some(start),
        }
    }
}

/// Raw token recognizer. Terminated forms outrank their unterminated
/// prefixes when both match the same slice.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r"[ \t\r]+")]
    Whitespace,

    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", priority = 12)]
    BlockComment,

    #[regex(r"/\*([^*]|\*[^/])*\*?", priority = 11)]
    UnterminatedBlockComment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#, priority = 12)]
    String,

    #[regex(r#""([^"\\\n]|\\.)*"#, priority = 11)]
    UnterminatedString,

    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,

    #[regex(r"[+\-*/%=<>!&|^~?:;,.@#$'`\\]")]
    Punct,
}

/// Outcome of scanning one contiguous range.
struct ScanOutcome {
    tokens: Vec<Token>,
    /// Delimiter depth in effect after the last token.
    end_depth: u8,
}

/// The streaming lexer. Owns the current text buffer and token sequence.
pub struct StreamingLexer {
    language: Rc<LanguageSpec>,
    text: String,
    tokens: Vec<Token>,
    next_id: u32,
    generation: u32,
    // Chunked-input state.
    stream_pos: u32,
    stream_depth: u8,
    state: ScanState,
}

impl std::fmt::Debug for StreamingLexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingLexer")
            .field("language", &self.language.name())
            .field("text_len", &self.text.len())
            .field("tokens", &self.tokens.len())
            .field("generation", &self.generation)
            .field("state", &self.state)
            .finish()
    }
}

impl StreamingLexer {
    pub fn new(language: Rc<LanguageSpec>) -> Self {
        Self {
            language,
            text: String::new(),
            tokens: Vec::new(),
            next_id: 0,
            generation: 0,
            stream_pos: 0,
            stream_depth: 0,
            state: ScanState::Ready,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn allocate_id(&mut self) -> TokenId {
        let id = TokenId::from_u32(self.next_id);
        self.next_id += 1;
        id
    }

    /// Tokenize a whole buffer, replacing any previous state.
    pub fn tokenize(&mut self, text: &str) -> &[Token] {
        self.text.clear();
        self.text.push_str(text);
        self.tokens.clear();
        self.next_id = 0;
        self.generation += 1;
        self.stream_pos = self.text.len() as u32;
        self.stream_depth = 0;
        self.state = ScanState::Ready;

        let outcome = self.scan_range(0, self.text.len() as u32, 0);
        self.stream_depth = outcome.end_depth;
        self.tokens = outcome.tokens;
        &self.tokens
    }

    // =========================================================================
    // Chunked input
    // =========================================================================

    /// Append a chunk and return the tokens that are certainly complete.
    ///
    /// A trailing token that the next chunk could extend (identifier,
    /// number, unterminated string/comment) is held back and re-emitted,
    /// flagged [`TokenFlags::CONTINUED`], once its end is known.
    pub fn feed(&mut self, chunk: &str) -> Vec<Token> {
        let chunk_base = self.text.len() as u32;
        self.text.push_str(chunk);

        let resume = self.state.resume_offset().unwrap_or(self.stream_pos);
        let continued = self.state != ScanState::Ready;
        let outcome = self.scan_range(resume, self.text.len() as u32, self.stream_depth);

        let mut emitted = Vec::new();
        let buffer_end = self.text.len() as u32;
        let mut held: Option<(ScanState, u32)> = None;

        for (i, mut token) in outcome.tokens.into_iter().enumerate() {
            if continued && i == 0 && token.span.start < chunk_base {
                token.flags.insert(TokenFlags::CONTINUED);
            }
            if token.span.end == buffer_end {
                if let Some(state) = hold_state(&token) {
                    held = Some((state, token.span.start));
                    break;
                }
            }
            emitted.push(token);
        }

        match held {
            Some((state, start)) => {
                self.state = state;
                self.stream_pos = start;
                // Roll the id counter back so the held token keeps a
                // stable id when it is finally emitted.
                self.next_id -= 1;
            }
            None => {
                self.state = ScanState::Ready;
                self.stream_pos = buffer_end;
            }
        }
        if let Some(last) = emitted.last() {
            self.stream_depth = last.depth_after();
        }
        self.tokens.extend(emitted.iter().copied());
        emitted
    }

    /// Flush any held-back token at end of input.
    ///
    /// Unterminated strings/comments are emitted as-is, flagged
    /// [`TokenFlags::UNTERMINATED`].
    pub fn finish(&mut self) -> Vec<Token> {
        let resume = match self.state.resume_offset() {
            Some(offset) => offset,
            None => return Vec::new(),
        };
        let continued = self.state != ScanState::Ready;
        let outcome = self.scan_range(resume, self.text.len() as u32, self.stream_depth);
        let mut flushed = outcome.tokens;
        if continued {
            if let Some(first) = flushed.first_mut() {
                first.flags.insert(TokenFlags::CONTINUED);
            }
        }
        self.state = ScanState::Ready;
        self.stream_pos = self.text.len() as u32;
        self.stream_depth = outcome.end_depth;
        self.tokens.extend(flushed.iter().copied());
        flushed
    }

    // =========================================================================
    // Incremental edits
    // =========================================================================

    /// Apply one edit and re-scan the minimal affected range.
    pub fn process_edit(&mut self, edit: &Edit) -> Result<TokenDelta> {
        if let Some(expected) = edit.expected_generation {
            if expected != self.generation {
                return Err(EngineError::StaleGeneration {
                    expected,
                    actual: self.generation,
                });
            }
        }
        let buffer_len = self.text.len();
        if edit.range.end as usize > buffer_len
            || !self.text.is_char_boundary(edit.range.start as usize)
            || !self.text.is_char_boundary(edit.range.end as usize)
        {
            return Err(EngineError::edit_out_of_bounds(edit.range, buffer_len));
        }

        let delta = edit.size_delta();
        self.text.replace_range(
            edit.range.start as usize..edit.range.end as usize,
            &edit.new_text,
        );
        let new_len = self.text.len() as u32;

        // Damaged range in new-buffer coordinates, expanded by the
        // language's resynchronization policy.
        let damaged = Span::new(
            edit.range.start,
            edit.range.start + edit.new_text.len() as u32,
        );
        let expanded = self.language.resync().expand(&self.text, damaged);
        trace!(%damaged, %expanded, "edit range expanded for re-scan");

        // Tokens wholly before the expanded range survive untouched.
        let prefix_len = self
            .tokens
            .partition_point(|t| t.span.end <= expanded.start);

        // Widen the scan start to the first overlapped token: a
        // multi-line construct may begin before the expanded range.
        let mut scan_start = expanded.start;
        if let Some(first_removed) = self.tokens.get(prefix_len) {
            if first_removed.span.start < scan_start {
                scan_start = first_removed.span.start;
            }
        }

        // First token retained after the scan window, in old coordinates.
        let mut scan_end = expanded.end.min(new_len);
        let mut suffix_idx = self.suffix_index(prefix_len, scan_end, delta);
        if suffix_idx > prefix_len {
            let last_removed_end = self.tokens[suffix_idx - 1].span.end as i64 + delta;
            scan_end = scan_end.max(last_removed_end.max(0) as u32).min(new_len);
            suffix_idx = self.suffix_index(prefix_len, scan_end, delta);
        }

        let seed_depth = self.tokens[..prefix_len]
            .last()
            .map(|t| t.depth_after())
            .unwrap_or(0);

        // Re-scan, widening until the window is self-delimiting.
        let outcome = loop {
            let outcome = self.scan_range(scan_start, scan_end, seed_depth);
            match self.widen_for(&outcome, scan_end, suffix_idx, delta) {
                Some(wider_end) => {
                    warn!(
                        old_end = scan_end,
                        new_end = wider_end,
                        "re-scan window not self-delimiting, widening"
                    );
                    // Ids were consumed by the discarded scan; rewind.
                    self.next_id -= outcome.tokens.len() as u32;
                    scan_end = wider_end;
                    suffix_idx = self.suffix_index(prefix_len, scan_end, delta);
                }
                None => break outcome,
            }
        };

        // Retire the overlapped tokens, shift and depth-adjust the suffix.
        let removed: Vec<TokenId> = self.tokens[prefix_len..suffix_idx]
            .iter()
            .map(|t| t.id)
            .collect();
        // Depth in effect entering the seam token. A close delimiter
        // stores the post-decrement value, so add its decrement back.
        let old_seam_depth = self
            .tokens
            .get(suffix_idx)
            .map(|t| {
                if t.kind.is_close_delimiter() {
                    t.depth.saturating_add(1)
                } else {
                    t.depth
                }
            })
            .unwrap_or(0);
        let depth_delta = outcome.end_depth as i16 - old_seam_depth as i16;

        let mut rebuilt = Vec::with_capacity(
            prefix_len + outcome.tokens.len() + (self.tokens.len() - suffix_idx),
        );
        rebuilt.extend_from_slice(&self.tokens[..prefix_len]);
        rebuilt.extend_from_slice(&outcome.tokens);
        for token in &self.tokens[suffix_idx..] {
            let mut shifted = *token;
            shifted.span = token.span.shifted(delta);
            if depth_delta != 0 {
                shifted.depth = (token.depth as i16 + depth_delta).clamp(0, u8::MAX as i16) as u8;
            }
            rebuilt.push(shifted);
        }
        self.tokens = rebuilt;
        self.generation += 1;
        self.stream_pos = new_len;

        debug!(
            removed = removed.len(),
            added = outcome.tokens.len(),
            affected = %Span::new(scan_start, scan_end),
            generation = self.generation,
            "edit applied"
        );

        Ok(TokenDelta {
            removed,
            added: outcome.tokens,
            affected_range: Span::new(scan_start, scan_end),
            generation: self.generation,
        })
    }

    /// Index of the first old token retained after a scan window ending
    /// at `scan_end` (new coordinates).
    fn suffix_index(&self, prefix_len: usize, scan_end: u32, delta: i64) -> usize {
        let threshold = scan_end as i64 - delta;
        prefix_len
            + self.tokens[prefix_len..].partition_point(|t| (t.span.start as i64) < threshold)
    }

    /// Decide whether the scan window must widen, and to where.
    ///
    /// Returns the new window end, or `None` when the window is safe.
    fn widen_for(
        &self,
        outcome: &ScanOutcome,
        scan_end: u32,
        suffix_idx: usize,
        delta: i64,
    ) -> Option<u32> {
        let new_len = self.text.len() as u32;
        if scan_end >= new_len {
            return None;
        }
        let last = outcome.tokens.last()?;
        if last.span.end != scan_end {
            return None;
        }
        let bytes = self.text.as_bytes();

        // An unterminated string/comment that the old buffer closed
        // somewhere later: no safe resync point short of end of buffer.
        if last.flags.contains(TokenFlags::UNTERMINATED) {
            return Some(new_len);
        }
        // A line comment swallowing the seam runs to its newline.
        if last.kind == TokenKind::LineComment && bytes[scan_end as usize] != b'\n' {
            let mut end = scan_end;
            while end < new_len && bytes[end as usize] != b'\n' {
                end += 1;
            }
            if end < new_len {
                end += 1;
            }
            return Some(end);
        }
        // A word-like token that would merge with the next retained token.
        if matches!(
            last.kind,
            TokenKind::Ident | TokenKind::Keyword | TokenKind::Integer | TokenKind::Float
        ) && is_word_byte(bytes[scan_end as usize])
        {
            if let Some(next_old) = self.tokens.get(suffix_idx) {
                let next_end = (next_old.span.end as i64 + delta).max(0) as u32;
                return Some(next_end.min(new_len));
            }
            return Some(new_len);
        }
        None
    }

    // =========================================================================
    // Raw scanning
    // =========================================================================

    /// Scan `text[start..end)`, seeding delimiter depth.
    ///
    /// The single traversal is shared by full, chunked, and incremental
    /// paths; only the window and the seed differ.
    fn scan_range(&mut self, start: u32, end: u32, seed_depth: u8) -> ScanOutcome {
        let slice = &self.text[start as usize..end as usize];
        let mut raw = RawToken::lexer(slice);
        let mut tokens = Vec::new();
        let mut depth = seed_depth;
        let mut pending: Vec<(Span, RawToken, bool)> = Vec::new();

        while let Some(result) = raw.next() {
            let range = raw.span();
            let span = Span::new(start + range.start as u32, start + range.end as u32);
            match result {
                Ok(token) => pending.push((span, token, false)),
                Err(()) => pending.push((span, RawToken::Punct, true)),
            }
        }

        for (span, raw_token, is_error) in pending {
            let text = &self.text[span.start as usize..span.end as usize];
            let mut flags = TokenFlags::empty();
            let kind = if is_error {
                TokenKind::Error
            } else {
                match raw_token {
                    RawToken::Whitespace => TokenKind::Whitespace,
                    RawToken::Newline => TokenKind::Newline,
                    RawToken::LineComment => TokenKind::LineComment,
                    RawToken::BlockComment => TokenKind::BlockComment,
                    RawToken::UnterminatedBlockComment => {
                        flags.insert(TokenFlags::UNTERMINATED);
                        TokenKind::BlockComment
                    }
                    RawToken::Ident => {
                        if self.language.is_keyword(text) {
                            TokenKind::Keyword
                        } else {
                            TokenKind::Ident
                        }
                    }
                    RawToken::Integer => TokenKind::Integer,
                    RawToken::Float => TokenKind::Float,
                    RawToken::String => TokenKind::String,
                    RawToken::UnterminatedString => {
                        flags.insert(TokenFlags::UNTERMINATED);
                        TokenKind::String
                    }
                    RawToken::OpenParen => TokenKind::OpenParen,
                    RawToken::CloseParen => TokenKind::CloseParen,
                    RawToken::OpenBracket => TokenKind::OpenBracket,
                    RawToken::CloseBracket => TokenKind::CloseBracket,
                    RawToken::OpenBrace => TokenKind::OpenBrace,
                    RawToken::CloseBrace => TokenKind::CloseBrace,
                    RawToken::Punct => TokenKind::Punct,
                }
            };

            let token_depth = if kind.is_close_delimiter() {
                depth = depth.saturating_sub(1);
                depth
            } else {
                depth
            };
            if kind.is_open_delimiter() {
                depth = depth.saturating_add(1);
            }

            tokens.push(Token {
                id: self.allocate_id(),
                span,
                kind,
                depth: token_depth,
                flags,
            });
        }

        ScanOutcome {
            tokens,
            end_depth: depth,
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Which hold-back state a chunk-trailing token maps to, if any.
fn hold_state(token: &Token) -> Option<ScanState> {
    let start = token.span.start;
    match token.kind {
        TokenKind::Ident | TokenKind::Keyword => Some(ScanState::InWord { start }),
        TokenKind::Integer | TokenKind::Float => Some(ScanState::InNumber { start }),
        TokenKind::String if token.flags.contains(TokenFlags::UNTERMINATED) => {
            Some(ScanState::InString { start })
        }
        TokenKind::BlockComment if token.flags.contains(TokenFlags::UNTERMINATED) => {
            Some(ScanState::InBlockComment { start })
        }
        TokenKind::LineComment => Some(ScanState::InLineComment { start }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::language::LanguageSpec;

    fn lexer() -> StreamingLexer {
        StreamingLexer::new(Rc::new(LanguageSpec::c_like()))
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn non_trivia(tokens: &[Token]) -> Vec<Token> {
        tokens
            .iter()
            .copied()
            .filter(|t| !t.kind.is_trivia())
            .collect()
    }

    #[test]
    fn test_tokenize_classifies_keywords() {
        let mut lex = lexer();
        let tokens = lex.tokenize("fn main");
        assert_eq!(
            kinds(tokens),
            vec![TokenKind::Keyword, TokenKind::Whitespace, TokenKind::Ident]
        );
    }

    #[test]
    fn test_spans_strictly_increasing() {
        let mut lex = lexer();
        let tokens = lex.tokenize("fn main() { let x = 1.5; }");
        for pair in tokens.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
            assert!(pair[0].span.start < pair[1].span.start);
        }
        // Every byte is covered.
        let total: u32 = tokens.iter().map(|t| t.span.len()).sum();
        assert_eq!(total, lex.text().len() as u32);
    }

    #[test]
    fn test_depth_tracking() {
        let mut lex = lexer();
        let tokens = non_trivia(lex.tokenize("a(b[c]{d})e"));
        let depths: Vec<(TokenKind, u8)> = tokens.iter().map(|t| (t.kind, t.depth)).collect();
        assert_eq!(
            depths,
            vec![
                (TokenKind::Ident, 0),
                (TokenKind::OpenParen, 0),
                (TokenKind::Ident, 1),
                (TokenKind::OpenBracket, 1),
                (TokenKind::Ident, 2),
                (TokenKind::CloseBracket, 1),
                (TokenKind::OpenBrace, 1),
                (TokenKind::Ident, 2),
                (TokenKind::CloseBrace, 1),
                (TokenKind::CloseParen, 0),
                (TokenKind::Ident, 0),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_flagged() {
        let mut lex = lexer();
        let tokens = lex.tokenize("\"open");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert!(tokens[0].flags.contains(TokenFlags::UNTERMINATED));
    }

    #[test]
    fn test_comments_are_trivia() {
        let mut lex = lexer();
        let tokens = lex.tokenize("// line\n/* block */x");
        assert_eq!(
            kinds(tokens),
            vec![
                TokenKind::LineComment,
                TokenKind::Newline,
                TokenKind::BlockComment,
                TokenKind::Ident
            ]
        );
    }

    #[test]
    fn test_feed_holds_back_split_identifier() {
        let mut lex = lexer();
        let first = lex.feed("fn ma");
        // "ma" may continue: held back.
        assert_eq!(
            kinds(&first),
            vec![TokenKind::Keyword, TokenKind::Whitespace]
        );
        let second = lex.feed("in()");
        assert_eq!(second[0].kind, TokenKind::Ident);
        assert_eq!(second[0].span, Span::new(3, 7));
        assert!(second[0].flags.contains(TokenFlags::CONTINUED));
        assert_eq!(lex.text(), "fn main()");
    }

    #[test]
    fn test_feed_string_across_chunks() {
        let mut lex = lexer();
        let first = lex.feed("x = \"hel");
        assert!(first.iter().all(|t| t.kind != TokenKind::String));
        let second = lex.feed("lo\" y");
        let string = second
            .iter()
            .find(|t| t.kind == TokenKind::String)
            .expect("string token");
        assert_eq!(string.span, Span::new(4, 11));
        assert!(string.flags.contains(TokenFlags::CONTINUED));
        assert!(!string.flags.contains(TokenFlags::UNTERMINATED));
    }

    #[test]
    fn test_finish_flushes_unterminated() {
        let mut lex = lexer();
        lex.feed("\"never closed");
        let flushed = lex.finish();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].kind, TokenKind::String);
        assert!(flushed[0].flags.contains(TokenFlags::UNTERMINATED));
        assert!(lex.finish().is_empty());
    }

    #[test]
    fn test_edit_rescan_is_minimal() {
        let mut lex = lexer();
        lex.tokenize("fn one(){} fn two(){}");
        let delta = lex
            .process_edit(&Edit::new(Span::new(14, 17), "three"))
            .unwrap();
        // Only the identifier token is replaced.
        assert_eq!(delta.removed.len(), 1);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].kind, TokenKind::Ident);
        assert_eq!(delta.affected_range, Span::new(14, 19));
        assert_eq!(lex.text(), "fn one(){} fn three(){}");
        // Suffix tokens shifted, prefix untouched.
        let all = lex.tokens();
        assert_eq!(all.last().unwrap().span, Span::new(22, 23));
        assert_eq!(all[0].span, Span::new(0, 2));
    }

    #[test]
    fn test_edit_out_of_bounds() {
        let mut lex = lexer();
        lex.tokenize("short");
        let err = lex
            .process_edit(&Edit::new(Span::new(10, 12), "x"))
            .unwrap_err();
        assert!(matches!(err, EngineError::EditOutOfBounds { .. }));
    }

    #[test]
    fn test_edit_stale_generation() {
        let mut lex = lexer();
        lex.tokenize("a b");
        let first_gen = lex.generation();
        lex.process_edit(&Edit::new(Span::new(0, 1), "c")).unwrap();
        let err = lex
            .process_edit(&Edit::new(Span::new(0, 1), "d").with_generation(first_gen))
            .unwrap_err();
        assert!(matches!(err, EngineError::StaleGeneration { .. }));
    }

    #[test]
    fn test_edit_opening_string_falls_back_to_eof() {
        let mut lex = lexer();
        lex.tokenize("aa bb cc\ndd ee");
        // Insert an opening quote before "bb": everything after is
        // swallowed by the unterminated string.
        let delta = lex
            .process_edit(&Edit::new(Span::new(3, 3), "\""))
            .unwrap();
        assert_eq!(delta.affected_range.end, lex.text().len() as u32);
        // Strings are line-scoped in this grammar: the opened string is
        // unterminated and the rest of its line is swallowed.
        let string = lex
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::String)
            .unwrap();
        assert!(string.flags.contains(TokenFlags::UNTERMINATED));
        assert_eq!(
            &lex.text()[string.span.start as usize..string.span.end as usize],
            "\"bb cc"
        );
    }

    #[test]
    fn test_edit_inside_multiline_comment_rescans_from_its_start() {
        let mut lex = lexer();
        lex.tokenize("x\n/* one\ntwo */\ny");
        let delta = lex
            .process_edit(&Edit::new(Span::new(9, 12), "ten"))
            .unwrap();
        // The scan window reaches back to the comment opener.
        assert!(delta.affected_range.start <= 2);
        let comment = lex
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::BlockComment)
            .unwrap();
        assert_eq!(
            &lex.text()[comment.span.start as usize..comment.span.end as usize],
            "/* one\nten */"
        );
        assert!(!comment.flags.contains(TokenFlags::UNTERMINATED));
    }

    #[test]
    fn test_edit_adjacent_slash_merges_into_comment() {
        let mut lex = lexer();
        lex.tokenize("a / b");
        let delta = lex.process_edit(&Edit::new(Span::new(3, 3), "/")).unwrap();
        // "a // b": the line comment swallows the seam.
        let comment = lex
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::LineComment)
            .expect("line comment");
        assert_eq!(comment.span.end, lex.text().len() as u32);
        assert!(delta.affected_range.end >= comment.span.end);
    }

    #[test]
    fn test_edit_depth_change_propagates_to_suffix() {
        let mut lex = lexer();
        lex.tokenize("a () b");
        // Drop the close paren: depth after the edit rises by one.
        lex.process_edit(&Edit::new(Span::new(3, 4), "")).unwrap();
        let b = lex
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::Ident && t.span.start > 2)
            .unwrap();
        assert_eq!(b.depth, 1);
    }

    #[test]
    fn test_insertion_before_close_brace_keeps_depths() {
        let mut lex = lexer();
        lex.tokenize("{}");
        lex.process_edit(&Edit::new(Span::empty(1), "x")).unwrap();
        let depths: Vec<(TokenKind, u8)> =
            lex.tokens().iter().map(|t| (t.kind, t.depth)).collect();
        assert_eq!(
            depths,
            vec![
                (TokenKind::OpenBrace, 0),
                (TokenKind::Ident, 1),
                (TokenKind::CloseBrace, 0),
            ]
        );
    }

    #[test]
    fn test_edit_joining_identifiers() {
        let mut lex = lexer();
        lex.tokenize("one two");
        lex.process_edit(&Edit::new(Span::new(3, 4), "")).unwrap();
        let tokens = lex.tokens();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].span, Span::new(0, 6));
    }
}
