//! Token model shared by the lexer and the structural parser.

use crate::base::Span;

/// Identifier of a token within one lexer instance.
///
/// Ids survive incremental edits for tokens outside the re-scanned range,
/// which is what lets a [`TokenDelta`](super::TokenDelta) name removed
/// tokens precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TokenId(u32);

impl TokenId {
    pub fn to_u32(self) -> u32 {
        self.0
    }

    pub fn from_u32(raw: u32) -> Self {
        Self(raw)
    }
}

/// Closed set of token kinds.
///
/// Per-language variation lives in the keyword table of the
/// [`LanguageSpec`](super::LanguageSpec), not in new kinds; the engine
/// dispatches on this enum exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    /// Any other single punctuation character.
    Punct,
    Ident,
    Keyword,
    Integer,
    Float,
    String,
    LineComment,
    BlockComment,
    Whitespace,
    Newline,
    /// Byte sequence the lexer could not classify.
    Error,
    /// End of input marker.
    Eof,
}

impl TokenKind {
    /// Whitespace and comments: skipped by the structural parser.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::Whitespace | Self::Newline | Self::LineComment | Self::BlockComment
        )
    }

    pub fn is_open_delimiter(self) -> bool {
        matches!(self, Self::OpenParen | Self::OpenBracket | Self::OpenBrace)
    }

    pub fn is_close_delimiter(self) -> bool {
        matches!(
            self,
            Self::CloseParen | Self::CloseBracket | Self::CloseBrace
        )
    }

    /// The close kind matching an open delimiter, if any.
    pub fn matching_close(self) -> Option<TokenKind> {
        Some(match self {
            Self::OpenParen => Self::CloseParen,
            Self::OpenBracket => Self::CloseBracket,
            Self::OpenBrace => Self::CloseBrace,
            _ => return None,
        })
    }
}

/// Per-token flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct TokenFlags(u8);

impl TokenFlags {
    /// Token was assembled across a chunk boundary in streaming mode.
    pub const CONTINUED: TokenFlags = TokenFlags(1 << 0);
    /// String or block comment with no closing delimiter before EOF.
    pub const UNTERMINATED: TokenFlags = TokenFlags(1 << 1);
    /// Token was produced while recovering from a lexing error.
    pub const RECOVERED: TokenFlags = TokenFlags(1 << 2);
    /// Token starts a recognized boundary header.
    pub const BOUNDARY_HEAD: TokenFlags = TokenFlags(1 << 3);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, flag: TokenFlags) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn insert(&mut self, flag: TokenFlags) {
        self.0 |= flag.0;
    }

    pub fn union(self, flag: TokenFlags) -> Self {
        Self(self.0 | flag.0)
    }
}

/// A token: span, kind, delimiter depth, and flags.
///
/// Tokens carry no text; consumers slice the source with `span`.
/// `depth` is the count of open delimiters in effect at the token:
/// an open delimiter carries the depth *before* its increment, and its
/// matching close carries that same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub id: TokenId,
    pub span: Span,
    pub kind: TokenKind,
    pub depth: u8,
    pub flags: TokenFlags,
}

impl Token {
    /// Depth in effect immediately after this token.
    pub fn depth_after(&self) -> u8 {
        if self.kind.is_open_delimiter() {
            self.depth.saturating_add(1)
        } else {
            self.depth
        }
    }
}

/// Minimal token-level change caused by one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDelta {
    /// Ids of tokens invalidated by the edit.
    pub removed: Vec<TokenId>,
    /// Replacement tokens, in span order.
    pub added: Vec<Token>,
    /// Range of the new text that was re-scanned.
    pub affected_range: Span,
    /// Lexer generation after applying the edit.
    pub generation: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivia_classification() {
        assert!(TokenKind::Whitespace.is_trivia());
        assert!(TokenKind::LineComment.is_trivia());
        assert!(!TokenKind::Ident.is_trivia());
        assert!(!TokenKind::OpenBrace.is_trivia());
    }

    #[test]
    fn test_delimiter_matching() {
        assert_eq!(
            TokenKind::OpenBrace.matching_close(),
            Some(TokenKind::CloseBrace)
        );
        assert_eq!(TokenKind::Ident.matching_close(), None);
    }

    #[test]
    fn test_flags() {
        let mut flags = TokenFlags::empty();
        assert!(!flags.contains(TokenFlags::UNTERMINATED));
        flags.insert(TokenFlags::UNTERMINATED);
        flags.insert(TokenFlags::CONTINUED);
        assert!(flags.contains(TokenFlags::UNTERMINATED));
        assert!(flags.contains(TokenFlags::CONTINUED));
        assert!(!flags.contains(TokenFlags::RECOVERED));
    }

    #[test]
    fn test_depth_after() {
        let open = Token {
            id: TokenId::from_u32(0),
            span: Span::new(0, 1),
            kind: TokenKind::OpenBrace,
            depth: 2,
            flags: TokenFlags::empty(),
        };
        assert_eq!(open.depth_after(), 3);
        let close = Token {
            kind: TokenKind::CloseBrace,
            ..open
        };
        assert_eq!(close.depth_after(), 2);
    }
}
