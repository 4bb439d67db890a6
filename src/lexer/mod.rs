//! Streaming lexer: bytes in, tokens out, minimal re-scans after edits.
//!
//! - [`Token`], [`TokenKind`], [`TokenFlags`] - the token model
//! - [`LanguageSpec`] - per-language keyword and boundary tables, plus the
//!   pluggable [`ResyncStrategy`]
//! - [`StreamingLexer`] - full tokenization, chunked input with resumable
//!   [`ScanState`], and [`Edit`]-driven incremental retokenization
//!   producing a [`TokenDelta`]
//!
//! Depends on `base` (spans) and `structure` only for the
//! [`BoundaryKind`](crate::structure::BoundaryKind) names in the language
//! tables.

mod language;
mod scan;
mod token;

pub use language::{
    LanguageSpec, LineBoundaryResync, ResyncStrategy, TokenBoundaryResync, WholeBufferResync,
};
pub use scan::{Edit, ScanState, StreamingLexer};
pub use token::{Token, TokenDelta, TokenFlags, TokenId, TokenKind};
