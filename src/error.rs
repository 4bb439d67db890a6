//! Error types for the fact engine.
//!
//! Recoverable syntax errors are *data* (`ErrorRegion` in the structure
//! module), never `Err`: parsing continues past them. The variants here
//! cover the failures a caller must react to: malformed incremental input,
//! queries against an unbound store, and grammar setup mistakes.

use thiserror::Error;

use crate::base::Span;

/// Errors that can occur while driving the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An edit range lies outside the current buffer.
    ///
    /// Callers may fall back to a full re-parse of the document.
    #[error("edit range {start}..{end} is outside the buffer (len {buffer_len})")]
    EditOutOfBounds {
        start: u32,
        end: u32,
        buffer_len: u32,
    },

    /// An edit referenced a generation that is no longer current.
    ///
    /// The caller's view of the document is outdated; re-sync and retry,
    /// or fall back to a full re-parse.
    #[error("stale generation: edit expects {expected}, current is {actual}")]
    StaleGeneration { expected: u32, actual: u32 },

    /// A query was executed with no fact store bound.
    #[error("no fact store bound to the query executor")]
    NoFactStore,

    /// An explicit lookup for a span found nothing.
    #[error("no entry for span {0:?}")]
    SpanNotFound(Span),

    /// A grammar rule referenced a rule name that was never defined.
    #[error("grammar references unknown rule `{0}`")]
    UnknownRule(String),

    /// A grammar rule set cannot recognize any boundary header.
    #[error("grammar for boundary kind `{0}` does not end at an open delimiter")]
    UnanchoredRule(String),
}

impl EngineError {
    /// Create an out-of-bounds error from an edit span and buffer length.
    pub fn edit_out_of_bounds(range: Span, buffer_len: usize) -> Self {
        Self::EditOutOfBounds {
            start: range.start,
            end: range.end,
            buffer_len: buffer_len as u32,
        }
    }

    /// True if the caller can recover by re-parsing the whole document.
    pub fn is_recoverable_by_reparse(&self) -> bool {
        matches!(
            self,
            Self::EditOutOfBounds { .. } | Self::StaleGeneration { .. }
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;
